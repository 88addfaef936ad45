//! Unified numeric classification and promotion helpers.
//!
//! [`NumKind`] classifies atomic values into the four numeric primitives, carrying
//! the promoted value; it is shared by the arithmetic, comparison and aggregate
//! paths.

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use crate::xdm::XdmAtomicValue;

/// Numeric classification carrying the promoted value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum NumKind {
    Int(i64),
    Dec(Decimal),
    Float(f32),
    Double(f64),
}

impl NumKind {
    /// Convert any numeric kind to f64 (lossy for Decimal).
    pub(crate) fn to_f64(self) -> f64 {
        match self {
            NumKind::Int(i) => i as f64,
            NumKind::Dec(d) => d.to_f64().unwrap_or(f64::NAN),
            NumKind::Float(f) => f64::from(f),
            NumKind::Double(d) => d,
        }
    }

    pub(crate) fn to_decimal(self) -> Option<Decimal> {
        match self {
            NumKind::Int(i) => Some(Decimal::from(i)),
            NumKind::Dec(d) => Some(d),
            NumKind::Float(f) => Decimal::from_f32(f),
            NumKind::Double(d) => Decimal::from_f64(d),
        }
    }

    pub(crate) fn is_nan(self) -> bool {
        match self {
            NumKind::Float(f) => f.is_nan(),
            NumKind::Double(d) => d.is_nan(),
            _ => false,
        }
    }

    pub(crate) fn into_atomic(self) -> XdmAtomicValue {
        match self {
            NumKind::Int(i) => XdmAtomicValue::Integer(i),
            NumKind::Dec(d) => XdmAtomicValue::Decimal(d),
            NumKind::Float(f) => XdmAtomicValue::Float(f),
            NumKind::Double(d) => XdmAtomicValue::Double(d),
        }
    }
}

/// Classify an atomic value into a [`NumKind`], if it is numeric. Integer subtypes
/// classify as integers; unsigned values beyond `i64` fall back to decimal.
pub(crate) fn classify(v: &XdmAtomicValue) -> Option<NumKind> {
    use XdmAtomicValue as V;
    Some(match v {
        V::Integer(i) | V::Long(i) | V::NonPositiveInteger(i) | V::NegativeInteger(i) => NumKind::Int(*i),
        V::Int(i) => NumKind::Int(i64::from(*i)),
        V::Short(i) => NumKind::Int(i64::from(*i)),
        V::Byte(i) => NumKind::Int(i64::from(*i)),
        V::UnsignedInt(i) => NumKind::Int(i64::from(*i)),
        V::UnsignedShort(i) => NumKind::Int(i64::from(*i)),
        V::UnsignedByte(i) => NumKind::Int(i64::from(*i)),
        V::UnsignedLong(u) | V::NonNegativeInteger(u) | V::PositiveInteger(u) => match i64::try_from(*u) {
            Ok(i) => NumKind::Int(i),
            Err(_) => NumKind::Dec(Decimal::from(*u)),
        },
        V::Decimal(d) => NumKind::Dec(*d),
        V::Float(f) => NumKind::Float(*f),
        V::Double(d) => NumKind::Double(*d),
        _ => return None,
    })
}

/// Promote two [`NumKind`] values to a common type: integer+integer stays integer,
/// integer+decimal becomes decimal, anything with float becomes float, anything
/// with double becomes double.
pub(crate) fn unify_numeric(a: NumKind, b: NumKind) -> (NumKind, NumKind) {
    use NumKind::*;
    match (a, b) {
        (Double(x), y) => (Double(x), Double(y.to_f64())),
        (y, Double(x)) => (Double(y.to_f64()), Double(x)),
        (Float(x), Float(y)) => (Float(x), Float(y)),
        (Float(x), Int(y)) => (Float(x), Float(y as f32)),
        (Int(x), Float(y)) => (Float(x as f32), Float(y)),
        (Float(x), Dec(y)) => (Float(x), Float(y.to_f32().unwrap_or(f32::NAN))),
        (Dec(x), Float(y)) => (Float(x.to_f32().unwrap_or(f32::NAN)), Float(y)),
        (Dec(x), Dec(y)) => (Dec(x), Dec(y)),
        (Dec(x), Int(y)) => (Dec(x), Dec(Decimal::from(y))),
        (Int(x), Dec(y)) => (Dec(Decimal::from(x)), Dec(y)),
        (Int(x), Int(y)) => (Int(x), Int(y)),
    }
}

/// Extract an integer value as `i128` from any integer-derived atomic.
pub(crate) fn a_as_i128(a: &XdmAtomicValue) -> Option<i128> {
    use XdmAtomicValue as V;
    Some(match a {
        V::Integer(i) | V::Long(i) | V::NonPositiveInteger(i) | V::NegativeInteger(i) => i128::from(*i),
        V::Int(i) => i128::from(*i),
        V::Short(i) => i128::from(*i),
        V::Byte(i) => i128::from(*i),
        V::UnsignedLong(u) | V::NonNegativeInteger(u) | V::PositiveInteger(u) => i128::from(*u),
        V::UnsignedInt(i) => i128::from(*i),
        V::UnsignedShort(i) => i128::from(*i),
        V::UnsignedByte(i) => i128::from(*i),
        _ => return None,
    })
}
