//! Atomic value comparison for XPath 2.0 value and general comparisons.

use core::cmp::Ordering;
use core::fmt;

use chrono::{NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::engine::atomize::AtomizeCursor;
use crate::engine::casting::{cast_atomic, lexical_of, parse_double_lex};
use crate::engine::numeric::{NumKind, classify, unify_numeric};
use crate::engine::promotion::time_anchor;
use crate::engine::runtime::{Error, ErrorCode, ValueContext};
use crate::engine::temporal::to_utc;
use crate::engine::xml_helpers::decode_hex;
use crate::model::XdmNode;
use crate::xdm::{AtomicType, SequenceCursor, XdmAtomicValue, XdmItem, XdmSequenceStream};

type V = XdmAtomicValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ComparisonOp {
    /// Value comparison keyword (`eq`, `lt`, ...).
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "eq",
            ComparisonOp::Ne => "ne",
            ComparisonOp::Lt => "lt",
            ComparisonOp::Le => "le",
            ComparisonOp::Gt => "gt",
            ComparisonOp::Ge => "ge",
        }
    }

    /// `None` is an unordered pair (a NaN operand): only `ne` holds.
    fn holds(self, ord: Option<Ordering>) -> bool {
        let Some(ord) = ord else {
            return self == ComparisonOp::Ne;
        };
        match self {
            ComparisonOp::Eq => ord.is_eq(),
            ComparisonOp::Ne => ord.is_ne(),
            ComparisonOp::Lt => ord.is_lt(),
            ComparisonOp::Le => ord.is_le(),
            ComparisonOp::Gt => ord.is_gt(),
            ComparisonOp::Ge => ord.is_ge(),
        }
    }

    fn is_equality(self) -> bool {
        matches!(self, ComparisonOp::Eq | ComparisonOp::Ne)
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

enum Outcome {
    /// Totally ordered pair (`None` when a NaN is involved).
    Ordered(Option<Ordering>),
    /// Pair of a type that only defines equality.
    Equality(bool),
}

/// Value comparison `a op b`.
///
/// `xs:untypedAtomic` operands compare as `xs:string`. Mixed numerics are promoted
/// along the tower, timezone-less temporals take the implicit timezone of `ctx`.
pub fn value_compare(
    op: ComparisonOp,
    a: &XdmAtomicValue,
    b: &XdmAtomicValue,
    ctx: &ValueContext,
) -> Result<bool, Error> {
    let untyped_as_string = |v: &XdmAtomicValue| match v {
        V::UntypedAtomic(s) => V::String(s.clone()),
        other => other.clone(),
    };
    let (a, b) = (untyped_as_string(a), untyped_as_string(b));
    match compare_pair(&a, &b, ctx) {
        Some(Outcome::Ordered(ord)) => Ok(op.holds(ord)),
        Some(Outcome::Equality(eq)) if op.is_equality() => Ok((op == ComparisonOp::Eq) == eq),
        _ => Err(Error::operator_not_defined(op.symbol(), a.type_of(), b.type_of())),
    }
}

pub fn value_eq(a: &XdmAtomicValue, b: &XdmAtomicValue, ctx: &ValueContext) -> Result<bool, Error> {
    value_compare(ComparisonOp::Eq, a, b, ctx)
}

pub fn value_gt(a: &XdmAtomicValue, b: &XdmAtomicValue, ctx: &ValueContext) -> Result<bool, Error> {
    value_compare(ComparisonOp::Gt, a, b, ctx)
}

/// Ordering of two comparable values, `None` if they are incomparable or unordered
/// (NaN). Used by `fn:min`/`fn:max`.
pub(crate) fn order_values(
    a: &XdmAtomicValue,
    b: &XdmAtomicValue,
    ctx: &ValueContext,
) -> Result<Option<Ordering>, Error> {
    match compare_pair(a, b, ctx) {
        Some(Outcome::Ordered(ord)) => Ok(ord),
        _ => Err(Error::operator_not_defined("lt", a.type_of(), b.type_of())),
    }
}

fn compare_pair(a: &XdmAtomicValue, b: &XdmAtomicValue, ctx: &ValueContext) -> Option<Outcome> {
    if let (Some(x), Some(y)) = (classify(a), classify(b)) {
        return Some(Outcome::Ordered(compare_numeric(x, y)));
    }
    let tz = ctx.implicit_timezone;
    let ordered = |o: Ordering| Some(Outcome::Ordered(Some(o)));
    match (a, b) {
        (V::Boolean(x), V::Boolean(y)) => ordered(x.cmp(y)),
        (x, y) if is_string_family(x) && is_string_family(y) => {
            ordered(x.as_str().unwrap_or_default().cmp(y.as_str().unwrap_or_default()))
        }
        (V::DateTime { value: x, tz: tx }, V::DateTime { value: y, tz: ty }) => {
            ordered(to_utc(*x, *tx, tz).cmp(&to_utc(*y, *ty, tz)))
        }
        (V::Date { date: x, tz: tx }, V::Date { date: y, tz: ty }) => {
            let m = NaiveTime::default();
            ordered(to_utc(x.and_time(m), *tx, tz).cmp(&to_utc(y.and_time(m), *ty, tz)))
        }
        (V::Time { time: x, tz: tx }, V::Time { time: y, tz: ty }) => {
            ordered(to_utc(time_anchor(*x), *tx, tz).cmp(&to_utc(time_anchor(*y), *ty, tz)))
        }
        (V::YearMonthDuration(x), V::YearMonthDuration(y)) => ordered(x.cmp(y)),
        (V::DayTimeDuration(x), V::DayTimeDuration(y)) => ordered(x.cmp(y)),
        (V::YearMonthDuration(_), V::DayTimeDuration(_)) | (V::DayTimeDuration(_), V::YearMonthDuration(_)) => None,
        (x, y) if is_duration(x) && is_duration(y) => Some(Outcome::Equality(duration_parts(x) == duration_parts(y))),
        (V::QName { ns_uri: na, local: la, .. }, V::QName { ns_uri: nb, local: lb, .. }) => {
            Some(Outcome::Equality(na == nb && la == lb))
        }
        (V::Notation(x), V::Notation(y)) => Some(Outcome::Equality(x == y)),
        (V::HexBinary(x), V::HexBinary(y)) => Some(Outcome::Equality(decode_hex(x) == decode_hex(y))),
        (V::Base64Binary(x), V::Base64Binary(y)) => Some(Outcome::Equality(x == y)),
        (x, y) if is_g_fragment(x) && x.type_of() == y.type_of() => {
            Some(Outcome::Equality(g_fragment_key(x, tz) == g_fragment_key(y, tz)))
        }
        _ => None,
    }
}

fn compare_numeric(x: NumKind, y: NumKind) -> Option<Ordering> {
    match unify_numeric(x, y) {
        (NumKind::Int(a), NumKind::Int(b)) => Some(a.cmp(&b)),
        (NumKind::Dec(a), NumKind::Dec(b)) => Some(a.cmp(&b)),
        (a, b) => a.to_f64().partial_cmp(&b.to_f64()),
    }
}

/// Strings, string-derived types, `xs:untypedAtomic` and `xs:anyURI` compare by codepoint.
fn is_string_family(v: &XdmAtomicValue) -> bool {
    v.as_str().is_some()
}

fn is_duration(v: &XdmAtomicValue) -> bool {
    v.type_of().derives_from(AtomicType::Duration)
}

fn duration_parts(v: &XdmAtomicValue) -> (i32, Decimal) {
    match v {
        V::Duration { months, seconds } => (*months, seconds.normalize()),
        V::YearMonthDuration(m) => (*m, Decimal::ZERO),
        V::DayTimeDuration(s) => (0, s.normalize()),
        _ => (0, Decimal::ZERO),
    }
}

fn is_g_fragment(v: &XdmAtomicValue) -> bool {
    matches!(v, V::GYear { .. } | V::GYearMonth { .. } | V::GMonth { .. } | V::GMonthDay { .. } | V::GDay { .. })
}

/// Fragments compare as the starting instant of their interval in a reference year.
fn g_fragment_key(v: &XdmAtomicValue, implicit: chrono::FixedOffset) -> Option<NaiveDateTime> {
    let (year, month, day, tz) = match v {
        V::GYear { year, tz } => (*year, 1, 1, *tz),
        V::GYearMonth { year, month, tz } => (*year, u32::from(*month), 1, *tz),
        V::GMonth { month, tz } => (1972, u32::from(*month), 1, *tz),
        V::GMonthDay { month, day, tz } => (1972, u32::from(*month), u32::from(*day), *tz),
        V::GDay { day, tz } => (1972, 12, u32::from(*day), *tz),
        _ => return None,
    };
    let start = chrono::NaiveDate::from_ymd_opt(year, month, day)?.and_time(NaiveTime::default());
    Some(to_utc(start, tz, implicit))
}

/// General comparison (`=`, `!=`, `<`, ...): true if some pair of atomized items
/// from `lhs` and `rhs` satisfies the value comparison.
///
/// An `xs:untypedAtomic` operand becomes `xs:double` against a numeric, `xs:string`
/// against a string or another untyped value, and the other operand's type
/// otherwise.
pub fn general_compare<N: XdmNode>(
    op: ComparisonOp,
    lhs: &XdmSequenceStream<N>,
    rhs: &XdmSequenceStream<N>,
    ctx: &ValueContext,
) -> Result<bool, Error> {
    let right: Vec<XdmAtomicValue> = atoms_of(rhs).collect::<Result<_, _>>()?;
    if right.is_empty() {
        return Ok(false);
    }
    for l in atoms_of(lhs) {
        let l = l?;
        for r in &right {
            let (a, b) = general_operands(&l, r, ctx)?;
            if value_compare(op, &a, &b, ctx)? {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn atoms_of<N: XdmNode>(s: &XdmSequenceStream<N>) -> impl Iterator<Item = Result<XdmAtomicValue, Error>> {
    let mut cursor = AtomizeCursor::new(s.cursor());
    core::iter::from_fn(move || {
        cursor.next_item().map(|r| {
            r.and_then(|it| match it {
                XdmItem::Atomic(a) => Ok(a),
                XdmItem::Node(_) => Err(Error::from_code(ErrorCode::FOER0000, "atomization produced a node")),
            })
        })
    })
}

fn general_operands(
    a: &XdmAtomicValue,
    b: &XdmAtomicValue,
    ctx: &ValueContext,
) -> Result<(XdmAtomicValue, XdmAtomicValue), Error> {
    let convert = |u: &str, other: &XdmAtomicValue| -> Result<XdmAtomicValue, Error> {
        if other.is_numeric() {
            parse_double_lex(u)
                .map(V::Double)
                .ok_or_else(|| Error::from_code(ErrorCode::FORG0001, format!("cannot convert '{u}' to xs:double")))
        } else if matches!(other, V::UntypedAtomic(_)) || other.type_of().is_string_like() {
            Ok(V::String(u.to_string()))
        } else {
            cast_atomic(&V::UntypedAtomic(u.to_string()), other.type_of(), ctx)
        }
    };
    Ok(match (a, b) {
        (V::UntypedAtomic(x), V::UntypedAtomic(y)) => (V::String(x.clone()), V::String(y.clone())),
        (V::UntypedAtomic(x), other) => (convert(x, other)?, other.clone()),
        (other, V::UntypedAtomic(y)) => (other.clone(), convert(y, other)?),
        _ => (a.clone(), b.clone()),
    })
}

/// Hashable equality key for `fn:distinct-values` and `fn:index-of`.
///
/// Keys are equal exactly when the values compare `eq`, except that all NaN values
/// share one key. Numerics compare across the tower, temporals are normalized to
/// UTC and durations of any kind compare by their (months, seconds) parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EqKey {
    NaN,
    /// Numeric value exactly representable as `f64` (bits, with -0 folded into 0).
    Number(u64),
    /// Numeric value beyond `f64` precision.
    Decimal(Decimal),
    Boolean(bool),
    String(String),
    QName(Option<String>, String),
    Notation(String),
    Instant(AtomicType, NaiveDateTime),
    /// Keyed by the subtype the value is comparable with; a generic duration
    /// with both parts set keys as `xs:duration`.
    Duration(AtomicType, i32, Decimal),
    Binary(AtomicType, Vec<u8>),
    /// Values without a normalized form fall back to their canonical lexical form.
    Lexical(AtomicType, String),
}

impl EqKey {
    pub fn new(v: &XdmAtomicValue, ctx: &ValueContext) -> EqKey {
        if let Some(n) = classify(v) {
            return Self::number(n);
        }
        let tz = ctx.implicit_timezone;
        match v {
            V::Boolean(b) => EqKey::Boolean(*b),
            V::QName { ns_uri, local, .. } => EqKey::QName(ns_uri.clone(), local.clone()),
            V::Notation(s) => EqKey::Notation(s.clone()),
            V::DateTime { value, tz: t } => EqKey::Instant(AtomicType::DateTime, to_utc(*value, *t, tz)),
            V::Date { date, tz: t } => {
                EqKey::Instant(AtomicType::Date, to_utc(date.and_time(NaiveTime::default()), *t, tz))
            }
            V::Time { time, tz: t } => EqKey::Instant(AtomicType::Time, to_utc(time_anchor(*time), *t, tz)),
            d if is_duration(d) => {
                let (m, s) = duration_parts(d);
                let family = match d {
                    V::YearMonthDuration(_) => AtomicType::YearMonthDuration,
                    V::Duration { .. } if s.is_zero() && m != 0 => AtomicType::YearMonthDuration,
                    V::Duration { .. } if m != 0 => AtomicType::Duration,
                    _ => AtomicType::DayTimeDuration,
                };
                EqKey::Duration(family, m, s)
            }
            V::HexBinary(h) => match decode_hex(h) {
                Some(bytes) => EqKey::Binary(AtomicType::HexBinary, bytes),
                None => EqKey::Lexical(AtomicType::HexBinary, h.clone()),
            },
            g if is_g_fragment(g) => match g_fragment_key(g, tz) {
                Some(instant) => EqKey::Instant(g.type_of(), instant),
                None => EqKey::Lexical(g.type_of(), g.to_string()),
            },
            s if is_string_family(s) => EqKey::String(lexical_of(s)),
            other => EqKey::Lexical(other.type_of(), other.to_string()),
        }
    }

    fn number(n: NumKind) -> EqKey {
        if n.is_nan() {
            return EqKey::NaN;
        }
        let bits = |f: f64| EqKey::Number(if f == 0.0 { 0.0f64.to_bits() } else { f.to_bits() });
        match n {
            NumKind::Float(_) | NumKind::Double(_) => bits(n.to_f64()),
            NumKind::Int(_) | NumKind::Dec(_) => {
                let d = n.to_decimal().unwrap_or_default();
                let f = n.to_f64();
                if Decimal::from_f64(f).is_some_and(|back| back == d) {
                    bits(f)
                } else {
                    EqKey::Decimal(d.normalize())
                }
            }
        }
    }
}
