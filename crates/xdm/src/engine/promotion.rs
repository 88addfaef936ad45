//! Arithmetic operator dispatch with type promotion.
//!
//! Operands are first normalized (`xs:untypedAtomic` becomes `xs:double`), then the
//! pair is dispatched on its kinds:
//! - two numerics are unified along the tower integer < decimal < float < double
//!   and computed in the promoted representation;
//! - durations combine with durations of the same kind, or with the generic
//!   `xs:duration` after promoting the lower-ranked operand;
//! - numerics scale durations (`*`, `div`), never add to them;
//! - date/time values shift by durations and subtract to `xs:dayTimeDuration`.
//!
//! Every other pair fails with [`Error::operator_not_defined`].

use core::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::engine::casting::parse_double_lex;
use crate::engine::numeric::{NumKind, classify, unify_numeric};
use crate::engine::runtime::{Error, ErrorCode, ValueContext};
use crate::engine::temporal::{add_months_saturating, delta_to_seconds, seconds_to_delta, to_utc};
use crate::xdm::{AtomicType, XdmAtomicValue};

type V = XdmAtomicValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    IDiv,
    Mod,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "div",
            ArithOp::IDiv => "idiv",
            ArithOp::Mod => "mod",
        }
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Common type two atomic types promote to, by rank within their family.
///
/// Numerics promote along the tower; `xs:yearMonthDuration` and
/// `xs:dayTimeDuration` promote to `xs:duration` only when the other side is the
/// generic duration. Returns `None` for unrelated families.
pub fn common_type(a: AtomicType, b: AtomicType) -> Option<AtomicType> {
    use AtomicType as T;
    if a.is_numeric() && b.is_numeric() {
        let rank = a.rank()?.max(b.rank()?);
        return Some(match rank {
            0 => T::Integer,
            1 => T::Decimal,
            2 => T::Float,
            _ => T::Double,
        });
    }
    match (a, b) {
        _ if a == b => Some(a),
        (T::Duration, T::YearMonthDuration | T::DayTimeDuration)
        | (T::YearMonthDuration | T::DayTimeDuration, T::Duration) => Some(T::Duration),
        _ => None,
    }
}

/// Convert `value` into the representation of a higher-ranked type of its family.
pub fn promote(value: &XdmAtomicValue, target: AtomicType) -> Option<XdmAtomicValue> {
    use AtomicType as T;
    let from = value.type_of();
    if from == target {
        return Some(value.clone());
    }
    if from.rank()? > target.rank()? {
        return None;
    }
    if let Some(n) = classify(value) {
        return match target {
            T::Integer => Some(n.into_atomic()),
            T::Decimal => n.to_decimal().map(V::Decimal),
            T::Float => Some(V::Float(n.to_f64() as f32)),
            T::Double => Some(V::Double(n.to_f64())),
            _ => None,
        };
    }
    match (value, target) {
        (V::YearMonthDuration(m), T::Duration) => Some(V::Duration { months: *m, seconds: Decimal::ZERO }),
        (V::DayTimeDuration(s), T::Duration) => Some(V::Duration { months: 0, seconds: *s }),
        _ => None,
    }
}

/// `xs:untypedAtomic` operands of arithmetic are cast to `xs:double`.
fn normalize_operand(v: &XdmAtomicValue) -> Result<XdmAtomicValue, Error> {
    match v {
        V::UntypedAtomic(s) => parse_double_lex(s)
            .map(V::Double)
            .ok_or_else(|| Error::from_code(ErrorCode::FORG0001, format!("cannot convert '{s}' to xs:double"))),
        other => Ok(other.clone()),
    }
}

/// Evaluate `a op b`.
pub fn arithmetic(
    op: ArithOp,
    a: &XdmAtomicValue,
    b: &XdmAtomicValue,
    ctx: &ValueContext,
) -> Result<XdmAtomicValue, Error> {
    let a = normalize_operand(a)?;
    let b = normalize_operand(b)?;
    if let (Some(x), Some(y)) = (classify(&a), classify(&b)) {
        let (x, y) = unify_numeric(x, y);
        return numeric_arith(op, x, y);
    }
    duration_arith(op, &a, &b)
        .or_else(|| temporal_arith(op, &a, &b, ctx))
        .unwrap_or_else(|| Err(Error::operator_not_defined(op.symbol(), a.type_of(), b.type_of())))
}

pub fn add(a: &XdmAtomicValue, b: &XdmAtomicValue, ctx: &ValueContext) -> Result<XdmAtomicValue, Error> {
    arithmetic(ArithOp::Add, a, b, ctx)
}

pub fn sub(a: &XdmAtomicValue, b: &XdmAtomicValue, ctx: &ValueContext) -> Result<XdmAtomicValue, Error> {
    arithmetic(ArithOp::Sub, a, b, ctx)
}

pub fn mul(a: &XdmAtomicValue, b: &XdmAtomicValue, ctx: &ValueContext) -> Result<XdmAtomicValue, Error> {
    arithmetic(ArithOp::Mul, a, b, ctx)
}

pub fn div(a: &XdmAtomicValue, b: &XdmAtomicValue, ctx: &ValueContext) -> Result<XdmAtomicValue, Error> {
    arithmetic(ArithOp::Div, a, b, ctx)
}

pub fn idiv(a: &XdmAtomicValue, b: &XdmAtomicValue, ctx: &ValueContext) -> Result<XdmAtomicValue, Error> {
    arithmetic(ArithOp::IDiv, a, b, ctx)
}

pub fn modulo(a: &XdmAtomicValue, b: &XdmAtomicValue, ctx: &ValueContext) -> Result<XdmAtomicValue, Error> {
    arithmetic(ArithOp::Mod, a, b, ctx)
}

/// Unary minus. Integer subtypes yield `xs:integer`.
pub fn negate(a: &XdmAtomicValue) -> Result<XdmAtomicValue, Error> {
    let a = normalize_operand(a)?;
    if let Some(n) = classify(&a) {
        return Ok(match n {
            NumKind::Int(i) => V::Integer(i.checked_neg().ok_or_else(overflow)?),
            NumKind::Dec(d) => V::Decimal(-d),
            NumKind::Float(f) => V::Float(-f),
            NumKind::Double(d) => V::Double(-d),
        });
    }
    match a {
        V::YearMonthDuration(m) => Ok(V::YearMonthDuration(m.checked_neg().ok_or_else(duration_overflow)?)),
        V::DayTimeDuration(s) => Ok(V::DayTimeDuration(-s)),
        other => {
            Err(Error::from_code(ErrorCode::XPTY0004, format!("unary '-' is not defined for {}", other.type_of())))
        }
    }
}

/// Unary plus: numerics and durations pass through unchanged.
pub fn unary_plus(a: &XdmAtomicValue) -> Result<XdmAtomicValue, Error> {
    let a = normalize_operand(a)?;
    if a.is_numeric() || matches!(a, V::YearMonthDuration(_) | V::DayTimeDuration(_)) {
        return Ok(a);
    }
    Err(Error::from_code(ErrorCode::XPTY0004, format!("unary '+' is not defined for {}", a.type_of())))
}

fn overflow() -> Error {
    Error::from_code(ErrorCode::FOAR0002, "numeric overflow")
}

fn division_by_zero() -> Error {
    Error::from_code(ErrorCode::FOAR0001, "division by zero")
}

fn duration_overflow() -> Error {
    Error::from_code(ErrorCode::FODT0002, "duration overflow")
}

fn mixed_sign_duration() -> Error {
    Error::from_code(ErrorCode::FODT0002, "duration result mixes positive and negative parts")
}

fn datetime_overflow() -> Error {
    Error::from_code(ErrorCode::FODT0001, "date/time overflow")
}

fn numeric_arith(op: ArithOp, a: NumKind, b: NumKind) -> Result<XdmAtomicValue, Error> {
    use NumKind::*;
    match (a, b) {
        (Int(x), Int(y)) => integer_arith(op, x, y),
        (Dec(x), Dec(y)) => decimal_arith(op, x, y),
        (Float(x), Float(y)) => Ok(match float_arith(op, f64::from(x), f64::from(y))? {
            FloatOut::Value(v) => V::Float(v as f32),
            FloatOut::Integer(i) => V::Integer(i),
        }),
        (x, y) => Ok(match float_arith(op, x.to_f64(), y.to_f64())? {
            FloatOut::Value(v) => V::Double(v),
            FloatOut::Integer(i) => V::Integer(i),
        }),
    }
}

fn integer_arith(op: ArithOp, x: i64, y: i64) -> Result<XdmAtomicValue, Error> {
    Ok(match op {
        ArithOp::Add => V::Integer(x.checked_add(y).ok_or_else(overflow)?),
        ArithOp::Sub => V::Integer(x.checked_sub(y).ok_or_else(overflow)?),
        ArithOp::Mul => V::Integer(x.checked_mul(y).ok_or_else(overflow)?),
        // integer div integer is a decimal
        ArithOp::Div => {
            if y == 0 {
                return Err(division_by_zero());
            }
            V::Decimal(Decimal::from(x).checked_div(Decimal::from(y)).ok_or_else(overflow)?)
        }
        ArithOp::IDiv => {
            if y == 0 {
                return Err(division_by_zero());
            }
            V::Integer(x.checked_div(y).ok_or_else(overflow)?)
        }
        ArithOp::Mod => {
            if y == 0 {
                return Err(division_by_zero());
            }
            V::Integer(x.checked_rem(y).unwrap_or(0))
        }
    })
}

fn decimal_arith(op: ArithOp, x: Decimal, y: Decimal) -> Result<XdmAtomicValue, Error> {
    if matches!(op, ArithOp::Div | ArithOp::IDiv | ArithOp::Mod) && y.is_zero() {
        return Err(division_by_zero());
    }
    Ok(match op {
        ArithOp::Add => V::Decimal(x.checked_add(y).ok_or_else(overflow)?),
        ArithOp::Sub => V::Decimal(x.checked_sub(y).ok_or_else(overflow)?),
        ArithOp::Mul => V::Decimal(x.checked_mul(y).ok_or_else(overflow)?),
        ArithOp::Div => V::Decimal(x.checked_div(y).ok_or_else(overflow)?),
        ArithOp::IDiv => {
            let q = x.checked_div(y).ok_or_else(overflow)?.trunc();
            V::Integer(q.to_i64().ok_or_else(overflow)?)
        }
        ArithOp::Mod => V::Decimal(x.checked_rem(y).ok_or_else(overflow)?),
    })
}

enum FloatOut {
    Value(f64),
    Integer(i64),
}

/// IEEE arithmetic; `idiv` is the only operator with a checked integer result.
fn float_arith(op: ArithOp, x: f64, y: f64) -> Result<FloatOut, Error> {
    Ok(FloatOut::Value(match op {
        ArithOp::Add => x + y,
        ArithOp::Sub => x - y,
        ArithOp::Mul => x * y,
        ArithOp::Div => x / y,
        ArithOp::Mod => x % y,
        ArithOp::IDiv => {
            if y == 0.0 {
                return Err(division_by_zero());
            }
            if x.is_nan() || y.is_nan() || x.is_infinite() {
                return Err(Error::from_code(ErrorCode::FOAR0002, "idiv operand is NaN or infinite"));
            }
            let q = (x / y).trunc();
            if q < i64::MIN as f64 || q >= i64::MAX as f64 {
                return Err(overflow());
            }
            return Ok(FloatOut::Integer(q as i64));
        }
    }))
}

/// Numeric factor of a duration scaling, rejecting NaN.
fn scale_factor(n: &XdmAtomicValue) -> Result<Option<NumKind>, Error> {
    let Some(k) = classify(n) else {
        return Ok(None);
    };
    if k.is_nan() {
        return Err(Error::from_code(ErrorCode::FOCA0005, "NaN supplied as a duration operand"));
    }
    Ok(Some(k))
}

/// `fn:round` semantics: halves round toward positive infinity.
fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

fn months_from_f64(x: f64) -> Result<i32, Error> {
    let r = round_half_up(x);
    if !r.is_finite() || r < f64::from(i32::MIN) || r > f64::from(i32::MAX) {
        return Err(duration_overflow());
    }
    Ok(r as i32)
}

fn seconds_from_factor(k: NumKind) -> Result<Decimal, Error> {
    k.to_decimal().ok_or_else(duration_overflow)
}

fn duration_arith(op: ArithOp, a: &XdmAtomicValue, b: &XdmAtomicValue) -> Option<Result<XdmAtomicValue, Error>> {
    use ArithOp::*;
    let result = match (a, b, op) {
        (V::YearMonthDuration(x), V::YearMonthDuration(y), Add) => {
            x.checked_add(*y).map(V::YearMonthDuration).ok_or_else(duration_overflow)
        }
        (V::YearMonthDuration(x), V::YearMonthDuration(y), Sub) => {
            x.checked_sub(*y).map(V::YearMonthDuration).ok_or_else(duration_overflow)
        }
        (V::YearMonthDuration(x), V::YearMonthDuration(y), Div) => {
            if *y == 0 {
                Err(division_by_zero())
            } else {
                Decimal::from(*x).checked_div(Decimal::from(*y)).map(V::Decimal).ok_or_else(overflow)
            }
        }
        (V::DayTimeDuration(x), V::DayTimeDuration(y), Add) => {
            x.checked_add(*y).map(V::DayTimeDuration).ok_or_else(duration_overflow)
        }
        (V::DayTimeDuration(x), V::DayTimeDuration(y), Sub) => {
            x.checked_sub(*y).map(V::DayTimeDuration).ok_or_else(duration_overflow)
        }
        (V::DayTimeDuration(x), V::DayTimeDuration(y), Div) => {
            if y.is_zero() {
                Err(division_by_zero())
            } else {
                x.checked_div(*y).map(V::Decimal).ok_or_else(overflow)
            }
        }
        (V::YearMonthDuration(m), n, Mul) | (n, V::YearMonthDuration(m), Mul) if n.is_numeric() => {
            scale_year_month(*m, n, false)
        }
        (V::YearMonthDuration(m), n, Div) if n.is_numeric() => scale_year_month(*m, n, true),
        (V::DayTimeDuration(s), n, Mul) | (n, V::DayTimeDuration(s), Mul) if n.is_numeric() => {
            scale_day_time(*s, n, false)
        }
        (V::DayTimeDuration(s), n, Div) if n.is_numeric() => scale_day_time(*s, n, true),
        (x, y, Add | Sub) if is_duration(x) && is_duration(y) => {
            let promoted = common_type(x.type_of(), y.type_of()).and_then(|t| Some((promote(x, t)?, promote(y, t)?)));
            match promoted {
                Some((V::Duration { months: m1, seconds: s1 }, V::Duration { months: m2, seconds: s2 })) => {
                    let months = if op == Add { m1.checked_add(m2) } else { m1.checked_sub(m2) };
                    let seconds = if op == Add { s1.checked_add(s2) } else { s1.checked_sub(s2) };
                    match (months, seconds) {
                        // xs:duration carries one sign for both components
                        (Some(months), Some(seconds)) if months.signum() * signum(seconds) < 0 => {
                            Err(mixed_sign_duration())
                        }
                        (Some(months), Some(seconds)) => Ok(V::Duration { months, seconds }),
                        _ => Err(duration_overflow()),
                    }
                }
                _ => return None,
            }
        }
        _ => return None,
    };
    Some(result)
}

fn signum(d: Decimal) -> i32 {
    if d.is_zero() {
        0
    } else if d.is_sign_negative() {
        -1
    } else {
        1
    }
}

fn is_duration(v: &XdmAtomicValue) -> bool {
    v.type_of().derives_from(AtomicType::Duration)
}

fn scale_year_month(months: i32, n: &XdmAtomicValue, divide: bool) -> Result<XdmAtomicValue, Error> {
    let Some(k) = scale_factor(n)? else {
        return Err(Error::operator_not_defined("*", AtomicType::YearMonthDuration, n.type_of()));
    };
    let f = k.to_f64();
    let x = if divide {
        if f == 0.0 {
            return Err(duration_overflow());
        }
        f64::from(months) / f
    } else {
        if f.is_infinite() {
            return Err(duration_overflow());
        }
        f64::from(months) * f
    };
    months_from_f64(x).map(V::YearMonthDuration)
}

fn scale_day_time(seconds: Decimal, n: &XdmAtomicValue, divide: bool) -> Result<XdmAtomicValue, Error> {
    let Some(k) = scale_factor(n)? else {
        return Err(Error::operator_not_defined("*", AtomicType::DayTimeDuration, n.type_of()));
    };
    let f = k.to_f64();
    if divide {
        if f == 0.0 {
            return Err(duration_overflow());
        }
        if f.is_infinite() {
            return Ok(V::DayTimeDuration(Decimal::ZERO));
        }
        let d = seconds_from_factor(k)?;
        return seconds.checked_div(d).map(V::DayTimeDuration).ok_or_else(duration_overflow);
    }
    if f.is_infinite() {
        return Err(duration_overflow());
    }
    let d = seconds_from_factor(k)?;
    seconds.checked_mul(d).map(|s| V::DayTimeDuration(s.normalize())).ok_or_else(duration_overflow)
}

/// Anchor date used for `xs:time` arithmetic and comparison.
pub(crate) fn time_anchor(time: NaiveTime) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1972, 12, 31).unwrap_or_default().and_time(time)
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default())
}

fn temporal_arith(
    op: ArithOp,
    a: &XdmAtomicValue,
    b: &XdmAtomicValue,
    ctx: &ValueContext,
) -> Option<Result<XdmAtomicValue, Error>> {
    use ArithOp::*;
    let sign = |op: ArithOp, m: i32| if op == Sub { m.checked_neg() } else { Some(m) };
    let result = match (a, b, op) {
        (V::DateTime { value, tz }, V::YearMonthDuration(m), Add | Sub)
        | (V::YearMonthDuration(m), V::DateTime { value, tz }, Add) => {
            sign(op, *m)
                .and_then(|m| add_months_saturating(value.date(), m))
                .map(|d| V::DateTime { value: d.and_time(value.time()), tz: *tz })
                .ok_or_else(datetime_overflow)
        }
        (V::Date { date, tz }, V::YearMonthDuration(m), Add | Sub)
        | (V::YearMonthDuration(m), V::Date { date, tz }, Add) => {
            sign(op, *m)
                .and_then(|m| add_months_saturating(*date, m))
                .map(|d| V::Date { date: d, tz: *tz })
                .ok_or_else(datetime_overflow)
        }
        (V::DateTime { value, tz }, V::DayTimeDuration(s), Add | Sub)
        | (V::DayTimeDuration(s), V::DateTime { value, tz }, Add) => {
            shift(*value, *s, op).map(|v| V::DateTime { value: v, tz: *tz })
        }
        (V::Date { date, tz }, V::DayTimeDuration(s), Add | Sub)
        | (V::DayTimeDuration(s), V::Date { date, tz }, Add) => {
            shift(midnight(*date), *s, op).map(|v| V::Date { date: v.date(), tz: *tz })
        }
        (V::Time { time, tz }, V::DayTimeDuration(s), Add | Sub)
        | (V::DayTimeDuration(s), V::Time { time, tz }, Add) => {
            // wraps around midnight
            let secs = if op == Sub { -*s } else { *s };
            let day = Decimal::from(86_400);
            let wrapped = secs.checked_rem(day).unwrap_or_default();
            seconds_to_delta(wrapped)
                .map(|d| V::Time { time: time.overflowing_add_signed(d).0, tz: *tz })
                .ok_or_else(duration_overflow)
        }
        (V::DateTime { value: x, tz: tx }, V::DateTime { value: y, tz: ty }, Sub) => {
            Ok(difference(to_utc(*x, *tx, ctx.implicit_timezone), to_utc(*y, *ty, ctx.implicit_timezone)))
        }
        (V::Date { date: x, tz: tx }, V::Date { date: y, tz: ty }, Sub) => Ok(difference(
            to_utc(midnight(*x), *tx, ctx.implicit_timezone),
            to_utc(midnight(*y), *ty, ctx.implicit_timezone),
        )),
        (V::Time { time: x, tz: tx }, V::Time { time: y, tz: ty }, Sub) => Ok(difference(
            to_utc(time_anchor(*x), *tx, ctx.implicit_timezone),
            to_utc(time_anchor(*y), *ty, ctx.implicit_timezone),
        )),
        _ => return None,
    };
    Some(result)
}

fn shift(value: NaiveDateTime, seconds: Decimal, op: ArithOp) -> Result<NaiveDateTime, Error> {
    let delta = seconds_to_delta(seconds).ok_or_else(datetime_overflow)?;
    let shifted = if op == ArithOp::Sub { value.checked_sub_signed(delta) } else { value.checked_add_signed(delta) };
    shifted.ok_or_else(datetime_overflow)
}

fn difference(x: NaiveDateTime, y: NaiveDateTime) -> XdmAtomicValue {
    V::DayTimeDuration(delta_to_seconds(x - y).normalize())
}
