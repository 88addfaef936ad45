use chrono::{Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use core::fmt;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::AtomicType;

/// Runtime atomic values of the XDM.
///
/// - Integer subtypes are stored distinctly so `instance of` stays exact without
///   lossy coercion; arithmetic treats them as `xs:integer`.
/// - String-derived subtypes keep their (whitespace-normalized) lexical form.
/// - Binary types keep their canonical lexical encoding; decoding happens on cast.
/// - Temporal values keep the local value plus an optional timezone so that
///   timezone-less values can be normalized against the implicit timezone.
#[derive(Debug, Clone, PartialEq)]
pub enum XdmAtomicValue {
    Boolean(bool),
    String(String),
    UntypedAtomic(String),
    AnyUri(String),
    Integer(i64),
    Decimal(Decimal),
    Double(f64),
    Float(f32),
    QName {
        ns_uri: Option<String>,
        prefix: Option<String>,
        local: String,
    },
    Notation(String),
    DateTime {
        value: NaiveDateTime,
        tz: Option<FixedOffset>,
    },
    Date {
        date: NaiveDate,
        tz: Option<FixedOffset>,
    },
    Time {
        time: NaiveTime,
        tz: Option<FixedOffset>,
    },
    /// Generic `xs:duration` with both components.
    Duration {
        months: i32,
        seconds: Decimal,
    },
    /// Total months (may be negative).
    YearMonthDuration(i32),
    /// Total seconds (may be negative, fractional).
    DayTimeDuration(Decimal),
    Long(i64),
    Int(i32),
    Short(i16),
    Byte(i8),
    UnsignedLong(u64),
    UnsignedInt(u32),
    UnsignedShort(u16),
    UnsignedByte(u8),
    NonPositiveInteger(i64),
    NegativeInteger(i64),
    NonNegativeInteger(u64),
    PositiveInteger(u64),
    Base64Binary(String),
    HexBinary(String),
    GYear {
        year: i32,
        tz: Option<FixedOffset>,
    },
    GYearMonth {
        year: i32,
        month: u8,
        tz: Option<FixedOffset>,
    },
    GMonth {
        month: u8,
        tz: Option<FixedOffset>,
    },
    GMonthDay {
        month: u8,
        day: u8,
        tz: Option<FixedOffset>,
    },
    GDay {
        day: u8,
        tz: Option<FixedOffset>,
    },
    NormalizedString(String),
    Token(String),
    Language(String),
    Name(String),
    NCName(String),
    NMTOKEN(String),
    Id(String),
    IdRef(String),
    Entity(String),
}

impl XdmAtomicValue {
    /// Dynamic type of the value.
    pub fn type_of(&self) -> AtomicType {
        use XdmAtomicValue as V;
        match self {
            V::Boolean(_) => AtomicType::Boolean,
            V::String(_) => AtomicType::String,
            V::UntypedAtomic(_) => AtomicType::UntypedAtomic,
            V::AnyUri(_) => AtomicType::AnyUri,
            V::Integer(_) => AtomicType::Integer,
            V::Decimal(_) => AtomicType::Decimal,
            V::Double(_) => AtomicType::Double,
            V::Float(_) => AtomicType::Float,
            V::QName { .. } => AtomicType::QName,
            V::Notation(_) => AtomicType::Notation,
            V::DateTime { .. } => AtomicType::DateTime,
            V::Date { .. } => AtomicType::Date,
            V::Time { .. } => AtomicType::Time,
            V::Duration { .. } => AtomicType::Duration,
            V::YearMonthDuration(_) => AtomicType::YearMonthDuration,
            V::DayTimeDuration(_) => AtomicType::DayTimeDuration,
            V::Long(_) => AtomicType::Long,
            V::Int(_) => AtomicType::Int,
            V::Short(_) => AtomicType::Short,
            V::Byte(_) => AtomicType::Byte,
            V::UnsignedLong(_) => AtomicType::UnsignedLong,
            V::UnsignedInt(_) => AtomicType::UnsignedInt,
            V::UnsignedShort(_) => AtomicType::UnsignedShort,
            V::UnsignedByte(_) => AtomicType::UnsignedByte,
            V::NonPositiveInteger(_) => AtomicType::NonPositiveInteger,
            V::NegativeInteger(_) => AtomicType::NegativeInteger,
            V::NonNegativeInteger(_) => AtomicType::NonNegativeInteger,
            V::PositiveInteger(_) => AtomicType::PositiveInteger,
            V::Base64Binary(_) => AtomicType::Base64Binary,
            V::HexBinary(_) => AtomicType::HexBinary,
            V::GYear { .. } => AtomicType::GYear,
            V::GYearMonth { .. } => AtomicType::GYearMonth,
            V::GMonth { .. } => AtomicType::GMonth,
            V::GMonthDay { .. } => AtomicType::GMonthDay,
            V::GDay { .. } => AtomicType::GDay,
            V::NormalizedString(_) => AtomicType::NormalizedString,
            V::Token(_) => AtomicType::Token,
            V::Language(_) => AtomicType::Language,
            V::Name(_) => AtomicType::Name,
            V::NCName(_) => AtomicType::NcName,
            V::NMTOKEN(_) => AtomicType::NmToken,
            V::Id(_) => AtomicType::Id,
            V::IdRef(_) => AtomicType::IdRef,
            V::Entity(_) => AtomicType::Entity,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.type_of().is_numeric()
    }

    pub fn is_nan(&self) -> bool {
        match self {
            XdmAtomicValue::Double(d) => d.is_nan(),
            XdmAtomicValue::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Lexical form for string-like values (string subtypes, untypedAtomic, anyURI).
    pub fn as_str(&self) -> Option<&str> {
        use XdmAtomicValue as V;
        match self {
            V::String(s)
            | V::UntypedAtomic(s)
            | V::AnyUri(s)
            | V::NormalizedString(s)
            | V::Token(s)
            | V::Language(s)
            | V::Name(s)
            | V::NCName(s)
            | V::NMTOKEN(s)
            | V::Id(s)
            | V::IdRef(s)
            | V::Entity(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for XdmAtomicValue {
    fn from(b: bool) -> Self {
        XdmAtomicValue::Boolean(b)
    }
}

impl From<i64> for XdmAtomicValue {
    fn from(i: i64) -> Self {
        XdmAtomicValue::Integer(i)
    }
}

impl From<f64> for XdmAtomicValue {
    fn from(d: f64) -> Self {
        XdmAtomicValue::Double(d)
    }
}

impl From<Decimal> for XdmAtomicValue {
    fn from(d: Decimal) -> Self {
        XdmAtomicValue::Decimal(d)
    }
}

impl From<&str> for XdmAtomicValue {
    fn from(s: &str) -> Self {
        XdmAtomicValue::String(s.to_string())
    }
}

impl From<String> for XdmAtomicValue {
    fn from(s: String) -> Self {
        XdmAtomicValue::String(s)
    }
}

/// Canonical lexical form (the result of casting to `xs:string`).
impl fmt::Display for XdmAtomicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use XdmAtomicValue as V;
        match self {
            V::Boolean(b) => write!(f, "{b}"),
            V::Integer(i) | V::Long(i) | V::NonPositiveInteger(i) | V::NegativeInteger(i) => write!(f, "{i}"),
            V::Int(i) => write!(f, "{i}"),
            V::Short(i) => write!(f, "{i}"),
            V::Byte(i) => write!(f, "{i}"),
            V::UnsignedLong(i) | V::NonNegativeInteger(i) | V::PositiveInteger(i) => write!(f, "{i}"),
            V::UnsignedInt(i) => write!(f, "{i}"),
            V::UnsignedShort(i) => write!(f, "{i}"),
            V::UnsignedByte(i) => write!(f, "{i}"),
            V::Decimal(d) => f.write_str(&format_decimal(*d)),
            V::Double(d) => f.write_str(&format_double(*d)),
            V::Float(x) => f.write_str(&format_float(*x)),
            V::QName { prefix: Some(p), local, .. } if !p.is_empty() => write!(f, "{p}:{local}"),
            V::QName { local, .. } => f.write_str(local),
            V::Notation(s) | V::Base64Binary(s) | V::HexBinary(s) => f.write_str(s),
            V::DateTime { value, tz } => {
                write_date(f, value.date())?;
                f.write_str("T")?;
                write_time(f, value.time())?;
                write_tz(f, *tz)
            }
            V::Date { date, tz } => {
                write_date(f, *date)?;
                write_tz(f, *tz)
            }
            V::Time { time, tz } => {
                write_time(f, *time)?;
                write_tz(f, *tz)
            }
            V::Duration { months, seconds } => f.write_str(&format_duration(*months, *seconds)),
            V::YearMonthDuration(m) => f.write_str(&format_duration(*m, Decimal::ZERO).replace("PT0S", "P0M")),
            V::DayTimeDuration(s) => f.write_str(&format_duration(0, *s)),
            V::GYear { year, tz } => {
                write_year(f, *year)?;
                write_tz(f, *tz)
            }
            V::GYearMonth { year, month, tz } => {
                write_year(f, *year)?;
                write!(f, "-{month:02}")?;
                write_tz(f, *tz)
            }
            V::GMonth { month, tz } => {
                write!(f, "--{month:02}")?;
                write_tz(f, *tz)
            }
            V::GMonthDay { month, day, tz } => {
                write!(f, "--{month:02}-{day:02}")?;
                write_tz(f, *tz)
            }
            V::GDay { day, tz } => {
                write!(f, "---{day:02}")?;
                write_tz(f, *tz)
            }
            other => f.write_str(other.as_str().unwrap_or_default()),
        }
    }
}

pub(crate) fn format_decimal(d: Decimal) -> String {
    d.normalize().to_string()
}

/// XPath canonical form: plain notation for magnitudes in `[1e-6, 1e6)`, otherwise
/// scientific notation with at least one fractional mantissa digit (`1.0E7`).
pub(crate) fn format_double(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "INF".to_string() } else { "-INF".to_string() };
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0".to_string() } else { "0".to_string() };
    }
    let abs = v.abs();
    if (1e-6..1e6).contains(&abs) { format!("{v}") } else { scientific(&format!("{v:E}")) }
}

pub(crate) fn format_float(v: f32) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "INF".to_string() } else { "-INF".to_string() };
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0".to_string() } else { "0".to_string() };
    }
    let abs = v.abs();
    if (1e-6..1e6).contains(&abs) { format!("{v}") } else { scientific(&format!("{v:E}")) }
}

fn scientific(raw: &str) -> String {
    match raw.split_once('E') {
        Some((mantissa, exp)) if !mantissa.contains('.') => format!("{mantissa}.0E{exp}"),
        _ => raw.to_string(),
    }
}

/// `PnYnMnDTnHnMnS` with zero components omitted; `PT0S` for a zero duration.
pub(crate) fn format_duration(months: i32, seconds: Decimal) -> String {
    let negative = months < 0 || (seconds.is_sign_negative() && !seconds.is_zero());
    let months = months.unsigned_abs();
    let seconds = seconds.abs();
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push('P');
    let (years, rem_months) = (months / 12, months % 12);
    if years > 0 {
        out.push_str(&format!("{years}Y"));
    }
    if rem_months > 0 {
        out.push_str(&format!("{rem_months}M"));
    }
    let whole = seconds.trunc();
    let frac = seconds - whole;
    let total = whole.to_u64().unwrap_or(u64::MAX);
    let (days, hours, minutes, secs) = (total / 86_400, (total % 86_400) / 3600, (total % 3600) / 60, total % 60);
    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    if hours > 0 || minutes > 0 || secs > 0 || !frac.is_zero() {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{hours}H"));
        }
        if minutes > 0 {
            out.push_str(&format!("{minutes}M"));
        }
        if secs > 0 || !frac.is_zero() {
            out.push_str(&format_decimal(Decimal::from(secs) + frac));
            out.push('S');
        }
    }
    if out.ends_with('P') {
        out.push_str("T0S");
    }
    out
}

fn write_year(f: &mut fmt::Formatter<'_>, year: i32) -> fmt::Result {
    if year < 0 { write!(f, "-{:04}", year.unsigned_abs()) } else { write!(f, "{year:04}") }
}

fn write_date(f: &mut fmt::Formatter<'_>, date: NaiveDate) -> fmt::Result {
    write_year(f, date.year())?;
    write!(f, "-{:02}-{:02}", date.month(), date.day())
}

fn write_time(f: &mut fmt::Formatter<'_>, time: NaiveTime) -> fmt::Result {
    write!(f, "{:02}:{:02}:{:02}", time.hour(), time.minute(), time.second())?;
    let nanos = time.nanosecond() % 1_000_000_000;
    if nanos > 0 {
        let digits = format!("{nanos:09}");
        write!(f, ".{}", digits.trim_end_matches('0'))?;
    }
    Ok(())
}

fn write_tz(f: &mut fmt::Formatter<'_>, tz: Option<FixedOffset>) -> fmt::Result {
    let Some(tz) = tz else {
        return Ok(());
    };
    let secs = tz.local_minus_utc();
    if secs == 0 {
        return f.write_str("Z");
    }
    let sign = if secs < 0 { '-' } else { '+' };
    let abs = secs.unsigned_abs();
    write!(f, "{sign}{:02}:{:02}", abs / 3600, (abs % 3600) / 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_canonical_forms() {
        assert_eq!(format_double(2.0), "2");
        assert_eq!(format_double(3.5), "3.5");
        assert_eq!(format_double(1e7), "1.0E7");
        assert_eq!(format_double(1.5e-7), "1.5E-7");
        assert_eq!(format_double(f64::NAN), "NaN");
        assert_eq!(format_double(f64::NEG_INFINITY), "-INF");
    }

    #[test]
    fn duration_canonical_forms() {
        assert_eq!(format_duration(0, Decimal::from(3600)), "PT1H");
        assert_eq!(format_duration(14, Decimal::ZERO), "P1Y2M");
        assert_eq!(format_duration(0, Decimal::ZERO), "PT0S");
        assert_eq!(format_duration(0, Decimal::new(-905, 1)), "-PT1M30.5S");
        assert_eq!(XdmAtomicValue::YearMonthDuration(0).to_string(), "P0M");
    }
}
