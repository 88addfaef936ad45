//! Lexical parsing of XML Schema date/time and duration literals, plus the small
//! calendar helpers used by temporal arithmetic.

use chrono::{Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TemporalErr {
    Lexical,
    Range,
}

type TResult<T> = Result<T, TemporalErr>;

/// Split a trailing timezone (`Z` or `±hh:mm`) off a lexical value.
fn split_tz(s: &str) -> TResult<(&str, Option<FixedOffset>)> {
    if let Some(body) = s.strip_suffix('Z') {
        return Ok((body, FixedOffset::east_opt(0)));
    }
    let bytes = s.as_bytes();
    let n = bytes.len();
    if n >= 6 && matches!(bytes[n - 6], b'+' | b'-') && bytes[n - 3] == b':' {
        let hh = two_digits(&s[n - 5..n - 3])?;
        let mm = two_digits(&s[n - 2..])?;
        if hh > 14 || mm > 59 || (hh == 14 && mm != 0) {
            return Err(TemporalErr::Range);
        }
        let secs = i32::try_from(hh * 3600 + mm * 60).map_err(|_| TemporalErr::Range)?;
        let secs = if bytes[n - 6] == b'-' { -secs } else { secs };
        return Ok((&s[..n - 6], Some(FixedOffset::east_opt(secs).ok_or(TemporalErr::Range)?)));
    }
    Ok((s, None))
}

fn two_digits(s: &str) -> TResult<u32> {
    if s.len() != 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TemporalErr::Lexical);
    }
    s.parse().map_err(|_| TemporalErr::Lexical)
}

/// `-?YYYY+` with no leading zeros beyond four digits; year zero is rejected.
fn parse_year(s: &str) -> TResult<i32> {
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.len() < 4
        || !digits.bytes().all(|b| b.is_ascii_digit())
        || (digits.len() > 4 && digits.starts_with('0'))
    {
        return Err(TemporalErr::Lexical);
    }
    let year: i32 = s.parse().map_err(|_| TemporalErr::Range)?;
    if year == 0 {
        return Err(TemporalErr::Range);
    }
    Ok(year)
}

fn parse_ymd(body: &str) -> TResult<NaiveDate> {
    let (ym, dd) = body.rsplit_once('-').ok_or(TemporalErr::Lexical)?;
    let (y, mm) = ym.rsplit_once('-').ok_or(TemporalErr::Lexical)?;
    let year = parse_year(y)?;
    NaiveDate::from_ymd_opt(year, two_digits(mm)?, two_digits(dd)?).ok_or(TemporalErr::Range)
}

/// `hh:mm:ss(.s+)?`; the boolean is true for the end-of-day form `24:00:00`.
fn parse_clock(body: &str) -> TResult<(NaiveTime, bool)> {
    let mut parts = body.splitn(3, ':');
    let (Some(h), Some(m), Some(sec)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(TemporalErr::Lexical);
    };
    let (hh, mm) = (two_digits(h)?, two_digits(m)?);
    let (whole, frac) = sec.split_once('.').unwrap_or((sec, ""));
    let ss = two_digits(whole)?;
    if !frac.bytes().all(|b| b.is_ascii_digit()) || (sec.contains('.') && frac.is_empty()) {
        return Err(TemporalErr::Lexical);
    }
    let mut nanos = 0u32;
    for (i, b) in frac.bytes().take(9).enumerate() {
        nanos += u32::from(b - b'0') * 10u32.pow(8 - u32::try_from(i).unwrap_or(8));
    }
    if hh == 24 {
        if mm == 0 && ss == 0 && nanos == 0 {
            return NaiveTime::from_hms_opt(0, 0, 0).map(|t| (t, true)).ok_or(TemporalErr::Range);
        }
        return Err(TemporalErr::Range);
    }
    NaiveTime::from_hms_nano_opt(hh, mm, ss, nanos).map(|t| (t, false)).ok_or(TemporalErr::Range)
}

pub(crate) fn parse_date_lex(s: &str) -> TResult<(NaiveDate, Option<FixedOffset>)> {
    let (body, tz) = split_tz(s.trim())?;
    Ok((parse_ymd(body)?, tz))
}

pub(crate) fn parse_time_lex(s: &str) -> TResult<(NaiveTime, Option<FixedOffset>)> {
    let (body, tz) = split_tz(s.trim())?;
    let (time, _) = parse_clock(body)?;
    Ok((time, tz))
}

pub(crate) fn parse_date_time_lex(s: &str) -> TResult<(NaiveDateTime, Option<FixedOffset>)> {
    let (body, tz) = split_tz(s.trim())?;
    let (d, t) = body.split_once('T').ok_or(TemporalErr::Lexical)?;
    let date = parse_ymd(d)?;
    let (time, end_of_day) = parse_clock(t)?;
    let date = if end_of_day { date.succ_opt().ok_or(TemporalErr::Range)? } else { date };
    Ok((date.and_time(time), tz))
}

pub(crate) fn parse_g_year(s: &str) -> TResult<(i32, Option<FixedOffset>)> {
    let (body, tz) = split_tz(s.trim())?;
    Ok((parse_year(body)?, tz))
}

pub(crate) fn parse_g_year_month(s: &str) -> TResult<(i32, u8, Option<FixedOffset>)> {
    let (body, tz) = split_tz(s.trim())?;
    let (y, m) = body.rsplit_once('-').ok_or(TemporalErr::Lexical)?;
    let year = parse_year(y)?;
    Ok((year, month(m)?, tz))
}

pub(crate) fn parse_g_month(s: &str) -> TResult<(u8, Option<FixedOffset>)> {
    let (body, tz) = split_tz(s.trim())?;
    let m = body.strip_prefix("--").ok_or(TemporalErr::Lexical)?;
    Ok((month(m)?, tz))
}

pub(crate) fn parse_g_month_day(s: &str) -> TResult<(u8, u8, Option<FixedOffset>)> {
    let (body, tz) = split_tz(s.trim())?;
    let rest = body.strip_prefix("--").ok_or(TemporalErr::Lexical)?;
    let (m, d) = rest.split_once('-').ok_or(TemporalErr::Lexical)?;
    let (m, d) = (month(m)?, day(d)?);
    // validated against a leap year so that --02-29 is accepted
    NaiveDate::from_ymd_opt(2000, u32::from(m), u32::from(d)).ok_or(TemporalErr::Range)?;
    Ok((m, d, tz))
}

pub(crate) fn parse_g_day(s: &str) -> TResult<(u8, Option<FixedOffset>)> {
    let (body, tz) = split_tz(s.trim())?;
    let d = body.strip_prefix("---").ok_or(TemporalErr::Lexical)?;
    Ok((day(d)?, tz))
}

fn month(s: &str) -> TResult<u8> {
    let m = two_digits(s)?;
    if (1..=12).contains(&m) { u8::try_from(m).map_err(|_| TemporalErr::Range) } else { Err(TemporalErr::Range) }
}

fn day(s: &str) -> TResult<u8> {
    let d = two_digits(s)?;
    if (1..=31).contains(&d) { u8::try_from(d).map_err(|_| TemporalErr::Range) } else { Err(TemporalErr::Range) }
}

/// Components of a parsed duration literal. `months` and `seconds` carry the sign.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DurationParts {
    pub months: i64,
    pub seconds: Decimal,
    pub has_year_month: bool,
    pub has_day_time: bool,
}

/// `-?PnYnMnDTnHnMn(.n)S` with at least one component.
pub(crate) fn parse_duration_lex(s: &str) -> TResult<DurationParts> {
    let s = s.trim();
    let (negative, rest) = match s.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, s),
    };
    let rest = rest.strip_prefix('P').ok_or(TemporalErr::Lexical)?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((_, "")) => return Err(TemporalErr::Lexical),
        Some((d, t)) => (d, Some(t)),
        None => (rest, None),
    };
    let mut parts = DurationParts { months: 0, seconds: Decimal::ZERO, has_year_month: false, has_day_time: false };
    let mut any = false;
    for (value, designator) in components(date_part, &['Y', 'M', 'D'])? {
        any = true;
        let n = value.parse::<i64>().map_err(|_| TemporalErr::Lexical)?;
        match designator {
            'Y' => {
                parts.months = n.checked_mul(12).and_then(|m| m.checked_add(parts.months)).ok_or(TemporalErr::Range)?;
                parts.has_year_month = true;
            }
            'M' => {
                parts.months = parts.months.checked_add(n).ok_or(TemporalErr::Range)?;
                parts.has_year_month = true;
            }
            _ => {
                parts.seconds += Decimal::from(n).checked_mul(Decimal::from(86_400)).ok_or(TemporalErr::Range)?;
                parts.has_day_time = true;
            }
        }
    }
    if let Some(t) = time_part {
        for (value, designator) in components(t, &['H', 'M', 'S'])? {
            any = true;
            parts.has_day_time = true;
            let factor = match designator {
                'H' => 3600,
                'M' => 60,
                _ => 1,
            };
            let v = if designator == 'S' {
                if value.ends_with('.') || value.starts_with('.') {
                    return Err(TemporalErr::Lexical);
                }
                value.parse::<Decimal>().map_err(|_| TemporalErr::Lexical)?
            } else {
                Decimal::from(value.parse::<i64>().map_err(|_| TemporalErr::Lexical)?)
            };
            parts.seconds =
                v.checked_mul(Decimal::from(factor))
                    .and_then(|x| x.checked_add(parts.seconds))
                    .ok_or(TemporalErr::Range)?;
        }
    }
    if !any {
        return Err(TemporalErr::Lexical);
    }
    if negative {
        parts.months = -parts.months;
        parts.seconds = -parts.seconds;
    }
    Ok(parts)
}

/// Split `1Y2M` style segments, enforcing designator order and digit-only values
/// (a decimal point is only allowed before `S`).
fn components<'a>(s: &'a str, order: &[char]) -> TResult<Vec<(&'a str, char)>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut next_allowed = 0;
    for (i, ch) in s.char_indices() {
        if ch.is_ascii_digit() || (ch == '.' && order.contains(&'S')) {
            continue;
        }
        let pos = order[next_allowed..].iter().position(|d| *d == ch).ok_or(TemporalErr::Lexical)?;
        let value = &s[start..i];
        if value.is_empty() || (value.contains('.') && ch != 'S') {
            return Err(TemporalErr::Lexical);
        }
        out.push((value, ch));
        next_allowed += pos + 1;
        start = i + ch.len_utf8();
    }
    if start != s.len() {
        return Err(TemporalErr::Lexical);
    }
    Ok(out)
}

pub(crate) fn parse_year_month_duration(s: &str) -> TResult<i32> {
    let p = parse_duration_lex(s)?;
    if p.has_day_time {
        return Err(TemporalErr::Lexical);
    }
    i32::try_from(p.months).map_err(|_| TemporalErr::Range)
}

pub(crate) fn parse_day_time_duration(s: &str) -> TResult<Decimal> {
    let p = parse_duration_lex(s)?;
    if p.has_year_month {
        return Err(TemporalErr::Lexical);
    }
    Ok(p.seconds)
}

/// Shift a date by whole months, clamping the day to the end of the target month.
pub(crate) fn add_months_saturating(date: NaiveDate, delta_months: i32) -> Option<NaiveDate> {
    let total =
        date.year().checked_mul(12)?.checked_add(i32::try_from(date.month0()).ok()?)?.checked_add(delta_months)?;
    let year = total.div_euclid(12);
    let month = u32::try_from(total.rem_euclid(12)).ok()? + 1;
    let mut day = date.day();
    loop {
        if let Some(d) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(d);
        }
        if day <= 28 {
            return None;
        }
        day -= 1;
    }
}

pub(crate) fn seconds_to_delta(seconds: Decimal) -> Option<TimeDelta> {
    let whole = seconds.trunc();
    let nanos = ((seconds - whole) * Decimal::from(1_000_000_000)).trunc().to_i64()?;
    TimeDelta::try_seconds(whole.to_i64()?)?.checked_add(&TimeDelta::nanoseconds(nanos))
}

pub(crate) fn delta_to_seconds(delta: TimeDelta) -> Decimal {
    Decimal::from(delta.num_seconds()) + Decimal::new(i64::from(delta.subsec_nanos()), 9)
}

/// The UTC instant of a local value, using `implicit` when no timezone is attached.
pub(crate) fn to_utc(value: NaiveDateTime, tz: Option<FixedOffset>, implicit: FixedOffset) -> NaiveDateTime {
    let offset = tz.unwrap_or(implicit).local_minus_utc();
    value - TimeDelta::seconds(i64::from(offset))
}
