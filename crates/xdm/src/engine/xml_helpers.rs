//! Whitespace and XML name helpers used by the string-derived casts.

/// whiteSpace="replace": tab, newline and carriage return become spaces.
pub(crate) fn replace_xml_whitespace(input: &str) -> String {
    input.chars().map(|ch| if matches!(ch, '\t' | '\n' | '\r') { ' ' } else { ch }).collect()
}

/// whiteSpace="collapse": runs of XML whitespace become one space, trimmed at both ends.
pub(crate) fn collapse_xml_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for word in input.split(is_xml_whitespace).filter(|w| !w.is_empty()) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

pub(crate) fn is_xml_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r')
}

/// RFC 3066 style language tag: 1-8 letters, then `-` separated 1-8 alphanumerics.
pub(crate) fn is_valid_language(s: &str) -> bool {
    let mut parts = s.split('-');
    let Some(first) = parts.next() else {
        return false;
    };
    if !(1..=8).contains(&first.len()) || !first.chars().all(|c| c.is_ascii_alphabetic()) {
        return false;
    }
    parts.all(|p| (1..=8).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphanumeric()))
}

fn is_name_start_char(ch: char, allow_colon: bool) -> bool {
    (allow_colon && ch == ':') || ch == '_' || ch.is_alphabetic()
}

fn is_name_char(ch: char, allow_colon: bool) -> bool {
    is_name_start_char(ch, allow_colon) || ch.is_numeric() || matches!(ch, '-' | '.' | '\u{B7}')
}

/// `xs:Name` (colons allowed) or `xs:NCName` (no colons).
pub(crate) fn is_valid_name(s: &str, allow_colon: bool) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if is_name_start_char(first, allow_colon) => chars.all(|c| is_name_char(c, allow_colon)),
        _ => false,
    }
}

pub(crate) fn is_valid_ncname(s: &str) -> bool {
    is_valid_name(s, false)
}

pub(crate) fn is_valid_nmtoken(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|ch| is_name_char(ch, true))
}

/// Split `prefix:local`; `None` if either part is not an NCName.
pub(crate) fn split_qname(s: &str) -> Option<(Option<&str>, &str)> {
    match s.split_once(':') {
        Some((p, l)) if is_valid_ncname(p) && is_valid_ncname(l) => Some((Some(p), l)),
        Some(_) => None,
        None if is_valid_ncname(s) => Some((None, s)),
        None => None,
    }
}

pub(crate) fn decode_hex(input: &str) -> Option<Vec<u8>> {
    if !input.len().is_multiple_of(2) {
        return None;
    }
    let mut bytes = Vec::with_capacity(input.len() / 2);
    let mut chars = input.chars();
    while let (Some(high), Some(low)) = (chars.next(), chars.next()) {
        let byte = (high.to_digit(16)? << 4) | low.to_digit(16)?;
        bytes.push(u8::try_from(byte).ok()?);
    }
    Some(bytes)
}

pub(crate) fn encode_hex_upper(bytes: &[u8]) -> String {
    use core::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02X}");
    }
    out
}
