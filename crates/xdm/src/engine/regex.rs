//! Regular expression backend for `fn:matches`, `fn:replace` and `fn:tokenize`.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use fancy_regex::{Captures, Regex, RegexBuilder};
use lru::LruCache;
use tracing::trace;

use crate::engine::runtime::{Error, ErrorCode};

pub trait RegexProvider: Send + Sync {
    fn matches(&self, pattern: &str, flags: &str, text: &str) -> Result<bool, Error>;
    fn replace(&self, pattern: &str, flags: &str, text: &str, replacement: &str) -> Result<String, Error>;
    fn tokenize(&self, pattern: &str, flags: &str, text: &str) -> Result<Vec<String>, Error>;
}

const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Backreference-capable provider based on fancy-regex, with an LRU cache of
/// compiled patterns keyed by `(pattern, flags)`.
pub struct FancyRegexProvider {
    cache: Mutex<LruCache<(String, String), Arc<Regex>>>,
}

impl Default for FancyRegexProvider {
    fn default() -> Self {
        let cap = NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self::with_capacity(cap)
    }
}

impl FancyRegexProvider {
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self { cache: Mutex::new(LruCache::new(capacity)) }
    }

    /// Number of compiled patterns currently cached.
    pub fn cached_patterns(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn compile(&self, pattern: &str, flags: &str) -> Result<Arc<Regex>, Error> {
        let key = (pattern.to_string(), flags.to_string());
        if let Ok(mut cache) = self.cache.lock()
            && let Some(re) = cache.get(&key)
        {
            return Ok(Arc::clone(re));
        }
        trace!(pattern, flags, "compiling regex");
        let re = Arc::new(build_with_flags(pattern, flags)?);
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, Arc::clone(&re));
        }
        Ok(re)
    }

    fn reject_zero_length(re: &Regex, what: &str) -> Result<(), Error> {
        if re.is_match("").map_err(eval_error)? {
            return Err(Error::from_code(
                ErrorCode::FORX0003,
                format!("pattern in {what} matches a zero-length string"),
            ));
        }
        Ok(())
    }
}

fn build_with_flags(pattern: &str, flags: &str) -> Result<Regex, Error> {
    let mut builder_pattern = pattern.to_string();
    let mut case_insensitive = false;
    let mut multi_line = false;
    let mut dot_all = false;
    for ch in flags.chars() {
        match ch {
            'i' => case_insensitive = true,
            'm' => multi_line = true,
            's' => dot_all = true,
            'x' => builder_pattern.retain(|c| !matches!(c, ' ' | '\t' | '\n' | '\r')),
            _ => {
                return Err(Error::from_code(ErrorCode::FORX0001, format!("unsupported regex flag: {ch}")));
            }
        }
    }
    let mut builder = RegexBuilder::new(&builder_pattern);
    builder.case_insensitive(case_insensitive);
    builder.multi_line(multi_line);
    builder.dot_matches_new_line(dot_all);
    builder.build().map_err(|e| {
        Error::from_code(ErrorCode::FORX0002, format!("invalid regex pattern '{pattern}'"))
            .with_source(Some(Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>))
    })
}

fn eval_error(e: fancy_regex::Error) -> Error {
    Error::from_code(ErrorCode::FORX0002, "regex evaluation error")
        .with_source(Some(Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>))
}

#[derive(Debug, PartialEq)]
enum Piece {
    Literal(String),
    Group(usize),
}

/// Parse an XPath replacement string: `\\` and `\$` are escapes, `$N` refers to
/// capture group N (digits are taken greedily while they name an existing group).
fn parse_replacement(replacement: &str, groups: usize) -> Result<Vec<Piece>, Error> {
    let mut pieces = Vec::new();
    let mut lit = String::new();
    let mut chars = replacement.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some(c @ ('\\' | '$')) => lit.push(c),
                _ => return Err(Error::from_code(ErrorCode::FORX0004, "invalid escape in replacement string")),
            },
            '$' => {
                let Some(first) = chars.next().and_then(|c| c.to_digit(10)) else {
                    return Err(Error::from_code(ErrorCode::FORX0004, "'$' must be followed by a digit"));
                };
                let mut n = first as usize;
                while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                    let candidate = n * 10 + d as usize;
                    if candidate > groups {
                        break;
                    }
                    n = candidate;
                    chars.next();
                }
                if !lit.is_empty() {
                    pieces.push(Piece::Literal(core::mem::take(&mut lit)));
                }
                pieces.push(Piece::Group(n));
            }
            c => lit.push(c),
        }
    }
    if !lit.is_empty() {
        pieces.push(Piece::Literal(lit));
    }
    Ok(pieces)
}

fn expand(out: &mut String, pieces: &[Piece], caps: &Captures<'_>) {
    for p in pieces {
        match p {
            Piece::Literal(s) => out.push_str(s),
            Piece::Group(n) => {
                if let Some(m) = caps.get(*n) {
                    out.push_str(m.as_str());
                }
            }
        }
    }
}

impl RegexProvider for FancyRegexProvider {
    fn matches(&self, pattern: &str, flags: &str, text: &str) -> Result<bool, Error> {
        let re = self.compile(pattern, flags)?;
        re.is_match(text).map_err(eval_error)
    }

    fn replace(&self, pattern: &str, flags: &str, text: &str, replacement: &str) -> Result<String, Error> {
        let re = self.compile(pattern, flags)?;
        Self::reject_zero_length(&re, "fn:replace")?;
        let groups = re.captures_len().saturating_sub(1);
        let pieces = parse_replacement(replacement, groups)?;
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in re.captures_iter(text) {
            let caps = caps.map_err(eval_error)?;
            let Some(m) = caps.get(0) else {
                continue;
            };
            out.push_str(&text[last..m.start()]);
            expand(&mut out, &pieces, &caps);
            last = m.end();
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    fn tokenize(&self, pattern: &str, flags: &str, text: &str) -> Result<Vec<String>, Error> {
        let re = self.compile(pattern, flags)?;
        Self::reject_zero_length(&re, "fn:tokenize")?;
        if text.is_empty() {
            return Ok(Vec::new());
        }
        re.split(text).map(|part| part.map(str::to_string).map_err(eval_error)).collect()
    }
}
