use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{FixedOffset, Offset, Utc};
use tracing::debug;

use crate::consts::ERR_NS;
use crate::engine::functions::default_function_registry;
use crate::engine::regex::{FancyRegexProvider, RegexProvider};
use crate::engine::registry::{CallCtx, FunctionRegistry, ResolveError};
use crate::model::XdmNode;
use crate::xdm::{ExpandedName, XdmSequence};

/// W3C error codes raised by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    FOAR0001, // division by zero
    FOAR0002, // numeric overflow / invalid numeric operand
    FOCA0001, // value too large for decimal
    FOCA0002, // invalid lexical value (NaN/INF to integer)
    FOCA0003, // value too large for integer
    FOCA0005, // NaN supplied as float/double to a duration operation
    FODT0001, // overflow/underflow in date/time operation
    FODT0002, // overflow/underflow in duration operation
    FOCH0002, // unsupported collation
    FOER0000, // unidentified error
    FONS0004, // no namespace found for prefix
    FORG0001, // invalid value for cast/constructor
    FORG0003, // zero-or-one called with more than one item
    FORG0004, // one-or-more called with an empty sequence
    FORG0005, // exactly-one called with zero or several items
    FORG0006, // invalid argument type
    FORX0001, // invalid regex flags
    FORX0002, // invalid regex pattern
    FORX0003, // regex matches zero-length string
    FORX0004, // invalid replacement string
    XPDY0050, // treat as failed at runtime
    XPST0017, // unknown function or wrong arity
    XPST0051, // unknown atomic type
    XPST0080, // cast to abstract type
    XPST0081, // unbound namespace prefix
    XPTY0004, // type error
    Unknown,
}

const ALL_CODES: &[ErrorCode] = &[
    ErrorCode::FOAR0001,
    ErrorCode::FOAR0002,
    ErrorCode::FOCA0001,
    ErrorCode::FOCA0002,
    ErrorCode::FOCA0003,
    ErrorCode::FOCA0005,
    ErrorCode::FODT0001,
    ErrorCode::FODT0002,
    ErrorCode::FOCH0002,
    ErrorCode::FOER0000,
    ErrorCode::FONS0004,
    ErrorCode::FORG0001,
    ErrorCode::FORG0003,
    ErrorCode::FORG0004,
    ErrorCode::FORG0005,
    ErrorCode::FORG0006,
    ErrorCode::FORX0001,
    ErrorCode::FORX0002,
    ErrorCode::FORX0003,
    ErrorCode::FORX0004,
    ErrorCode::XPDY0050,
    ErrorCode::XPST0017,
    ErrorCode::XPST0051,
    ErrorCode::XPST0080,
    ErrorCode::XPST0081,
    ErrorCode::XPTY0004,
];

impl ErrorCode {
    /// Prefixed form, e.g. `err:XPTY0004`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::FOAR0001 => "err:FOAR0001",
            ErrorCode::FOAR0002 => "err:FOAR0002",
            ErrorCode::FOCA0001 => "err:FOCA0001",
            ErrorCode::FOCA0002 => "err:FOCA0002",
            ErrorCode::FOCA0003 => "err:FOCA0003",
            ErrorCode::FOCA0005 => "err:FOCA0005",
            ErrorCode::FODT0001 => "err:FODT0001",
            ErrorCode::FODT0002 => "err:FODT0002",
            ErrorCode::FOCH0002 => "err:FOCH0002",
            ErrorCode::FOER0000 => "err:FOER0000",
            ErrorCode::FONS0004 => "err:FONS0004",
            ErrorCode::FORG0001 => "err:FORG0001",
            ErrorCode::FORG0003 => "err:FORG0003",
            ErrorCode::FORG0004 => "err:FORG0004",
            ErrorCode::FORG0005 => "err:FORG0005",
            ErrorCode::FORG0006 => "err:FORG0006",
            ErrorCode::FORX0001 => "err:FORX0001",
            ErrorCode::FORX0002 => "err:FORX0002",
            ErrorCode::FORX0003 => "err:FORX0003",
            ErrorCode::FORX0004 => "err:FORX0004",
            ErrorCode::XPDY0050 => "err:XPDY0050",
            ErrorCode::XPST0017 => "err:XPST0017",
            ErrorCode::XPST0051 => "err:XPST0051",
            ErrorCode::XPST0080 => "err:XPST0080",
            ErrorCode::XPST0081 => "err:XPST0081",
            ErrorCode::XPTY0004 => "err:XPTY0004",
            ErrorCode::Unknown => "err:UNKNOWN",
        }
    }

    /// The code as a QName in the `err` namespace.
    pub fn qname(&self) -> ExpandedName {
        let local = self.as_str().trim_start_matches("err:");
        ExpandedName::new(Some(ERR_NS.to_string()), local)
    }

    pub fn from_code(s: &str) -> Self {
        ALL_CODES.iter().copied().find(|c| c.as_str() == s).unwrap_or(ErrorCode::Unknown)
    }

    /// Language-level error category of this code.
    pub fn kind(&self) -> ErrorKind {
        use ErrorCode::*;
        match self {
            XPTY0004 | XPDY0050 | FORG0006 | XPST0080 => ErrorKind::TypeMismatch,
            FORG0003 | FORG0004 | FORG0005 => ErrorKind::CardinalityViolation,
            FORG0001 | FOCA0001 | FOCA0002 | FOCA0003 => ErrorKind::InvalidCastValue,
            XPST0051 => ErrorKind::UndefinedType,
            XPST0081 | FONS0004 | XPST0017 | FOCH0002 => ErrorKind::UnresolvedName,
            FORX0001 | FORX0002 | FORX0003 | FORX0004 => ErrorKind::InvalidRegex,
            FOAR0001 => ErrorKind::DivisionByZero,
            FOAR0002 | FOCA0005 | FODT0001 | FODT0002 => ErrorKind::InvalidNumericOperand,
            FOER0000 | Unknown => ErrorKind::Other,
        }
    }
}

/// Error categories surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Operand of an unexpected type, operator not defined for the operand types, failed node test.
    TypeMismatch,
    /// Empty where a value is required, or more than one item where at most one is allowed.
    CardinalityViolation,
    /// Value that does not convert to the target type.
    InvalidCastValue,
    UndefinedType,
    UnresolvedName,
    InvalidRegex,
    DivisionByZero,
    InvalidNumericOperand,
    Other,
}

#[derive(Debug, Clone, thiserror::Error)]
pub struct Error {
    pub code: ExpandedName,
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn new_qname(code: ExpandedName, msg: impl Into<String>) -> Self {
        let kind = Self::kind_of_qname(&code);
        Self { code, kind, message: msg.into(), source: None }
    }

    pub fn from_code(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self { code: code.qname(), kind: code.kind(), message: msg.into(), source: None }
    }

    /// Cardinality failure reported under `code` (XPTY0004 for type-driven checks,
    /// FORG000x for the cardinality functions).
    pub fn cardinality(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::CardinalityViolation, ..Self::from_code(code, msg) }
    }

    /// No implementation of `op` for the two operand types.
    pub fn operator_not_defined(op: &str, left: impl fmt::Display, right: impl fmt::Display) -> Self {
        Self::from_code(ErrorCode::XPTY0004, format!("operator '{op}' is not defined for {left} and {right}"))
    }

    pub fn with_source(mut self, source: impl Into<Option<Arc<dyn std::error::Error + Send + Sync>>>) -> Self {
        self.source = source.into();
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code_enum(&self) -> ErrorCode {
        if self.code.ns_uri.as_deref() == Some(ERR_NS) {
            ErrorCode::from_code(&format!("err:{}", self.code.local))
        } else {
            ErrorCode::Unknown
        }
    }

    /// `err:LOCAL` for W3C codes, `Q{ns}local` otherwise.
    pub fn format_code(&self) -> String {
        if self.code.ns_uri.as_deref() == Some(ERR_NS) {
            format!("err:{}", self.code.local)
        } else if let Some(ns) = &self.code.ns_uri {
            format!("Q{{{ns}}}{}", self.code.local)
        } else {
            self.code.local.clone()
        }
    }

    /// Parse `err:LOCAL`, `Q{ns}local` or a bare local name.
    pub fn parse_code(s: &str) -> ExpandedName {
        if let Some(rest) = s.strip_prefix("err:") {
            return ExpandedName::new(Some(ERR_NS.to_string()), rest);
        }
        if let Some((ns, local)) = s.strip_prefix("Q{").and_then(|t| t.split_once('}')) {
            return ExpandedName::new(Some(ns.to_string()), local);
        }
        ExpandedName::new(None, s)
    }

    fn kind_of_qname(code: &ExpandedName) -> ErrorKind {
        if code.ns_uri.as_deref() == Some(ERR_NS) {
            ErrorCode::from_code(&format!("err:{}", code.local)).kind()
        } else {
            ErrorKind::Other
        }
    }
}

impl From<fancy_regex::Error> for Error {
    fn from(e: fancy_regex::Error) -> Self {
        Error::from_code(ErrorCode::FORX0002, "regex error")
            .with_source(Some(Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error: {} ({})", self.message, self.format_code())
    }
}

#[derive(Debug, Clone, Default)]
pub struct NamespaceBindings {
    pub by_prefix: HashMap<String, String>,
}

impl NamespaceBindings {
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.by_prefix.get(prefix).map(String::as_str)
    }
}

/// Settings consulted by value operations: the implicit timezone for
/// timezone-less temporal values and the namespaces for `xs:QName` casts.
#[derive(Debug, Clone)]
pub struct ValueContext {
    pub implicit_timezone: FixedOffset,
    pub namespaces: NamespaceBindings,
}

impl Default for ValueContext {
    fn default() -> Self {
        let mut namespaces = NamespaceBindings::default();
        namespaces.by_prefix.insert("xml".to_string(), crate::consts::XML_URI.to_string());
        namespaces.by_prefix.insert("xs".to_string(), crate::consts::XS.to_string());
        namespaces.by_prefix.insert("fn".to_string(), crate::consts::FNS.to_string());
        Self { implicit_timezone: Utc.fix(), namespaces }
    }
}

pub struct ValueContextBuilder {
    ctx: ValueContext,
}

impl Default for ValueContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueContextBuilder {
    pub fn new() -> Self {
        Self { ctx: ValueContext::default() }
    }

    pub fn with_implicit_timezone(mut self, tz: FixedOffset) -> Self {
        self.ctx.implicit_timezone = tz;
        self
    }

    /// Register a prefix → URI binding. The reserved `xml` prefix cannot be rebound.
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        let p = prefix.into();
        if p == "xml" {
            return self;
        }
        self.ctx.namespaces.by_prefix.insert(p, uri.into());
        self
    }

    pub fn build(self) -> ValueContext {
        debug!(
            implicit_timezone = %self.ctx.implicit_timezone,
            namespaces = self.ctx.namespaces.by_prefix.len(),
            "value context built"
        );
        self.ctx
    }
}

/// Evaluation-time context: value settings plus the function registry, built once
/// and shared read-only between evaluations.
#[derive(Clone)]
pub struct DynamicContext<N> {
    pub values: ValueContext,
    pub functions: Arc<FunctionRegistry<N>>,
    pub regex: Arc<dyn RegexProvider>,
    pub default_function_namespace: Option<String>,
}

impl<N: XdmNode> Default for DynamicContext<N> {
    fn default() -> Self {
        DynamicContextBuilder::new().build()
    }
}

impl<N: XdmNode> DynamicContext<N> {
    pub fn regex(&self) -> &dyn RegexProvider {
        self.regex.as_ref()
    }

    /// Call a function through the registry. Unprefixed names resolve in the
    /// default function namespace.
    pub fn call(&self, name: &ExpandedName, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
        let f = self
            .functions
            .resolve(name, args.len(), self.default_function_namespace.as_deref())
            .map_err(|e| match e {
                ResolveError::Unknown(n) => Error::from_code(ErrorCode::XPST0017, format!("unknown function {n}")),
                ResolveError::WrongArity { name, available } => {
                    use itertools::Itertools;
                    Error::from_code(
                        ErrorCode::XPST0017,
                        format!(
                            "function {name} called with {} arguments; available arities: {}",
                            args.len(),
                            available.iter().join(", ")
                        ),
                    )
                }
            })?;
        let ctx = CallCtx { dyn_ctx: self };
        f(&ctx, args)
    }
}

pub struct DynamicContextBuilder<N> {
    values: ValueContext,
    functions: Option<Arc<FunctionRegistry<N>>>,
    regex: Option<Arc<dyn RegexProvider>>,
    default_function_namespace: Option<String>,
}

impl<N: XdmNode> Default for DynamicContextBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: XdmNode> DynamicContextBuilder<N> {
    pub fn new() -> Self {
        Self {
            values: ValueContext::default(),
            functions: None,
            regex: None,
            default_function_namespace: Some(crate::consts::FNS.to_string()),
        }
    }

    pub fn with_value_context(mut self, values: ValueContext) -> Self {
        self.values = values;
        self
    }

    pub fn with_implicit_timezone(mut self, tz: FixedOffset) -> Self {
        self.values.implicit_timezone = tz;
        self
    }

    /// Share an already built registry between contexts.
    pub fn with_functions(mut self, functions: Arc<FunctionRegistry<N>>) -> Self {
        self.functions = Some(functions);
        self
    }

    pub fn with_regex_provider(mut self, provider: Arc<dyn RegexProvider>) -> Self {
        self.regex = Some(provider);
        self
    }

    pub fn with_default_function_namespace(mut self, uri: Option<String>) -> Self {
        self.default_function_namespace = uri;
        self
    }

    pub fn build(self) -> DynamicContext<N> {
        let functions = self.functions.unwrap_or_else(|| {
            debug!("building default function registry");
            Arc::new(default_function_registry::<N>())
        });
        let regex = self.regex.unwrap_or_else(|| Arc::new(FancyRegexProvider::default()));
        debug!(functions = functions.len(), "dynamic context built");
        DynamicContext {
            values: self.values,
            functions,
            regex,
            default_function_namespace: self.default_function_namespace,
        }
    }
}
