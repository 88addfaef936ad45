/// XML Schema namespace (`xs:` prefix).
pub const XS: &str = "http://www.w3.org/2001/XMLSchema";
/// Namespace of the standard function library (`fn:` prefix).
pub const FNS: &str = "http://www.w3.org/2005/xpath-functions";
/// Namespace for W3C-defined error codes (`err:` prefix).
pub const ERR_NS: &str = "http://www.w3.org/2005/xqt-errors";
/// Implicitly bound `xml` namespace.
pub const XML_URI: &str = "http://www.w3.org/XML/1998/namespace";
/// Unicode codepoint collation, the only collation string comparisons use.
pub const CODEPOINT_URI: &str = "http://www.w3.org/2005/xpath-functions/collation/codepoint";
