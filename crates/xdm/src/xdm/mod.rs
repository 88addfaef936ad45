use core::fmt;

mod atomic;
pub mod cursors;
mod stream;
mod types;

pub use atomic::XdmAtomicValue;
pub use stream::{CursorState, SequenceCursor, XdmItemResult, XdmSequenceIter, XdmSequenceStream};
pub use types::AtomicType;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandedName {
    pub ns_uri: Option<String>,
    pub local: String,
}

impl ExpandedName {
    pub fn new(ns_uri: Option<String>, local: impl Into<String>) -> Self {
        Self { ns_uri, local: local.into() }
    }

    /// Name in the XML Schema namespace.
    pub fn xs(local: impl Into<String>) -> Self {
        Self::new(Some(crate::consts::XS.to_string()), local)
    }

    /// Name in the standard function namespace.
    pub fn fn_name(local: impl Into<String>) -> Self {
        Self::new(Some(crate::consts::FNS.to_string()), local)
    }
}

impl fmt::Display for ExpandedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ns_uri.as_deref() {
            Some(crate::consts::XS) => write!(f, "xs:{}", self.local),
            Some(crate::consts::FNS) => write!(f, "fn:{}", self.local),
            Some(ns) => write!(f, "Q{{{ns}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

pub type XdmSequence<N> = Vec<XdmItem<N>>;

#[derive(Debug, Clone, PartialEq)]
pub enum XdmItem<N> {
    Node(N),
    Atomic(XdmAtomicValue),
}

impl<N> XdmItem<N> {
    pub fn is_node(&self) -> bool {
        matches!(self, XdmItem::Node(_))
    }

    pub fn as_atomic(&self) -> Option<&XdmAtomicValue> {
        match self {
            XdmItem::Atomic(a) => Some(a),
            XdmItem::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&N> {
        match self {
            XdmItem::Node(n) => Some(n),
            XdmItem::Atomic(_) => None,
        }
    }
}

// Convenience conversion: allow passing a node directly where an XdmItem<N> is expected.
impl<N> From<N> for XdmItem<N> {
    fn from(n: N) -> Self {
        XdmItem::Node(n)
    }
}

impl<N> fmt::Display for XdmItem<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XdmItem::Node(_) => write!(f, "<node>"),
            XdmItem::Atomic(a) => write!(f, "{a}"),
        }
    }
}
