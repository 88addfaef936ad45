//! Sequence type descriptors consumed by `cast`, `treat`, `castable` and `instance of`.

use core::fmt;

use string_cache::DefaultAtom;

use crate::engine::runtime::{Error, ErrorCode};
use crate::xdm::{AtomicType, ExpandedName};

/// Cardinality of a sequence type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occurrence {
    One,
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

impl Occurrence {
    pub fn allows_empty(self) -> bool {
        matches!(self, Occurrence::ZeroOrOne | Occurrence::ZeroOrMore)
    }

    pub fn allows_many(self) -> bool {
        matches!(self, Occurrence::ZeroOrMore | Occurrence::OneOrMore)
    }

    pub fn indicator(self) -> &'static str {
        match self {
            Occurrence::One => "",
            Occurrence::ZeroOrOne => "?",
            Occurrence::ZeroOrMore => "*",
            Occurrence::OneOrMore => "+",
        }
    }
}

/// Name with interned parts, compared against node names during node tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InternedQName {
    pub ns_uri: Option<DefaultAtom>,
    pub local: DefaultAtom,
}

impl InternedQName {
    pub fn new(ns_uri: Option<&str>, local: &str) -> Self {
        Self { ns_uri: ns_uri.map(DefaultAtom::from), local: DefaultAtom::from(local) }
    }

    pub fn local(local: &str) -> Self {
        Self::new(None, local)
    }
}

impl From<&ExpandedName> for InternedQName {
    fn from(n: &ExpandedName) -> Self {
        Self::new(n.ns_uri.as_deref(), &n.local)
    }
}

impl fmt::Display for InternedQName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns_uri {
            Some(ns) => write!(f, "Q{{{ns}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NameOrWildcard {
    Name(InternedQName),
    Any,
}

/// Name and kind tests for node item types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeTest {
    AnyKind,
    Name(InternedQName),
    /// `*`
    WildcardAny,
    /// `prefix:*`, holding the resolved namespace URI.
    NsWildcard(DefaultAtom),
    /// `*:local`
    LocalWildcard(DefaultAtom),
    KindText,
    KindComment,
    KindProcessingInstruction(Option<String>),
    KindDocument(Option<Box<NodeTest>>),
    KindElement { name: Option<NameOrWildcard>, ty: Option<ExpandedName> },
    KindAttribute { name: Option<NameOrWildcard>, ty: Option<ExpandedName> },
}

impl fmt::Display for NodeTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name_arg = |name: &Option<NameOrWildcard>| match name {
            None => String::new(),
            Some(NameOrWildcard::Any) => "*".to_string(),
            Some(NameOrWildcard::Name(q)) => q.to_string(),
        };
        match self {
            NodeTest::AnyKind => f.write_str("node()"),
            NodeTest::Name(q) => write!(f, "{q}"),
            NodeTest::WildcardAny => f.write_str("*"),
            NodeTest::NsWildcard(ns) => write!(f, "Q{{{ns}}}*"),
            NodeTest::LocalWildcard(l) => write!(f, "*:{l}"),
            NodeTest::KindText => f.write_str("text()"),
            NodeTest::KindComment => f.write_str("comment()"),
            NodeTest::KindProcessingInstruction(t) => {
                write!(f, "processing-instruction({})", t.as_deref().unwrap_or_default())
            }
            NodeTest::KindDocument(None) => f.write_str("document-node()"),
            NodeTest::KindDocument(Some(inner)) => write!(f, "document-node({inner})"),
            NodeTest::KindElement { name, ty } => match ty {
                Some(t) => write!(f, "element({}, {t})", name_arg(name)),
                None => write!(f, "element({})", name_arg(name)),
            },
            NodeTest::KindAttribute { name, ty } => match ty {
                Some(t) => write!(f, "attribute({}, {t})", name_arg(name)),
                None => write!(f, "attribute({})", name_arg(name)),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemType {
    AnyItem,
    AnyNode,
    Kind(NodeTest),
    Atomic(AtomicType),
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemType::AnyItem => f.write_str("item()"),
            ItemType::AnyNode => f.write_str("node()"),
            ItemType::Kind(k) => write!(f, "{k}"),
            ItemType::Atomic(t) => write!(f, "{t}"),
        }
    }
}

/// An item type paired with a cardinality, or `empty-sequence()`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SequenceType {
    EmptySequence,
    Typed { item: ItemType, occ: Occurrence },
}

impl SequenceType {
    pub fn new(item: ItemType, occ: Occurrence) -> Self {
        SequenceType::Typed { item, occ }
    }

    /// Atomic sequence type by schema type name.
    ///
    /// Fails with `err:XPST0051` (UndefinedType) when the name is not a built-in
    /// atomic type.
    pub fn atomic(name: &ExpandedName, occ: Occurrence) -> Result<Self, Error> {
        let t = AtomicType::from_name(name)
            .ok_or_else(|| Error::from_code(ErrorCode::XPST0051, format!("unknown atomic type {name}")))?;
        Ok(Self::new(ItemType::Atomic(t), occ))
    }

    /// Shorthand for `xs:{local}` with the given occurrence.
    pub fn xs(local: &str, occ: Occurrence) -> Result<Self, Error> {
        Self::atomic(&ExpandedName::xs(local), occ)
    }

    pub fn occurrence(&self) -> Option<Occurrence> {
        match self {
            SequenceType::EmptySequence => None,
            SequenceType::Typed { occ, .. } => Some(*occ),
        }
    }
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceType::EmptySequence => f.write_str("empty-sequence()"),
            SequenceType::Typed { item, occ } => write!(f, "{item}{}", occ.indicator()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_forms() {
        let t = SequenceType::xs("integer", Occurrence::ZeroOrMore).unwrap();
        assert_eq!(t.to_string(), "xs:integer*");
        let e = SequenceType::new(
            ItemType::Kind(NodeTest::KindElement { name: Some(NameOrWildcard::Any), ty: None }),
            Occurrence::One,
        );
        assert_eq!(e.to_string(), "element(*)");
    }
}
