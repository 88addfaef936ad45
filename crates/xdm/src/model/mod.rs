use crate::engine::runtime::{Error, ErrorCode};
use crate::xdm::{ExpandedName, XdmAtomicValue};

pub mod simple;

use core::cmp::Ordering;
use core::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
    Namespace,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    pub ns_uri: Option<String>,
}

impl QName {
    pub fn local(local: impl Into<String>) -> Self {
        Self { prefix: None, local: local.into(), ns_uri: None }
    }
}

/// Relative position of two nodes as reported by a tree backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOrder {
    Before,
    After,
    Same,
    /// The backend cannot relate the two nodes (typically different documents).
    Unordered,
}

impl NodeOrder {
    pub fn from_ordering(o: Ordering) -> Self {
        match o {
            Ordering::Less => NodeOrder::Before,
            Ordering::Equal => NodeOrder::Same,
            Ordering::Greater => NodeOrder::After,
        }
    }
}

/// Compare two nodes by ancestry and stable sibling order (fallback algorithm).
///
/// Properties:
/// - If one node is an ancestor of the other, the ancestor precedes the descendant.
/// - Among siblings, namespaces come first, then attributes, then child nodes; within
///   each group the order provided by the adapter is preserved.
/// - If the nodes belong to different roots, returns an error (`err:FOER0000`) because
///   the fallback cannot establish a global order. Adapters with multi-root trees should
///   override `XdmNode::compare_document_order` or provide `tree_key`.
pub fn try_compare_by_ancestry<N: XdmNode>(a: &N, b: &N) -> Result<Ordering, Error> {
    if a == b {
        return Ok(Ordering::Equal);
    }
    let pa = path_from_root(a);
    let pb = path_from_root(b);
    let len = pa.len().min(pb.len());
    let mut i = 0usize;
    while i < len && pa[i] == pb[i] {
        i += 1;
    }
    if i == len {
        // shorter path is the ancestor
        return Ok(pa.len().cmp(&pb.len()));
    }
    if i == 0 {
        return Err(Error::from_code(ErrorCode::FOER0000, "document order undefined: nodes from different roots"));
    }
    let parent = &pa[i - 1];
    let mut sibs: Vec<N> = parent.namespaces();
    sibs.extend(parent.attributes());
    sibs.extend(parent.children());
    let posa = sibs.iter().position(|n| n == &pa[i]);
    let posb = sibs.iter().position(|n| n == &pb[i]);
    Ok(match (posa, posb) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => Ordering::Equal,
    })
}

/// Path from the root down to `n` (inclusive).
pub(crate) fn path_from_root<N: XdmNode>(n: &N) -> Vec<N> {
    let mut path = vec![n.clone()];
    let mut cur = n.parent();
    while let Some(p) = cur {
        cur = p.parent();
        path.push(p);
    }
    path.reverse();
    path
}

/// Topmost ancestor (or the node itself).
pub fn root_of<N: XdmNode>(n: &N) -> N {
    let mut cur = n.clone();
    while let Some(p) = cur.parent() {
        cur = p;
    }
    cur
}

/// Node capability consumed by the runtime. Implemented by tree backends.
///
/// Equality and hashing must reflect node identity: two handles to the same
/// node compare equal, handles to distinct nodes never do.
pub trait XdmNode: Clone + Eq + Hash + core::fmt::Debug + Send + Sync + 'static {
    fn kind(&self) -> NodeKind;
    fn name(&self) -> Option<QName>;
    fn string_value(&self) -> String;

    /// Typed value used by atomization when no schema type applies.
    fn typed_value(&self) -> Vec<XdmAtomicValue> {
        let s = self.string_value();
        match self.kind() {
            NodeKind::Comment | NodeKind::ProcessingInstruction | NodeKind::Namespace => {
                vec![XdmAtomicValue::String(s)]
            }
            _ => vec![XdmAtomicValue::UntypedAtomic(s)],
        }
    }

    /// Schema type annotation (e.g. `xs:integer` for a validated attribute).
    fn type_annotation(&self) -> Option<ExpandedName> {
        None
    }

    fn parent(&self) -> Option<Self>;
    fn children(&self) -> Vec<Self>;
    fn attributes(&self) -> Vec<Self>;
    fn namespaces(&self) -> Vec<Self> {
        Vec::new()
    }

    /// Optional hint for document order comparisons. If provided, the engine uses this
    /// value to avoid recomputing ancestry during ordering operations.
    fn doc_order_key(&self) -> Option<u64> {
        None
    }

    /// Stable identity of the document (tree) this node belongs to. Used to order
    /// nodes from different documents relative to each other.
    fn tree_key(&self) -> Option<u64> {
        None
    }

    /// Default document order comparison uses ancestry and sibling order.
    /// Returns an error for multi-root comparisons unless overridden by adapter.
    fn compare_document_order(&self, other: &Self) -> Result<Ordering, Error> {
        if let (Some(a), Some(b)) = (self.doc_order_key(), other.doc_order_key()) {
            return Ok(a.cmp(&b));
        }
        try_compare_by_ancestry(self, other)
    }

    fn compare_order(&self, other: &Self) -> NodeOrder {
        match self.compare_document_order(other) {
            Ok(o) => NodeOrder::from_ordering(o),
            Err(_) => NodeOrder::Unordered,
        }
    }
}
