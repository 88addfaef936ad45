//! Simple in-memory tree implementation for `XdmNode` used in tests and quick prototypes.
//!
//! Focus:
//! - Ergonomic builder for quick test tree creation
//! - Document order keys assigned lazily in pre-order on first use, one tree key per document.
//!   A subtree that is attached to a parent after it was ordered is renumbered with its new root.
//! - A node belongs to the first parent it is built into
//! - Optional type annotations so typed atomization can be exercised without a schema processor
//!
//! Example:
//! ```
//! use platynui_xdm::model::simple::{attr, elem, text};
//! use platynui_xdm::XdmNode;
//!
//! // <root id="r"><child>Hello</child><child world="yes"/></root>
//! let root = elem("root")
//!     .attr(attr("id", "r"))
//!     .child(elem("child").child(text("Hello")))
//!     .child(elem("child").attr(attr("world", "yes")))
//!     .build();
//!
//! assert_eq!(root.name().unwrap().local, "root");
//! assert_eq!(root.children().len(), 2);
//! assert_eq!(root.string_value(), "Hello");
//! ```
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock, Weak};

use crate::model::{NodeKind, QName, XdmNode, root_of};
use crate::xdm::ExpandedName;

static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub(crate) struct Inner {
    kind: NodeKind,
    name: Option<QName>,
    value: Option<String>,
    type_annotation: Option<ExpandedName>,
    parent: OnceLock<Weak<Inner>>,
    attributes: Vec<SimpleNode>,
    namespaces: Vec<SimpleNode>,
    children: Vec<SimpleNode>,
    cached_text: OnceLock<String>,
    // (tree id, pre-order index); written for the whole tree from the root
    order: RwLock<Option<(u64, u64)>>,
    numbered: OnceLock<()>,
}

/// A simple Arc-backed node implementation.
#[derive(Clone)]
pub struct SimpleNode(pub(crate) Arc<Inner>);

impl PartialEq for SimpleNode {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for SimpleNode {}
impl std::hash::Hash for SimpleNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state);
    }
}

impl fmt::Debug for SimpleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleNode")
            .field("kind", &self.0.kind)
            .field("name", &self.0.name.as_ref().map(|q| q.local.as_str()))
            .field("value", &self.0.value)
            .finish()
    }
}

impl SimpleNode {
    pub fn document() -> SimpleNodeBuilder {
        SimpleNodeBuilder::new(NodeKind::Document, None, None)
    }
    pub fn element(name: &str) -> SimpleNodeBuilder {
        SimpleNodeBuilder::new(NodeKind::Element, Some(split_qname(name)), None)
    }
    pub fn attribute(name: &str, value: &str) -> SimpleNode {
        SimpleNodeBuilder::new(NodeKind::Attribute, Some(split_qname(name)), Some(value.to_string())).build()
    }
    pub fn text(value: &str) -> SimpleNode {
        SimpleNodeBuilder::new(NodeKind::Text, None, Some(value.to_string())).build()
    }
    pub fn comment(value: &str) -> SimpleNode {
        SimpleNodeBuilder::new(NodeKind::Comment, None, Some(value.to_string())).build()
    }
    pub fn pi(target: &str, data: &str) -> SimpleNode {
        SimpleNodeBuilder::new(NodeKind::ProcessingInstruction, Some(QName::local(target)), Some(data.to_string()))
            .build()
    }
    pub fn namespace(prefix: &str, uri: &str) -> SimpleNode {
        let name = QName { prefix: Some(prefix.to_string()), local: prefix.to_string(), ns_uri: None };
        SimpleNodeBuilder::new(NodeKind::Namespace, Some(name), Some(uri.to_string())).build()
    }

    /// Resolve namespace prefix by walking ancestor chain (including self)
    pub fn lookup_namespace_uri(&self, prefix: &str) -> Option<String> {
        let mut cur = Some(self.clone());
        while let Some(n) = cur {
            for ns in &n.0.namespaces {
                if ns.0.name.as_ref().and_then(|q| q.prefix.as_deref()) == Some(prefix) {
                    return ns.0.value.clone();
                }
            }
            cur = n.parent();
        }
        None
    }

    fn ensure_numbered(&self) {
        let root = root_of(self);
        root.0.numbered.get_or_init(|| {
            let tree = NEXT_TREE_ID.fetch_add(1, AtomicOrdering::Relaxed);
            let mut next = 0u64;
            number_subtree(&root, tree, &mut next);
        });
    }

    fn order(&self) -> Option<(u64, u64)> {
        self.ensure_numbered();
        *self.0.order.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn number_subtree(n: &SimpleNode, tree: u64, next: &mut u64) {
    set_order(n, tree, next);
    // nodes whose parent is another node are ordered with that node's tree
    let owned = |x: &&SimpleNode| x.0.parent.get().is_some_and(|p| p.as_ptr() == Arc::as_ptr(&n.0));
    for x in n.0.namespaces.iter().chain(&n.0.attributes).filter(owned) {
        set_order(x, tree, next);
    }
    for c in n.0.children.iter().filter(owned) {
        number_subtree(c, tree, next);
    }
}

fn set_order(n: &SimpleNode, tree: u64, next: &mut u64) {
    *n.0.order.write().unwrap_or_else(PoisonError::into_inner) = Some((tree, *next));
    *next += 1;
}

fn split_qname(name: &str) -> QName {
    match name.split_once(':') {
        Some((prefix, local)) => QName { prefix: Some(prefix.to_string()), local: local.to_string(), ns_uri: None },
        None => QName::local(name),
    }
}

pub struct SimpleNodeBuilder {
    kind: NodeKind,
    name: Option<QName>,
    value: Option<String>,
    type_annotation: Option<ExpandedName>,
    pending_children: Vec<SimpleNode>,
    pending_attrs: Vec<SimpleNode>,
    pending_ns: Vec<SimpleNode>,
}

impl SimpleNodeBuilder {
    fn new(kind: NodeKind, name: Option<QName>, value: Option<String>) -> Self {
        Self {
            kind,
            name,
            value,
            type_annotation: None,
            pending_children: Vec::new(),
            pending_attrs: Vec::new(),
            pending_ns: Vec::new(),
        }
    }

    pub fn child(mut self, child: impl Into<SimpleNodeOrBuilder>) -> Self {
        self.pending_children.push(child.into().into_node());
        self
    }

    pub fn children<I: IntoIterator<Item = SimpleNodeOrBuilder>>(mut self, it: I) -> Self {
        self.pending_children.extend(it.into_iter().map(SimpleNodeOrBuilder::into_node));
        self
    }

    pub fn attr(mut self, attr: SimpleNode) -> Self {
        debug_assert!(attr.kind() == NodeKind::Attribute);
        self.pending_attrs.push(attr);
        self
    }

    pub fn namespace(mut self, ns: SimpleNode) -> Self {
        debug_assert!(ns.kind() == NodeKind::Namespace);
        self.pending_ns.push(ns);
        self
    }

    /// Bind the element name to a namespace URI.
    pub fn in_namespace(mut self, uri: &str) -> Self {
        if let Some(name) = self.name.as_mut() {
            name.ns_uri = Some(uri.to_string());
        }
        self
    }

    /// Annotate the node with a schema type (`xs:` local name, e.g. `"integer"`).
    pub fn typed(mut self, xs_local: &str) -> Self {
        self.type_annotation = Some(ExpandedName::xs(xs_local));
        self
    }

    pub fn build(self) -> SimpleNode {
        let node = SimpleNode(Arc::new(Inner {
            kind: self.kind,
            name: self.name,
            value: self.value,
            type_annotation: self.type_annotation,
            parent: OnceLock::new(),
            attributes: self.pending_attrs,
            namespaces: self.pending_ns,
            children: self.pending_children,
            cached_text: OnceLock::new(),
            order: RwLock::new(None),
            numbered: OnceLock::new(),
        }));
        for c in node.0.attributes.iter().chain(&node.0.namespaces).chain(&node.0.children) {
            let _ = c.0.parent.set(Arc::downgrade(&node.0));
        }
        node
    }
}

/// Typed attribute helper: `typed_attr("price", "12.5", "decimal")`.
pub fn typed_attr(name: &str, value: &str, xs_local: &str) -> SimpleNode {
    SimpleNodeBuilder::new(NodeKind::Attribute, Some(split_qname(name)), Some(value.to_string()))
        .typed(xs_local)
        .build()
}

pub enum SimpleNodeOrBuilder {
    Built(SimpleNode),
    Builder(SimpleNodeBuilder),
}

impl SimpleNodeOrBuilder {
    fn into_node(self) -> SimpleNode {
        match self {
            SimpleNodeOrBuilder::Built(n) => n,
            SimpleNodeOrBuilder::Builder(b) => b.build(),
        }
    }
}

impl From<SimpleNode> for SimpleNodeOrBuilder {
    fn from(n: SimpleNode) -> Self {
        SimpleNodeOrBuilder::Built(n)
    }
}
impl From<SimpleNodeBuilder> for SimpleNodeOrBuilder {
    fn from(b: SimpleNodeBuilder) -> Self {
        SimpleNodeOrBuilder::Builder(b)
    }
}

// Convenience helper functions for concise test code
pub fn elem(name: &str) -> SimpleNodeBuilder {
    SimpleNode::element(name)
}
pub fn text(v: &str) -> SimpleNode {
    SimpleNode::text(v)
}
pub fn attr(name: &str, v: &str) -> SimpleNode {
    SimpleNode::attribute(name, v)
}
pub fn comment(v: &str) -> SimpleNode {
    SimpleNode::comment(v)
}
pub fn pi(target: &str, data: &str) -> SimpleNode {
    SimpleNode::pi(target, data)
}
pub fn ns(prefix: &str, uri: &str) -> SimpleNode {
    SimpleNode::namespace(prefix, uri)
}
pub fn doc() -> SimpleNodeBuilder {
    SimpleNode::document()
}

impl XdmNode for SimpleNode {
    fn kind(&self) -> NodeKind {
        self.0.kind
    }

    fn name(&self) -> Option<QName> {
        self.0.name.clone()
    }

    fn string_value(&self) -> String {
        match self.0.kind {
            NodeKind::Element | NodeKind::Document => self
                .0
                .cached_text
                .get_or_init(|| {
                    fn dfs(n: &SimpleNode, out: &mut String) {
                        if n.0.kind == NodeKind::Text
                            && let Some(v) = &n.0.value
                        {
                            out.push_str(v);
                        }
                        for c in &n.0.children {
                            dfs(c, out);
                        }
                    }
                    let mut out = String::new();
                    dfs(self, &mut out);
                    out
                })
                .clone(),
            _ => self.0.value.clone().unwrap_or_default(),
        }
    }

    fn type_annotation(&self) -> Option<ExpandedName> {
        self.0.type_annotation.clone()
    }

    fn parent(&self) -> Option<Self> {
        self.0.parent.get().and_then(Weak::upgrade).map(SimpleNode)
    }

    fn children(&self) -> Vec<Self> {
        self.0.children.clone()
    }

    fn attributes(&self) -> Vec<Self> {
        self.0.attributes.clone()
    }

    fn namespaces(&self) -> Vec<Self> {
        self.0.namespaces.clone()
    }

    fn doc_order_key(&self) -> Option<u64> {
        self.order().map(|(tree, idx)| (tree << 32) | (idx & 0xFFFF_FFFF))
    }

    fn tree_key(&self) -> Option<u64> {
        self.order().map(|(tree, _)| tree)
    }
}
