//! Node tests and name matching used by `instance of` and `treat as` on node item types.

use string_cache::DefaultAtom;

use crate::engine::seqtype::{InternedQName, NameOrWildcard, NodeTest};
use crate::model::{NodeKind, XdmNode};
use crate::xdm::{AtomicType, ExpandedName};

#[inline]
pub(crate) fn matches_interned_name<N: XdmNode>(node: &N, expected: &InternedQName) -> bool {
    let Some(node_name) = node.name() else {
        return false;
    };
    if expected.local.as_ref() != node_name.local.as_str() {
        return false;
    }
    match (effective_namespace(node), &expected.ns_uri) {
        (None, None) => true,
        (Some(a), Some(b)) => a == *b,
        _ => false,
    }
}

/// Namespace URI of the node name: the stored URI, or the binding of its prefix.
/// Unprefixed attributes are never in a namespace.
fn effective_namespace<N: XdmNode>(node: &N) -> Option<DefaultAtom> {
    let name = node.name()?;
    if let Some(uri) = name.ns_uri.as_deref() {
        return Some(DefaultAtom::from(uri));
    }
    match name.prefix.as_deref() {
        Some(prefix) => resolve_prefix_namespace(node, prefix),
        None if matches!(node.kind(), NodeKind::Attribute) => None,
        None => resolve_prefix_namespace(node, ""),
    }
}

pub fn node_test<N: XdmNode>(node: &N, test: &NodeTest) -> bool {
    match test {
        NodeTest::AnyKind => true,
        NodeTest::Name(q) => {
            // namespace nodes match on their prefix only
            if matches!(node.kind(), NodeKind::Namespace) {
                return node.name().is_some_and(|n| n.local == q.local.as_ref());
            }
            matches_interned_name(node, q)
        }
        NodeTest::WildcardAny => node.name().is_some(),
        NodeTest::NsWildcard(ns) => effective_namespace(node).is_some_and(|atom| atom == *ns),
        NodeTest::LocalWildcard(local) => node.name().is_some_and(|n| n.local == local.as_ref()),
        NodeTest::KindText => matches!(node.kind(), NodeKind::Text),
        NodeTest::KindComment => matches!(node.kind(), NodeKind::Comment),
        NodeTest::KindProcessingInstruction(target) => {
            if !matches!(node.kind(), NodeKind::ProcessingInstruction) {
                return false;
            }
            match target {
                Some(t) => node.name().is_some_and(|n| n.local == *t),
                None => true,
            }
        }
        NodeTest::KindDocument(inner) => {
            if !matches!(node.kind(), NodeKind::Document) {
                return false;
            }
            match inner {
                Some(inner) => document_element(node).is_some_and(|e| node_test(&e, inner)),
                None => true,
            }
        }
        NodeTest::KindElement { name, ty } => {
            matches!(node.kind(), NodeKind::Element)
                && name_matches(node, name.as_ref())
                && annotation_matches(node, ty.as_ref())
        }
        NodeTest::KindAttribute { name, ty } => {
            matches!(node.kind(), NodeKind::Attribute)
                && name_matches(node, name.as_ref())
                && annotation_matches(node, ty.as_ref())
        }
    }
}

/// The single element child of a document whose other children are comments and
/// processing instructions, as `document-node(E)` requires.
fn document_element<N: XdmNode>(doc: &N) -> Option<N> {
    let mut element = None;
    for c in doc.children() {
        match c.kind() {
            NodeKind::Element if element.is_none() => element = Some(c),
            NodeKind::Comment | NodeKind::ProcessingInstruction => {}
            _ => return None,
        }
    }
    element
}

fn name_matches<N: XdmNode>(node: &N, name: Option<&NameOrWildcard>) -> bool {
    match name {
        None | Some(NameOrWildcard::Any) => true,
        Some(NameOrWildcard::Name(exp)) => matches_interned_name(node, exp),
    }
}

/// `element(n, T)` / `attribute(n, T)`: the node's annotation must derive from `T`.
/// Unannotated nodes count as `xs:untypedAtomic` (attributes) or `xs:untyped` (elements).
fn annotation_matches<N: XdmNode>(node: &N, ty: Option<&ExpandedName>) -> bool {
    let Some(ty) = ty else {
        return true;
    };
    if ty.local == "anyType" && ty.ns_uri.as_deref() == Some(crate::consts::XS) {
        return true;
    }
    let actual = node.type_annotation().unwrap_or_else(|| match node.kind() {
        NodeKind::Element => ExpandedName::xs("untyped"),
        _ => ExpandedName::xs("untypedAtomic"),
    });
    if actual == *ty {
        return true;
    }
    match (AtomicType::from_name(&actual), AtomicType::from_name(ty)) {
        (Some(actual), Some(wanted)) => actual.derives_from(wanted),
        _ => false,
    }
}

/// Resolve a namespace prefix to its in-scope namespace URI by walking up the
/// ancestor chain and inspecting declared namespace nodes. The `xml` prefix is
/// always bound. `None` when no binding is found.
pub(crate) fn resolve_prefix_namespace<N: XdmNode>(node: &N, prefix: &str) -> Option<DefaultAtom> {
    if prefix == "xml" {
        return Some(DefaultAtom::from(crate::consts::XML_URI));
    }
    let mut cur = Some(node.clone());
    while let Some(n) = cur {
        if matches!(n.kind(), NodeKind::Element) {
            for ns in n.namespaces() {
                if let Some(q) = ns.name()
                    && q.prefix.unwrap_or_default() == prefix
                {
                    return Some(DefaultAtom::from(ns.string_value().as_str()));
                }
            }
        }
        cur = n.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::simple::{attr, comment, doc, elem, ns, text};

    #[test]
    fn prefixed_element_resolves_through_ancestors() {
        let root = doc().child(elem("root").namespace(ns("p", "urn:p")).child(elem("p:item").child(text("x")))).build();
        let item = root.children()[0].children()[0].clone();
        assert!(node_test(&item, &NodeTest::Name(InternedQName::new(Some("urn:p"), "item"))));
        assert!(!node_test(&item, &NodeTest::Name(InternedQName::local("item"))));
        assert!(node_test(&item, &NodeTest::NsWildcard(DefaultAtom::from("urn:p"))));
        assert!(node_test(&item, &NodeTest::LocalWildcard(DefaultAtom::from("item"))));
    }

    #[test]
    fn kind_tests() {
        let root = doc().child(elem("a").attr(attr("id", "1")).child(text("t"))).build();
        let a = root.children()[0].clone();
        let id = a.attributes()[0].clone();
        let t = a.children()[0].clone();
        let any_elem = NodeTest::KindElement { name: None, ty: None };
        assert!(node_test(&a, &any_elem));
        assert!(!node_test(&id, &any_elem));
        assert!(node_test(&id, &NodeTest::KindAttribute { name: Some(NameOrWildcard::Any), ty: None }));
        assert!(node_test(&t, &NodeTest::KindText));
        assert!(node_test(&root, &NodeTest::KindDocument(Some(Box::new(any_elem)))));
        assert!(!node_test(&t, &NodeTest::WildcardAny));
    }

    #[test]
    fn document_test_needs_a_single_matching_element() {
        let named_a = NodeTest::KindElement { name: Some(NameOrWildcard::Name(InternedQName::local("a"))), ty: None };
        let test = NodeTest::KindDocument(Some(Box::new(named_a)));
        assert!(node_test(&doc().child(comment("c")).child(elem("a")).build(), &test));
        assert!(!node_test(&doc().child(elem("b")).child(elem("a")).build(), &test));
        assert!(!node_test(&doc().child(elem("a")).child(elem("a")).build(), &test));
        assert!(!node_test(&doc().child(text("x")).child(elem("a")).build(), &test));
        assert!(!node_test(&doc().build(), &test));
    }

    #[test]
    fn unannotated_nodes_have_untyped_annotations() {
        let root = doc().child(elem("a").attr(attr("id", "1")).child(elem("n").typed("integer"))).build();
        let a = root.children()[0].clone();
        let id = a.attributes()[0].clone();
        let n = a.children()[0].clone();
        let element_of = |t: &str| NodeTest::KindElement { name: None, ty: Some(ExpandedName::xs(t)) };
        let attribute_of = |t: &str| NodeTest::KindAttribute { name: None, ty: Some(ExpandedName::xs(t)) };
        assert!(node_test(&a, &element_of("untyped")));
        assert!(node_test(&a, &element_of("anyType")));
        assert!(!node_test(&a, &element_of("untypedAtomic")));
        assert!(node_test(&id, &attribute_of("untypedAtomic")));
        assert!(!node_test(&id, &attribute_of("untyped")));
        assert!(node_test(&n, &element_of("decimal")));
        assert!(!node_test(&n, &element_of("untyped")));
    }
}
