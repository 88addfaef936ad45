use platynui_xdm::engine::set_ops::{doc_order_distinct, node_follows, node_is, node_precedes};
use platynui_xdm::{
    ErrorCode, ErrorKind, SetOrdering, SimpleNode, XdmAtomicValue as A, XdmItem as I, XdmNode, XdmSequenceStream,
    attr, doc, elem, except, intersect, text, union,
};
use rstest::{fixture, rstest};

type S = XdmSequenceStream<SimpleNode>;

/// `<r id="r"><a/><b/><c/></r>` as document, r, a, b, c, @id.
struct Tree {
    doc: SimpleNode,
    r: SimpleNode,
    a: SimpleNode,
    b: SimpleNode,
    c: SimpleNode,
    id: SimpleNode,
}

#[fixture]
fn tree() -> Tree {
    let d = doc().child(elem("r").attr(attr("id", "r")).child(elem("a")).child(elem("b")).child(elem("c"))).build();
    let r = d.children()[0].clone();
    let kids = r.children();
    Tree {
        id: r.attributes()[0].clone(),
        a: kids[0].clone(),
        b: kids[1].clone(),
        c: kids[2].clone(),
        r,
        doc: d,
    }
}

fn seq(nodes: &[&SimpleNode]) -> S {
    S::from_vec(nodes.iter().map(|n| I::Node((*n).clone())).collect())
}

fn nodes(s: &S) -> Vec<SimpleNode> {
    s.materialize()
        .unwrap()
        .into_iter()
        .map(|it| match it {
            I::Node(n) => n,
            I::Atomic(a) => panic!("unexpected atomic {a}"),
        })
        .collect()
}

#[rstest]
fn ordered_ops_with_one_shared_node(tree: Tree) {
    // operands given out of document order; b is in both
    let lhs = seq(&[&tree.c, &tree.b]);
    let rhs = seq(&[&tree.b, &tree.a]);
    let u = union(&lhs, &rhs, SetOrdering::Ordered).unwrap();
    assert_eq!(nodes(&u), vec![tree.a.clone(), tree.b.clone(), tree.c.clone()]);
    let i = intersect(&lhs, &rhs, SetOrdering::Ordered).unwrap();
    assert_eq!(nodes(&i), vec![tree.b.clone()]);
    let e = except(&lhs, &rhs, SetOrdering::Ordered).unwrap();
    assert_eq!(nodes(&e), vec![tree.c.clone()]);
}

#[rstest]
fn ordered_results_put_attributes_after_their_element(tree: Tree) {
    let u = union(&seq(&[&tree.a, &tree.id]), &seq(&[&tree.r, &tree.doc]), SetOrdering::Ordered).unwrap();
    assert_eq!(nodes(&u), vec![tree.doc.clone(), tree.r.clone(), tree.id.clone(), tree.a.clone()]);
}

#[rstest]
fn duplicates_within_one_operand_collapse(tree: Tree) {
    let u = union(&seq(&[&tree.b, &tree.b, &tree.a]), &S::empty(), SetOrdering::Ordered).unwrap();
    assert_eq!(nodes(&u), vec![tree.a.clone(), tree.b.clone()]);
    let d = doc_order_distinct(&seq(&[&tree.c, &tree.a, &tree.c])).unwrap();
    assert_eq!(nodes(&d), vec![tree.a.clone(), tree.c.clone()]);
}

#[rstest]
fn unordered_ops_keep_first_encounter_order(tree: Tree) {
    let lhs = seq(&[&tree.c, &tree.b]);
    let rhs = seq(&[&tree.b, &tree.a]);
    let u = union(&lhs, &rhs, SetOrdering::Unordered).unwrap();
    assert_eq!(nodes(&u), vec![tree.c.clone(), tree.b.clone(), tree.a.clone()]);
    let i = intersect(&lhs, &rhs, SetOrdering::Unordered).unwrap();
    assert_eq!(nodes(&i), vec![tree.b.clone()]);
    let e = except(&lhs, &rhs, SetOrdering::Unordered).unwrap();
    assert_eq!(nodes(&e), vec![tree.c.clone()]);
    // the lazy result restarts cleanly
    assert_eq!(nodes(&u.clone()), nodes(&u));
}

#[rstest]
#[case(SetOrdering::Ordered)]
#[case(SetOrdering::Unordered)]
fn atomic_operands_are_type_errors(tree: Tree, #[case] ordering: SetOrdering) {
    let mixed = seq(&[&tree.a]).concat(S::from_item(I::Atomic(A::Integer(1))));
    let err = union(&mixed, &seq(&[&tree.b]), ordering).and_then(|s| s.materialize()).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    let err = except(&seq(&[&tree.b]), &mixed, ordering).and_then(|s| s.materialize()).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
}

#[rstest]
fn unordered_errors_surface_when_reached(tree: Tree) {
    let lhs = seq(&[&tree.a]).concat(S::from_item(I::Atomic(A::Integer(1))));
    let mut out = union(&lhs, &S::empty(), SetOrdering::Unordered).unwrap();
    assert!(out.move_next().unwrap());
    assert_eq!(out.current().unwrap(), &I::Node(tree.a.clone()));
    assert_eq!(out.move_next().unwrap_err().code_enum(), ErrorCode::XPTY0004);
}

#[rstest]
fn separate_trees_are_ordered_consistently() {
    let first = doc().child(elem("x").child(text("1"))).build();
    let second = doc().child(elem("y")).build();
    let x = first.children()[0].clone();
    let y = second.children()[0].clone();
    let forward = nodes(&union(&seq(&[&y]), &seq(&[&x, &first]), SetOrdering::Ordered).unwrap());
    let backward = nodes(&union(&seq(&[&first, &x]), &seq(&[&y]), SetOrdering::Ordered).unwrap());
    assert_eq!(forward, backward);
    assert_eq!(forward.len(), 3);
    // each tree stays contiguous
    let pos = |n: &SimpleNode| forward.iter().position(|m| m == n).unwrap();
    assert_eq!(pos(&first) + 1, pos(&x));
}

#[rstest]
fn node_identity_and_order(tree: Tree) {
    assert!(node_is(&tree.a, &tree.a));
    assert!(!node_is(&tree.a, &tree.b));
    assert!(node_precedes(&tree.a, &tree.b));
    assert!(node_follows(&tree.c, &tree.id));
    assert!(!node_precedes(&tree.a, &tree.a));
}

#[rstest]
fn subtrees_ordered_before_attachment_follow_their_new_document() {
    let a = elem("a").build();
    let b = elem("b").build();
    // orders `b` while it is still its own root
    let alone = union(&seq(&[&b]), &seq(&[&b]), SetOrdering::Ordered).unwrap();
    assert_eq!(nodes(&alone), vec![b.clone()]);

    let d = doc().child(a.clone()).child(b.clone()).build();
    let u = union(&seq(&[&b, &a]), &S::empty(), SetOrdering::Ordered).unwrap();
    assert_eq!(nodes(&u), vec![a.clone(), b.clone()]);
    assert_eq!(a.tree_key(), d.tree_key());
    assert_eq!(b.tree_key(), d.tree_key());
    assert!(node_precedes(&d, &b));
}
