//! Node set operations (`union`, `intersect`, `except`) and document-order utilities.
//!
//! Ordered results follow document order. Nodes of different trees are ordered
//! by the backend's tree key; roots without a tree key follow the order in which
//! they were first encountered, after all keyed trees.

use core::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use smallvec::SmallVec;
use tracing::trace;

use crate::engine::runtime::{Error, ErrorCode};
use crate::model::{XdmNode, root_of};
use crate::xdm::{XdmItem, XdmSequenceStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetOrdering {
    /// Document order, duplicates removed.
    #[default]
    Ordered,
    /// First-encounter order, duplicates removed. Evaluated lazily.
    Unordered,
}

#[derive(Debug, Clone, Copy)]
enum SetOp {
    Union,
    Intersect,
    Except,
}

impl SetOp {
    fn name(self) -> &'static str {
        match self {
            SetOp::Union => "union",
            SetOp::Intersect => "intersect",
            SetOp::Except => "except",
        }
    }
}

/// Position of a node's tree among all trees involved in one operation.
type TreeRank = (u8, u64);

/// Assigns tree ranks; untagged roots are numbered on first sight.
struct TreeRanks<N> {
    untagged: HashMap<N, u64>,
}

impl<N: XdmNode> TreeRanks<N> {
    fn new() -> Self {
        Self { untagged: HashMap::new() }
    }

    fn rank(&mut self, n: &N) -> TreeRank {
        if let Some(k) = n.tree_key() {
            return (0, k);
        }
        let next = self.untagged.len() as u64;
        (1, *self.untagged.entry(root_of(n)).or_insert(next))
    }
}

/// Document order within one tree.
pub(crate) fn node_compare<N: XdmNode>(a: &N, b: &N) -> Result<Ordering, Error> {
    match (a.doc_order_key(), b.doc_order_key()) {
        (Some(ak), Some(bk)) => Ok(ak.cmp(&bk)),
        _ => a.compare_document_order(b),
    }
}

fn ranked_compare<N: XdmNode>(a: &(TreeRank, N), b: &(TreeRank, N)) -> Ordering {
    a.0.cmp(&b.0).then_with(|| node_compare(&a.1, &b.1).unwrap_or(Ordering::Equal))
}

fn collect_nodes<N: XdmNode>(s: &XdmSequenceStream<N>, op: &str) -> Result<Vec<N>, Error> {
    let mut nodes: Vec<N> = Vec::new();
    let mut c = s.cursor();
    while let Some(item) = c.next_item() {
        match item? {
            XdmItem::Node(n) => nodes.push(n),
            XdmItem::Atomic(a) => {
                return Err(Error::from_code(
                    ErrorCode::XPTY0004,
                    format!("{op} requires node sequences, found {}", a.type_of()),
                ));
            }
        }
    }
    Ok(nodes)
}

/// Deduplicate by identity, then sort into document order.
fn sorted_distinct<N: XdmNode>(nodes: impl IntoIterator<Item = N>, ranks: &mut TreeRanks<N>) -> Vec<N> {
    let mut seen: HashSet<N> = HashSet::new();
    let mut keyed: SmallVec<[(TreeRank, N); 16]> = SmallVec::new();
    for n in nodes {
        if seen.insert(n.clone()) {
            keyed.push((ranks.rank(&n), n));
        }
    }
    keyed.sort_by(ranked_compare);
    keyed.into_iter().map(|(_, n)| n).collect()
}

fn to_stream<N: XdmNode>(nodes: Vec<N>) -> XdmSequenceStream<N> {
    XdmSequenceStream::from_vec(nodes.into_iter().map(XdmItem::Node).collect())
}

fn ordered<N: XdmNode>(
    op: SetOp,
    a: &XdmSequenceStream<N>,
    b: &XdmSequenceStream<N>,
) -> Result<XdmSequenceStream<N>, Error> {
    let lhs = collect_nodes(a, op.name())?;
    let rhs = collect_nodes(b, op.name())?;
    let mut ranks = TreeRanks::new();
    let out = match op {
        SetOp::Union => sorted_distinct(lhs.into_iter().chain(rhs), &mut ranks),
        SetOp::Intersect | SetOp::Except => {
            let keep_common = matches!(op, SetOp::Intersect);
            let rhs: HashSet<N> = rhs.into_iter().collect();
            let lhs = sorted_distinct(lhs, &mut ranks);
            lhs.into_iter().filter(|n| rhs.contains(n) == keep_common).collect()
        }
    };
    trace!(op = op.name(), len = out.len(), "ordered set operation");
    Ok(to_stream(out))
}

fn unordered<N: XdmNode>(op: SetOp, a: &XdmSequenceStream<N>, b: &XdmSequenceStream<N>) -> XdmSequenceStream<N> {
    let (a, b) = (a.clone(), b.clone());
    XdmSequenceStream::from_generator(move || {
        let (filter, failed) = match op {
            SetOp::Union => (None, None),
            SetOp::Intersect | SetOp::Except => match collect_nodes(&b, op.name()) {
                Ok(rhs) => (Some(rhs.into_iter().collect::<HashSet<N>>()), None),
                Err(e) => (None, Some(e)),
            },
        };
        let inputs: Vec<_> = match (op, &failed) {
            (_, Some(_)) => Vec::new(),
            (SetOp::Union, None) => vec![a.iter(), b.iter()],
            (_, None) => vec![a.iter()],
        };
        let keep_common = matches!(op, SetOp::Intersect);
        let mut seen: HashSet<N> = HashSet::new();
        let mut stopped = false;
        let items = inputs.into_iter().flatten().filter_map(move |item| {
            if stopped {
                return None;
            }
            match item {
                Ok(XdmItem::Node(n)) => {
                    let wanted = filter.as_ref().is_none_or(|rhs| rhs.contains(&n) == keep_common);
                    (wanted && seen.insert(n.clone())).then_some(Ok(XdmItem::Node(n)))
                }
                Ok(XdmItem::Atomic(v)) => {
                    stopped = true;
                    Some(Err(Error::from_code(
                        ErrorCode::XPTY0004,
                        format!("{} requires node sequences, found {}", op.name(), v.type_of()),
                    )))
                }
                Err(e) => {
                    stopped = true;
                    Some(Err(e))
                }
            }
        });
        failed.map(Err).into_iter().chain(items)
    })
}

fn dispatch<N: XdmNode>(
    op: SetOp,
    a: &XdmSequenceStream<N>,
    b: &XdmSequenceStream<N>,
    ordering: SetOrdering,
) -> Result<XdmSequenceStream<N>, Error> {
    match ordering {
        SetOrdering::Ordered => ordered(op, a, b),
        SetOrdering::Unordered => Ok(unordered(op, a, b)),
    }
}

/// Nodes in either operand.
///
/// A non-node item is `err:XPTY0004`: eagerly in ordered mode, when it is reached
/// in unordered mode.
pub fn union<N: XdmNode>(
    a: &XdmSequenceStream<N>,
    b: &XdmSequenceStream<N>,
    ordering: SetOrdering,
) -> Result<XdmSequenceStream<N>, Error> {
    dispatch(SetOp::Union, a, b, ordering)
}

/// Nodes of `a` that are also in `b`.
pub fn intersect<N: XdmNode>(
    a: &XdmSequenceStream<N>,
    b: &XdmSequenceStream<N>,
    ordering: SetOrdering,
) -> Result<XdmSequenceStream<N>, Error> {
    dispatch(SetOp::Intersect, a, b, ordering)
}

/// Nodes of `a` that are not in `b`.
pub fn except<N: XdmNode>(
    a: &XdmSequenceStream<N>,
    b: &XdmSequenceStream<N>,
    ordering: SetOrdering,
) -> Result<XdmSequenceStream<N>, Error> {
    dispatch(SetOp::Except, a, b, ordering)
}

/// Sort a node sequence into document order and remove duplicates.
pub fn doc_order_distinct<N: XdmNode>(s: &XdmSequenceStream<N>) -> Result<XdmSequenceStream<N>, Error> {
    let nodes = collect_nodes(s, "document ordering")?;
    Ok(to_stream(sorted_distinct(nodes, &mut TreeRanks::new())))
}

/// `a is b`
pub fn node_is<N: XdmNode>(a: &N, b: &N) -> bool {
    a == b
}

fn pair_order<N: XdmNode>(a: &N, b: &N) -> Ordering {
    let mut ranks = TreeRanks::new();
    let ra = (ranks.rank(a), a.clone());
    let rb = (ranks.rank(b), b.clone());
    ranked_compare(&ra, &rb)
}

/// `a << b`
pub fn node_precedes<N: XdmNode>(a: &N, b: &N) -> bool {
    a != b && pair_order(a, b) == Ordering::Less
}

/// `a >> b`
pub fn node_follows<N: XdmNode>(a: &N, b: &N) -> bool {
    a != b && pair_order(a, b) == Ordering::Greater
}
