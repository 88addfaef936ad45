//! Matching of items and sequences against sequence types.

use crate::engine::node_ops::node_test;
use crate::engine::runtime::Error;
use crate::engine::seqtype::{ItemType, Occurrence, SequenceType};
use crate::model::XdmNode;
use crate::xdm::{XdmItem, XdmSequenceStream};

pub fn item_matches_type<N: XdmNode>(item: &XdmItem<N>, t: &ItemType) -> bool {
    match (item, t) {
        (_, ItemType::AnyItem) => true,
        (XdmItem::Node(_), ItemType::AnyNode) => true,
        (XdmItem::Node(n), ItemType::Kind(k)) => node_test(n, k),
        (XdmItem::Atomic(a), ItemType::Atomic(exp)) => a.type_of().derives_from(*exp),
        (XdmItem::Atomic(_), ItemType::AnyNode | ItemType::Kind(_)) | (XdmItem::Node(_), ItemType::Atomic(_)) => false,
    }
}

/// True if the item count satisfies `occ`.
pub fn occurrence_matches(occ: Occurrence, count: usize) -> bool {
    match occ {
        Occurrence::One => count == 1,
        Occurrence::ZeroOrOne => count <= 1,
        Occurrence::ZeroOrMore => true,
        Occurrence::OneOrMore => count >= 1,
    }
}

/// Streaming match of a whole sequence. Stops at the first item that fails the
/// item type or exceeds the occurrence.
pub fn sequence_matches<N: XdmNode>(stream: &XdmSequenceStream<N>, t: &SequenceType) -> Result<bool, Error> {
    let mut c = stream.cursor();
    match t {
        SequenceType::EmptySequence => Ok(c.next_item().transpose()?.is_none()),
        SequenceType::Typed { item, occ } => {
            let mut count = 0usize;
            while let Some(it) = c.next_item() {
                let it = it?;
                count = count.saturating_add(1);
                if !item_matches_type(&it, item) || (count > 1 && !occ.allows_many()) {
                    return Ok(false);
                }
            }
            Ok(occurrence_matches(*occ, count))
        }
    }
}
