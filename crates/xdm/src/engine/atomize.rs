//! Atomization and effective boolean value.

use std::collections::VecDeque;

use crate::engine::casting::cast_atomic;
use crate::engine::runtime::{Error, ErrorCode, ValueContext};
use crate::model::XdmNode;
use crate::xdm::{AtomicType, SequenceCursor, XdmAtomicValue, XdmItem, XdmItemResult, XdmSequenceStream};

/// Typed value of a node.
///
/// Nodes carrying a built-in atomic type annotation yield their untyped content
/// cast to that type; everything else uses [`XdmNode::typed_value`].
pub fn atomize_node<N: XdmNode>(node: &N) -> Result<Vec<XdmAtomicValue>, Error> {
    let atoms = node.typed_value();
    let target = node
        .type_annotation()
        .and_then(|t| AtomicType::from_name(&t))
        .filter(|t| !t.is_abstract() && *t != AtomicType::UntypedAtomic);
    let Some(target) = target else {
        return Ok(atoms);
    };
    let ctx = ValueContext::default();
    atoms
        .into_iter()
        .map(|a| match a {
            XdmAtomicValue::UntypedAtomic(_) => cast_atomic(&a, target, &ctx),
            other => Ok(other),
        })
        .collect()
}

pub fn atomize_item<N: XdmNode>(item: &XdmItem<N>) -> Result<Vec<XdmAtomicValue>, Error> {
    match item {
        XdmItem::Atomic(a) => Ok(vec![a.clone()]),
        XdmItem::Node(n) => atomize_node(n),
    }
}

/// Lazily atomizes every item of the input; nodes expand to their typed values.
pub struct AtomizeCursor<N> {
    input: Box<dyn SequenceCursor<N>>,
    pending: VecDeque<XdmAtomicValue>,
}

impl<N> AtomizeCursor<N> {
    pub fn new(input: Box<dyn SequenceCursor<N>>) -> Self {
        Self { input, pending: VecDeque::new() }
    }
}

impl<N: XdmNode> SequenceCursor<N> for AtomizeCursor<N> {
    fn next_item(&mut self) -> Option<XdmItemResult<N>> {
        loop {
            if let Some(a) = self.pending.pop_front() {
                return Some(Ok(XdmItem::Atomic(a)));
            }
            match self.input.next_item()? {
                Ok(XdmItem::Atomic(a)) => return Some(Ok(XdmItem::Atomic(a))),
                Ok(XdmItem::Node(n)) => match atomize_node(&n) {
                    Ok(atoms) => self.pending.extend(atoms),
                    Err(e) => return Some(Err(e)),
                },
                Err(e) => return Some(Err(e)),
            }
        }
    }

    fn boxed_clone(&self) -> Box<dyn SequenceCursor<N>> {
        Box::new(Self::new(self.input.boxed_clone()))
    }
}

pub fn atomize<N: XdmNode>(stream: &XdmSequenceStream<N>) -> XdmSequenceStream<N> {
    XdmSequenceStream::new(Box::new(AtomizeCursor::new(stream.cursor())))
}

/// Atomize an argument that must hold at most one atomic value.
///
/// Returns `Ok(None)` for the empty sequence and `err:XPTY0004` (cardinality)
/// for more than one atom.
pub fn singleton_atomic<N: XdmNode>(seq: &[XdmItem<N>]) -> Result<Option<XdmAtomicValue>, Error> {
    let mut out: Option<XdmAtomicValue> = None;
    for item in seq {
        for a in atomize_item(item)? {
            if out.is_some() {
                return Err(Error::cardinality(ErrorCode::XPTY0004, "expected at most one atomic value"));
            }
            out = Some(a);
        }
    }
    Ok(out)
}

/// Effective boolean value.
///
/// Empty is false; a sequence starting with a node is true; a single boolean,
/// string-like, untyped, anyURI or numeric value maps to its truth value. Anything
/// else raises `err:FORG0006`.
pub fn effective_boolean_value<N: XdmNode>(stream: &XdmSequenceStream<N>) -> Result<bool, Error> {
    let mut c = stream.cursor();
    let Some(first) = c.next_item().transpose()? else {
        return Ok(false);
    };
    let XdmItem::Atomic(a) = first else {
        return Ok(true);
    };
    if c.next_item().transpose()?.is_some() {
        return Err(Error::from_code(
            ErrorCode::FORG0006,
            "effective boolean value is not defined for a sequence of two or more atomic values",
        ));
    }
    if let Some(s) = a.as_str() {
        return Ok(!s.is_empty());
    }
    use XdmAtomicValue as V;
    Ok(match a {
        V::Boolean(b) => b,
        V::Double(d) => d != 0.0 && !d.is_nan(),
        V::Float(f) => f != 0.0 && !f.is_nan(),
        V::Decimal(d) => !d.is_zero(),
        other if other.type_of().is_integer() => crate::engine::numeric::a_as_i128(&other).is_some_and(|i| i != 0),
        other => {
            return Err(Error::from_code(
                ErrorCode::FORG0006,
                format!("effective boolean value is not defined for {}", other.type_of()),
            ));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::simple::{SimpleNode, elem, text, typed_attr};

    type S = XdmSequenceStream<SimpleNode>;

    #[test]
    fn annotated_attribute_atomizes_to_its_type() {
        let e = elem("e").attr(typed_attr("n", " 42 ", "integer")).build();
        let a = e.attributes()[0].clone();
        assert_eq!(atomize_node(&a).unwrap(), vec![XdmAtomicValue::Integer(42)]);
    }

    #[test]
    fn unannotated_element_is_untyped() {
        let e = elem("e").child(text("ab")).child(text("cd")).build();
        let s = S::from_item(XdmItem::Node(e));
        let atoms = atomize(&s).materialize().unwrap();
        assert_eq!(atoms, vec![XdmItem::Atomic(XdmAtomicValue::UntypedAtomic("abcd".into()))]);
    }

    #[test]
    fn ebv_rules() {
        assert!(!effective_boolean_value(&S::empty()).unwrap());
        assert!(effective_boolean_value(&S::from_item(XdmItem::Node(elem("x").build()))).unwrap());
        assert!(!effective_boolean_value(&S::from_item(XdmItem::Atomic(XdmAtomicValue::Double(f64::NAN)))).unwrap());
        assert!(effective_boolean_value(&S::from_item(XdmItem::Atomic("x".into()))).unwrap());
        let err = effective_boolean_value(&S::from_range_inclusive(1, 2)).unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::FORG0006);
    }
}
