//! `cast as`, `treat as`, `castable as` and `instance of`.
//!
//! All four run the same cardinality gate before looking at item types:
//! - empty input is an error against `One`/`OneOrMore` and passes otherwise;
//! - more than one item is an error against `One`/`ZeroOrOne`.
//!
//! The gate wraps its input in a replay buffer, so a generator-backed operand is
//! pulled only once even though the gate peeks at its first two items.

use tracing::{debug, trace};

use crate::engine::atomize::{atomize, atomize_item};
use crate::engine::casting::cast_atomic;
use crate::engine::runtime::{Error, ErrorCode, ErrorKind, ValueContext};
use crate::engine::seqtype::{ItemType, Occurrence, SequenceType};
use crate::engine::type_check::{item_matches_type, sequence_matches};
use crate::model::XdmNode;
use crate::xdm::{AtomicType, SequenceCursor, XdmAtomicValue, XdmItem, XdmItemResult, XdmSequenceStream};

/// Check `input` against `occ` and return a replayable handle on it.
fn cardinality_gate<N: XdmNode>(
    input: &XdmSequenceStream<N>,
    occ: Occurrence,
    code: ErrorCode,
) -> Result<XdmSequenceStream<N>, Error> {
    let buffered = input.create_buffered();
    let mut c = buffered.cursor();
    if c.next_item().transpose()?.is_none() {
        if occ.allows_empty() {
            return Ok(XdmSequenceStream::empty());
        }
        return Err(Error::cardinality(code, format!("empty sequence is not allowed for occurrence '{occ:?}'")));
    }
    if !occ.allows_many() && c.next_item().transpose()?.is_some() {
        return Err(Error::cardinality(code, "sequence of more than one item is not allowed"));
    }
    Ok(buffered)
}

fn expect_empty<N: XdmNode>(input: &XdmSequenceStream<N>, code: ErrorCode) -> Result<XdmSequenceStream<N>, Error> {
    if input.is_empty()? {
        Ok(XdmSequenceStream::empty())
    } else {
        Err(Error::cardinality(code, "expected empty-sequence()"))
    }
}

/// `input cast as target`.
///
/// Atomic targets atomize the input and convert each value with [`cast_atomic`].
/// `from_literal` marks a string literal operand, the only string source accepted
/// for `xs:QName` and `xs:NOTATION`. Node and `item()` targets never convert: each
/// item must already match, otherwise `err:XPTY0004`.
///
/// For `*` and `+` targets the conversion is applied lazily while the result is
/// pulled.
pub fn cast<N: XdmNode>(
    input: &XdmSequenceStream<N>,
    target: &SequenceType,
    from_literal: bool,
    ctx: &ValueContext,
) -> Result<XdmSequenceStream<N>, Error> {
    let (item_type, occ) = match target {
        SequenceType::EmptySequence => return expect_empty(input, ErrorCode::XPTY0004),
        SequenceType::Typed { item, occ } => (item.clone(), *occ),
    };
    let gated = cardinality_gate(input, occ, ErrorCode::XPTY0004)?;
    let ItemType::Atomic(t) = item_type else {
        return Ok(gated.map(move |it| check_item(it, &item_type, ErrorCode::XPTY0004)));
    };
    trace!(target = %t, from_literal, "cast");
    if occ.allows_many() {
        let ctx = ctx.clone();
        return Ok(atomize(&gated).map(move |it| match it {
            XdmItem::Atomic(a) => cast_value(&a, t, from_literal, &ctx).map(XdmItem::Atomic),
            XdmItem::Node(_) => Err(Error::from_code(ErrorCode::FOER0000, "atomization produced a node")),
        }));
    }
    let atoms = match gated.first()? {
        Some(item) => atomize_item(&item)?,
        None => return Ok(gated),
    };
    match atoms.as_slice() {
        [] if occ.allows_empty() => Ok(XdmSequenceStream::empty()),
        [] => Err(Error::cardinality(ErrorCode::XPTY0004, "cast of an empty atomized value")),
        [a] => Ok(XdmSequenceStream::from_item(XdmItem::Atomic(cast_value(a, t, from_literal, ctx)?))),
        _ => Err(Error::cardinality(ErrorCode::XPTY0004, "atomized value has more than one item")),
    }
}

fn cast_value(
    value: &XdmAtomicValue,
    target: AtomicType,
    from_literal: bool,
    ctx: &ValueContext,
) -> Result<XdmAtomicValue, Error> {
    if matches!(target, AtomicType::QName | AtomicType::Notation)
        && !from_literal
        && matches!(value, XdmAtomicValue::UntypedAtomic(_) | XdmAtomicValue::String(_))
    {
        return Err(Error::from_code(
            ErrorCode::XPTY0004,
            format!("only a string literal can be cast to {target}, got {}", value.type_of()),
        ));
    }
    cast_atomic(value, target, ctx)
}

fn check_item<N: XdmNode>(item: XdmItem<N>, t: &ItemType, code: ErrorCode) -> XdmItemResult<N> {
    if item_matches_type(&item, t) {
        Ok(item)
    } else {
        let found = match &item {
            XdmItem::Atomic(a) => a.type_of().to_string(),
            XdmItem::Node(n) => format!("{:?} node", n.kind()),
        };
        Err(Error::from_code(code, format!("expected {t}, found {found}")))
    }
}

/// Checks every item of its input against an item type while passing it through.
struct TreatCursor<N> {
    input: Box<dyn SequenceCursor<N>>,
    item: ItemType,
}

impl<N: XdmNode> SequenceCursor<N> for TreatCursor<N> {
    fn next_item(&mut self) -> Option<XdmItemResult<N>> {
        Some(self.input.next_item()?.and_then(|it| check_item(it, &self.item, ErrorCode::XPDY0050)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.input.size_hint()
    }

    fn exact_len(&self) -> Option<usize> {
        self.input.exact_len()
    }

    fn boxed_clone(&self) -> Box<dyn SequenceCursor<N>> {
        Box::new(Self { input: self.input.boxed_clone(), item: self.item.clone() })
    }
}

/// `input treat as target`: a runtime assertion, never a conversion.
///
/// Failures are `err:XPDY0050`, reported as CardinalityViolation for a wrong item
/// count and TypeMismatch for an item of the wrong type. Item types are checked as
/// the result is pulled.
pub fn treat<N: XdmNode>(input: &XdmSequenceStream<N>, target: &SequenceType) -> Result<XdmSequenceStream<N>, Error> {
    let (item, occ) = match target {
        SequenceType::EmptySequence => return expect_empty(input, ErrorCode::XPDY0050),
        SequenceType::Typed { item, occ } => (item.clone(), *occ),
    };
    let gated = cardinality_gate(input, occ, ErrorCode::XPDY0050)?;
    if matches!(item, ItemType::AnyItem) {
        return Ok(gated);
    }
    Ok(XdmSequenceStream::new(Box::new(TreatCursor { input: gated.cursor(), item })))
}

/// `input castable as target`. Never fails: any error of [`cast`] is `false`.
pub fn castable<N: XdmNode>(
    input: &XdmSequenceStream<N>,
    target: &SequenceType,
    from_literal: bool,
    ctx: &ValueContext,
) -> bool {
    match cast(input, target, from_literal, ctx).and_then(|s| s.materialize()) {
        Ok(_) => true,
        Err(e) => {
            debug!(target = %target, code = %e.format_code(), "not castable");
            false
        }
    }
}

/// `input instance of target`. Pure predicate: a failed cardinality gate is `false`.
pub fn instance_of<N: XdmNode>(input: &XdmSequenceStream<N>, target: &SequenceType) -> Result<bool, Error> {
    let gated = match target {
        SequenceType::EmptySequence => return input.is_empty(),
        SequenceType::Typed { occ, .. } => cardinality_gate(input, *occ, ErrorCode::XPTY0004),
    };
    match gated {
        Ok(s) => sequence_matches(&s, target),
        Err(e) if e.kind() == ErrorKind::CardinalityViolation => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::simple::SimpleNode;

    type S = XdmSequenceStream<SimpleNode>;

    fn int(occ: Occurrence) -> SequenceType {
        SequenceType::new(ItemType::Atomic(AtomicType::Integer), occ)
    }

    #[test]
    fn gate_pulls_a_generator_once() {
        use std::cell::Cell;
        use std::rc::Rc;
        let runs = Rc::new(Cell::new(0));
        let r = Rc::clone(&runs);
        let s = S::from_generator(move || {
            r.set(r.get() + 1);
            (1..=3).map(|i| Ok(XdmItem::Atomic(XdmAtomicValue::Integer(i))))
        });
        let out = cast(&s, &int(Occurrence::OneOrMore), false, &ValueContext::default()).unwrap();
        assert_eq!(out.count().unwrap(), 3);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn treat_does_not_convert() {
        let s = S::from_item(XdmItem::Atomic(XdmAtomicValue::String("1".into())));
        let out = treat(&s, &int(Occurrence::One)).unwrap();
        let err = out.materialize().unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::XPDY0050);
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn qname_needs_a_literal() {
        let s = S::from_item(XdmItem::Atomic(XdmAtomicValue::String("xs:int".into())));
        let t = SequenceType::new(ItemType::Atomic(AtomicType::QName), Occurrence::One);
        let ctx = ValueContext::default();
        assert!(castable(&s, &t, true, &ctx));
        let err = cast(&s, &t, false, &ctx).unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
    }
}
