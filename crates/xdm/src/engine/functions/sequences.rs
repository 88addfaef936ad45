use std::collections::HashSet;

use super::common::{atoms, boolean, one_atomic, round_half_up, to_integer, to_number};
use crate::engine::atomize::{effective_boolean_value, singleton_atomic};
use crate::engine::comparison::{EqKey, value_eq};
use crate::engine::registry::CallCtx;
use crate::engine::runtime::{Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::{XdmAtomicValue, XdmItem, XdmSequence, XdmSequenceStream};

pub(super) fn empty_fn<N: XdmNode>(_ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    Ok(boolean(args[0].is_empty()))
}

pub(super) fn exists_fn<N: XdmNode>(_ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    Ok(boolean(!args[0].is_empty()))
}

pub(super) fn count_fn<N: XdmNode>(_ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    let n = i64::try_from(args[0].len()).unwrap_or(i64::MAX);
    Ok(one_atomic(XdmAtomicValue::Integer(n)))
}

pub(super) fn exactly_one_fn<N: XdmNode>(_ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    if args[0].len() != 1 {
        return Err(Error::from_code(
            ErrorCode::FORG0005,
            format!("exactly-one called with a sequence of {} items", args[0].len()),
        ));
    }
    Ok(args[0].clone())
}

pub(super) fn zero_or_one_fn<N: XdmNode>(_ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    if args[0].len() > 1 {
        return Err(Error::from_code(ErrorCode::FORG0003, "zero-or-one called with more than one item"));
    }
    Ok(args[0].clone())
}

pub(super) fn one_or_more_fn<N: XdmNode>(_ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    if args[0].is_empty() {
        return Err(Error::from_code(ErrorCode::FORG0004, "one-or-more called with an empty sequence"));
    }
    Ok(args[0].clone())
}

/// First occurrence of every distinct atomized value. All NaN values are one value.
pub(super) fn distinct_values_fn<N: XdmNode>(
    ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let values = &ctx.dyn_ctx.values;
    let mut seen: HashSet<EqKey> = HashSet::new();
    let mut out: XdmSequence<N> = Vec::new();
    for a in atoms(&args[0])? {
        if seen.insert(EqKey::new(&a, values)) {
            out.push(XdmItem::Atomic(a));
        }
    }
    Ok(out)
}

/// 1-based positions of the items equal to the search value; incomparable items
/// are skipped.
pub(super) fn index_of_fn<N: XdmNode>(ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    let Some(search) = singleton_atomic(&args[1])? else {
        return Err(Error::cardinality(ErrorCode::XPTY0004, "index-of requires a search value"));
    };
    let values = &ctx.dyn_ctx.values;
    let mut out: XdmSequence<N> = Vec::new();
    for (i, a) in atoms(&args[0])?.iter().enumerate() {
        if value_eq(a, &search, values).unwrap_or(false) {
            let pos = i64::try_from(i + 1).unwrap_or(i64::MAX);
            out.push(XdmItem::Atomic(XdmAtomicValue::Integer(pos)));
        }
    }
    Ok(out)
}

pub(super) fn reverse_fn<N: XdmNode>(_ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    Ok(args[0].iter().rev().cloned().collect())
}

/// Items at positions `p` with `round(start) <= p < round(start) + round(length)`.
pub(super) fn subsequence_fn<N: XdmNode>(_ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    let start = round_half_up(to_number(&args[1])?);
    let end = match args.get(2) {
        Some(len) => start + round_half_up(to_number(len)?),
        None => f64::INFINITY,
    };
    if start.is_nan() || end.is_nan() {
        return Ok(Vec::new());
    }
    Ok(args[0]
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            let p = (*i + 1) as f64;
            p >= start && p < end
        })
        .map(|(_, it)| it.clone())
        .collect())
}

pub(super) fn insert_before_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let target = &args[0];
    let pos = to_integer(&args[1])?;
    let at = usize::try_from(pos.max(1) - 1).unwrap_or(usize::MAX).min(target.len());
    let mut out: XdmSequence<N> = Vec::with_capacity(target.len() + args[2].len());
    out.extend_from_slice(&target[..at]);
    out.extend_from_slice(&args[2]);
    out.extend_from_slice(&target[at..]);
    Ok(out)
}

pub(super) fn remove_fn<N: XdmNode>(_ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    let pos = to_integer(&args[1])?;
    let mut out = args[0].clone();
    if let Ok(p) = usize::try_from(pos)
        && (1..=out.len()).contains(&p)
    {
        out.remove(p - 1);
    }
    Ok(out)
}

pub(super) fn data_fn<N: XdmNode>(_ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    Ok(atoms(&args[0])?.into_iter().map(XdmItem::Atomic).collect())
}

pub(super) fn boolean_fn<N: XdmNode>(_ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    let ebv = effective_boolean_value(&XdmSequenceStream::from_vec(args[0].clone()))?;
    Ok(boolean(ebv))
}

pub(super) fn not_fn<N: XdmNode>(_ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    let ebv = effective_boolean_value(&XdmSequenceStream::from_vec(args[0].clone()))?;
    Ok(boolean(!ebv))
}
