//! `fn:min`, `fn:max`, `fn:sum` and `fn:avg`.

use core::cmp::Ordering;

use super::common::{atoms, check_collation, one_atomic};
use crate::engine::casting::parse_double_lex;
use crate::engine::comparison::order_values;
use crate::engine::promotion::{add, common_type, div, promote};
use crate::engine::registry::CallCtx;
use crate::engine::runtime::{Error, ErrorCode, ValueContext};
use crate::model::XdmNode;
use crate::xdm::{AtomicType, XdmAtomicValue, XdmSequence};

type V = XdmAtomicValue;

/// `xs:untypedAtomic` inputs of aggregates are cast to `xs:double`.
fn untyped_to_double(a: V) -> Result<V, Error> {
    match a {
        V::UntypedAtomic(s) => parse_double_lex(&s)
            .map(V::Double)
            .ok_or_else(|| Error::from_code(ErrorCode::FORG0001, format!("cannot convert '{s}' to xs:double"))),
        other => Ok(other),
    }
}

fn aggregate_input<N: XdmNode>(seq: &[crate::xdm::XdmItem<N>]) -> Result<Vec<V>, Error> {
    atoms(seq)?.into_iter().map(untyped_to_double).collect()
}

fn not_comparable(a: &V, b: &V) -> Error {
    Error::from_code(
        ErrorCode::FORG0006,
        format!("values of type {} and {} cannot be compared", a.type_of(), b.type_of()),
    )
}

/// The value that sorts first toward `wanted` (`Less` for min, `Greater` for max).
///
/// Numerics are promoted to their common type; any NaN makes the result NaN.
fn extremum(values: Vec<V>, wanted: Ordering, ctx: &ValueContext) -> Result<Option<V>, Error> {
    let mut iter = values.into_iter();
    let Some(mut best) = iter.next() else {
        return Ok(None);
    };
    let mut numeric_type = best.is_numeric().then(|| best.type_of());
    let mut nan: Option<V> = best.is_nan().then(|| best.clone());
    // a lone value must still be of an ordered type
    order_values(&best, &best, ctx).map_err(|_| not_comparable(&best, &best))?;
    for v in iter {
        if v.is_numeric() {
            numeric_type = match numeric_type {
                Some(t) => common_type(t, v.type_of()),
                None => return Err(not_comparable(&best, &v)),
            };
        }
        if v.is_nan() && nan.is_none() {
            nan = Some(v.clone());
        }
        match order_values(&v, &best, ctx).map_err(|_| not_comparable(&v, &best))? {
            Some(o) if o == wanted => best = v,
            _ => {}
        }
    }
    if let Some(n) = nan {
        best = n;
    }
    Ok(Some(match numeric_type {
        Some(t) => promote(&best, t).unwrap_or(best),
        None => best,
    }))
}

pub(super) fn min_fn<N: XdmNode>(ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    check_collation(args.get(1))?;
    let values = aggregate_input(&args[0])?;
    Ok(extremum(values, Ordering::Less, &ctx.dyn_ctx.values)?.map(one_atomic).unwrap_or_default())
}

pub(super) fn max_fn<N: XdmNode>(ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    check_collation(args.get(1))?;
    let values = aggregate_input(&args[0])?;
    Ok(extremum(values, Ordering::Greater, &ctx.dyn_ctx.values)?.map(one_atomic).unwrap_or_default())
}

/// Sum of numerics, or of durations of one kind.
fn total(values: &[V], ctx: &ValueContext) -> Result<Option<V>, Error> {
    let Some(first) = values.first() else {
        return Ok(None);
    };
    let summable = |v: &V| {
        v.is_numeric() || matches!(v.type_of(), AtomicType::YearMonthDuration | AtomicType::DayTimeDuration)
    };
    if let Some(bad) = values.iter().find(|v| !summable(v)) {
        return Err(Error::from_code(ErrorCode::FORG0006, format!("cannot sum values of type {}", bad.type_of())));
    }
    let mut acc = first.clone();
    for v in &values[1..] {
        acc = add(&acc, v, ctx).map_err(|e| {
            if e.code_enum() == ErrorCode::XPTY0004 {
                Error::from_code(ErrorCode::FORG0006, format!("cannot sum {} and {}", acc.type_of(), v.type_of()))
            } else {
                e
            }
        })?;
    }
    Ok(Some(acc))
}

pub(super) fn sum_fn<N: XdmNode>(ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    let values = aggregate_input(&args[0])?;
    match total(&values, &ctx.dyn_ctx.values)? {
        Some(v) => Ok(one_atomic(v)),
        None => match args.get(1) {
            Some(zero) => Ok(zero.clone()),
            None => Ok(one_atomic(V::Integer(0))),
        },
    }
}

pub(super) fn avg_fn<N: XdmNode>(ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    let values = aggregate_input(&args[0])?;
    let Some(sum) = total(&values, &ctx.dyn_ctx.values)? else {
        return Ok(Vec::new());
    };
    let count = V::Integer(i64::try_from(values.len()).unwrap_or(i64::MAX));
    Ok(one_atomic(div(&sum, &count, &ctx.dyn_ctx.values)?))
}
