//! `fn:matches`, `fn:replace` and `fn:tokenize` on top of the context's
//! [`RegexProvider`](crate::engine::regex::RegexProvider).

use super::common::{boolean, one_atomic, string_arg};
use crate::engine::registry::CallCtx;
use crate::engine::runtime::Error;
use crate::model::XdmNode;
use crate::xdm::{XdmAtomicValue, XdmItem, XdmSequence};

fn flags_arg<N: XdmNode>(args: &[XdmSequence<N>], idx: usize) -> Result<String, Error> {
    args.get(idx).map_or_else(|| Ok(String::new()), |s| string_arg(s))
}

pub(super) fn matches_fn<N: XdmNode>(ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    let input = string_arg(&args[0])?;
    let pattern = string_arg(&args[1])?;
    let flags = flags_arg(args, 2)?;
    Ok(boolean(ctx.dyn_ctx.regex().matches(&pattern, &flags, &input)?))
}

pub(super) fn replace_fn<N: XdmNode>(ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    let input = string_arg(&args[0])?;
    let pattern = string_arg(&args[1])?;
    let replacement = string_arg(&args[2])?;
    let flags = flags_arg(args, 3)?;
    let out = ctx.dyn_ctx.regex().replace(&pattern, &flags, &input, &replacement)?;
    Ok(one_atomic(XdmAtomicValue::String(out)))
}

pub(super) fn tokenize_fn<N: XdmNode>(ctx: &CallCtx<N>, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
    let input = string_arg(&args[0])?;
    let pattern = string_arg(&args[1])?;
    let flags = flags_arg(args, 2)?;
    let parts = ctx.dyn_ctx.regex().tokenize(&pattern, &flags, &input)?;
    Ok(parts.into_iter().map(|p| XdmItem::Atomic(XdmAtomicValue::String(p))).collect())
}
