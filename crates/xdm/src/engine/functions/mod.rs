//! Built-in `fn:` functions over sequences.
//!
//! The registry is built once per [`DynamicContext`](crate::engine::runtime::DynamicContext)
//! (or shared between contexts through an `Arc`) and is read-only afterwards.

use tracing::debug;

use crate::consts::FNS;
use crate::engine::registry::FunctionRegistry;
use crate::model::XdmNode;

mod aggregates;
mod common;
mod regex;
mod sequences;

pub fn default_function_registry<N: XdmNode>() -> FunctionRegistry<N> {
    let mut reg: FunctionRegistry<N> = FunctionRegistry::new();

    reg.register_ns(FNS, "empty", 1, sequences::empty_fn::<N>);
    reg.register_ns(FNS, "exists", 1, sequences::exists_fn::<N>);
    reg.register_ns(FNS, "count", 1, sequences::count_fn::<N>);
    reg.register_ns(FNS, "exactly-one", 1, sequences::exactly_one_fn::<N>);
    reg.register_ns(FNS, "zero-or-one", 1, sequences::zero_or_one_fn::<N>);
    reg.register_ns(FNS, "one-or-more", 1, sequences::one_or_more_fn::<N>);
    reg.register_ns(FNS, "distinct-values", 1, sequences::distinct_values_fn::<N>);
    reg.register_ns(FNS, "index-of", 2, sequences::index_of_fn::<N>);
    reg.register_ns(FNS, "reverse", 1, sequences::reverse_fn::<N>);
    reg.register_ns_range(FNS, "subsequence", 2, Some(3), sequences::subsequence_fn::<N>);
    reg.register_ns(FNS, "insert-before", 3, sequences::insert_before_fn::<N>);
    reg.register_ns(FNS, "remove", 2, sequences::remove_fn::<N>);
    reg.register_ns(FNS, "data", 1, sequences::data_fn::<N>);
    reg.register_ns(FNS, "boolean", 1, sequences::boolean_fn::<N>);
    reg.register_ns(FNS, "not", 1, sequences::not_fn::<N>);

    reg.register_ns_range(FNS, "min", 1, Some(2), aggregates::min_fn::<N>);
    reg.register_ns_range(FNS, "max", 1, Some(2), aggregates::max_fn::<N>);
    reg.register_ns_range(FNS, "sum", 1, Some(2), aggregates::sum_fn::<N>);
    reg.register_ns(FNS, "avg", 1, aggregates::avg_fn::<N>);

    reg.register_ns_range(FNS, "matches", 2, Some(3), regex::matches_fn::<N>);
    reg.register_ns_range(FNS, "replace", 3, Some(4), regex::replace_fn::<N>);
    reg.register_ns_range(FNS, "tokenize", 2, Some(3), regex::tokenize_fn::<N>);

    debug!(functions = reg.len(), "default function registry built");
    reg
}
