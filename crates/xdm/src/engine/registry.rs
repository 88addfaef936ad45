use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::runtime::{DynamicContext, Error};
use crate::xdm::{ExpandedName, XdmSequence};

pub type Arity = usize;

/// Error type returned by function resolution.
#[derive(Debug, Clone)]
pub enum ResolveError {
    /// No function with the (possibly default-namespace resolved) name exists.
    Unknown(ExpandedName),
    /// Function exists, but not for the requested arity. Provides known arities.
    WrongArity { name: ExpandedName, available: Vec<Arity> },
}

pub struct CallCtx<'a, N> {
    pub dyn_ctx: &'a DynamicContext<N>,
}

pub type FunctionImpl<N> = Arc<dyn Fn(&CallCtx<N>, &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> + Send + Sync>;

pub type FunctionOverload<N> = (Arity, Option<Arity>, FunctionImpl<N>);
pub type FunctionOverloads<N> = Vec<FunctionOverload<N>>;

/// Functions keyed by name with arity ranges.
///
/// Built once (usually by [`default_function_registry`](crate::engine::functions::default_function_registry))
/// and shared read-only through an `Arc`.
pub struct FunctionRegistry<N> {
    // Each entry holds (min_arity, max_arity, impl); max `None` means variadic.
    // Kept sorted so the most specific overload wins: higher min first, then smaller max.
    fns: HashMap<ExpandedName, FunctionOverloads<N>>,
}

impl<N> Default for FunctionRegistry<N> {
    fn default() -> Self {
        Self { fns: HashMap::new() }
    }
}

impl<N> FunctionRegistry<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fns.is_empty()
    }

    pub fn register(&mut self, name: ExpandedName, arity: Arity, func: FunctionImpl<N>) {
        self.register_range(name, arity, Some(arity), func);
    }

    /// Register a closure in a namespace with an arity range.
    pub fn register_ns_range<F>(&mut self, ns_uri: &str, local: &str, min_arity: Arity, max_arity: Option<Arity>, f: F)
    where
        F: 'static + Send + Sync + Fn(&CallCtx<N>, &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error>,
    {
        let name = ExpandedName::new(Some(ns_uri.to_string()), local);
        self.register_range(name, min_arity, max_arity, Arc::new(f));
    }

    pub fn register_ns<F>(&mut self, ns_uri: &str, local: &str, arity: Arity, f: F)
    where
        F: 'static + Send + Sync + Fn(&CallCtx<N>, &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error>,
    {
        self.register_ns_range(ns_uri, local, arity, Some(arity), f);
    }

    /// Register by name with an arity range. Overlapping ranges are allowed; the
    /// resolver picks the most specific (highest min, then smallest max).
    pub fn register_range(
        &mut self,
        name: ExpandedName,
        min_arity: Arity,
        max_arity: Option<Arity>,
        func: FunctionImpl<N>,
    ) {
        let overloads = self.fns.entry(name).or_default();
        overloads.push((min_arity, max_arity, func));
        overloads.sort_by(|a, b| {
            b.0.cmp(&a.0).then_with(|| match (&a.1, &b.1) {
                (Some(amax), Some(bmax)) => amax.cmp(bmax),
                (Some(_), None) => core::cmp::Ordering::Less,
                (None, Some(_)) => core::cmp::Ordering::Greater,
                (None, None) => core::cmp::Ordering::Equal,
            })
        });
    }

    /// Resolve a function by name/arity with optional default function namespace fallback.
    pub fn resolve(
        &self,
        name: &ExpandedName,
        arity: Arity,
        default_ns: Option<&str>,
    ) -> Result<&FunctionImpl<N>, ResolveError> {
        let effective_buf: Option<ExpandedName> = if name.ns_uri.is_none() {
            default_ns.map(|ns| ExpandedName::new(Some(ns.to_string()), name.local.clone()))
        } else {
            None
        };
        let effective: &ExpandedName = effective_buf.as_ref().unwrap_or(name);
        // no-namespace registrations win on an exact arity match
        if let Some(cands) = self.fns.get(name)
            && let Some((_, _, f)) = cands.iter().find(|(min, max, _)| *min == arity && *max == Some(arity))
        {
            return Ok(f);
        }
        if let Some(cands) = self.fns.get(effective) {
            if let Some((_, _, f)) =
                cands.iter().find(|(min, max, _)| arity >= *min && max.is_none_or(|m| arity <= m))
            {
                return Ok(f);
            }
            let mut arities: Vec<Arity> =
                cands.iter().filter_map(|(min, max, _)| max.map(|m| *min..=m)).flatten().collect();
            arities.sort_unstable();
            arities.dedup();
            return Err(ResolveError::WrongArity { name: effective.clone(), available: arities });
        }
        Err(ResolveError::Unknown(effective.clone()))
    }
}
