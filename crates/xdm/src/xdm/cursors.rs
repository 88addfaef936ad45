//! Cursor variants backing [`XdmSequenceStream`](super::XdmSequenceStream).

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use tracing::trace;

use super::stream::{SequenceCursor, XdmItemResult};
use super::{XdmAtomicValue, XdmItem};
use crate::engine::runtime::Error;

pub struct EmptyCursor<N> {
    _marker: PhantomData<fn() -> N>,
}

impl<N> EmptyCursor<N> {
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<N> Default for EmptyCursor<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: 'static> SequenceCursor<N> for EmptyCursor<N> {
    fn next_item(&mut self) -> Option<XdmItemResult<N>> {
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(0))
    }

    fn exact_len(&self) -> Option<usize> {
        Some(0)
    }

    fn is_materialized(&self) -> bool {
        true
    }

    fn boxed_clone(&self) -> Box<dyn SequenceCursor<N>> {
        Box::new(Self::new())
    }
}

pub struct SingleCursor<N> {
    item: XdmItem<N>,
    done: bool,
}

impl<N> SingleCursor<N> {
    pub fn new(item: XdmItem<N>) -> Self {
        Self { item, done: false }
    }
}

impl<N: Clone + 'static> SequenceCursor<N> for SingleCursor<N> {
    fn next_item(&mut self) -> Option<XdmItemResult<N>> {
        if self.done {
            return None;
        }
        self.done = true;
        Some(Ok(self.item.clone()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::from(!self.done);
        (n, Some(n))
    }

    fn exact_len(&self) -> Option<usize> {
        Some(1)
    }

    fn is_materialized(&self) -> bool {
        true
    }

    fn boxed_clone(&self) -> Box<dyn SequenceCursor<N>> {
        Box::new(Self::new(self.item.clone()))
    }
}

/// Integers `lo..=hi`, produced from a counter.
pub struct RangeCursor<N> {
    lo: i64,
    hi: i64,
    next: Option<i64>,
    _marker: PhantomData<fn() -> N>,
}

impl<N> RangeCursor<N> {
    pub fn new(lo: i64, hi: i64) -> Self {
        Self { lo, hi, next: (lo <= hi).then_some(lo), _marker: PhantomData }
    }

    fn len(&self) -> usize {
        if self.hi < self.lo {
            return 0;
        }
        usize::try_from(i128::from(self.hi) - i128::from(self.lo) + 1).unwrap_or(usize::MAX)
    }
}

impl<N: 'static> SequenceCursor<N> for RangeCursor<N> {
    fn next_item(&mut self) -> Option<XdmItemResult<N>> {
        let cur = self.next?;
        self.next = if cur < self.hi { Some(cur + 1) } else { None };
        Some(Ok(XdmItem::Atomic(XdmAtomicValue::Integer(cur))))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match self.next {
            Some(n) => usize::try_from(i128::from(self.hi) - i128::from(n) + 1).unwrap_or(usize::MAX),
            None => 0,
        };
        (remaining, Some(remaining))
    }

    fn exact_len(&self) -> Option<usize> {
        Some(self.len())
    }

    fn range_bounds(&self) -> Option<(i64, i64)> {
        Some((self.lo, self.hi))
    }

    fn is_materialized(&self) -> bool {
        true
    }

    fn boxed_clone(&self) -> Box<dyn SequenceCursor<N>> {
        Box::new(Self::new(self.lo, self.hi))
    }
}

/// Precomputed items shared between clones.
pub struct VecCursor<N> {
    items: Rc<[XdmItem<N>]>,
    pos: usize,
}

impl<N> VecCursor<N> {
    pub fn new(items: Vec<XdmItem<N>>) -> Self {
        Self { items: items.into(), pos: 0 }
    }
}

impl<N: Clone + 'static> SequenceCursor<N> for VecCursor<N> {
    fn next_item(&mut self) -> Option<XdmItemResult<N>> {
        let item = self.items.get(self.pos)?.clone();
        self.pos += 1;
        Some(Ok(item))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.items.len().saturating_sub(self.pos);
        (n, Some(n))
    }

    fn exact_len(&self) -> Option<usize> {
        Some(self.items.len())
    }

    fn is_materialized(&self) -> bool {
        true
    }

    fn boxed_clone(&self) -> Box<dyn SequenceCursor<N>> {
        Box::new(Self { items: Rc::clone(&self.items), pos: 0 })
    }
}

type ItemIter<N> = Box<dyn Iterator<Item = XdmItemResult<N>>>;

/// Drives an external producer. The producer is started lazily on the first pull,
/// and every clone starts a new run of it.
pub struct GeneratorCursor<N> {
    factory: Rc<dyn Fn() -> ItemIter<N>>,
    iter: Option<ItemIter<N>>,
}

impl<N: 'static> GeneratorCursor<N> {
    pub fn new<F, I>(factory: F) -> Self
    where
        F: Fn() -> I + 'static,
        I: Iterator<Item = XdmItemResult<N>> + 'static,
    {
        Self { factory: Rc::new(move || Box::new(factory()) as ItemIter<N>), iter: None }
    }
}

impl<N: 'static> SequenceCursor<N> for GeneratorCursor<N> {
    fn next_item(&mut self) -> Option<XdmItemResult<N>> {
        let factory = &self.factory;
        self.iter.get_or_insert_with(|| factory()).next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.as_ref().map_or((0, None), |it| it.size_hint())
    }

    fn boxed_clone(&self) -> Box<dyn SequenceCursor<N>> {
        Box::new(Self { factory: Rc::clone(&self.factory), iter: None })
    }
}

struct BufferState<N> {
    items: Vec<XdmItem<N>>,
    // `None` once the source is exhausted or failed
    source: Option<Box<dyn SequenceCursor<N>>>,
    error: Option<Error>,
}

/// Replay cache shared by every clone.
///
/// Clones hold the same `Rc<RefCell<..>>`: an item pulled from the source by any
/// clone is appended once and served from the cache to all others. The sharing is
/// single-threaded (`Rc`), so buffered streams are `!Send`.
pub struct BufferedCursor<N> {
    shared: Rc<RefCell<BufferState<N>>>,
    pos: usize,
}

impl<N> BufferedCursor<N> {
    pub fn new(source: Box<dyn SequenceCursor<N>>) -> Self {
        let state = BufferState { items: Vec::new(), source: Some(source), error: None };
        Self { shared: Rc::new(RefCell::new(state)), pos: 0 }
    }
}

impl<N: Clone + 'static> SequenceCursor<N> for BufferedCursor<N> {
    fn next_item(&mut self) -> Option<XdmItemResult<N>> {
        let mut st = self.shared.borrow_mut();
        if let Some(item) = st.items.get(self.pos) {
            let item = item.clone();
            self.pos += 1;
            return Some(Ok(item));
        }
        if self.pos > st.items.len() {
            return None;
        }
        if let Some(err) = &st.error {
            // replay the failure once, at the position where it happened
            self.pos += 1;
            return Some(Err(err.clone()));
        }
        let pulled = st.source.as_mut()?.next_item();
        match pulled {
            Some(Ok(item)) => {
                st.items.push(item.clone());
                trace!(cached = st.items.len(), "buffered cursor pulled item from source");
                self.pos += 1;
                Some(Ok(item))
            }
            Some(Err(err)) => {
                st.source = None;
                st.error = Some(err.clone());
                self.pos += 1;
                Some(Err(err))
            }
            None => {
                st.source = None;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let st = self.shared.borrow();
        let cached = st.items.len().saturating_sub(self.pos);
        match &st.source {
            Some(src) => {
                let (lo, hi) = src.size_hint();
                (cached + lo, hi.map(|h| h + cached))
            }
            None => (cached, Some(cached)),
        }
    }

    fn exact_len(&self) -> Option<usize> {
        let st = self.shared.borrow();
        match (&st.source, &st.error) {
            (None, None) => Some(st.items.len()),
            _ => None,
        }
    }

    fn buffered_len(&self) -> Option<usize> {
        Some(self.shared.borrow().items.len())
    }

    fn is_materialized(&self) -> bool {
        true
    }

    fn boxed_clone(&self) -> Box<dyn SequenceCursor<N>> {
        Box::new(Self { shared: Rc::clone(&self.shared), pos: 0 })
    }
}

/// Concatenation of several cursors.
pub struct ConcatCursor<N> {
    parts: Vec<Box<dyn SequenceCursor<N>>>,
    idx: usize,
}

impl<N> ConcatCursor<N> {
    pub fn new(parts: Vec<Box<dyn SequenceCursor<N>>>) -> Self {
        Self { parts, idx: 0 }
    }
}

impl<N: 'static> SequenceCursor<N> for ConcatCursor<N> {
    fn next_item(&mut self) -> Option<XdmItemResult<N>> {
        while let Some(part) = self.parts.get_mut(self.idx) {
            if let Some(it) = part.next_item() {
                return Some(it);
            }
            self.idx += 1;
        }
        None
    }

    fn exact_len(&self) -> Option<usize> {
        self.parts.iter().map(|p| p.exact_len()).sum()
    }

    fn is_materialized(&self) -> bool {
        self.parts.iter().all(|p| p.is_materialized())
    }

    fn boxed_clone(&self) -> Box<dyn SequenceCursor<N>> {
        Box::new(Self::new(self.parts.iter().map(|p| p.boxed_clone()).collect()))
    }
}

type MapFn<N> = Rc<dyn Fn(XdmItem<N>) -> XdmItemResult<N>>;

/// One-to-one lazy transformation of an input cursor.
pub struct MapCursor<N> {
    input: Box<dyn SequenceCursor<N>>,
    f: MapFn<N>,
}

impl<N: 'static> MapCursor<N> {
    pub fn new<F>(input: Box<dyn SequenceCursor<N>>, f: F) -> Self
    where
        F: Fn(XdmItem<N>) -> XdmItemResult<N> + 'static,
    {
        Self { input, f: Rc::new(f) }
    }
}

impl<N: 'static> SequenceCursor<N> for MapCursor<N> {
    fn next_item(&mut self) -> Option<XdmItemResult<N>> {
        Some(self.input.next_item()?.and_then(|it| (self.f)(it)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.input.size_hint()
    }

    fn exact_len(&self) -> Option<usize> {
        self.input.exact_len()
    }

    fn boxed_clone(&self) -> Box<dyn SequenceCursor<N>> {
        Box::new(Self { input: self.input.boxed_clone(), f: Rc::clone(&self.f) })
    }
}
