//! Pull-based sequence streams.
//!
//! A [`SequenceCursor`] produces items one at a time. Every cursor can hand out a
//! fresh copy of itself via [`SequenceCursor::boxed_clone`]; the copy replays the
//! same logical sequence from the beginning, independent of how far the original
//! has advanced.
//!
//! [`XdmSequenceStream`] wraps a cursor with the `move_next`/`current` protocol and
//! the lifecycle `NotStarted -> Iterating -> Finished`.

use tracing::trace;

use super::XdmItem;
use super::cursors::{
    BufferedCursor, ConcatCursor, EmptyCursor, GeneratorCursor, MapCursor, RangeCursor, SingleCursor, VecCursor,
};
use crate::engine::runtime::{Error, ErrorCode};

pub type XdmItemResult<N> = Result<XdmItem<N>, Error>;

/// Lazy producer of sequence items.
pub trait SequenceCursor<N>: 'static {
    /// Produce the next item, `None` once exhausted.
    fn next_item(&mut self) -> Option<XdmItemResult<N>>;

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, None)
    }

    /// Total length of the logical sequence when known without pulling items.
    fn exact_len(&self) -> Option<usize> {
        None
    }

    /// Inclusive integer bounds for cursors over a contiguous integer range.
    fn range_bounds(&self) -> Option<(i64, i64)> {
        None
    }

    /// Number of items held in a shared replay cache, for buffered cursors.
    fn buffered_len(&self) -> Option<usize> {
        None
    }

    /// True when replaying the sequence recomputes nothing (precomputed,
    /// synthesized or cached items).
    fn is_materialized(&self) -> bool {
        false
    }

    /// A fresh cursor over the same logical sequence, positioned before the first item.
    fn boxed_clone(&self) -> Box<dyn SequenceCursor<N>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    NotStarted,
    Iterating,
    Finished,
}

/// Sequence handle with a current-item protocol.
pub struct XdmSequenceStream<N> {
    cursor: Box<dyn SequenceCursor<N>>,
    state: CursorState,
    current: Option<XdmItem<N>>,
    position: usize,
}

impl<N: Clone + 'static> XdmSequenceStream<N> {
    pub fn new(cursor: Box<dyn SequenceCursor<N>>) -> Self {
        Self { cursor, state: CursorState::NotStarted, current: None, position: 0 }
    }

    pub fn empty() -> Self {
        Self::new(Box::new(EmptyCursor::new()))
    }

    pub fn from_item(item: XdmItem<N>) -> Self {
        Self::new(Box::new(SingleCursor::new(item)))
    }

    pub fn from_vec(items: Vec<XdmItem<N>>) -> Self {
        match items.len() {
            0 => Self::empty(),
            _ => Self::new(Box::new(VecCursor::new(items))),
        }
    }

    /// Integers `lo..=hi` without a backing store; empty when `lo > hi`.
    pub fn from_range_inclusive(lo: i64, hi: i64) -> Self {
        Self::new(Box::new(RangeCursor::new(lo, hi)))
    }

    /// Stream driven by a producer. Every clone re-invokes `factory` from scratch.
    pub fn from_generator<F, I>(factory: F) -> Self
    where
        F: Fn() -> I + 'static,
        I: Iterator<Item = XdmItemResult<N>> + 'static,
    {
        Self::new(Box::new(GeneratorCursor::new(factory)))
    }

    /// Concatenation of two streams (each restarted from its beginning).
    pub fn concat(self, other: Self) -> Self {
        let parts = vec![self.cursor.boxed_clone(), other.cursor.boxed_clone()];
        Self::new(Box::new(ConcatCursor::new(parts)))
    }

    /// Lazily apply `f` to every item.
    pub fn map<F>(self, f: F) -> Self
    where
        F: Fn(XdmItem<N>) -> XdmItemResult<N> + 'static,
    {
        Self::new(Box::new(MapCursor::new(self.cursor.boxed_clone(), f)))
    }

    /// Advance to the next item. The first call starts the underlying producer.
    ///
    /// Returns `Ok(false)` and moves to `Finished` once exhausted. An error from the
    /// producer also finishes the stream.
    pub fn move_next(&mut self) -> Result<bool, Error> {
        if self.state == CursorState::Finished {
            return Ok(false);
        }
        match self.cursor.next_item() {
            Some(Ok(item)) => {
                self.current = Some(item);
                self.position += 1;
                self.state = CursorState::Iterating;
                Ok(true)
            }
            Some(Err(e)) => {
                self.current = None;
                self.state = CursorState::Finished;
                Err(e)
            }
            None => {
                self.current = None;
                self.state = CursorState::Finished;
                Ok(false)
            }
        }
    }

    /// Current item; only valid after `move_next` returned `true`.
    pub fn current(&self) -> Result<&XdmItem<N>, Error> {
        self.current.as_ref().ok_or_else(|| {
            let msg = match self.state {
                CursorState::NotStarted => "no current item: move_next has not been called",
                _ => "no current item: sequence exhausted",
            };
            Error::from_code(ErrorCode::FOER0000, msg)
        })
    }

    pub fn try_current(&self) -> Option<&XdmItem<N>> {
        self.current.as_ref()
    }

    /// 1-based position of the current item (0 before the first `move_next`).
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Number of items in the sequence.
    ///
    /// Exhausted streams report the items seen; cursors with a known length answer
    /// directly. Otherwise a fresh clone is drained, which recomputes the source.
    pub fn count(&self) -> Result<usize, Error> {
        if self.state == CursorState::Finished {
            return Ok(self.position);
        }
        if let Some(n) = self.cursor.exact_len() {
            return Ok(n);
        }
        trace!("counting stream by draining a clone");
        let mut c = self.cursor.boxed_clone();
        let mut n = 0usize;
        while let Some(it) = c.next_item() {
            it?;
            n += 1;
        }
        Ok(n)
    }

    /// True if the sequence holds exactly one item. Pulls at most two items.
    pub fn is_single(&self) -> Result<bool, Error> {
        if let Some(n) = self.cursor.exact_len() {
            return Ok(n == 1);
        }
        let mut c = self.cursor.boxed_clone();
        match c.next_item() {
            None => Ok(false),
            Some(first) => {
                first?;
                match c.next_item() {
                    None => Ok(true),
                    Some(second) => second.map(|_| false),
                }
            }
        }
    }

    pub fn is_empty(&self) -> Result<bool, Error> {
        if let Some(n) = self.cursor.exact_len() {
            return Ok(n == 0);
        }
        Ok(self.first()?.is_none())
    }

    pub fn first(&self) -> Result<Option<XdmItem<N>>, Error> {
        self.cursor.boxed_clone().next_item().transpose()
    }

    /// Stream whose clones share one replay cache.
    ///
    /// Streams that replay without recomputation (ranges, materialized vectors,
    /// already buffered streams) are returned as a plain restart.
    pub fn create_buffered(&self) -> Self {
        if self.cursor.is_materialized() {
            return self.clone();
        }
        trace!("wrapping stream in a replay buffer");
        Self::new(Box::new(BufferedCursor::new(self.cursor.boxed_clone())))
    }

    /// Items currently cached by a buffered stream.
    pub fn cached_len(&self) -> Option<usize> {
        self.cursor.buffered_len()
    }

    pub fn is_range(&self) -> bool {
        self.cursor.range_bounds().is_some()
    }

    pub fn range_bounds(&self) -> Option<(i64, i64)> {
        self.cursor.range_bounds()
    }

    /// Fresh cursor over the whole sequence.
    pub fn cursor(&self) -> Box<dyn SequenceCursor<N>> {
        self.cursor.boxed_clone()
    }

    /// Iterate the whole sequence from the beginning without disturbing this stream.
    pub fn iter(&self) -> XdmSequenceIter<N> {
        XdmSequenceIter { cursor: self.cursor.boxed_clone() }
    }

    pub fn materialize(&self) -> Result<Vec<XdmItem<N>>, Error> {
        self.iter().collect()
    }
}

/// Clones restart from the beginning, whatever the position of `self`.
impl<N: Clone + 'static> Clone for XdmSequenceStream<N> {
    fn clone(&self) -> Self {
        Self::new(self.cursor.boxed_clone())
    }
}

impl<N: Clone + 'static> From<Vec<XdmItem<N>>> for XdmSequenceStream<N> {
    fn from(items: Vec<XdmItem<N>>) -> Self {
        Self::from_vec(items)
    }
}

impl<N> core::fmt::Debug for XdmSequenceStream<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("XdmSequenceStream").field("state", &self.state).field("position", &self.position).finish()
    }
}

pub struct XdmSequenceIter<N> {
    cursor: Box<dyn SequenceCursor<N>>,
}

impl<N: 'static> Iterator for XdmSequenceIter<N> {
    type Item = XdmItemResult<N>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next_item()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.cursor.size_hint()
    }
}

/// Consumes the remaining items (those after the current position).
impl<N: 'static> IntoIterator for XdmSequenceStream<N> {
    type Item = XdmItemResult<N>;
    type IntoIter = XdmSequenceIter<N>;

    fn into_iter(self) -> Self::IntoIter {
        XdmSequenceIter { cursor: self.cursor }
    }
}
