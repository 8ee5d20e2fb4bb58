//! Coordinate primitives for the layer stack.
//!
//! Every layer defines two parallel coordinate systems per axis:
//!
//! - **Position**: layer-local, 0-based, contiguous, reflecting the current
//!   visible/logical ordering. Positions are invalidated by structural
//!   mutations (hide, reorder, insert, delete).
//! - **Index**: the stable identity of a row/column in the underlying data,
//!   invariant under reordering and hiding.
//!
//! Positions only have meaning relative to the layer that defines them, so a
//! position travelling between layers is tagged with its owning layer via
//! [`PositionCoordinate`]. Both axes share one set of types; per-axis
//! operations take an [`Axis`] argument instead of duplicating a column and a
//! row variant of every type.

use std::sync::atomic::{AtomicU64, Ordering};

/// A global counter for generating unique layer ids.
static LAYER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// The axis a position lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// The horizontal axis (columns).
    Column,
    /// The vertical axis (rows).
    Row,
}

impl Axis {
    /// Returns the other axis.
    #[inline]
    pub fn other(self) -> Axis {
        match self {
            Axis::Column => Axis::Row,
            Axis::Row => Axis::Column,
        }
    }
}

/// A contiguous, end-exclusive span of positions on one axis.
///
/// A zero-length range is valid and denotes "empty, anchored at `start`",
/// which is how insertion points are expressed.
///
/// # Example
///
/// ```
/// use trellis::Range;
///
/// let range = Range::new(2, 5);
/// assert_eq!(range.len(), 3);
/// assert!(range.contains(4));
/// assert!(!range.contains(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    /// First position in the span.
    pub start: usize,
    /// One past the last position in the span.
    pub end: usize,
}

impl Range {
    /// Creates a range. `start` must not exceed `end`.
    #[inline]
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "range start {start} exceeds end {end}");
        Self { start, end }
    }

    /// Creates a range covering a single position.
    #[inline]
    pub fn single(position: usize) -> Self {
        Self::new(position, position + 1)
    }

    /// Creates an empty range anchored at `position`.
    #[inline]
    pub fn empty_at(position: usize) -> Self {
        Self::new(position, position)
    }

    /// Number of positions in the range.
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the range contains no positions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `position` falls inside the range.
    #[inline]
    pub fn contains(&self, position: usize) -> bool {
        position >= self.start && position < self.end
    }

    /// Whether the two ranges share any position.
    #[inline]
    pub fn overlaps(&self, other: &Range) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Iterates the positions in the range in ascending order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = usize> + use<> {
        self.start..self.end
    }

    /// Groups a set of positions into maximal contiguous ranges.
    ///
    /// The input does not need to be sorted or unique; the output ranges are
    /// sorted, disjoint and non-adjacent.
    pub fn coalesce(positions: &[usize]) -> Vec<Range> {
        let mut sorted = positions.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut ranges = Vec::new();
        let mut iter = sorted.into_iter();
        let Some(first) = iter.next() else {
            return ranges;
        };
        let mut current = Range::single(first);
        for position in iter {
            if position == current.end {
                current.end += 1;
            } else {
                ranges.push(current);
                current = Range::single(position);
            }
        }
        ranges.push(current);
        ranges
    }

    /// Flattens a list of ranges into the positions they cover.
    pub fn flatten(ranges: &[Range]) -> Vec<usize> {
        let mut positions: Vec<usize> = ranges.iter().flat_map(Range::iter).collect();
        positions.sort_unstable();
        positions.dedup();
        positions
    }
}

/// A process-unique identity for a layer instance.
///
/// Two coordinates are only comparable when tagged with the same layer id;
/// equality is identity of the layer instance, never structural equality of
/// layer contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(u64);

impl LayerId {
    /// Allocates a fresh id.
    pub(crate) fn next() -> Self {
        Self(LAYER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// A position tagged with the axis and the layer whose space defines it.
///
/// Carrying the owning layer makes it possible to convert the position
/// between layers of one stack without ambiguity about which space the raw
/// number is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositionCoordinate {
    /// The layer instance whose position space this coordinate lives in.
    pub layer: LayerId,
    /// The axis the position is on.
    pub axis: Axis,
    /// The position itself.
    pub position: usize,
}

impl PositionCoordinate {
    /// Creates a coordinate in the given layer's space.
    pub fn new(layer: LayerId, axis: Axis, position: usize) -> Self {
        Self {
            layer,
            axis,
            position,
        }
    }
}
