//! Structural events and their upward propagation.
//!
//! When a layer mutates its position space it fires a [`StructuralEvent`] on
//! its own event signal. Every layer that composes another subscribes to its
//! underlying layer's signal with a scoped connection; on receipt it first
//! updates its own remapping state, then translates the event's positions
//! into its own space and re-fires, so a listener at layer N only ever sees
//! positions expressed in layer N's space.
//!
//! Translation is lossy on purpose: a position that no longer exists in the
//! receiving layer's space (hidden, collapsed, scrolled out of view) simply
//! drops out, and an event whose positions all drop out is discarded without
//! being re-fired. That is the normal case for a viewport over a large
//! underlying space, not an error.

use trellis_core::logging::targets;

use crate::coords::{Axis, Range};

/// A notification that a layer's position space changed.
///
/// All positions are expressed in the space of the layer the event is fired
/// on; reorder events carry both the source ranges and the (edge-adjusted)
/// insertion position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralEvent {
    /// Positions were removed from the visible space by hiding.
    /// Ranges are in the pre-mutation space (while still present).
    PositionsHidden { axis: Axis, ranges: Vec<Range> },
    /// Previously hidden entries became visible again.
    /// Ranges are in the post-mutation space (where they reappeared).
    PositionsShown { axis: Axis, ranges: Vec<Range> },
    /// Positions changed their pixel extent.
    PositionsResized { axis: Axis, ranges: Vec<Range> },
    /// Positions moved to a new location as one contiguous block.
    PositionsReordered {
        axis: Axis,
        /// Where the moved positions were taken from.
        from: Vec<Range>,
        /// The insertion position the block was placed at.
        to: usize,
    },
    /// New positions appeared in the space.
    PositionsInserted { axis: Axis, ranges: Vec<Range> },
    /// Positions were removed from the space entirely.
    /// Ranges are in the pre-mutation space.
    PositionsDeleted { axis: Axis, ranges: Vec<Range> },
    /// The whole surface should repaint; no position-space change.
    VisualRefresh,
    /// A single cell's value changed (e.g. an async value resolved).
    CellRefresh { column: usize, row: usize },
}

impl StructuralEvent {
    /// The axis the event is about, if it is axis-specific.
    pub fn axis(&self) -> Option<Axis> {
        match self {
            StructuralEvent::PositionsHidden { axis, .. }
            | StructuralEvent::PositionsShown { axis, .. }
            | StructuralEvent::PositionsResized { axis, .. }
            | StructuralEvent::PositionsReordered { axis, .. }
            | StructuralEvent::PositionsInserted { axis, .. }
            | StructuralEvent::PositionsDeleted { axis, .. } => Some(*axis),
            StructuralEvent::VisualRefresh | StructuralEvent::CellRefresh { .. } => None,
        }
    }

    /// Whether the event's positions are expressed in the pre-mutation space.
    ///
    /// Hidden and deleted positions can only be named while they still
    /// exist, so those events carry pre-mutation positions. A wrapping layer
    /// must forward such an event (translating with its not-yet-updated
    /// state) *before* absorbing it, and absorb-first for everything else;
    /// that way every layer in the upward cascade sees positions it can
    /// still resolve.
    pub fn pre_mutation(&self) -> bool {
        matches!(
            self,
            StructuralEvent::PositionsHidden { .. } | StructuralEvent::PositionsDeleted { .. }
        )
    }

    /// Translates the event into the space of a wrapping layer.
    ///
    /// `map` converts one position of the firing layer's space (on the given
    /// axis) into the wrapping layer's space, returning `None` for positions
    /// that do not exist there. Returns `None` when nothing of the event
    /// survives translation, in which case the event is dropped.
    ///
    /// The `to` position of a reorder is an insertion point and may equal the
    /// firing layer's count; if it cannot be mapped directly, the position
    /// after the mapped predecessor is used, and `fallback_to` (the wrapping
    /// layer's count on the event's axis) when both fail.
    pub fn translated<F>(&self, map: F, fallback_to: usize) -> Option<StructuralEvent>
    where
        F: Fn(Axis, usize) -> Option<usize>,
    {
        let event = match self {
            StructuralEvent::PositionsHidden { axis, ranges } => {
                StructuralEvent::PositionsHidden {
                    axis: *axis,
                    ranges: translate_ranges(ranges, |p| map(*axis, p))?,
                }
            }
            StructuralEvent::PositionsShown { axis, ranges } => StructuralEvent::PositionsShown {
                axis: *axis,
                ranges: translate_ranges(ranges, |p| map(*axis, p))?,
            },
            StructuralEvent::PositionsResized { axis, ranges } => {
                StructuralEvent::PositionsResized {
                    axis: *axis,
                    ranges: translate_ranges(ranges, |p| map(*axis, p))?,
                }
            }
            StructuralEvent::PositionsReordered { axis, from, to } => {
                let from = translate_ranges(from, |p| map(*axis, p))?;
                let to = map(*axis, *to)
                    .or_else(|| to.checked_sub(1).and_then(|p| map(*axis, p)).map(|p| p + 1))
                    .unwrap_or(fallback_to);
                StructuralEvent::PositionsReordered {
                    axis: *axis,
                    from,
                    to,
                }
            }
            StructuralEvent::PositionsInserted { axis, ranges } => {
                StructuralEvent::PositionsInserted {
                    axis: *axis,
                    ranges: translate_ranges(ranges, |p| map(*axis, p))?,
                }
            }
            StructuralEvent::PositionsDeleted { axis, ranges } => {
                StructuralEvent::PositionsDeleted {
                    axis: *axis,
                    ranges: translate_ranges(ranges, |p| map(*axis, p))?,
                }
            }
            StructuralEvent::VisualRefresh => StructuralEvent::VisualRefresh,
            StructuralEvent::CellRefresh { column, row } => StructuralEvent::CellRefresh {
                column: map(Axis::Column, *column)?,
                row: map(Axis::Row, *row)?,
            },
        };
        Some(event)
    }
}

/// Maps every position covered by `ranges` and re-coalesces the survivors.
///
/// Returns `None` when no position survives, so callers can drop the event.
fn translate_ranges<F>(ranges: &[Range], map: F) -> Option<Vec<Range>>
where
    F: Fn(usize) -> Option<usize>,
{
    let translated: Vec<usize> = ranges
        .iter()
        .flat_map(Range::iter)
        .filter_map(|p| map(p))
        .collect();
    if translated.is_empty() {
        tracing::trace!(target: targets::EVENT, "event dropped: no positions survive translation");
        return None;
    }
    Some(Range::coalesce(&translated))
}

/// Reconstructs the old-position → new-position permutation produced by
/// moving `from_positions` as a contiguous block to insertion point `to`.
///
/// `to` is expressed in pre-mutation positions and is corrected internally
/// for the entries removed before it. The relative order of the moved
/// positions is preserved. Listeners that keep position-keyed state (the
/// selection layer) use this to follow a reorder.
pub fn reorder_mapping(count: usize, from_positions: &[usize], to: usize) -> Vec<usize> {
    let mut moved: Vec<usize> = from_positions
        .iter()
        .copied()
        .filter(|&p| p < count)
        .collect();
    moved.sort_unstable();
    moved.dedup();

    if moved.is_empty() {
        return (0..count).collect();
    }

    // Removing the moved entries shifts everything after them left, so the
    // insertion point must drop by the number of moved entries before it.
    let corrected_to = to.min(count) - moved.iter().filter(|&&p| p < to).count();

    let remaining: Vec<usize> = (0..count).filter(|p| !moved.contains(p)).collect();
    let mut new_order = Vec::with_capacity(count);
    new_order.extend_from_slice(&remaining[..corrected_to]);
    new_order.extend_from_slice(&moved);
    new_order.extend_from_slice(&remaining[corrected_to..]);

    // new_order[new] == old; invert to old -> new.
    let mut mapping = vec![0; count];
    for (new_position, &old_position) in new_order.iter().enumerate() {
        mapping[old_position] = new_position;
    }
    mapping
}
