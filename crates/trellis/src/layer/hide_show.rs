//! Hide/show transform layer.
//!
//! Maintains a set of hidden *indexes* for one axis. Hidden entries do not
//! exist in this layer's position space at all: `position → index` skips
//! them, and asking for a hidden index's position yields the `None` sentinel.
//! Keying by index rather than position makes the hidden set survive
//! reordering beneath this layer.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;
use trellis_core::logging::targets;

use crate::command::GridCommand;
use crate::coords::{Axis, Range};
use crate::event::StructuralEvent;
use crate::layer::{forward_event, Layer, LayerCore};

/// Cached bidirectional mapping between this layer's positions and the
/// underlying layer's positions on the transformed axis.
struct Mapping {
    /// Local position → underlying position, visible entries only.
    to_underlying: Vec<usize>,
    /// Underlying position → local position (`None` when hidden).
    from_underlying: Vec<Option<usize>>,
}

impl Mapping {
    fn empty() -> Self {
        Self {
            to_underlying: Vec::new(),
            from_underlying: Vec::new(),
        }
    }
}

/// A transform layer that removes hidden entries from one axis.
pub struct HideShowLayer<U> {
    core: LayerCore,
    underlying: Arc<U>,
    axis: Axis,
    hidden: RwLock<BTreeSet<usize>>,
    mapping: RwLock<Mapping>,
}

impl<U: Layer + 'static> HideShowLayer<U> {
    /// Creates a hide/show transform for `axis` over `underlying`.
    pub fn new(underlying: Arc<U>, axis: Axis) -> Arc<Self> {
        let layer = Arc::new(Self {
            core: LayerCore::new(),
            underlying,
            axis,
            hidden: RwLock::new(BTreeSet::new()),
            mapping: RwLock::new(Mapping::empty()),
        });
        layer.rebuild();

        let weak = Arc::downgrade(&layer);
        let guard = layer.underlying.events().connect_scoped(move |event| {
            if let Some(layer) = weak.upgrade() {
                layer.on_underlying_event(event);
            }
        });
        layer.core.retain_guard(guard);
        layer
    }

    /// The axis this layer transforms.
    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// The hidden indexes, in ascending order.
    pub fn hidden_indexes(&self) -> Vec<usize> {
        self.hidden.read().iter().copied().collect()
    }

    /// Whether an index is currently hidden by this layer.
    pub fn is_hidden(&self, index: usize) -> bool {
        self.hidden.read().contains(&index)
    }

    fn rebuild(&self) {
        let hidden = self.hidden.read();
        let underlying_count = self.underlying.count(self.axis);
        let mut mapping = Mapping {
            to_underlying: Vec::with_capacity(underlying_count),
            from_underlying: vec![None; underlying_count],
        };
        for underlying_position in 0..underlying_count {
            let visible = self
                .underlying
                .index_of(self.axis, underlying_position)
                .is_some_and(|index| !hidden.contains(&index));
            if visible {
                mapping.from_underlying[underlying_position] = Some(mapping.to_underlying.len());
                mapping.to_underlying.push(underlying_position);
            }
        }
        drop(hidden);
        *self.mapping.write() = mapping;
    }

    /// Hides the entries at the given local positions.
    ///
    /// Fires a hide event naming the pre-mutation positions, since hidden
    /// positions are not expressible afterwards.
    pub fn hide_positions(&self, positions: &[usize]) {
        let mut affected = Vec::new();
        let mut indexes = Vec::new();
        for &position in positions {
            if let Some(index) = self.index_of(self.axis, position) {
                affected.push(position);
                indexes.push(index);
            }
        }
        if indexes.is_empty() {
            return;
        }
        tracing::debug!(target: targets::LAYER, axis = ?self.axis, ?indexes, "hiding indexes");
        self.hidden.write().extend(indexes);
        self.rebuild();
        self.core.fire(StructuralEvent::PositionsHidden {
            axis: self.axis,
            ranges: Range::coalesce(&affected),
        });
    }

    /// Hides the given indexes directly, e.g. when restoring persisted
    /// state. Unlike [`hide_positions`](Self::hide_positions) this does not
    /// need the entries to be visible right now.
    pub fn hide_indexes(&self, indexes: &[usize]) {
        let affected: Vec<usize> = indexes
            .iter()
            .filter_map(|&index| self.position_of(self.axis, index))
            .collect();
        self.hidden.write().extend(indexes.iter().copied());
        self.rebuild();
        if !affected.is_empty() {
            self.core.fire(StructuralEvent::PositionsHidden {
                axis: self.axis,
                ranges: Range::coalesce(&affected),
            });
        }
    }

    /// Shows the given indexes again.
    ///
    /// Fires a show event naming the post-mutation positions the entries
    /// reappeared at.
    pub fn show_indexes(&self, indexes: &[usize]) {
        let mut shown = Vec::new();
        {
            let mut hidden = self.hidden.write();
            for index in indexes {
                if hidden.remove(index) {
                    shown.push(*index);
                }
            }
        }
        if shown.is_empty() {
            return;
        }
        self.rebuild();
        let positions: Vec<usize> = shown
            .iter()
            .filter_map(|&index| self.position_of(self.axis, index))
            .collect();
        if positions.is_empty() {
            return;
        }
        self.core.fire(StructuralEvent::PositionsShown {
            axis: self.axis,
            ranges: Range::coalesce(&positions),
        });
    }

    /// Shows everything hidden on this layer's axis.
    pub fn show_all(&self) {
        let indexes: Vec<usize> = self.hidden.read().iter().copied().collect();
        self.show_indexes(&indexes);
    }

    fn on_underlying_event(&self, event: &StructuralEvent) {
        if event.pre_mutation() {
            forward_event(self, event);
            self.absorb(event);
        } else {
            self.absorb(event);
            forward_event(self, event);
        }
    }

    /// Updates the hidden set and the cached mapping for a structural change
    /// beneath this layer.
    fn absorb(&self, event: &StructuralEvent) {
        match event {
            StructuralEvent::PositionsInserted { axis, ranges } if *axis == self.axis => {
                // New entries shift the index identities at and above the
                // insertion point.
                for range in ranges {
                    if let Some(start_index) = self.underlying.index_of(self.axis, range.start) {
                        let mut hidden = self.hidden.write();
                        let shifted: BTreeSet<usize> = hidden
                            .iter()
                            .map(|&i| if i >= start_index { i + range.len() } else { i })
                            .collect();
                        *hidden = shifted;
                    }
                }
                self.rebuild();
            }
            StructuralEvent::PositionsDeleted { axis, ranges } if *axis == self.axis => {
                // Runs after the event was forwarded; the underlying layer
                // still resolves the deleted positions.
                for range in ranges {
                    let start_index = self
                        .underlying
                        .index_of(self.axis, range.start)
                        .unwrap_or_else(|| {
                            // Tail deletion: the dying indexes were the last.
                            self.underlying.count(self.axis).saturating_sub(range.len())
                        });
                    let len = range.len();
                    let mut hidden = self.hidden.write();
                    let shifted: BTreeSet<usize> = hidden
                        .iter()
                        .filter_map(|&i| {
                            if i < start_index {
                                Some(i)
                            } else if i < start_index + len {
                                None
                            } else {
                                Some(i - len)
                            }
                        })
                        .collect();
                    *hidden = shifted;
                }
                self.rebuild();
            }
            StructuralEvent::PositionsResized { .. }
            | StructuralEvent::VisualRefresh
            | StructuralEvent::CellRefresh { .. } => {}
            // Any other structural change only moves entries around; the
            // hidden set is index-keyed and survives as-is.
            _ => self.rebuild(),
        }
    }
}

impl<U: Layer + 'static> Layer for HideShowLayer<U> {
    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn underlying(&self) -> Option<&dyn Layer> {
        Some(self.underlying.as_ref())
    }

    fn count(&self, axis: Axis) -> usize {
        if axis == self.axis {
            self.mapping.read().to_underlying.len()
        } else {
            self.underlying.count(axis)
        }
    }

    fn underlying_position(&self, axis: Axis, position: usize) -> Option<usize> {
        if axis == self.axis {
            self.mapping.read().to_underlying.get(position).copied()
        } else {
            (position < self.underlying.count(axis)).then_some(position)
        }
    }

    fn position_of_underlying(&self, axis: Axis, underlying: usize) -> Option<usize> {
        if axis == self.axis {
            self.mapping
                .read()
                .from_underlying
                .get(underlying)
                .copied()
                .flatten()
        } else {
            (underlying < self.underlying.count(axis)).then_some(underlying)
        }
    }

    fn handle_command(&self, command: &GridCommand) -> bool {
        match command {
            GridCommand::HidePositions { axis, positions } if *axis == self.axis => {
                self.hide_positions(positions);
                true
            }
            GridCommand::ShowIndexes { axis, indexes } if *axis == self.axis => {
                self.show_indexes(indexes);
                true
            }
            GridCommand::ShowAll { axis } if *axis == self.axis => {
                self.show_all();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::tests::FlatLayer;
    use parking_lot::Mutex;

    fn captured(layer: &dyn Layer) -> Arc<Mutex<Vec<StructuralEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        layer.events().connect(move |event: &StructuralEvent| {
            sink.lock().push(event.clone());
        });
        events
    }

    #[test]
    fn test_hidden_positions_do_not_exist() {
        let layer = HideShowLayer::new(Arc::new(FlatLayer::new(5, 3)), Axis::Column);
        layer.hide_positions(&[1, 3]);

        assert_eq!(layer.count(Axis::Column), 3);
        assert_eq!(layer.index_of(Axis::Column, 0), Some(0));
        assert_eq!(layer.index_of(Axis::Column, 1), Some(2));
        assert_eq!(layer.index_of(Axis::Column, 2), Some(4));
        // Hidden indexes resolve to the sentinel.
        assert_eq!(layer.position_of(Axis::Column, 1), None);
        assert_eq!(layer.position_of(Axis::Column, 3), None);
        // The other axis passes through.
        assert_eq!(layer.count(Axis::Row), 3);
        assert_eq!(layer.index_of(Axis::Row, 2), Some(2));
    }

    #[test]
    fn test_hide_fires_pre_mutation_positions() {
        let layer = HideShowLayer::new(Arc::new(FlatLayer::new(5, 3)), Axis::Column);
        let events = captured(layer.as_ref());

        layer.hide_positions(&[1, 2]);
        assert_eq!(
            *events.lock(),
            vec![StructuralEvent::PositionsHidden {
                axis: Axis::Column,
                ranges: vec![Range::new(1, 3)],
            }]
        );
    }

    #[test]
    fn test_show_fires_post_mutation_positions() {
        let layer = HideShowLayer::new(Arc::new(FlatLayer::new(5, 3)), Axis::Column);
        layer.hide_positions(&[0, 1]);

        let events = captured(layer.as_ref());
        layer.show_indexes(&[0]);
        assert_eq!(
            *events.lock(),
            vec![StructuralEvent::PositionsShown {
                axis: Axis::Column,
                ranges: vec![Range::single(0)],
            }]
        );
    }

    #[test]
    fn test_hide_then_show_restores_bijection() {
        let layer = HideShowLayer::new(Arc::new(FlatLayer::new(6, 2)), Axis::Column);
        let original: Vec<Option<usize>> =
            (0..6).map(|p| layer.index_of(Axis::Column, p)).collect();

        layer.hide_positions(&[1, 4]);
        layer.show_indexes(&[1, 4]);

        let restored: Vec<Option<usize>> =
            (0..6).map(|p| layer.index_of(Axis::Column, p)).collect();
        assert_eq!(original, restored);
        assert_eq!(layer.count(Axis::Column), 6);
    }

    #[test]
    fn test_show_all() {
        let layer = HideShowLayer::new(Arc::new(FlatLayer::new(4, 2)), Axis::Row);
        layer.hide_positions(&[0, 1]);
        assert_eq!(layer.count(Axis::Row), 0);

        layer.show_all();
        assert_eq!(layer.count(Axis::Row), 2);
        assert!(layer.hidden_indexes().is_empty());
    }

    #[test]
    fn test_hide_command_is_handled() {
        let layer = HideShowLayer::new(Arc::new(FlatLayer::new(5, 3)), Axis::Column);
        assert!(layer.do_command(&GridCommand::HidePositions {
            axis: Axis::Column,
            positions: vec![2],
        }));
        assert!(layer.is_hidden(2));

        assert!(layer.do_command(&GridCommand::ShowAll { axis: Axis::Column }));
        assert!(!layer.is_hidden(2));

        // Row-axis visibility is not this layer's concern and nothing below
        // handles it either.
        assert!(!layer.do_command(&GridCommand::ShowAll { axis: Axis::Row }));
    }

    #[test]
    fn test_hide_indexes_restores_persisted_state() {
        let layer = HideShowLayer::new(Arc::new(FlatLayer::new(5, 3)), Axis::Column);
        layer.hide_positions(&[1, 3]);
        let saved = layer.hidden_indexes();

        let restored = HideShowLayer::new(Arc::new(FlatLayer::new(5, 3)), Axis::Column);
        restored.hide_indexes(&saved);
        assert_eq!(restored.hidden_indexes(), saved);
        assert_eq!(restored.count(Axis::Column), 3);
    }

    #[test]
    fn test_extent_skips_hidden() {
        let layer = HideShowLayer::new(Arc::new(FlatLayer::new(5, 3)), Axis::Column);
        layer.hide_positions(&[0]);
        // FlatLayer columns are 10px; position 0 is now old position 1.
        assert_eq!(layer.extent(Axis::Column, 0), Some(10));
        assert_eq!(layer.total_extent(Axis::Column), 40);
    }
}
