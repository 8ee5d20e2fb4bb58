//! Reorder transform layer.
//!
//! Maintains an explicit permutation between this layer's positions and the
//! underlying layer's positions on one axis, distinct from the identity
//! permutation the underlying layer exposes. The permutation is replaced
//! wholesale under one write lock per mutation, so a concurrent query never
//! observes a half-applied reorder.

use std::sync::Arc;

use parking_lot::RwLock;
use trellis_core::logging::targets;

use crate::command::GridCommand;
use crate::coords::{Axis, Range};
use crate::event::{reorder_mapping, StructuralEvent};
use crate::layer::{forward_event, Layer, LayerCore};

/// The permutation and its inverse.
struct Order {
    /// Local position → underlying position.
    to_underlying: Vec<usize>,
    /// Underlying position → local position.
    from_underlying: Vec<usize>,
}

impl Order {
    fn identity(count: usize) -> Self {
        Self {
            to_underlying: (0..count).collect(),
            from_underlying: (0..count).collect(),
        }
    }

    fn from_permutation(to_underlying: Vec<usize>) -> Self {
        let mut from_underlying = vec![0; to_underlying.len()];
        for (position, &underlying) in to_underlying.iter().enumerate() {
            from_underlying[underlying] = position;
        }
        Self {
            to_underlying,
            from_underlying,
        }
    }
}

/// A transform layer that permutes one axis of the underlying layer.
pub struct ReorderLayer<U> {
    core: LayerCore,
    underlying: Arc<U>,
    axis: Axis,
    order: RwLock<Order>,
}

impl<U: Layer + 'static> ReorderLayer<U> {
    /// Creates a reorder transform for `axis` over `underlying`, starting
    /// with the identity permutation.
    pub fn new(underlying: Arc<U>, axis: Axis) -> Arc<Self> {
        let count = underlying.count(axis);
        let layer = Arc::new(Self {
            core: LayerCore::new(),
            underlying,
            axis,
            order: RwLock::new(Order::identity(count)),
        });

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

    /// The current permutation, local position → underlying position.
    ///
    /// Together with [`set_permutation`](Self::set_permutation) this is the
    /// snapshot surface a persistence collaborator uses to save and restore
    /// the ordering.
    pub fn permutation(&self) -> Vec<usize> {
        self.order.read().to_underlying.clone()
    }

    /// Replaces the whole permutation, e.g. when restoring persisted state.
    ///
    /// Rejects anything that is not a permutation of the current positions.
    pub fn set_permutation(&self, to_underlying: Vec<usize>) -> bool {
        let count = self.count(self.axis);
        let mut seen = vec![false; count];
        let valid = to_underlying.len() == count
            && to_underlying.iter().all(|&u| {
                u < count && !std::mem::replace(&mut seen[u], true)
            });
        if !valid {
            return false;
        }
        *self.order.write() = Order::from_permutation(to_underlying);
        self.core.fire(StructuralEvent::VisualRefresh);
        true
    }

    /// Moves a single position to an insertion point.
    pub fn reorder(&self, from: usize, to: usize) {
        self.multi_reorder(&[from], to, true);
    }

    /// Moves a set of positions (not necessarily contiguous) as one block.
    ///
    /// The block lands immediately before (`left_edge`) or after the target
    /// position; the target is corrected internally for the moved entries
    /// removed in front of it. Invalid positions are ignored; an entirely
    /// invalid request is a no-op.
    pub fn multi_reorder(&self, from_positions: &[usize], to: usize, left_edge: bool) {
        let count = self.count(self.axis);
        let mut moved: Vec<usize> = from_positions
            .iter()
            .copied()
            .filter(|&p| p < count)
            .collect();
        moved.sort_unstable();
        moved.dedup();
        if moved.is_empty() {
            return;
        }

        let effective_to = (to + usize::from(!left_edge)).min(count);
        let mapping = reorder_mapping(count, &moved, effective_to);

        {
            let mut order = self.order.write();
            let mut to_underlying = vec![0; count];
            for (old_position, &underlying) in order.to_underlying.iter().enumerate() {
                to_underlying[mapping[old_position]] = underlying;
            }
            *order = Order::from_permutation(to_underlying);
        }

        tracing::debug!(
            target: targets::LAYER,
            axis = ?self.axis,
            ?moved,
            to = effective_to,
            "reordered positions"
        );
        self.core.fire(StructuralEvent::PositionsReordered {
            axis: self.axis,
            from: Range::coalesce(&moved),
            to: effective_to,
        });
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

    /// Patches the permutation for a structural change beneath this layer.
    fn absorb(&self, event: &StructuralEvent) {
        match event {
            StructuralEvent::PositionsInserted { axis, ranges }
            | StructuralEvent::PositionsShown { axis, ranges }
                if *axis == self.axis =>
            {
                for range in ranges {
                    self.absorb_appeared(*range);
                }
            }
            StructuralEvent::PositionsDeleted { axis, ranges }
            | StructuralEvent::PositionsHidden { axis, ranges }
                if *axis == self.axis =>
            {
                for range in ranges {
                    self.absorb_vanished(*range);
                }
            }
            StructuralEvent::PositionsReordered { axis, from, to } if *axis == self.axis => {
                // The values reference underlying positions, which just moved.
                let mut order = self.order.write();
                let count = order.to_underlying.len();
                let mapping = reorder_mapping(count, &Range::flatten(from), *to);
                let to_underlying = order
                    .to_underlying
                    .iter()
                    .map(|&underlying| mapping[underlying])
                    .collect();
                *order = Order::from_permutation(to_underlying);
            }
            _ => {}
        }
    }

    /// New underlying positions appeared at `range`; keep them at their
    /// natural spot relative to the entry they displaced.
    fn absorb_appeared(&self, range: Range) {
        let mut order = self.order.write();
        let mut to_underlying: Vec<usize> = order
            .to_underlying
            .iter()
            .map(|&u| if u >= range.start { u + range.len() } else { u })
            .collect();
        let displaced = range.start + range.len();
        let slot = to_underlying
            .iter()
            .position(|&u| u == displaced)
            .unwrap_or(to_underlying.len());
        for (offset, underlying) in range.iter().enumerate() {
            to_underlying.insert(slot + offset, underlying);
        }
        *order = Order::from_permutation(to_underlying);
    }

    /// Underlying positions in `range` vanished; drop them and close the gap.
    fn absorb_vanished(&self, range: Range) {
        let mut order = self.order.write();
        let to_underlying = order
            .to_underlying
            .iter()
            .filter_map(|&u| {
                if range.contains(u) {
                    None
                } else if u >= range.end {
                    Some(u - range.len())
                } else {
                    Some(u)
                }
            })
            .collect();
        *order = Order::from_permutation(to_underlying);
    }
}

impl<U: Layer + 'static> Layer for ReorderLayer<U> {
    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn underlying(&self) -> Option<&dyn Layer> {
        Some(self.underlying.as_ref())
    }

    fn count(&self, axis: Axis) -> usize {
        if axis == self.axis {
            self.order.read().to_underlying.len()
        } else {
            self.underlying.count(axis)
        }
    }

    fn underlying_position(&self, axis: Axis, position: usize) -> Option<usize> {
        if axis == self.axis {
            self.order.read().to_underlying.get(position).copied()
        } else {
            (position < self.underlying.count(axis)).then_some(position)
        }
    }

    fn position_of_underlying(&self, axis: Axis, underlying: usize) -> Option<usize> {
        if axis == self.axis {
            self.order.read().from_underlying.get(underlying).copied()
        } else {
            (underlying < self.underlying.count(axis)).then_some(underlying)
        }
    }

    fn handle_command(&self, command: &GridCommand) -> bool {
        match command {
            GridCommand::Reorder { axis, from, to } if *axis == self.axis => {
                self.reorder(*from, *to);
                true
            }
            GridCommand::MultiReorder {
                axis,
                from_positions,
                to,
                left_edge,
            } if *axis == self.axis => {
                self.multi_reorder(from_positions, *to, *left_edge);
                true
            }
            _ => false,
        }
    }
}
