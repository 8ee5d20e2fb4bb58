//! Group expand/collapse transform layer.
//!
//! An axis transform whose hidden set is derived from a shared [`GroupModel`]:
//! the non-static members of every collapsed group are absent from this
//! layer's position space. Collapse and expand are the only mutations; the
//! mapping itself is rebuilt from the model.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;
use trellis_core::logging::targets;

use crate::command::GridCommand;
use crate::coords::{Axis, Range};
use crate::event::StructuralEvent;
use crate::group::GroupModel;
use crate::layer::{forward_event, Layer, LayerCore};

struct Mapping {
    to_underlying: Vec<usize>,
    from_underlying: Vec<Option<usize>>,
}

/// A transform layer hiding the collapsed groups' non-static members.
pub struct GroupExpandCollapseLayer<U> {
    core: LayerCore,
    underlying: Arc<U>,
    axis: Axis,
    model: Arc<GroupModel>,
    mapping: RwLock<Mapping>,
}

impl<U: Layer + 'static> GroupExpandCollapseLayer<U> {
    /// Creates the transform for `axis` over `underlying`, driven by `model`.
    pub fn new(underlying: Arc<U>, axis: Axis, model: Arc<GroupModel>) -> Arc<Self> {
        let layer = Arc::new(Self {
            core: LayerCore::new(),
            underlying,
            axis,
            model,
            mapping: RwLock::new(Mapping {
                to_underlying: Vec::new(),
                from_underlying: Vec::new(),
            }),
        });
        layer.rebuild();

        let weak = Arc::downgrade(&layer);
        let guard = layer.underlying.events().connect_scoped(move |event| {
            if let Some(layer) = weak.upgrade() {
                layer.on_underlying_event(event);
            }
        });
        layer.core.retain_guard(guard);

        // The model may be mutated from another stack sharing it; keep the
        // mapping in sync and repaint.
        let weak = Arc::downgrade(&layer);
        let guard = layer.model.changed.connect_scoped(move |_| {
            if let Some(layer) = weak.upgrade() {
                layer.rebuild();
                layer.core.fire(StructuralEvent::VisualRefresh);
            }
        });
        layer.core.retain_guard(guard);
        layer
    }

    /// The shared group model.
    pub fn model(&self) -> &Arc<GroupModel> {
        &self.model
    }

    fn rebuild(&self) {
        let hidden: BTreeSet<usize> = self.model.collapsed_hidden_indexes().into_iter().collect();
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
        *self.mapping.write() = mapping;
    }

    /// Collapses the named group, hiding its non-static members.
    ///
    /// No-op for unknown, already collapsed or non-collapseable groups.
    pub fn collapse(&self, name: &str) {
        let Some(group) = self.model.group_by_name(name) else {
            return;
        };
        if group.is_collapsed() || !group.is_collapseable() {
            return;
        }
        // The affected positions must be computed while the members are
        // still visible; after the flip they are not expressible.
        let affected: Vec<usize> = group
            .collapsible_members()
            .iter()
            .filter_map(|&index| self.position_of(self.axis, index))
            .collect();
        if !self.model.set_collapsed(name, true) {
            return;
        }
        tracing::debug!(target: targets::GROUP, name, ?affected, "collapsed group");
        if !affected.is_empty() {
            self.core.fire(StructuralEvent::PositionsHidden {
                axis: self.axis,
                ranges: Range::coalesce(&affected),
            });
        }
    }

    /// Expands the named group, showing its hidden members again.
    pub fn expand(&self, name: &str) {
        let Some(group) = self.model.group_by_name(name) else {
            return;
        };
        if !group.is_collapsed() {
            return;
        }
        // Detect which members are actually hidden while they still are;
        // lower layers may be hiding some of them independently, and those
        // must not be reported as shown.
        let hidden_here: Vec<usize> = group
            .collapsible_members()
            .iter()
            .copied()
            .filter(|&index| {
                self.position_of(self.axis, index).is_none()
                    && self
                        .underlying
                        .position_of(self.axis, index)
                        .is_some()
            })
            .collect();
        if !self.model.set_collapsed(name, false) {
            return;
        }
        let shown: Vec<usize> = hidden_here
            .iter()
            .filter_map(|&index| self.position_of(self.axis, index))
            .collect();
        tracing::debug!(target: targets::GROUP, name, ?shown, "expanded group");
        if !shown.is_empty() {
            self.core.fire(StructuralEvent::PositionsShown {
                axis: self.axis,
                ranges: Range::coalesce(&shown),
            });
        }
    }

    /// Toggles the group covering the entry at `position`.
    pub fn toggle_at(&self, position: usize) {
        let Some(index) = self.index_of(self.axis, position) else {
            return;
        };
        let Some(group) = self.model.group_of_index(index) else {
            return;
        };
        if group.is_collapsed() {
            self.expand(group.name());
        } else {
            self.collapse(group.name());
        }
    }

    fn on_underlying_event(&self, event: &StructuralEvent) {
        if event.pre_mutation() {
            forward_event(self, event);
            self.rebuild();
        } else {
            self.rebuild();
            forward_event(self, event);
        }
    }
}

impl<U: Layer + 'static> Layer for GroupExpandCollapseLayer<U> {
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
            GridCommand::ToggleGroupCollapse { axis, position } if *axis == self.axis => {
                // Unknown groups and non-collapseable groups are silently
                // consumed so no handler further down reinterprets them.
                self.toggle_at(*position);
                true
            }
            _ => false,
        }
    }
}
