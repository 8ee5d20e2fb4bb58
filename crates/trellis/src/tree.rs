//! Tree row model and tree transform layer.
//!
//! [`TreeRowModel`] is a parent/child relation over row indexes with an
//! independent collapsed-state set. The relation is built once; collapse and
//! expand mutate only the state set, so visibility can be recomputed cheaply
//! without rebuilding the hierarchy.
//!
//! [`TreeLayer`] projects the relation onto the row axis: collapsing a node
//! removes all of its transitive descendants' positions from the visible
//! space without touching their indexes; expanding restores them in their
//! prior relative order.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use trellis_core::logging::targets;
use trellis_core::Signal;

use crate::command::GridCommand;
use crate::coords::{Axis, Range};
use crate::event::StructuralEvent;
use crate::layer::{forward_event, Layer, LayerCore};

/// A parent/child relation over row indexes with collapse state.
pub struct TreeRowModel {
    /// Index → parent index; `None` for roots.
    parents: Vec<Option<usize>>,
    /// Index → ordered child indexes. Derived from `parents`, immutable.
    children: Vec<Vec<usize>>,
    collapsed: RwLock<HashSet<usize>>,
    /// Emitted after any collapse-state change.
    pub changed: Signal<()>,
}

impl TreeRowModel {
    /// Builds the relation from a parent table.
    ///
    /// Entries referencing an out-of-range parent are treated as roots.
    pub fn new(parents: Vec<Option<usize>>) -> Self {
        let len = parents.len();
        let parents: Vec<Option<usize>> = parents
            .into_iter()
            .map(|p| p.filter(|&parent| parent < len))
            .collect();
        let mut children = vec![Vec::new(); len];
        for (index, parent) in parents.iter().enumerate() {
            if let Some(parent) = parent {
                children[*parent].push(index);
            }
        }
        Self {
            parents,
            children,
            collapsed: RwLock::new(HashSet::new()),
            changed: Signal::new(),
        }
    }

    /// Number of indexes in the relation.
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// Whether the relation is empty.
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// The parent of `index`, if any.
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.parents.get(index).copied().flatten()
    }

    /// Whether `index` has children.
    pub fn has_children(&self, index: usize) -> bool {
        self.children.get(index).is_some_and(|c| !c.is_empty())
    }

    /// The direct children of `index`, in index order.
    pub fn children(&self, index: usize) -> Vec<usize> {
        self.children.get(index).cloned().unwrap_or_default()
    }

    /// The nesting depth of `index`; roots have depth 0.
    pub fn depth(&self, index: usize) -> usize {
        let mut depth = 0;
        let mut current = self.parent(index);
        while let Some(parent) = current {
            depth += 1;
            current = self.parent(parent);
        }
        depth
    }

    /// All transitive descendants of `index`, pre-order.
    pub fn descendants(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self
            .children(index)
            .into_iter()
            .rev()
            .collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            for &child in self.children[next].iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Whether `index` is currently collapsed.
    pub fn is_collapsed(&self, index: usize) -> bool {
        self.collapsed.read().contains(&index)
    }

    /// Whether `index` is visible, i.e. no ancestor is collapsed.
    pub fn is_visible(&self, index: usize) -> bool {
        let collapsed = self.collapsed.read();
        let mut current = self.parent(index);
        while let Some(parent) = current {
            if collapsed.contains(&parent) {
                return false;
            }
            current = self.parent(parent);
        }
        true
    }

    /// Collapses a node. Returns `false` for leaves and already-collapsed
    /// nodes; the relation itself never changes.
    pub fn collapse(&self, index: usize) -> bool {
        if !self.has_children(index) {
            return false;
        }
        let inserted = self.collapsed.write().insert(index);
        if inserted {
            self.changed.emit(());
        }
        inserted
    }

    /// Expands a node. Returns `false` if it was not collapsed.
    pub fn expand(&self, index: usize) -> bool {
        let removed = self.collapsed.write().remove(&index);
        if removed {
            self.changed.emit(());
        }
        removed
    }

    /// Collapses every node that has children.
    pub fn collapse_all(&self) {
        {
            let mut collapsed = self.collapsed.write();
            for index in 0..self.len() {
                if self.has_children(index) {
                    collapsed.insert(index);
                }
            }
        }
        self.changed.emit(());
    }

    /// Expands every node.
    pub fn expand_all(&self) {
        self.collapsed.write().clear();
        self.changed.emit(());
    }
}

struct Mapping {
    to_underlying: Vec<usize>,
    from_underlying: Vec<Option<usize>>,
}

/// A row-axis transform hiding the descendants of collapsed tree nodes.
pub struct TreeLayer<U> {
    core: LayerCore,
    underlying: Arc<U>,
    model: Arc<TreeRowModel>,
    mapping: RwLock<Mapping>,
}

impl<U: Layer + 'static> TreeLayer<U> {
    /// Creates a tree transform over `underlying`, driven by `model`.
    pub fn new(underlying: Arc<U>, model: Arc<TreeRowModel>) -> Arc<Self> {
        let layer = Arc::new(Self {
            core: LayerCore::new(),
            underlying,
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

    /// The shared tree model.
    pub fn model(&self) -> &Arc<TreeRowModel> {
        &self.model
    }

    fn rebuild(&self) {
        let underlying_count = self.underlying.count(Axis::Row);
        let mut mapping = Mapping {
            to_underlying: Vec::with_capacity(underlying_count),
            from_underlying: vec![None; underlying_count],
        };
        for underlying_position in 0..underlying_count {
            let visible = self
                .underlying
                .index_of(Axis::Row, underlying_position)
                .is_some_and(|index| self.model.is_visible(index));
            if visible {
                mapping.from_underlying[underlying_position] = Some(mapping.to_underlying.len());
                mapping.to_underlying.push(underlying_position);
            }
        }
        *self.mapping.write() = mapping;
    }

    /// Collapses the node with row index `index`, hiding its descendants.
    pub fn collapse_index(&self, index: usize) {
        // Compute the vanishing positions while the descendants are still
        // visible.
        let affected: Vec<usize> = self
            .model
            .descendants(index)
            .into_iter()
            .filter_map(|descendant| self.position_of(Axis::Row, descendant))
            .collect();
        if !self.model.collapse(index) {
            return;
        }
        tracing::debug!(target: targets::TREE, index, hidden = affected.len(), "collapsed node");
        if !affected.is_empty() {
            self.core.fire(StructuralEvent::PositionsHidden {
                axis: Axis::Row,
                ranges: Range::coalesce(&affected),
            });
        }
    }

    /// Expands the node with row index `index`, restoring its descendants.
    ///
    /// Descendants of nested nodes that remain collapsed stay hidden.
    pub fn expand_index(&self, index: usize) {
        // Detect which descendants this collapse is actually hiding while
        // they are still hidden.
        let candidates: Vec<usize> = self
            .model
            .descendants(index)
            .into_iter()
            .filter(|&descendant| {
                self.position_of(Axis::Row, descendant).is_none()
                    && self.underlying.position_of(Axis::Row, descendant).is_some()
            })
            .collect();
        if !self.model.expand(index) {
            return;
        }
        let shown: Vec<usize> = candidates
            .into_iter()
            .filter_map(|descendant| self.position_of(Axis::Row, descendant))
            .collect();
        if !shown.is_empty() {
            self.core.fire(StructuralEvent::PositionsShown {
                axis: Axis::Row,
                ranges: Range::coalesce(&shown),
            });
        }
    }

    /// Toggles the node at a row position. Positions without children are
    /// silently consumed.
    pub fn toggle_at(&self, position: usize) {
        let Some(index) = self.index_of(Axis::Row, position) else {
            return;
        };
        if !self.model.has_children(index) {
            return;
        }
        if self.model.is_collapsed(index) {
            self.expand_index(index);
        } else {
            self.collapse_index(index);
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

impl<U: Layer + 'static> Layer for TreeLayer<U> {
    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn underlying(&self) -> Option<&dyn Layer> {
        Some(self.underlying.as_ref())
    }

    fn count(&self, axis: Axis) -> usize {
        if axis == Axis::Row {
            self.mapping.read().to_underlying.len()
        } else {
            self.underlying.count(axis)
        }
    }

    fn underlying_position(&self, axis: Axis, position: usize) -> Option<usize> {
        if axis == Axis::Row {
            self.mapping.read().to_underlying.get(position).copied()
        } else {
            (position < self.underlying.count(axis)).then_some(position)
        }
    }

    fn position_of_underlying(&self, axis: Axis, underlying: usize) -> Option<usize> {
        if axis == Axis::Row {
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
            GridCommand::ToggleTreeCollapse { row } => {
                self.toggle_at(*row);
                true
            }
            GridCommand::TreeExpandAll => {
                self.model.expand_all();
                true
            }
            GridCommand::TreeCollapseAll => {
                self.model.collapse_all();
                true
            }
            _ => false,
        }
    }
}
