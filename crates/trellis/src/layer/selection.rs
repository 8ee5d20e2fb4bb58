//! Selection layer.
//!
//! An identity transform that owns the selection state: a set of selected
//! cell positions plus the anchor and the last-selected cell. Modifier
//! semantics follow the usual desktop conventions:
//!
//! - a plain select clears everything, selects the target and re-anchors;
//! - shift extends a rectangular region from the anchor to the target,
//!   replacing the non-anchor selection;
//! - ctrl toggles the single target cell and re-anchors;
//! - shift+ctrl adds the anchor→target region without clearing.
//!
//! Selection state is keyed by *position*. When the structure beneath this
//! layer changes, the stored positions are remapped so the selection follows
//! the stable index: a reorder carries the selected cells along, hiding or
//! deleting drops the covered cells and closes the gap.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::cell::DisplayMode;
use crate::command::GridCommand;
use crate::coords::{Axis, Range};
use crate::event::{reorder_mapping, StructuralEvent};
use crate::layer::{Layer, LayerCore};

/// Read-only selection queries consumed by header layers.
///
/// Index-based queries resolve through the selection layer's own position
/// space, so callers in a differently scrolled space can still ask about a
/// stable row or column identity.
pub trait SelectionSource: Send + Sync {
    /// Whether the cell at a (column, row) position is selected.
    fn is_cell_selected(&self, column: usize, row: usize) -> bool;
    /// Whether any cell in the given row/column position is selected.
    fn is_position_selected(&self, axis: Axis, position: usize) -> bool;
    /// Whether every cell in the given row/column position is selected.
    fn is_fully_selected(&self, axis: Axis, position: usize) -> bool;
    /// The positions on `axis` whose every cell is selected, ascending.
    fn fully_selected_positions(&self, axis: Axis) -> Vec<usize>;
    /// Whether any cell of the row/column with the given index is selected.
    fn is_index_selected(&self, axis: Axis, index: usize) -> bool;
    /// The stable indexes behind `fully_selected_positions`.
    fn fully_selected_indexes(&self, axis: Axis) -> Vec<usize>;
}

#[derive(Default)]
struct SelectionState {
    cells: HashSet<(usize, usize)>,
    anchor: Option<(usize, usize)>,
    last: Option<(usize, usize)>,
}

impl SelectionState {
    /// Remaps the coordinate on `axis` of every stored cell; cells whose
    /// coordinate vanishes are dropped.
    fn remap<F>(&mut self, axis: Axis, map: F)
    where
        F: Fn(usize) -> Option<usize>,
    {
        let remap_cell = |&(column, row): &(usize, usize)| match axis {
            Axis::Column => map(column).map(|c| (c, row)),
            Axis::Row => map(row).map(|r| (column, r)),
        };
        self.cells = self.cells.iter().filter_map(remap_cell).collect();
        self.anchor = self.anchor.as_ref().and_then(remap_cell);
        self.last = self.last.as_ref().and_then(remap_cell);
    }
}

/// The layer owning selection state, stacked directly below the viewport.
pub struct SelectionLayer<U> {
    core: LayerCore,
    underlying: Arc<U>,
    state: RwLock<SelectionState>,
}

impl<U: Layer + 'static> SelectionLayer<U> {
    /// Creates a selection layer over `underlying`.
    pub fn new(underlying: Arc<U>) -> Arc<Self> {
        let layer = Arc::new(Self {
            core: LayerCore::new(),
            underlying,
            state: RwLock::new(SelectionState::default()),
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

    /// The anchor cell for region selection.
    pub fn anchor(&self) -> Option<(usize, usize)> {
        self.state.read().anchor
    }

    /// The most recently selected cell.
    pub fn last_selected(&self) -> Option<(usize, usize)> {
        self.state.read().last
    }

    /// The selected cell positions, unordered.
    pub fn selected_cells(&self) -> Vec<(usize, usize)> {
        self.state.read().cells.iter().copied().collect()
    }

    /// Whether anything is selected.
    pub fn has_selection(&self) -> bool {
        !self.state.read().cells.is_empty()
    }

    /// Applies a select-cell transition with modifier flags.
    pub fn select_cell(&self, column: usize, row: usize, shift: bool, ctrl: bool) {
        if column >= self.count(Axis::Column) || row >= self.count(Axis::Row) {
            return;
        }
        {
            let mut state = self.state.write();
            if shift {
                let anchor = state.anchor.unwrap_or((column, row));
                if !ctrl {
                    state.cells.clear();
                }
                let columns = anchor.0.min(column)..=anchor.0.max(column);
                for c in columns {
                    for r in anchor.1.min(row)..=anchor.1.max(row) {
                        state.cells.insert((c, r));
                    }
                }
                state.anchor = Some(anchor);
            } else if ctrl {
                if !state.cells.remove(&(column, row)) {
                    state.cells.insert((column, row));
                }
                state.anchor = Some((column, row));
            } else {
                state.cells.clear();
                state.cells.insert((column, row));
                state.anchor = Some((column, row));
            }
            state.last = Some((column, row));
        }
        self.core.fire(StructuralEvent::VisualRefresh);
    }

    /// Selects a rectangular region, clamped to the layer's extent.
    pub fn select_region(&self, columns: Range, rows: Range) {
        let column_count = self.count(Axis::Column);
        let row_count = self.count(Axis::Row);
        {
            let mut state = self.state.write();
            for column in columns.iter().filter(|&c| c < column_count) {
                for row in rows.iter().filter(|&r| r < row_count) {
                    state.cells.insert((column, row));
                }
            }
        }
        self.core.fire(StructuralEvent::VisualRefresh);
    }

    /// Applies a whole-row/column select transition with modifier flags.
    pub fn select_axis(&self, axis: Axis, position: usize, shift: bool, ctrl: bool) {
        if position >= self.count(axis) {
            return;
        }
        let cross_count = self.count(axis.other());
        let line = |p: usize| -> Vec<(usize, usize)> {
            (0..cross_count)
                .map(|cross| match axis {
                    Axis::Column => (p, cross),
                    Axis::Row => (cross, p),
                })
                .collect()
        };
        {
            let mut state = self.state.write();
            let anchor_line = match (shift, state.anchor) {
                (true, Some((column, row))) => match axis {
                    Axis::Column => column,
                    Axis::Row => row,
                },
                _ => position,
            };
            if shift {
                if !ctrl {
                    state.cells.clear();
                }
                for p in anchor_line.min(position)..=anchor_line.max(position) {
                    state.cells.extend(line(p));
                }
            } else if ctrl {
                let cells = line(position);
                if cells.iter().all(|cell| state.cells.contains(cell)) {
                    for cell in &cells {
                        state.cells.remove(cell);
                    }
                } else {
                    state.cells.extend(cells);
                }
            } else {
                state.cells.clear();
                state.cells.extend(line(position));
            }
            let anchor_cell = match axis {
                Axis::Column => (position, 0),
                Axis::Row => (0, position),
            };
            if !shift {
                state.anchor = Some(anchor_cell);
            }
            state.last = Some(anchor_cell);
        }
        self.core.fire(StructuralEvent::VisualRefresh);
    }

    /// Selects every cell.
    pub fn select_all(&self) {
        let column_count = self.count(Axis::Column);
        let row_count = self.count(Axis::Row);
        {
            let mut state = self.state.write();
            for column in 0..column_count {
                for row in 0..row_count {
                    state.cells.insert((column, row));
                }
            }
        }
        self.core.fire(StructuralEvent::VisualRefresh);
    }

    /// Clears the selection and both markers.
    pub fn clear(&self) {
        {
            let mut state = self.state.write();
            state.cells.clear();
            state.anchor = None;
            state.last = None;
        }
        self.core.fire(StructuralEvent::VisualRefresh);
    }

    fn on_underlying_event(&self, event: &StructuralEvent) {
        if event.pre_mutation() {
            // Identity transform: re-fire unchanged, then remap stored state.
            self.core.fire(event.clone());
            self.absorb(event);
        } else {
            self.absorb(event);
            self.core.fire(event.clone());
        }
    }

    /// Remaps the stored positions so the selection follows the index.
    fn absorb(&self, event: &StructuralEvent) {
        match event {
            StructuralEvent::PositionsReordered { axis, from, to } => {
                let mapping = reorder_mapping(self.count(*axis), &Range::flatten(from), *to);
                self.state
                    .write()
                    .remap(*axis, |p| mapping.get(p).copied());
            }
            StructuralEvent::PositionsHidden { axis, ranges }
            | StructuralEvent::PositionsDeleted { axis, ranges } => {
                let vanished = Range::flatten(ranges);
                self.state.write().remap(*axis, |p| {
                    if vanished.binary_search(&p).is_ok() {
                        return None;
                    }
                    let shift = vanished.iter().take_while(|&&v| v < p).count();
                    Some(p - shift)
                });
            }
            StructuralEvent::PositionsShown { axis, ranges }
            | StructuralEvent::PositionsInserted { axis, ranges } => {
                let appeared = Range::flatten(ranges);
                self.state.write().remap(*axis, |p| {
                    let mut shifted = p;
                    for &s in &appeared {
                        if s <= shifted {
                            shifted += 1;
                        }
                    }
                    Some(shifted)
                });
            }
            StructuralEvent::PositionsResized { .. }
            | StructuralEvent::VisualRefresh
            | StructuralEvent::CellRefresh { .. } => {}
        }
    }
}

impl<U: Layer + 'static> SelectionSource for SelectionLayer<U> {
    fn is_cell_selected(&self, column: usize, row: usize) -> bool {
        self.state.read().cells.contains(&(column, row))
    }

    fn is_position_selected(&self, axis: Axis, position: usize) -> bool {
        let state = self.state.read();
        state.cells.iter().any(|&(column, row)| match axis {
            Axis::Column => column == position,
            Axis::Row => row == position,
        })
    }

    fn is_fully_selected(&self, axis: Axis, position: usize) -> bool {
        let cross_count = self.count(axis.other());
        if cross_count == 0 {
            return false;
        }
        let state = self.state.read();
        (0..cross_count).all(|cross| {
            let cell = match axis {
                Axis::Column => (position, cross),
                Axis::Row => (cross, position),
            };
            state.cells.contains(&cell)
        })
    }

    fn fully_selected_positions(&self, axis: Axis) -> Vec<usize> {
        (0..self.count(axis))
            .filter(|&p| self.is_fully_selected(axis, p))
            .collect()
    }

    fn is_index_selected(&self, axis: Axis, index: usize) -> bool {
        self.position_of(axis, index)
            .is_some_and(|p| self.is_position_selected(axis, p))
    }

    fn fully_selected_indexes(&self, axis: Axis) -> Vec<usize> {
        self.fully_selected_positions(axis)
            .into_iter()
            .filter_map(|p| self.index_of(axis, p))
            .collect()
    }
}

impl<U: Layer + 'static> Layer for SelectionLayer<U> {
    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn underlying(&self) -> Option<&dyn Layer> {
        Some(self.underlying.as_ref())
    }

    fn count(&self, axis: Axis) -> usize {
        self.underlying.count(axis)
    }

    fn underlying_position(&self, axis: Axis, position: usize) -> Option<usize> {
        (position < self.count(axis)).then_some(position)
    }

    fn position_of_underlying(&self, axis: Axis, underlying: usize) -> Option<usize> {
        (underlying < self.count(axis)).then_some(underlying)
    }

    fn display_mode(&self, column: usize, row: usize) -> DisplayMode {
        if self.is_cell_selected(column, row) {
            DisplayMode::Select
        } else if column < self.count(Axis::Column) && row < self.count(Axis::Row) {
            self.underlying.display_mode(column, row)
        } else {
            DisplayMode::Normal
        }
    }

    fn handle_command(&self, command: &GridCommand) -> bool {
        match command {
            GridCommand::SelectCell {
                column,
                row,
                shift,
                ctrl,
            } => {
                self.select_cell(*column, *row, *shift, *ctrl);
                true
            }
            GridCommand::SelectRegion { columns, rows } => {
                self.select_region(*columns, *rows);
                true
            }
            GridCommand::SelectAxis {
                axis,
                position,
                shift,
                ctrl,
            } => {
                self.select_axis(*axis, *position, *shift, *ctrl);
                true
            }
            GridCommand::SelectAll => {
                self.select_all();
                true
            }
            GridCommand::ClearSelection => {
                self.clear();
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
    use crate::layer::{HideShowLayer, ReorderLayer};

    fn selection() -> Arc<SelectionLayer<FlatLayer>> {
        SelectionLayer::new(Arc::new(FlatLayer::new(4, 4)))
    }

    #[test]
    fn test_plain_select_clears_and_anchors() {
        let layer = selection();
        layer.select_cell(1, 1, false, false);
        layer.select_cell(2, 3, false, false);

        assert_eq!(layer.selected_cells(), vec![(2, 3)]);
        assert_eq!(layer.anchor(), Some((2, 3)));
        assert_eq!(layer.last_selected(), Some((2, 3)));
    }

    #[test]
    fn test_ctrl_toggles_without_disturbing_rest() {
        let layer = selection();
        layer.select_cell(0, 0, false, false);
        layer.select_cell(2, 2, false, true);
        assert!(layer.is_cell_selected(0, 0));
        assert!(layer.is_cell_selected(2, 2));

        layer.select_cell(2, 2, false, true);
        assert!(layer.is_cell_selected(0, 0));
        assert!(!layer.is_cell_selected(2, 2));
    }

    #[test]
    fn test_shift_extends_region_from_anchor() {
        let layer = selection();
        layer.select_cell(1, 1, false, false);
        layer.select_cell(3, 2, true, false);

        let mut cells = layer.selected_cells();
        cells.sort_unstable();
        assert_eq!(
            cells,
            vec![(1, 1), (1, 2), (2, 1), (2, 2), (3, 1), (3, 2)]
        );
        // Anchor survives the extension.
        assert_eq!(layer.anchor(), Some((1, 1)));

        // Extending again replaces the non-anchor region.
        layer.select_cell(1, 2, true, false);
        let mut cells = layer.selected_cells();
        cells.sort_unstable();
        assert_eq!(cells, vec![(1, 1), (1, 2)]);
    }

    #[test]
    fn test_shift_ctrl_adds_region_without_clearing() {
        let layer = selection();
        layer.select_cell(0, 0, false, false);
        layer.select_cell(3, 3, false, true);
        layer.select_cell(3, 2, true, true);

        assert!(layer.is_cell_selected(0, 0));
        assert!(layer.is_cell_selected(3, 3));
        assert!(layer.is_cell_selected(3, 2));
    }

    #[test]
    fn test_fully_selected_derivation() {
        let layer = selection();
        for column in 0..4 {
            layer.select_cell(column, 2, false, true);
        }
        assert!(layer.is_fully_selected(Axis::Row, 2));
        assert_eq!(layer.fully_selected_positions(Axis::Row), vec![2]);
        assert!(!layer.is_fully_selected(Axis::Row, 1));
        assert!(!layer.is_fully_selected(Axis::Column, 0));

        layer.select_cell(0, 2, false, true); // knock one cell out
        assert!(!layer.is_fully_selected(Axis::Row, 2));
    }

    #[test]
    fn test_select_axis_and_select_all() {
        let layer = selection();
        layer.select_axis(Axis::Column, 1, false, false);
        assert!(layer.is_fully_selected(Axis::Column, 1));
        assert_eq!(layer.fully_selected_positions(Axis::Column), vec![1]);

        layer.select_all();
        assert_eq!(layer.fully_selected_positions(Axis::Column).len(), 4);

        layer.clear();
        assert!(!layer.has_selection());
        assert_eq!(layer.anchor(), None);
    }

    #[test]
    fn test_selection_follows_reorder_beneath() {
        let reorder = ReorderLayer::new(Arc::new(FlatLayer::new(5, 3)), Axis::Column);
        let layer = SelectionLayer::new(reorder.clone());
        layer.select_cell(1, 0, false, false);
        let index = layer.index_of(Axis::Column, 1).unwrap();

        reorder.multi_reorder(&[1], 4, true);

        // The selected cell moved with its index.
        let new_position = layer.position_of(Axis::Column, index).unwrap();
        assert_eq!(new_position, 3);
        assert_eq!(layer.selected_cells(), vec![(3, 0)]);
        assert_eq!(layer.anchor(), Some((3, 0)));
    }

    #[test]
    fn test_selection_drops_hidden_positions() {
        let hide = HideShowLayer::new(Arc::new(FlatLayer::new(5, 3)), Axis::Column);
        let layer = SelectionLayer::new(hide.clone());
        layer.select_cell(1, 0, false, false);
        layer.select_cell(3, 1, false, true);

        hide.hide_positions(&[1]);

        // Position 1's cell is gone; position 3 shifted to 2.
        let mut cells = layer.selected_cells();
        cells.sort_unstable();
        assert_eq!(cells, vec![(2, 1)]);

        hide.show_indexes(&[1]);
        let mut cells = layer.selected_cells();
        cells.sort_unstable();
        assert_eq!(cells, vec![(3, 1)]);
    }

    #[test]
    fn test_select_commands_are_handled() {
        let layer = selection();
        assert!(layer.do_command(&GridCommand::SelectCell {
            column: 2,
            row: 2,
            shift: false,
            ctrl: false,
        }));
        assert!(layer.is_cell_selected(2, 2));

        assert!(layer.do_command(&GridCommand::ClearSelection));
        assert!(!layer.has_selection());
    }

    #[test]
    fn test_display_mode_reflects_selection() {
        let layer = selection();
        layer.select_cell(1, 1, false, false);
        assert_eq!(layer.display_mode(1, 1), DisplayMode::Select);
        assert_eq!(layer.display_mode(0, 0), DisplayMode::Normal);
    }

    #[test]
    fn test_out_of_range_select_is_a_no_op() {
        let layer = selection();
        layer.select_cell(9, 9, false, false);
        assert!(!layer.has_selection());
    }
}
