//! Group header layer.
//!
//! Adds one leading band to a header stack (a row above the column header
//! for column grouping): each group paints a single spanned cell across its
//! contiguous visible members, while ungrouped entries span the band and the
//! header band below as one tall cell.
//!
//! This layer also carries the grouping commands. Creating a group first
//! reorders the selected entries into one contiguous block (spanned rendering
//! requires contiguous members) and then registers the index set. The batch
//! is all-or-nothing: it is validated completely before any mutation, and an
//! invalid batch consumes the command without touching anything, still firing
//! a repaint so the surface stays consistent.

use std::sync::Arc;

use trellis_core::logging::targets;

use crate::cell::{CellInfo, CellValue, DisplayMode};
use crate::command::GridCommand;
use crate::coords::Axis;
use crate::event::StructuralEvent;
use crate::group::GroupModel;
use crate::layer::{forward_event, Layer, LayerCore, SelectionSource};

/// The header band with group-spanning cells and the grouping commands.
pub struct GroupHeaderLayer {
    core: LayerCore,
    /// The header layer this band sits on top of.
    header: Arc<dyn Layer>,
    model: Arc<GroupModel>,
    selection: Arc<dyn SelectionSource>,
    /// The layer whose position space the selection reports, used to
    /// dispatch the contiguity reorder.
    body: Arc<dyn Layer>,
    grouping_axis: Axis,
    band_extent: u32,
}

impl GroupHeaderLayer {
    /// Creates a group header band over `header`.
    ///
    /// `body` must be the layer the selection's positions are expressed in;
    /// the grouping command dispatches its reorder there. `band_extent` is
    /// the band's pixel height (for column grouping) or width (for row
    /// grouping).
    pub fn new(
        header: Arc<dyn Layer>,
        model: Arc<GroupModel>,
        selection: Arc<dyn SelectionSource>,
        body: Arc<dyn Layer>,
        grouping_axis: Axis,
        band_extent: u32,
    ) -> Arc<Self> {
        let layer = Arc::new(Self {
            core: LayerCore::new(),
            header,
            model,
            selection,
            body,
            grouping_axis,
            band_extent,
        });

        let weak = Arc::downgrade(&layer);
        let guard = layer.header.events().connect_scoped(move |event| {
            if let Some(layer) = weak.upgrade() {
                forward_event(layer.as_ref(), event);
            }
        });
        layer.core.retain_guard(guard);

        let weak = Arc::downgrade(&layer);
        let guard = layer.model.changed.connect_scoped(move |_| {
            if let Some(layer) = weak.upgrade() {
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

    fn cross_axis(&self) -> Axis {
        self.grouping_axis.other()
    }

    /// Splits a (column, row) pair into (grouping-axis, cross-axis)
    /// positions.
    fn split(&self, column: usize, row: usize) -> (usize, usize) {
        match self.grouping_axis {
            Axis::Column => (column, row),
            Axis::Row => (row, column),
        }
    }

    fn join(&self, grouping: usize, cross: usize) -> (usize, usize) {
        match self.grouping_axis {
            Axis::Column => (grouping, cross),
            Axis::Row => (cross, grouping),
        }
    }

    /// The contiguous run of visible positions around `position` belonging
    /// to the same group.
    fn group_span(&self, position: usize, group_name: &str) -> (usize, usize) {
        let in_group = |p: usize| {
            self.index_of(self.grouping_axis, p)
                .and_then(|index| self.model.group_of_index(index))
                .is_some_and(|g| g.name() == group_name)
        };
        let mut start = position;
        while start > 0 && in_group(start - 1) {
            start -= 1;
        }
        let mut end = position + 1;
        while end < self.count(self.grouping_axis) && in_group(end) {
            end += 1;
        }
        (start, end - start)
    }

    /// Registers the fully selected entries as a group after reordering them
    /// into one contiguous block. All-or-nothing; see the module docs.
    fn create_group(&self, name: &str) -> bool {
        let positions = self.selection.fully_selected_positions(self.grouping_axis);
        let indexes = self.selection.fully_selected_indexes(self.grouping_axis);

        let valid = !positions.is_empty()
            && indexes.len() == positions.len()
            && indexes.iter().all(|&index| {
                self.model
                    .group_of_index(index)
                    .is_none_or(|group| group.name() == name)
            });
        if !valid {
            tracing::debug!(target: targets::GROUP, name, "grouping rejected, nothing changed");
            self.core.fire(StructuralEvent::VisualRefresh);
            return true;
        }

        let target = positions[0];
        let reordered = self.body.do_command(&GridCommand::MultiReorder {
            axis: self.grouping_axis,
            from_positions: positions,
            to: target,
            left_edge: true,
        });
        if reordered {
            self.model.add_group(name, &indexes);
        }
        self.core.fire(StructuralEvent::VisualRefresh);
        true
    }

    /// Removes the fully selected entries from their groups.
    fn ungroup(&self) -> bool {
        let indexes = self.selection.fully_selected_indexes(self.grouping_axis);
        if !indexes.is_empty() {
            self.model.remove_indexes(&indexes);
        }
        self.core.fire(StructuralEvent::VisualRefresh);
        true
    }
}

impl Layer for GroupHeaderLayer {
    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn underlying(&self) -> Option<&dyn Layer> {
        Some(self.header.as_ref())
    }

    fn count(&self, axis: Axis) -> usize {
        if axis == self.grouping_axis {
            self.header.count(axis)
        } else {
            self.header.count(axis) + 1
        }
    }

    fn underlying_position(&self, axis: Axis, position: usize) -> Option<usize> {
        if axis == self.grouping_axis {
            (position < self.header.count(axis)).then_some(position)
        } else {
            // The band itself has no underlying position.
            position.checked_sub(1)
        }
    }

    fn position_of_underlying(&self, axis: Axis, underlying: usize) -> Option<usize> {
        if axis == self.grouping_axis {
            (underlying < self.header.count(axis)).then_some(underlying)
        } else {
            Some(underlying + 1)
        }
    }

    fn extent(&self, axis: Axis, position: usize) -> Option<u32> {
        if axis == self.grouping_axis {
            self.header.extent(axis, position)
        } else if position == 0 {
            Some(self.band_extent)
        } else {
            self.header.extent(axis, position - 1)
        }
    }

    fn value(&self, column: usize, row: usize) -> CellValue {
        let (grouping, cross) = self.split(column, row);
        if cross == 0 {
            return self
                .index_of(self.grouping_axis, grouping)
                .and_then(|index| self.model.group_of_index(index))
                .map_or(CellValue::None, |group| CellValue::from(group.name()));
        }
        let (column, row) = self.join(grouping, cross - 1);
        self.header.value(column, row)
    }

    fn display_mode(&self, column: usize, row: usize) -> DisplayMode {
        let (grouping, cross) = self.split(column, row);
        if cross == 0 {
            let selected = self
                .index_of(self.grouping_axis, grouping)
                .and_then(|index| self.model.group_of_index(index))
                .is_some_and(|group| {
                    let (start, span) = self.group_span(grouping, group.name());
                    (start..start + span)
                        .all(|p| self.selection.is_fully_selected(self.grouping_axis, p))
                });
            return if selected {
                DisplayMode::Select
            } else {
                DisplayMode::Normal
            };
        }
        let (column, row) = self.join(grouping, cross - 1);
        self.header.display_mode(column, row)
    }

    fn cell(&self, column: usize, row: usize) -> Option<CellInfo> {
        if column >= self.count(Axis::Column) || row >= self.count(Axis::Row) {
            return None;
        }
        let (grouping, cross) = self.split(column, row);
        let group = self
            .index_of(self.grouping_axis, grouping)
            .and_then(|index| self.model.group_of_index(index));

        let info = match group {
            Some(group) if cross == 0 => {
                let (start, span) = self.group_span(grouping, group.name());
                let (origin_column, origin_row) = self.join(start, 0);
                let (column_span, row_span) = match self.grouping_axis {
                    Axis::Column => (span, 1),
                    Axis::Row => (1, span),
                };
                CellInfo {
                    column_position: column,
                    row_position: row,
                    origin_column,
                    origin_row,
                    column_span,
                    row_span,
                    display_mode: self.display_mode(column, row),
                    value: CellValue::from(group.name()),
                }
            }
            Some(_) => {
                // A grouped entry's header cell, shifted below the band.
                let (header_column, header_row) = self.join(grouping, cross - 1);
                let mut info = self.header.cell(header_column, header_row)?;
                let (origin_column, origin_row) = match self.grouping_axis {
                    Axis::Column => (info.origin_column, info.origin_row + 1),
                    Axis::Row => (info.origin_column + 1, info.origin_row),
                };
                info.column_position = column;
                info.row_position = row;
                info.origin_column = origin_column;
                info.origin_row = origin_row;
                info
            }
            None => {
                // Ungrouped: one tall cell spanning the band and the header.
                let (header_column, header_row) = self.join(grouping, 0);
                let value = self.header.value(header_column, header_row);
                let (origin_column, origin_row) = self.join(grouping, 0);
                let (column_span, row_span) = match self.grouping_axis {
                    Axis::Column => (1, self.count(Axis::Row)),
                    Axis::Row => (self.count(Axis::Column), 1),
                };
                CellInfo {
                    column_position: column,
                    row_position: row,
                    origin_column,
                    origin_row,
                    column_span,
                    row_span,
                    display_mode: self.display_mode(column, row),
                    value,
                }
            }
        };
        Some(info)
    }

    fn handle_command(&self, command: &GridCommand) -> bool {
        match command {
            GridCommand::CreateGroup { axis, name } if *axis == self.grouping_axis => {
                self.create_group(name)
            }
            GridCommand::Ungroup { axis } if *axis == self.grouping_axis => self.ungroup(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::layer::tests::FlatLayer;
    use crate::layer::{DataLayer, ReorderLayer, SelectionLayer, VecDataProvider};
    use parking_lot::Mutex;

    type BodyStack = SelectionLayer<ReorderLayer<DataLayer>>;

    /// A 5-column body (data → reorder → selection) plus a header band.
    fn wired() -> (
        Arc<GroupModel>,
        Arc<BodyStack>,
        Arc<GroupHeaderLayer>,
    ) {
        let rows = (0..2)
            .map(|r| (0..5).map(|c| CellValue::from(format!("{r}:{c}"))).collect())
            .collect();
        let data = Arc::new(DataLayer::new(
            Arc::new(VecDataProvider::new(rows)),
            &GridConfig::default(),
        ));
        let reorder = ReorderLayer::new(data, Axis::Column);
        let selection = SelectionLayer::new(reorder);

        let model = Arc::new(GroupModel::new());
        let header_base = Arc::new(FlatLayer::new(5, 1));
        let header = GroupHeaderLayer::new(
            header_base,
            model.clone(),
            selection.clone(),
            selection.clone(),
            Axis::Column,
            20,
        );
        (model, selection, header)
    }

    #[test]
    fn test_band_adds_one_row() {
        let (_, _, header) = wired();
        assert_eq!(header.count(Axis::Row), 2);
        assert_eq!(header.count(Axis::Column), 5);
        assert_eq!(header.extent(Axis::Row, 0), Some(20));
    }

    #[test]
    fn test_group_cell_spans_members() {
        let (model, _, header) = wired();
        model.add_group("A", &[1, 2, 3]);

        let cell = header.cell(2, 0).unwrap();
        assert_eq!(cell.value, CellValue::from("A"));
        assert_eq!(cell.origin_column, 1);
        assert_eq!(cell.column_span, 3);
        assert_eq!(cell.row_span, 1);

        // Band cells over ungrouped entries span both rows.
        let cell = header.cell(0, 0).unwrap();
        assert_eq!(cell.row_span, 2);
        assert_eq!(cell.column_span, 1);
        assert!(cell.is_spanned());
    }

    #[test]
    fn test_create_group_reorders_into_contiguous_block() {
        let (model, body, header) = wired();
        // Fully select columns 1 and 3.
        body.select_axis(Axis::Column, 1, false, false);
        body.select_axis(Axis::Column, 3, false, true);

        assert!(header.do_command(&GridCommand::CreateGroup {
            axis: Axis::Column,
            name: "pair".to_string(),
        }));

        // Indexes 1 and 3 are registered and now contiguous in the body.
        let group = model.group_by_name("pair").unwrap();
        assert_eq!(group.members(), &[1, 3]);
        assert_eq!(body.position_of(Axis::Column, 1), Some(1));
        assert_eq!(body.position_of(Axis::Column, 3), Some(2));
    }

    #[test]
    fn test_create_group_merges_into_existing() {
        let (model, body, header) = wired();
        model.add_group("A", &[0, 1]);

        body.select_axis(Axis::Column, 2, false, false);
        assert!(header.do_command(&GridCommand::CreateGroup {
            axis: Axis::Column,
            name: "A".to_string(),
        }));
        assert_eq!(model.group_by_name("A").unwrap().members(), &[0, 1, 2]);
    }

    #[test]
    fn test_invalid_batch_mutates_nothing() {
        let (model, body, header) = wired();
        model.add_group("A", &[1, 2]);
        let order_before: Vec<usize> = (0..5)
            .map(|p| body.index_of(Axis::Column, p).unwrap())
            .collect();

        // Column 1 already belongs to group A: grouping under another name
        // must change nothing, but the command is still consumed and a
        // repaint fired.
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        header.events().connect(move |event: &StructuralEvent| {
            sink.lock().push(event.clone());
        });

        body.select_axis(Axis::Column, 1, false, false);
        body.select_axis(Axis::Column, 4, false, true);
        assert!(header.do_command(&GridCommand::CreateGroup {
            axis: Axis::Column,
            name: "B".to_string(),
        }));

        assert!(model.group_by_name("B").is_none());
        let order_after: Vec<usize> = (0..5)
            .map(|p| body.index_of(Axis::Column, p).unwrap())
            .collect();
        assert_eq!(order_before, order_after);
        assert!(events.lock().contains(&StructuralEvent::VisualRefresh));
    }

    #[test]
    fn test_ungroup_dissolves_trivial_remainder() {
        let (model, body, header) = wired();
        model.add_group("A", &[0, 1, 2]);

        body.select_axis(Axis::Column, 0, false, false);
        body.select_axis(Axis::Column, 1, false, true);
        assert!(header.do_command(&GridCommand::Ungroup { axis: Axis::Column }));

        // Two members removed; the single leftover dissolves the group.
        assert!(model.group_by_name("A").is_none());
    }

    #[test]
    fn test_band_value_and_display_mode() {
        let (model, body, header) = wired();
        model.add_group("A", &[0, 1]);

        assert_eq!(header.value(0, 0), CellValue::from("A"));
        assert_eq!(header.value(4, 0), CellValue::None);

        body.select_axis(Axis::Column, 0, false, false);
        body.select_axis(Axis::Column, 1, false, true);
        assert_eq!(header.display_mode(0, 0), DisplayMode::Select);
        assert_eq!(header.display_mode(4, 0), DisplayMode::Normal);
    }
}
