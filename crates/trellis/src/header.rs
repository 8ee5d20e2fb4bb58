//! Column header, row header and corner layers.
//!
//! Header layers are dimensionally dependent: on the axis they share with
//! the body (columns for the column header, rows for the row header) they
//! delegate counts, index mapping and extents to the body stack's top, so
//! headers track scrolling, hiding and reordering without any state of their
//! own. The other axis is theirs: header values come from a header data
//! provider, and the display mode reflects the body selection crossing the
//! header cell.

use std::sync::Arc;

use crate::cell::{CellValue, DisplayMode};
use crate::command::GridCommand;
use crate::coords::Axis;
use crate::layer::{DataProvider, Layer, LayerCore, SelectionSource};

/// Whether a command may travel from a header into the body stack: anything
/// context-free, or position-bound commands on the shared axis only.
fn forwards_to_body(command: &GridCommand, shared_axis: Axis) -> bool {
    if command.is_context_free() {
        return true;
    }
    match command {
        GridCommand::ResizePosition { axis, .. }
        | GridCommand::MultiResize { axis, .. }
        | GridCommand::Reorder { axis, .. }
        | GridCommand::MultiReorder { axis, .. }
        | GridCommand::HidePositions { axis, .. }
        | GridCommand::SelectAxis { axis, .. }
        | GridCommand::ToggleGroupCollapse { axis, .. }
        | GridCommand::ShowPosition { axis, .. } => *axis == shared_axis,
        _ => false,
    }
}

/// The header band above the body columns.
pub struct ColumnHeaderLayer {
    core: LayerCore,
    /// The body stack's top; the column space is its column space.
    body: Arc<dyn Layer>,
    provider: Arc<dyn DataProvider>,
    selection: Option<Arc<dyn SelectionSource>>,
    row_height: u32,
}

impl ColumnHeaderLayer {
    /// Creates a column header over the body stack top.
    ///
    /// `provider` supplies header values by (column index, header row); its
    /// row count is the number of header rows.
    pub fn new(
        body: Arc<dyn Layer>,
        provider: Arc<dyn DataProvider>,
        selection: Option<Arc<dyn SelectionSource>>,
        row_height: u32,
    ) -> Self {
        Self {
            core: LayerCore::new(),
            body,
            provider,
            selection,
            row_height,
        }
    }
}

impl Layer for ColumnHeaderLayer {
    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn underlying(&self) -> Option<&dyn Layer> {
        None
    }

    fn count(&self, axis: Axis) -> usize {
        match axis {
            Axis::Column => self.body.count(Axis::Column),
            Axis::Row => self.provider.row_count(),
        }
    }

    fn underlying_position(&self, _axis: Axis, _position: usize) -> Option<usize> {
        // Dimensional dependency is not ownership; there is no underlying
        // space to convert into.
        None
    }

    fn position_of_underlying(&self, _axis: Axis, _underlying: usize) -> Option<usize> {
        None
    }

    fn index_of(&self, axis: Axis, position: usize) -> Option<usize> {
        match axis {
            Axis::Column => self.body.index_of(Axis::Column, position),
            Axis::Row => (position < self.count(Axis::Row)).then_some(position),
        }
    }

    fn position_of(&self, axis: Axis, index: usize) -> Option<usize> {
        match axis {
            Axis::Column => self.body.position_of(Axis::Column, index),
            Axis::Row => (index < self.count(Axis::Row)).then_some(index),
        }
    }

    fn extent(&self, axis: Axis, position: usize) -> Option<u32> {
        match axis {
            Axis::Column => self.body.extent(Axis::Column, position),
            Axis::Row => (position < self.count(Axis::Row)).then_some(self.row_height),
        }
    }

    fn value(&self, column: usize, row: usize) -> CellValue {
        let Some(index) = self.index_of(Axis::Column, column) else {
            return CellValue::None;
        };
        if row >= self.count(Axis::Row) {
            return CellValue::None;
        }
        self.provider.value(index, row)
    }

    fn set_value(&self, column: usize, row: usize, value: CellValue) -> bool {
        match self.index_of(Axis::Column, column) {
            Some(index) if row < self.count(Axis::Row) => {
                self.provider.set_value(index, row, value)
            }
            _ => false,
        }
    }

    fn display_mode(&self, column: usize, _row: usize) -> DisplayMode {
        let selected = self
            .index_of(Axis::Column, column)
            .zip(self.selection.as_ref())
            .is_some_and(|(index, selection)| selection.is_index_selected(Axis::Column, index));
        if selected {
            DisplayMode::Select
        } else {
            DisplayMode::Normal
        }
    }

    fn do_command(&self, command: &GridCommand) -> bool {
        if self.core.is_disposed() {
            return false;
        }
        if self.core.invoke_registered(command) {
            return true;
        }
        if matches!(command, GridCommand::Dispose) {
            self.dispose();
            return true;
        }
        // The column space is shared with the body, so column-axis commands
        // travel there without conversion.
        if forwards_to_body(command, Axis::Column) {
            return self.body.do_command(command);
        }
        false
    }
}

/// The header band left of the body rows.
///
/// Without an explicit provider the header shows 1-based row numbers.
pub struct RowHeaderLayer {
    core: LayerCore,
    body: Arc<dyn Layer>,
    provider: Option<Arc<dyn DataProvider>>,
    selection: Option<Arc<dyn SelectionSource>>,
    column_width: u32,
}

impl RowHeaderLayer {
    /// Creates a row header over the body stack top.
    pub fn new(
        body: Arc<dyn Layer>,
        provider: Option<Arc<dyn DataProvider>>,
        selection: Option<Arc<dyn SelectionSource>>,
        column_width: u32,
    ) -> Self {
        Self {
            core: LayerCore::new(),
            body,
            provider,
            selection,
            column_width,
        }
    }
}

impl Layer for RowHeaderLayer {
    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn underlying(&self) -> Option<&dyn Layer> {
        None
    }

    fn count(&self, axis: Axis) -> usize {
        match axis {
            Axis::Column => self
                .provider
                .as_ref()
                .map_or(1, |provider| provider.column_count()),
            Axis::Row => self.body.count(Axis::Row),
        }
    }

    fn underlying_position(&self, _axis: Axis, _position: usize) -> Option<usize> {
        None
    }

    fn position_of_underlying(&self, _axis: Axis, _underlying: usize) -> Option<usize> {
        None
    }

    fn index_of(&self, axis: Axis, position: usize) -> Option<usize> {
        match axis {
            Axis::Column => (position < self.count(Axis::Column)).then_some(position),
            Axis::Row => self.body.index_of(Axis::Row, position),
        }
    }

    fn position_of(&self, axis: Axis, index: usize) -> Option<usize> {
        match axis {
            Axis::Column => (index < self.count(Axis::Column)).then_some(index),
            Axis::Row => self.body.position_of(Axis::Row, index),
        }
    }

    fn extent(&self, axis: Axis, position: usize) -> Option<u32> {
        match axis {
            Axis::Column => {
                (position < self.count(Axis::Column)).then_some(self.column_width)
            }
            Axis::Row => self.body.extent(Axis::Row, position),
        }
    }

    fn value(&self, column: usize, row: usize) -> CellValue {
        let Some(index) = self.index_of(Axis::Row, row) else {
            return CellValue::None;
        };
        if column >= self.count(Axis::Column) {
            return CellValue::None;
        }
        match &self.provider {
            Some(provider) => provider.value(column, index),
            // 1-based row numbers.
            None => CellValue::Int(index as i64 + 1),
        }
    }

    fn display_mode(&self, _column: usize, row: usize) -> DisplayMode {
        let selected = self
            .index_of(Axis::Row, row)
            .zip(self.selection.as_ref())
            .is_some_and(|(index, selection)| selection.is_index_selected(Axis::Row, index));
        if selected {
            DisplayMode::Select
        } else {
            DisplayMode::Normal
        }
    }

    fn do_command(&self, command: &GridCommand) -> bool {
        if self.core.is_disposed() {
            return false;
        }
        if self.core.invoke_registered(command) {
            return true;
        }
        if matches!(command, GridCommand::Dispose) {
            self.dispose();
            return true;
        }
        if forwards_to_body(command, Axis::Row) {
            return self.body.do_command(command);
        }
        false
    }
}

/// The corner region filling the space above the row header.
pub struct CornerLayer {
    core: LayerCore,
    row_header: Arc<dyn Layer>,
    column_header: Arc<dyn Layer>,
}

impl CornerLayer {
    /// Creates a corner whose columns follow the row header and whose rows
    /// follow the column header.
    pub fn new(row_header: Arc<dyn Layer>, column_header: Arc<dyn Layer>) -> Self {
        Self {
            core: LayerCore::new(),
            row_header,
            column_header,
        }
    }
}

impl Layer for CornerLayer {
    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn underlying(&self) -> Option<&dyn Layer> {
        None
    }

    fn count(&self, axis: Axis) -> usize {
        match axis {
            Axis::Column => self.row_header.count(Axis::Column),
            Axis::Row => self.column_header.count(Axis::Row),
        }
    }

    fn underlying_position(&self, axis: Axis, position: usize) -> Option<usize> {
        (position < self.count(axis)).then_some(position)
    }

    fn position_of_underlying(&self, axis: Axis, underlying: usize) -> Option<usize> {
        (underlying < self.count(axis)).then_some(underlying)
    }

    fn extent(&self, axis: Axis, position: usize) -> Option<u32> {
        match axis {
            Axis::Column => self.row_header.extent(Axis::Column, position),
            Axis::Row => self.column_header.extent(Axis::Row, position),
        }
    }
}
