//! Composite grid layer.
//!
//! Arranges four layer stacks (corner, column header, row header, body) into
//! one addressable 2-D space with region labels. Grid positions are the
//! region-local positions offset by the header bands: the row header's
//! columns come first on the column axis, the column header's rows first on
//! the row axis.
//!
//! Commands entering the grid are rebased into the owning region's space and
//! dispatched there (context-free commands are offered region by region);
//! child events re-fire translated into grid space.

use std::sync::Arc;

use trellis_core::logging::targets;

use crate::cell::{CellInfo, CellValue, DisplayMode};
use crate::command::GridCommand;
use crate::coords::Axis;
use crate::event::StructuralEvent;
use crate::layer::{Layer, LayerCore};

/// The four regions of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridRegion {
    /// Top-left corner above the row header.
    Corner,
    /// The column header band.
    ColumnHeader,
    /// The row header band.
    RowHeader,
    /// The scrollable data area.
    Body,
}

/// The composite layer joining the four regions.
pub struct GridLayer {
    core: LayerCore,
    corner: Arc<dyn Layer>,
    column_header: Arc<dyn Layer>,
    row_header: Arc<dyn Layer>,
    body: Arc<dyn Layer>,
}

impl GridLayer {
    /// Assembles a grid from its four regions.
    pub fn new(
        corner: Arc<dyn Layer>,
        column_header: Arc<dyn Layer>,
        row_header: Arc<dyn Layer>,
        body: Arc<dyn Layer>,
    ) -> Arc<Self> {
        let grid = Arc::new(Self {
            core: LayerCore::new(),
            corner,
            column_header,
            row_header,
            body,
        });

        for region in [
            GridRegion::Corner,
            GridRegion::ColumnHeader,
            GridRegion::RowHeader,
            GridRegion::Body,
        ] {
            let weak = Arc::downgrade(&grid);
            let guard = grid
                .child(region)
                .events()
                .connect_scoped(move |event: &StructuralEvent| {
                    if let Some(grid) = weak.upgrade() {
                        grid.forward_child_event(region, event);
                    }
                });
            grid.core.retain_guard(guard);
        }
        grid
    }

    /// The body stack's top layer.
    pub fn body(&self) -> &Arc<dyn Layer> {
        &self.body
    }

    /// The layer owning a region.
    pub fn child(&self, region: GridRegion) -> &Arc<dyn Layer> {
        match region {
            GridRegion::Corner => &self.corner,
            GridRegion::ColumnHeader => &self.column_header,
            GridRegion::RowHeader => &self.row_header,
            GridRegion::Body => &self.body,
        }
    }

    /// Number of header columns (the row header's width in positions).
    pub fn header_columns(&self) -> usize {
        self.row_header.count(Axis::Column)
    }

    /// Number of header rows (the column header's height in positions).
    pub fn header_rows(&self) -> usize {
        self.column_header.count(Axis::Row)
    }

    /// The region covering a grid cell position, if it is in range.
    pub fn region_at(&self, column: usize, row: usize) -> Option<GridRegion> {
        if column >= self.count(Axis::Column) || row >= self.count(Axis::Row) {
            return None;
        }
        let left = column < self.header_columns();
        let top = row < self.header_rows();
        Some(match (left, top) {
            (true, true) => GridRegion::Corner,
            (false, true) => GridRegion::ColumnHeader,
            (true, false) => GridRegion::RowHeader,
            (false, false) => GridRegion::Body,
        })
    }

    /// Per-axis grid offset of a region's local space.
    fn region_offset(&self, region: GridRegion, axis: Axis) -> usize {
        match (region, axis) {
            (GridRegion::ColumnHeader | GridRegion::Body, Axis::Column) => self.header_columns(),
            (GridRegion::RowHeader | GridRegion::Body, Axis::Row) => self.header_rows(),
            _ => 0,
        }
    }

    /// Rebases a grid position into a region's local space.
    fn to_region(&self, region: GridRegion, axis: Axis, position: usize) -> Option<usize> {
        let offset = self.region_offset(region, axis);
        if position < offset {
            return None;
        }
        let local = position - offset;
        (local < self.child(region).count(axis)).then_some(local)
    }

    /// Resolves a grid cell to its region and region-local position.
    fn resolve(&self, column: usize, row: usize) -> Option<(GridRegion, usize, usize)> {
        let region = self.region_at(column, row)?;
        let local_column = self.to_region(region, Axis::Column, column)?;
        let local_row = self.to_region(region, Axis::Row, row)?;
        Some((region, local_column, local_row))
    }

    fn forward_child_event(&self, region: GridRegion, event: &StructuralEvent) {
        let fallback = event.axis().map_or(0, |axis| self.count(axis));
        let translated = event.translated(
            |axis, p| Some(p + self.region_offset(region, axis)),
            fallback,
        );
        if let Some(translated) = translated {
            self.core.fire(translated);
        }
    }
}

impl Layer for GridLayer {
    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn underlying(&self) -> Option<&dyn Layer> {
        // A composite has no single underlying space.
        None
    }

    fn count(&self, axis: Axis) -> usize {
        match axis {
            Axis::Column => self.header_columns() + self.body.count(Axis::Column),
            Axis::Row => self.header_rows() + self.body.count(Axis::Row),
        }
    }

    fn underlying_position(&self, _axis: Axis, _position: usize) -> Option<usize> {
        None
    }

    fn position_of_underlying(&self, _axis: Axis, _underlying: usize) -> Option<usize> {
        None
    }

    fn index_of(&self, axis: Axis, position: usize) -> Option<usize> {
        let header = match axis {
            Axis::Column => self.header_columns(),
            Axis::Row => self.header_rows(),
        };
        if position < header {
            match axis {
                Axis::Column => self.row_header.index_of(axis, position),
                Axis::Row => self.column_header.index_of(axis, position),
            }
        } else {
            self.body.index_of(axis, position - header)
        }
    }

    fn position_of(&self, axis: Axis, index: usize) -> Option<usize> {
        let header = match axis {
            Axis::Column => self.header_columns(),
            Axis::Row => self.header_rows(),
        };
        self.body.position_of(axis, index).map(|p| p + header)
    }

    fn extent(&self, axis: Axis, position: usize) -> Option<u32> {
        let header = match axis {
            Axis::Column => self.header_columns(),
            Axis::Row => self.header_rows(),
        };
        if position < header {
            match axis {
                Axis::Column => self.row_header.extent(axis, position),
                Axis::Row => self.column_header.extent(axis, position),
            }
        } else {
            self.body.extent(axis, position - header)
        }
    }

    fn value(&self, column: usize, row: usize) -> CellValue {
        match self.resolve(column, row) {
            Some((region, local_column, local_row)) => {
                self.child(region).value(local_column, local_row)
            }
            None => CellValue::None,
        }
    }

    fn set_value(&self, column: usize, row: usize, value: CellValue) -> bool {
        match self.resolve(column, row) {
            Some((region, local_column, local_row)) => {
                self.child(region).set_value(local_column, local_row, value)
            }
            None => false,
        }
    }

    fn display_mode(&self, column: usize, row: usize) -> DisplayMode {
        match self.resolve(column, row) {
            Some((region, local_column, local_row)) => {
                self.child(region).display_mode(local_column, local_row)
            }
            None => DisplayMode::Normal,
        }
    }

    fn cell(&self, column: usize, row: usize) -> Option<CellInfo> {
        let (region, local_column, local_row) = self.resolve(column, row)?;
        let mut info = self.child(region).cell(local_column, local_row)?;
        info.column_position = column;
        info.row_position = row;
        info.origin_column += self.region_offset(region, Axis::Column);
        info.origin_row += self.region_offset(region, Axis::Row);
        Some(info)
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

        // The body viewport only gets the space left over by the headers.
        if let GridCommand::ClientAreaResize { width, height } = command {
            let body_width = width.saturating_sub(self.row_header.total_extent(Axis::Column));
            let body_height =
                height.saturating_sub(self.column_header.total_extent(Axis::Row));
            return self.body.do_command(&GridCommand::ClientAreaResize {
                width: body_width,
                height: body_height,
            });
        }

        // Offer the command region by region, rebased into each region's
        // space. Position-bound commands only convert for the region that
        // actually contains their positions; context-free commands pass
        // through everywhere and stop at the first handler.
        for region in [
            GridRegion::Body,
            GridRegion::ColumnHeader,
            GridRegion::RowHeader,
            GridRegion::Corner,
        ] {
            let rebased = command.converted(|axis, p| self.to_region(region, axis, p));
            if let Some(rebased) = rebased {
                if self.child(region).do_command(&rebased) {
                    tracing::trace!(
                        target: targets::COMMAND,
                        kind = ?command.kind(),
                        ?region,
                        "grid routed command"
                    );
                    return true;
                }
            }
        }
        false
    }

    fn dispose(&self) {
        self.core.dispose();
        self.corner.dispose();
        self.column_header.dispose();
        self.row_header.dispose();
        self.body.dispose();
    }
}
