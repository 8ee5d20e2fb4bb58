//! Trellis - a virtualized, layered grid core.
//!
//! Trellis displays, scrolls, selects, resizes, reorders and groups large
//! tabular datasets without pre-rendering the full dataset. The heart of the
//! crate is a stack of independently responsible layers: body data,
//! selection, viewport, hide/show, reorder, grouping and tree structure.
//! Each layer defines its own *position* space per axis, rewrites positions
//! on the way down (commands) and on the way up (queries and structural
//! events), and exclusively owns the layer beneath it.
//!
//! Painting, scrollbars and input bindings belong to the host toolkit; the
//! core exposes cell, bounds and display-mode queries for a renderer and
//! consumes [`GridCommand`]s a host translates its input events into.
//!
//! # Position vs index
//!
//! A *position* is layer-local, 0-based and contiguous, reflecting the
//! current visible order. An *index* is the stable identity of a row/column
//! in the underlying data, invariant under reordering and hiding. Positions
//! round-trip through indexes within one layer until the next structural
//! mutation.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis::prelude::*;
//!
//! let provider = Arc::new(VecDataProvider::new(vec![
//!     vec![CellValue::from("a"), CellValue::from(1i64)],
//!     vec![CellValue::from("b"), CellValue::from(2i64)],
//! ]));
//! let config = GridConfig::default();
//! let data = Arc::new(DataLayer::new(provider, &config));
//! let selection = SelectionLayer::new(data);
//! let viewport = ViewportLayer::new(selection.clone());
//! viewport.do_command(&GridCommand::ClientAreaResize { width: 300, height: 60 });
//!
//! viewport.do_command(&GridCommand::SelectCell {
//!     column: 0,
//!     row: 1,
//!     shift: false,
//!     ctrl: false,
//! });
//! assert!(selection.is_cell_selected(0, 1));
//! ```

mod cell;
mod command;
mod config;
mod coords;
mod error;
mod event;
mod grid;
pub mod group;
mod header;
mod layer;
pub mod prelude;
mod summary;
pub mod tree;

pub use cell::{Bounds, CellInfo, CellValue, DisplayMode};
pub use command::{CommandKind, GridCommand};
pub use config::GridConfig;
pub use coords::{Axis, LayerId, PositionCoordinate, Range};
pub use error::{Error, Result};
pub use event::{reorder_mapping, StructuralEvent};
pub use grid::{GridLayer, GridRegion};
pub use header::{ColumnHeaderLayer, CornerLayer, RowHeaderLayer};
pub use layer::{
    convert_to_underlying, CommandHandler, DataLayer, DataProvider, HideShowLayer, Layer,
    LayerCore, ReorderLayer, SelectionLayer, SelectionSource, VecDataProvider, ViewportLayer,
};
pub use summary::{
    Executor, InlineExecutor, SumFunction, SummaryFunction, SummaryRowLayer, ThreadExecutor,
};
