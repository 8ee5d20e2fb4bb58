//! Prelude module for Trellis.
//!
//! Re-exports the types needed to assemble and drive a grid stack:
//!
//! ```
//! use trellis::prelude::*;
//! ```

// ============================================================================
// Coordinates and events
// ============================================================================

pub use crate::coords::{Axis, LayerId, PositionCoordinate, Range};
pub use crate::event::StructuralEvent;

// ============================================================================
// Commands
// ============================================================================

pub use crate::command::{CommandKind, GridCommand};

// ============================================================================
// Layer stack
// ============================================================================

pub use crate::layer::{
    DataLayer, DataProvider, HideShowLayer, Layer, LayerCore, ReorderLayer, SelectionLayer,
    SelectionSource, VecDataProvider, ViewportLayer,
};

// ============================================================================
// Grouping and trees
// ============================================================================

pub use crate::group::{Group, GroupExpandCollapseLayer, GroupHeaderLayer, GroupModel};
pub use crate::tree::{TreeLayer, TreeRowModel};

// ============================================================================
// Composite grid
// ============================================================================

pub use crate::grid::{GridLayer, GridRegion};
pub use crate::header::{ColumnHeaderLayer, CornerLayer, RowHeaderLayer};

// ============================================================================
// Cells and configuration
// ============================================================================

pub use crate::cell::{Bounds, CellInfo, CellValue, DisplayMode};
pub use crate::config::GridConfig;
pub use crate::summary::{SummaryFunction, SummaryRowLayer};

// ============================================================================
// Core plumbing
// ============================================================================

pub use trellis_core::{Signal, SubscriptionGuard, UiQueue};
