//! Commands and their downward dispatch through the layer stack.
//!
//! A [`GridCommand`] is an immutable intent object. It enters the stack at
//! the topmost layer and travels downward: each layer first offers it to any
//! handler registered for its [`CommandKind`], then to its own built-in
//! handling, and finally converts the command's positions into the underlying
//! layer's space and recurses. Conversion never mutates the original command;
//! it clones into a new value with rewritten positions, so sibling dispatch
//! paths (the composite grid has several) each see the untouched original.
//!
//! Commands come in two categories:
//!
//! - **Context-free** commands carry no position and are accepted by the
//!   first layer that recognizes them; they pass through conversion
//!   unchanged.
//! - **Position-bound** commands must be re-expressed layer by layer. A
//!   position that fails to convert is dropped from multi-position commands;
//!   a command whose essential positions all fail to convert stops travelling
//!   on that path (the dispatch returns `false` there, which is a normal
//!   outcome, not an error).

use crate::cell::CellValue;
use crate::coords::{Axis, Range};

/// An intent dispatched down the layer stack.
#[derive(Debug, Clone, PartialEq)]
pub enum GridCommand {
    /// Resize one position to a pixel size.
    ResizePosition {
        axis: Axis,
        position: usize,
        size: u32,
    },
    /// Resize several positions to one pixel size.
    MultiResize {
        axis: Axis,
        positions: Vec<usize>,
        size: u32,
    },
    /// Restore default sizing on an axis. `fire_event` suppression allows
    /// batched reconfiguration without redundant repaints.
    ResetSizing { axis: Axis, fire_event: bool },
    /// The client area available to the viewport changed.
    ClientAreaResize { width: u32, height: u32 },

    /// Move a single position to an insertion point.
    Reorder { axis: Axis, from: usize, to: usize },
    /// Move a set of positions (not necessarily contiguous) as one block to
    /// an insertion point. `left_edge` selects which side of the target the
    /// block lands on.
    MultiReorder {
        axis: Axis,
        from_positions: Vec<usize>,
        to: usize,
        left_edge: bool,
    },

    /// Hide the given positions.
    HidePositions { axis: Axis, positions: Vec<usize> },
    /// Show the given indexes again. Indexes are stable identities, so this
    /// command is context-free.
    ShowIndexes { axis: Axis, indexes: Vec<usize> },
    /// Show everything hidden on an axis.
    ShowAll { axis: Axis },

    /// Select a single cell, with keyboard modifiers.
    SelectCell {
        column: usize,
        row: usize,
        shift: bool,
        ctrl: bool,
    },
    /// Select a rectangular region of cells.
    SelectRegion { columns: Range, rows: Range },
    /// Select a whole row or column, with keyboard modifiers.
    SelectAxis {
        axis: Axis,
        position: usize,
        shift: bool,
        ctrl: bool,
    },
    /// Select every cell.
    SelectAll,
    /// Clear the selection.
    ClearSelection,

    /// Group the currently fully-selected positions under a name.
    CreateGroup { axis: Axis, name: String },
    /// Remove the currently fully-selected positions from their groups.
    Ungroup { axis: Axis },
    /// Toggle the collapsed state of the group covering a position.
    ToggleGroupCollapse { axis: Axis, position: usize },

    /// Toggle the collapsed state of the tree node at a row position.
    ToggleTreeCollapse { row: usize },
    /// Expand every tree node.
    TreeExpandAll,
    /// Collapse every tree node.
    TreeCollapseAll,

    /// Scroll the minimum distance needed to reveal a position.
    ShowPosition { axis: Axis, position: usize },
    /// Scroll by a relative number of positions.
    ScrollBy { axis: Axis, delta: i64 },

    /// Write a value back through the stack to the data accessor.
    UpdateData {
        column: usize,
        row: usize,
        value: CellValue,
    },

    /// Release the stack's resources deterministically.
    Dispose,
}

/// The runtime kind of a command, used as the key for handler registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    ResizePosition,
    MultiResize,
    ResetSizing,
    ClientAreaResize,
    Reorder,
    MultiReorder,
    HidePositions,
    ShowIndexes,
    ShowAll,
    SelectCell,
    SelectRegion,
    SelectAxis,
    SelectAll,
    ClearSelection,
    CreateGroup,
    Ungroup,
    ToggleGroupCollapse,
    ToggleTreeCollapse,
    TreeExpandAll,
    TreeCollapseAll,
    ShowPosition,
    ScrollBy,
    UpdateData,
    Dispose,
}

impl GridCommand {
    /// The kind of this command.
    pub fn kind(&self) -> CommandKind {
        match self {
            GridCommand::ResizePosition { .. } => CommandKind::ResizePosition,
            GridCommand::MultiResize { .. } => CommandKind::MultiResize,
            GridCommand::ResetSizing { .. } => CommandKind::ResetSizing,
            GridCommand::ClientAreaResize { .. } => CommandKind::ClientAreaResize,
            GridCommand::Reorder { .. } => CommandKind::Reorder,
            GridCommand::MultiReorder { .. } => CommandKind::MultiReorder,
            GridCommand::HidePositions { .. } => CommandKind::HidePositions,
            GridCommand::ShowIndexes { .. } => CommandKind::ShowIndexes,
            GridCommand::ShowAll { .. } => CommandKind::ShowAll,
            GridCommand::SelectCell { .. } => CommandKind::SelectCell,
            GridCommand::SelectRegion { .. } => CommandKind::SelectRegion,
            GridCommand::SelectAxis { .. } => CommandKind::SelectAxis,
            GridCommand::SelectAll => CommandKind::SelectAll,
            GridCommand::ClearSelection => CommandKind::ClearSelection,
            GridCommand::CreateGroup { .. } => CommandKind::CreateGroup,
            GridCommand::Ungroup { .. } => CommandKind::Ungroup,
            GridCommand::ToggleGroupCollapse { .. } => CommandKind::ToggleGroupCollapse,
            GridCommand::ToggleTreeCollapse { .. } => CommandKind::ToggleTreeCollapse,
            GridCommand::TreeExpandAll => CommandKind::TreeExpandAll,
            GridCommand::TreeCollapseAll => CommandKind::TreeCollapseAll,
            GridCommand::ShowPosition { .. } => CommandKind::ShowPosition,
            GridCommand::ScrollBy { .. } => CommandKind::ScrollBy,
            GridCommand::UpdateData { .. } => CommandKind::UpdateData,
            GridCommand::Dispose => CommandKind::Dispose,
        }
    }

    /// Whether the command carries no positions at all.
    pub fn is_context_free(&self) -> bool {
        matches!(
            self,
            GridCommand::ResetSizing { .. }
                | GridCommand::ClientAreaResize { .. }
                | GridCommand::ShowIndexes { .. }
                | GridCommand::ShowAll { .. }
                | GridCommand::SelectAll
                | GridCommand::ClearSelection
                | GridCommand::CreateGroup { .. }
                | GridCommand::Ungroup { .. }
                | GridCommand::TreeExpandAll
                | GridCommand::TreeCollapseAll
                | GridCommand::ScrollBy { .. }
                | GridCommand::Dispose
        )
    }

    /// Produces a copy of the command with its positions rewritten into the
    /// underlying layer's space.
    ///
    /// `map` is the converting layer's local-position → underlying-position
    /// mapping per axis. Returns `None` when the command's essential
    /// positions do not exist in the underlying space, which ends the
    /// command's travel on this path. Context-free commands convert to an
    /// unchanged clone.
    pub fn converted<F>(&self, map: F) -> Option<GridCommand>
    where
        F: Fn(Axis, usize) -> Option<usize>,
    {
        let command = match self {
            GridCommand::ResizePosition {
                axis,
                position,
                size,
            } => GridCommand::ResizePosition {
                axis: *axis,
                position: map(*axis, *position)?,
                size: *size,
            },
            GridCommand::MultiResize {
                axis,
                positions,
                size,
            } => GridCommand::MultiResize {
                axis: *axis,
                positions: convert_positions(positions, |p| map(*axis, p))?,
                size: *size,
            },
            GridCommand::Reorder { axis, from, to } => GridCommand::Reorder {
                axis: *axis,
                from: map(*axis, *from)?,
                to: convert_insertion(*to, |p| map(*axis, p))?,
            },
            GridCommand::MultiReorder {
                axis,
                from_positions,
                to,
                left_edge,
            } => GridCommand::MultiReorder {
                axis: *axis,
                from_positions: convert_positions(from_positions, |p| map(*axis, p))?,
                to: convert_insertion(*to, |p| map(*axis, p))?,
                left_edge: *left_edge,
            },
            GridCommand::HidePositions { axis, positions } => GridCommand::HidePositions {
                axis: *axis,
                positions: convert_positions(positions, |p| map(*axis, p))?,
            },
            GridCommand::SelectCell {
                column,
                row,
                shift,
                ctrl,
            } => GridCommand::SelectCell {
                column: map(Axis::Column, *column)?,
                row: map(Axis::Row, *row)?,
                shift: *shift,
                ctrl: *ctrl,
            },
            GridCommand::SelectRegion { columns, rows } => GridCommand::SelectRegion {
                columns: convert_range(*columns, |p| map(Axis::Column, p))?,
                rows: convert_range(*rows, |p| map(Axis::Row, p))?,
            },
            GridCommand::SelectAxis {
                axis,
                position,
                shift,
                ctrl,
            } => GridCommand::SelectAxis {
                axis: *axis,
                position: map(*axis, *position)?,
                shift: *shift,
                ctrl: *ctrl,
            },
            GridCommand::ToggleGroupCollapse { axis, position } => {
                GridCommand::ToggleGroupCollapse {
                    axis: *axis,
                    position: map(*axis, *position)?,
                }
            }
            GridCommand::ToggleTreeCollapse { row } => GridCommand::ToggleTreeCollapse {
                row: map(Axis::Row, *row)?,
            },
            GridCommand::ShowPosition { axis, position } => GridCommand::ShowPosition {
                axis: *axis,
                position: map(*axis, *position)?,
            },
            GridCommand::UpdateData { column, row, value } => GridCommand::UpdateData {
                column: map(Axis::Column, *column)?,
                row: map(Axis::Row, *row)?,
                value: value.clone(),
            },
            // Context-free commands travel unchanged.
            other => other.clone(),
        };
        Some(command)
    }
}

/// Converts a position list, dropping entries that do not exist below.
///
/// Returns `None` when nothing survives.
fn convert_positions<F>(positions: &[usize], map: F) -> Option<Vec<usize>>
where
    F: Fn(usize) -> Option<usize>,
{
    let converted: Vec<usize> = positions.iter().filter_map(|&p| map(p)).collect();
    if converted.is_empty() {
        None
    } else {
        Some(converted)
    }
}

/// Converts an insertion point. An insertion point may sit one past the last
/// position; in that case the slot after the converted predecessor is used.
fn convert_insertion<F>(to: usize, map: F) -> Option<usize>
where
    F: Fn(usize) -> Option<usize>,
{
    map(to).or_else(|| to.checked_sub(1).and_then(map).map(|p| p + 1))
}

/// Converts an end-exclusive range via its boundary positions.
fn convert_range<F>(range: Range, map: F) -> Option<Range>
where
    F: Fn(usize) -> Option<usize>,
{
    if range.is_empty() {
        let start = map(range.start)?;
        return Some(Range::empty_at(start));
    }
    let start = map(range.start)?;
    let last = map(range.end - 1)?;
    Some(Range::new(start, last + 1))
}
