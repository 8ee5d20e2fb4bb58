//! The base layer contract.
//!
//! A [`Layer`] defines its own position space per axis and optionally wraps a
//! single underlying layer it exclusively owns. Composition, not inheritance:
//! a transform layer holds an `Arc` of its underlying layer and rewrites
//! positions on the way down (commands) and on the way up (queries, events).
//!
//! Most of the contract has default implementations expressed in terms of the
//! per-layer primitives (`count`, `underlying_position`,
//! `position_of_underlying`, `underlying`), so a pass-through layer only
//! implements the handful of methods whose behavior it actually changes.
//!
//! # Failure policy
//!
//! Conversion failure (out of range, no underlying layer) is an `Option::None`
//! sentinel, never a panic: a position failing to convert is a normal
//! occurrence, e.g. a row scrolled out of an ancestor's view. An unhandled
//! command is a `false` return.

mod data;
mod hide_show;
mod reorder;
mod selection;
mod viewport;

pub use data::{DataLayer, DataProvider, VecDataProvider};
pub use hide_show::HideShowLayer;
pub use reorder::ReorderLayer;
pub use selection::{SelectionLayer, SelectionSource};
pub use viewport::ViewportLayer;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use trellis_core::logging::targets;
use trellis_core::{Signal, SubscriptionGuard};

use crate::cell::{Bounds, CellInfo, CellValue, DisplayMode};
use crate::command::{CommandKind, GridCommand};
use crate::coords::{Axis, LayerId, PositionCoordinate};
use crate::event::StructuralEvent;

/// A handler registered on a layer for one command kind.
pub type CommandHandler = Arc<dyn Fn(&GridCommand) -> bool + Send + Sync>;

/// Shared state every layer carries: identity, event signal, registered
/// command handlers, retained subscriptions and the disposed flag.
///
/// Layers embed a `LayerCore` and expose it through [`Layer::core`], the way
/// widgets expose their base in a widget toolkit.
pub struct LayerCore {
    id: LayerId,
    events: Signal<StructuralEvent>,
    handlers: RwLock<HashMap<CommandKind, CommandHandler>>,
    guards: Mutex<Vec<SubscriptionGuard>>,
    disposed: AtomicBool,
}

impl Default for LayerCore {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerCore {
    /// Creates a fresh core with a unique layer id.
    pub fn new() -> Self {
        Self {
            id: LayerId::next(),
            events: Signal::new(),
            handlers: RwLock::new(HashMap::new()),
            guards: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        }
    }

    /// The layer's identity.
    pub fn id(&self) -> LayerId {
        self.id
    }

    /// The layer's structural event signal.
    pub fn events(&self) -> &Signal<StructuralEvent> {
        &self.events
    }

    /// Fires a structural event to this layer's listeners.
    pub fn fire(&self, event: StructuralEvent) {
        if self.is_disposed() {
            return;
        }
        tracing::trace!(target: targets::EVENT, ?event, layer = ?self.id, "firing event");
        self.events.emit(event);
    }

    /// Registers a handler for one command kind, replacing any previous one.
    ///
    /// Registered handlers take precedence over the layer's built-in
    /// handling.
    pub fn register_handler<F>(&self, kind: CommandKind, handler: F)
    where
        F: Fn(&GridCommand) -> bool + Send + Sync + 'static,
    {
        self.handlers.write().insert(kind, Arc::new(handler));
    }

    /// Removes the handler for a command kind.
    pub fn unregister_handler(&self, kind: CommandKind) -> bool {
        self.handlers.write().remove(&kind).is_some()
    }

    /// Offers a command to the registered handler for its kind, if any.
    pub fn invoke_registered(&self, command: &GridCommand) -> bool {
        let handler = self.handlers.read().get(&command.kind()).cloned();
        match handler {
            Some(handler) => handler(command),
            None => false,
        }
    }

    /// Retains a subscription guard until disposal.
    pub fn retain_guard(&self, guard: SubscriptionGuard) {
        self.guards.lock().push(guard);
    }

    /// Whether this layer has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Releases subscriptions, handlers and listeners.
    ///
    /// Disposal is deterministic: dropping the retained guards disconnects
    /// this layer from its underlying layer immediately, and the event signal
    /// is cleared so no further notifications escape.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::debug!(target: targets::LAYER, layer = ?self.id, "disposing layer");
        self.guards.lock().clear();
        self.handlers.write().clear();
        self.events.disconnect_all();
    }
}

/// A composable unit defining a position space per axis.
///
/// See the module docs for the composition and failure-policy contract. The
/// required methods are the per-layer primitives; everything else has a
/// default that delegates through [`underlying`](Layer::underlying).
pub trait Layer: Send + Sync {
    /// Shared layer state.
    fn core(&self) -> &LayerCore;

    /// The underlying layer this one composes, if any.
    fn underlying(&self) -> Option<&dyn Layer>;

    /// Number of positions on the axis.
    fn count(&self, axis: Axis) -> usize;

    /// Maps a local position into the underlying layer's space.
    ///
    /// Leaf layers map identically within range.
    fn underlying_position(&self, axis: Axis, position: usize) -> Option<usize>;

    /// Maps an underlying-layer position into this layer's space.
    ///
    /// Returns `None` for underlying positions not present here (hidden,
    /// scrolled out, collapsed away).
    fn position_of_underlying(&self, axis: Axis, underlying: usize) -> Option<usize>;

    // -------------------------------------------------------------------------
    // Identity and conversion, defaulted through the underlying layer
    // -------------------------------------------------------------------------

    /// This layer's identity.
    fn id(&self) -> LayerId {
        self.core().id()
    }

    /// The structural event signal listeners subscribe to.
    fn events(&self) -> &Signal<StructuralEvent> {
        self.core().events()
    }

    /// Resolves the stable index behind a local position.
    fn index_of(&self, axis: Axis, position: usize) -> Option<usize> {
        let underlying_position = self.underlying_position(axis, position)?;
        match self.underlying() {
            Some(under) => under.index_of(axis, underlying_position),
            // The leaf's positions are the indexes.
            None => Some(underlying_position),
        }
    }

    /// Resolves the current local position of a stable index.
    fn position_of(&self, axis: Axis, index: usize) -> Option<usize> {
        match self.underlying() {
            Some(under) => {
                let underlying_position = under.position_of(axis, index)?;
                self.position_of_underlying(axis, underlying_position)
            }
            None => (index < self.count(axis)).then_some(index),
        }
    }

    /// Tags a position with this layer's identity.
    fn coordinate(&self, axis: Axis, position: usize) -> PositionCoordinate {
        PositionCoordinate::new(self.id(), axis, position)
    }

    // -------------------------------------------------------------------------
    // Pixel measures
    // -------------------------------------------------------------------------

    /// Pixel extent (width/height) of one position.
    fn extent(&self, axis: Axis, position: usize) -> Option<u32> {
        let underlying_position = self.underlying_position(axis, position)?;
        self.underlying()?.extent(axis, underlying_position)
    }

    /// Total pixel extent of the axis.
    fn total_extent(&self, axis: Axis) -> u32 {
        (0..self.count(axis))
            .filter_map(|p| self.extent(axis, p))
            .sum()
    }

    /// Cumulative pixel start of a position. `position == count` yields the
    /// total extent, which is useful as an end boundary.
    fn origin(&self, axis: Axis, position: usize) -> Option<u32> {
        if position > self.count(axis) {
            return None;
        }
        let mut origin = 0;
        for p in 0..position {
            origin += self.extent(axis, p)?;
        }
        Some(origin)
    }

    /// The position whose pixel span contains `px`, if any.
    fn position_at(&self, axis: Axis, px: u32) -> Option<usize> {
        let mut origin = 0;
        for position in 0..self.count(axis) {
            let extent = self.extent(axis, position)?;
            if px < origin + extent {
                return Some(position);
            }
            origin += extent;
        }
        None
    }

    /// Pixel bounds of a cell, relative to this layer's top-left corner.
    fn bounds(&self, column: usize, row: usize) -> Option<Bounds> {
        Some(Bounds {
            x: self.origin(Axis::Column, column)?,
            y: self.origin(Axis::Row, row)?,
            width: self.extent(Axis::Column, column)?,
            height: self.extent(Axis::Row, row)?,
        })
    }

    // -------------------------------------------------------------------------
    // Cell access
    // -------------------------------------------------------------------------

    /// Reads the value behind a cell position. Returns the `None` sentinel
    /// when the position does not resolve.
    fn value(&self, column: usize, row: usize) -> CellValue {
        let Some(column) = self.underlying_position(Axis::Column, column) else {
            return CellValue::None;
        };
        let Some(row) = self.underlying_position(Axis::Row, row) else {
            return CellValue::None;
        };
        match self.underlying() {
            Some(under) => under.value(column, row),
            None => CellValue::None,
        }
    }

    /// Writes a value back through the stack. Returns `false` when the
    /// position does not resolve or the data accessor rejects the write.
    fn set_value(&self, column: usize, row: usize, value: CellValue) -> bool {
        let Some(column) = self.underlying_position(Axis::Column, column) else {
            return false;
        };
        let Some(row) = self.underlying_position(Axis::Row, row) else {
            return false;
        };
        match self.underlying() {
            Some(under) => under.set_value(column, row, value),
            None => false,
        }
    }

    /// Presentation mode of a cell.
    fn display_mode(&self, column: usize, row: usize) -> DisplayMode {
        let converted = (
            self.underlying_position(Axis::Column, column),
            self.underlying_position(Axis::Row, row),
        );
        match (converted, self.underlying()) {
            ((Some(column), Some(row)), Some(under)) => under.display_mode(column, row),
            _ => DisplayMode::Normal,
        }
    }

    /// The resolved cell at a position, as a renderer sees it.
    fn cell(&self, column: usize, row: usize) -> Option<CellInfo> {
        if column >= self.count(Axis::Column) || row >= self.count(Axis::Row) {
            return None;
        }
        Some(CellInfo::unspanned(
            column,
            row,
            self.display_mode(column, row),
            self.value(column, row),
        ))
    }

    // -------------------------------------------------------------------------
    // Command dispatch and lifecycle
    // -------------------------------------------------------------------------

    /// Built-in command handling for this layer. The default handles nothing.
    fn handle_command(&self, _command: &GridCommand) -> bool {
        false
    }

    /// Dispatches a command down the stack.
    ///
    /// Order: registered handler for the command's kind, then built-in
    /// handling, then conversion into the underlying layer's space and
    /// recursion. Returns `false` only when no layer in the chain handled
    /// the command.
    fn do_command(&self, command: &GridCommand) -> bool {
        if self.core().is_disposed() {
            return false;
        }
        if self.core().invoke_registered(command) {
            return true;
        }
        if matches!(command, GridCommand::Dispose) {
            self.dispose();
            return true;
        }
        if self.handle_command(command) {
            tracing::trace!(
                target: targets::COMMAND,
                kind = ?command.kind(),
                layer = ?self.id(),
                "command handled"
            );
            return true;
        }
        if let Some(under) = self.underlying() {
            match command.converted(|axis, p| self.underlying_position(axis, p)) {
                Some(converted) => return under.do_command(&converted),
                None => {
                    tracing::trace!(
                        target: targets::COMMAND,
                        kind = ?command.kind(),
                        layer = ?self.id(),
                        "command dropped: positions do not convert"
                    );
                }
            }
        }
        false
    }

    /// Releases this layer's resources, then its underlying layer's.
    ///
    /// Deterministic by contract: native resources held by collaborators are
    /// released here, not at some later collection time.
    fn dispose(&self) {
        self.core().dispose();
        if let Some(under) = self.underlying() {
            under.dispose();
        }
    }
}

// Region composition stores layers as trait objects; keep the trait usable
// that way and the shared core shareable across threads.
static_assertions::assert_obj_safe!(Layer);
static_assertions::assert_impl_all!(LayerCore: Send, Sync);

/// Converts a tagged position into the space of a layer further down the
/// stack.
///
/// `coordinate` must be owned by `layer`; the position is rewritten layer by
/// layer until `target` is reached. Returns `None` when the coordinate is
/// tagged with a different layer, when the target is not in the underlying
/// chain, or when the position does not exist somewhere along the way. All
/// of these are normal outcomes a caller checks for, not errors.
pub fn convert_to_underlying(
    layer: &dyn Layer,
    coordinate: PositionCoordinate,
    target: LayerId,
) -> Option<PositionCoordinate> {
    if coordinate.layer != layer.id() {
        return None;
    }
    let mut position = coordinate.position;
    let mut current: &dyn Layer = layer;
    while current.id() != target {
        position = current.underlying_position(coordinate.axis, position)?;
        current = current.underlying()?;
    }
    Some(PositionCoordinate::new(target, coordinate.axis, position))
}

/// Translates an underlying layer's event into `layer`'s space and re-fires
/// it there, dropping it when nothing survives translation.
///
/// The translation map is the layer's `position_of_underlying`, so this must
/// be called while the layer's remap state matches the space the event's
/// positions are expressed in (see [`StructuralEvent::pre_mutation`]).
pub(crate) fn forward_event(layer: &dyn Layer, event: &StructuralEvent) {
    let fallback_to = event.axis().map_or(0, |axis| layer.count(axis));
    if let Some(translated) =
        event.translated(|axis, p| layer.position_of_underlying(axis, p), fallback_to)
    {
        layer.core().fire(translated);
    }
}
