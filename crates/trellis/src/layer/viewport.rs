//! Viewport layer.
//!
//! Presents the subset of the underlying positions that fits into a client
//! area, offset by a scroll origin expressed in position units. Scrolling is
//! clamped so the tail of the content always fills the viewport when there is
//! less content left than client space, meaning the last position can never
//! be scrolled fully out of view.

use std::sync::Arc;

use parking_lot::RwLock;
use trellis_core::logging::targets;

use crate::command::GridCommand;
use crate::coords::Axis;
use crate::event::StructuralEvent;
use crate::layer::{Layer, LayerCore};

#[derive(Default)]
struct ViewState {
    client_width: u32,
    client_height: u32,
    origin_column: usize,
    origin_row: usize,
}

impl ViewState {
    fn client_extent(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Column => self.client_width,
            Axis::Row => self.client_height,
        }
    }

    fn origin(&self, axis: Axis) -> usize {
        match axis {
            Axis::Column => self.origin_column,
            Axis::Row => self.origin_row,
        }
    }

    fn set_origin(&mut self, axis: Axis, origin: usize) {
        match axis {
            Axis::Column => self.origin_column = origin,
            Axis::Row => self.origin_row = origin,
        }
    }
}

/// A scrollable window over the underlying layer.
pub struct ViewportLayer<U> {
    core: LayerCore,
    underlying: Arc<U>,
    state: RwLock<ViewState>,
}

impl<U: Layer + 'static> ViewportLayer<U> {
    /// Creates a viewport over `underlying` with an empty client area.
    ///
    /// Nothing is visible until the host reports a client area via
    /// [`set_client_area`](Self::set_client_area) or a
    /// [`GridCommand::ClientAreaResize`].
    pub fn new(underlying: Arc<U>) -> Arc<Self> {
        let layer = Arc::new(Self {
            core: LayerCore::new(),
            underlying,
            state: RwLock::new(ViewState::default()),
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

    /// The scroll origin on an axis, in position units.
    pub fn origin(&self, axis: Axis) -> usize {
        self.state.read().origin(axis)
    }

    /// The client area in pixels.
    pub fn client_area(&self) -> (u32, u32) {
        let state = self.state.read();
        (state.client_width, state.client_height)
    }

    /// Updates the client area, re-clamps the origins and repaints.
    ///
    /// The resize is also forwarded down the stack so the data layer can
    /// capture the space available to percentage sizing.
    pub fn set_client_area(&self, width: u32, height: u32) {
        {
            let mut state = self.state.write();
            state.client_width = width;
            state.client_height = height;
        }
        self.underlying
            .do_command(&GridCommand::ClientAreaResize { width, height });
        self.clamp_origins();
        self.core.fire(StructuralEvent::VisualRefresh);
    }

    /// Scrolls so that `origin` becomes the first visible position, clamped.
    pub fn scroll_to(&self, axis: Axis, origin: usize) {
        let clamped = origin.min(self.max_origin(axis));
        let changed = {
            let mut state = self.state.write();
            let changed = state.origin(axis) != clamped;
            state.set_origin(axis, clamped);
            changed
        };
        if changed {
            tracing::trace!(target: targets::VIEWPORT, ?axis, origin = clamped, "scrolled");
            self.core.fire(StructuralEvent::VisualRefresh);
        }
    }

    /// Scrolls by a relative number of positions.
    pub fn scroll_by(&self, axis: Axis, delta: i64) {
        let origin = self.origin(axis) as i64 + delta;
        self.scroll_to(axis, origin.max(0) as usize);
    }

    /// Scrolls the minimum distance needed to fully reveal an underlying
    /// position.
    pub fn show_position(&self, axis: Axis, position: usize) {
        let count = self.underlying.count(axis);
        if position >= count {
            return;
        }
        let origin = self.origin(axis);
        if position < origin {
            self.scroll_to(axis, position);
            return;
        }
        // Walk backwards from the target until the client space is used up;
        // the last origin that still fully fits the target is the minimal
        // scroll.
        let client = self.state.read().client_extent(axis);
        let mut px = 0u32;
        let mut first = position;
        loop {
            let extent = self.underlying.extent(axis, first).unwrap_or(0);
            if px + extent > client {
                first = (first + 1).min(position);
                break;
            }
            px += extent;
            if first == 0 {
                break;
            }
            first -= 1;
        }
        if first > origin {
            self.scroll_to(axis, first);
        }
    }

    /// The largest origin that keeps the viewport filled by the tail.
    fn max_origin(&self, axis: Axis) -> usize {
        let count = self.underlying.count(axis);
        let client = self.state.read().client_extent(axis);
        if client == 0 {
            return count.saturating_sub(1);
        }
        let mut px = 0u32;
        let mut tail_start = count;
        while tail_start > 0 {
            let extent = self.underlying.extent(axis, tail_start - 1).unwrap_or(0);
            if px + extent > client {
                break;
            }
            px += extent;
            tail_start -= 1;
        }
        tail_start
    }

    fn clamp_origins(&self) {
        for axis in [Axis::Column, Axis::Row] {
            let max = self.max_origin(axis);
            let mut state = self.state.write();
            if state.origin(axis) > max {
                state.set_origin(axis, max);
            }
        }
    }

    fn visible_count(&self, axis: Axis) -> usize {
        let (client, origin) = {
            let state = self.state.read();
            (state.client_extent(axis), state.origin(axis))
        };
        if client == 0 {
            return 0;
        }
        let count = self.underlying.count(axis);
        let mut px = 0u32;
        let mut visible = 0;
        for position in origin..count {
            if px >= client {
                break;
            }
            px += self.underlying.extent(axis, position).unwrap_or(0);
            visible += 1;
        }
        visible
    }

    fn on_underlying_event(&self, event: &StructuralEvent) {
        if event.pre_mutation() {
            self.forward_or_refresh(event);
            self.clamp_origins();
        } else {
            self.clamp_origins();
            self.forward_or_refresh(event);
        }
    }

    /// Forwards a translated event; when nothing of it is visible in the
    /// viewport the listeners still get a repaint hint, since scrollbar
    /// geometry depends on the total underlying size.
    fn forward_or_refresh(&self, event: &StructuralEvent) {
        let fallback = event.axis().map_or(0, |axis| self.count(axis));
        match event.translated(
            |axis, p| self.position_of_underlying(axis, p),
            fallback,
        ) {
            Some(translated) => self.core.fire(translated),
            None => self.core.fire(StructuralEvent::VisualRefresh),
        }
    }
}

impl<U: Layer + 'static> Layer for ViewportLayer<U> {
    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn underlying(&self) -> Option<&dyn Layer> {
        Some(self.underlying.as_ref())
    }

    fn count(&self, axis: Axis) -> usize {
        self.visible_count(axis)
    }

    fn underlying_position(&self, axis: Axis, position: usize) -> Option<usize> {
        if position >= self.visible_count(axis) {
            return None;
        }
        let underlying = self.origin(axis) + position;
        (underlying < self.underlying.count(axis)).then_some(underlying)
    }

    fn position_of_underlying(&self, axis: Axis, underlying: usize) -> Option<usize> {
        let origin = self.origin(axis);
        if underlying < origin {
            return None;
        }
        let position = underlying - origin;
        (position < self.visible_count(axis)).then_some(position)
    }

    fn total_extent(&self, axis: Axis) -> u32 {
        // The viewport is at most as large as its client area.
        let content: u32 = (0..self.count(axis))
            .filter_map(|p| self.extent(axis, p))
            .sum();
        content.min(self.state.read().client_extent(axis))
    }

    fn handle_command(&self, command: &GridCommand) -> bool {
        match command {
            GridCommand::ClientAreaResize { width, height } => {
                self.set_client_area(*width, *height);
                true
            }
            GridCommand::ShowPosition { axis, position } => {
                // The position arrives in viewport space from above; commands
                // targeting out-of-view positions address underlying space.
                let underlying = self
                    .underlying_position(*axis, *position)
                    .unwrap_or(*position);
                self.show_position(*axis, underlying);
                true
            }
            GridCommand::ScrollBy { axis, delta } => {
                self.scroll_by(*axis, *delta);
                true
            }
            _ => false,
        }
    }
}
