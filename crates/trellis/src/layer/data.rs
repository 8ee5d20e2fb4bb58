//! The data layer: the leaf of every stack.
//!
//! The data layer owns row/column sizing state and exposes raw cell values
//! through an external [`DataProvider`] collaborator. At the leaf, position
//! and index coincide on both axes; every other coordinate system in the
//! stack is defined relative to this one.
//!
//! # Sizing
//!
//! Each axis is sized either in fixed pixels or as percentages of the
//! available client space; the whole axis switches with
//! [`set_percentage_sizing`](DataLayer::set_percentage_sizing), and
//! individual entries can be pinned to pixel sizing even while the axis is in
//! percentage mode. Percentage resolution floors every participant's pixel
//! share and grants the accumulated remainder to the last participant, so the
//! column widths always add up to the available space without per-resize
//! drift.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::cell::CellValue;
use crate::command::GridCommand;
use crate::config::GridConfig;
use crate::coords::{Axis, Range};
use crate::event::StructuralEvent;
use crate::layer::{Layer, LayerCore};

/// The external data accessor the grid displays.
///
/// The core treats values as opaque payloads; conversion for display or
/// editing is the caller's concern. Access is assumed synchronous and cheap;
/// expensive sources should resolve asynchronously on the caller's side and
/// write back when ready.
pub trait DataProvider: Send + Sync {
    /// Number of columns in the data.
    fn column_count(&self) -> usize;
    /// Number of rows in the data.
    fn row_count(&self) -> usize;
    /// Reads the value at a (column index, row index) pair.
    fn value(&self, column_index: usize, row_index: usize) -> CellValue;
    /// Writes a value back. Returns `false` if the source is read-only or
    /// rejects the write. The default is read-only.
    fn set_value(&self, _column_index: usize, _row_index: usize, _value: CellValue) -> bool {
        false
    }
}

/// A simple in-memory provider over a row-major `Vec` of values.
pub struct VecDataProvider {
    rows: RwLock<Vec<Vec<CellValue>>>,
    columns: usize,
}

impl VecDataProvider {
    /// Creates a provider from row-major data. The column count is the width
    /// of the widest row.
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        Self {
            rows: RwLock::new(rows),
            columns,
        }
    }

    /// Inserts rows at `at`. The caller announces the insertion on the data
    /// layer afterwards.
    pub fn insert_rows(&self, at: usize, rows: Vec<Vec<CellValue>>) {
        let mut stored = self.rows.write();
        let at = at.min(stored.len());
        for (offset, row) in rows.into_iter().enumerate() {
            stored.insert(at + offset, row);
        }
    }

    /// Removes the rows in `range`. The caller announces the deletion on the
    /// data layer afterwards.
    pub fn remove_rows(&self, range: crate::coords::Range) {
        let mut stored = self.rows.write();
        let end = range.end.min(stored.len());
        if range.start < end {
            stored.drain(range.start..end);
        }
    }
}

impl DataProvider for VecDataProvider {
    fn column_count(&self) -> usize {
        self.columns
    }

    fn row_count(&self) -> usize {
        self.rows.read().len()
    }

    fn value(&self, column_index: usize, row_index: usize) -> CellValue {
        self.rows
            .read()
            .get(row_index)
            .and_then(|row| row.get(column_index))
            .cloned()
            .unwrap_or(CellValue::None)
    }

    fn set_value(&self, column_index: usize, row_index: usize, value: CellValue) -> bool {
        let mut rows = self.rows.write();
        match rows
            .get_mut(row_index)
            .and_then(|row| row.get_mut(column_index))
        {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

/// Per-axis sizing state.
struct SizeTrack {
    default_size: u32,
    min_size: u32,
    /// Axis-wide switch between pixel and percentage sizing.
    percentage_sizing: bool,
    /// Explicit pixel sizes by index.
    sizes: HashMap<usize, u32>,
    /// Explicit percentages by index.
    percentages: HashMap<usize, f64>,
    /// Indexes pinned to pixel sizing while the axis is in percentage mode.
    pixel_overrides: HashSet<usize>,
    /// Client space available for percentage resolution.
    available: u32,
}

impl SizeTrack {
    fn new(default_size: u32, min_size: u32) -> Self {
        Self {
            default_size,
            min_size,
            percentage_sizing: false,
            sizes: HashMap::new(),
            percentages: HashMap::new(),
            pixel_overrides: HashSet::new(),
            available: 0,
        }
    }

    fn pixel_size(&self, index: usize) -> u32 {
        self.sizes
            .get(&index)
            .copied()
            .unwrap_or(self.default_size)
            .max(self.min_size)
    }

    /// Resolves every entry's pixel size.
    ///
    /// In percentage mode, pinned entries are charged against the available
    /// space first; explicit percentages and an equal split of the remaining
    /// share for unspecified entries are then scaled over the rest. Each
    /// share is floored and the remainder goes to the last participant, so
    /// the total never drifts from the budget.
    fn resolve(&self, count: usize) -> Vec<u32> {
        if !self.percentage_sizing {
            return (0..count).map(|i| self.pixel_size(i)).collect();
        }

        let mut resolved = vec![0u32; count];
        let mut fixed_total = 0u32;
        let mut participants = Vec::new();
        for index in 0..count {
            if self.pixel_overrides.contains(&index) {
                let size = self.pixel_size(index);
                resolved[index] = size;
                fixed_total += size;
            } else {
                participants.push(index);
            }
        }
        if participants.is_empty() {
            return resolved;
        }

        let budget = f64::from(self.available.saturating_sub(fixed_total));
        if budget <= 0.0 {
            return resolved;
        }

        let explicit_sum: f64 = participants
            .iter()
            .filter_map(|i| self.percentages.get(i))
            .sum();
        let unspecified = participants
            .iter()
            .filter(|i| !self.percentages.contains_key(*i))
            .count();
        let fill_share = if unspecified == 0 {
            0.0
        } else {
            ((100.0 - explicit_sum) / unspecified as f64).max(0.0)
        };
        let share_of =
            |index: &usize| self.percentages.get(index).copied().unwrap_or(fill_share);

        let total: f64 = participants.iter().map(share_of).sum();
        if total <= 0.0 {
            return resolved;
        }
        // Shares are relative to 100; an over-subscribed axis is scaled down
        // proportionally, an under-subscribed one leaves space unallocated.
        let denominator = total.max(100.0);

        let mut allocated = 0u32;
        for index in &participants {
            let share = (budget * share_of(index) / denominator).floor() as u32;
            resolved[*index] = share;
            allocated += share;
        }
        if total >= 100.0 {
            if let Some(&last) = participants.last() {
                resolved[last] += budget as u32 - allocated;
            }
        }
        resolved
    }

    /// Applies a pixel resize, converting to a percentage when the axis is in
    /// percentage mode and the entry is not pinned.
    fn set_size(&mut self, index: usize, size: u32, count: usize) {
        let size = size.max(self.min_size);
        if self.percentage_sizing && !self.pixel_overrides.contains(&index) {
            let resolved = self.resolve(count);
            let fixed_total: u32 = self
                .pixel_overrides
                .iter()
                .filter(|&&i| i < count)
                .map(|&i| resolved[i])
                .sum();
            let budget = f64::from(self.available.saturating_sub(fixed_total));
            if budget > 0.0 {
                self.percentages
                    .insert(index, f64::from(size) * 100.0 / budget);
            }
        } else {
            self.sizes.insert(index, size);
        }
    }

    fn reset(&mut self) {
        self.sizes.clear();
        self.percentages.clear();
    }

    /// Shifts per-index state up for an insertion of `count` entries at `at`.
    fn shift_on_insert(&mut self, at: usize, count: usize) {
        let remap = |i: usize| Some(if i >= at { i + count } else { i });
        self.sizes = shift_keys(&self.sizes, remap);
        self.percentages = shift_keys(&self.percentages, remap);
        self.pixel_overrides = self
            .pixel_overrides
            .iter()
            .map(|&i| if i >= at { i + count } else { i })
            .collect();
    }

    /// Drops per-index state for deleted entries and shifts the rest down.
    fn shift_on_delete(&mut self, range: Range) {
        let remap = |i: usize| {
            if range.contains(i) {
                None
            } else if i >= range.end {
                Some(i - range.len())
            } else {
                Some(i)
            }
        };
        self.sizes = shift_keys(&self.sizes, remap);
        self.percentages = shift_keys(&self.percentages, remap);
        self.pixel_overrides = self
            .pixel_overrides
            .iter()
            .filter_map(|&i| remap(i))
            .collect();
    }
}

fn shift_keys<V: Copy, F>(map: &HashMap<usize, V>, remap: F) -> HashMap<usize, V>
where
    F: Fn(usize) -> Option<usize>,
{
    map.iter()
        .filter_map(|(&k, &v)| remap(k).map(|k| (k, v)))
        .collect()
}

/// The leaf layer owning sizing state and delegating values to the external
/// data accessor.
pub struct DataLayer {
    core: LayerCore,
    provider: Arc<dyn DataProvider>,
    column_track: RwLock<SizeTrack>,
    row_track: RwLock<SizeTrack>,
    resolved_columns: RwLock<Option<Vec<u32>>>,
    resolved_rows: RwLock<Option<Vec<u32>>>,
}

impl DataLayer {
    /// Creates a data layer over a provider with sizing defaults from the
    /// configuration.
    pub fn new(provider: Arc<dyn DataProvider>, config: &GridConfig) -> Self {
        Self {
            core: LayerCore::new(),
            provider,
            column_track: RwLock::new(SizeTrack::new(
                config.default_column_width,
                config.min_column_width,
            )),
            row_track: RwLock::new(SizeTrack::new(
                config.default_row_height,
                config.min_row_height,
            )),
            resolved_columns: RwLock::new(None),
            resolved_rows: RwLock::new(None),
        }
    }

    /// The provider backing this layer.
    pub fn provider(&self) -> &Arc<dyn DataProvider> {
        &self.provider
    }

    fn track(&self, axis: Axis) -> &RwLock<SizeTrack> {
        match axis {
            Axis::Column => &self.column_track,
            Axis::Row => &self.row_track,
        }
    }

    fn cache(&self, axis: Axis) -> &RwLock<Option<Vec<u32>>> {
        match axis {
            Axis::Column => &self.resolved_columns,
            Axis::Row => &self.resolved_rows,
        }
    }

    fn invalidate(&self, axis: Axis) {
        *self.cache(axis).write() = None;
    }

    fn resolved_size(&self, axis: Axis, index: usize) -> Option<u32> {
        let count = self.count(axis);
        if index >= count {
            return None;
        }
        let mut cache = self.cache(axis).write();
        if cache.as_ref().is_none_or(|sizes| sizes.len() != count) {
            *cache = Some(self.track(axis).read().resolve(count));
        }
        cache.as_ref().and_then(|sizes| sizes.get(index)).copied()
    }

    /// Switches an axis between pixel and percentage sizing.
    pub fn set_percentage_sizing(&self, axis: Axis, enabled: bool) {
        self.track(axis).write().percentage_sizing = enabled;
        self.invalidate(axis);
    }

    /// Whether an axis is sized by percentages.
    pub fn percentage_sizing(&self, axis: Axis) -> bool {
        self.track(axis).read().percentage_sizing
    }

    /// Pins one entry to pixel sizing even while the axis is in percentage
    /// mode.
    pub fn set_fixed_pixel(&self, axis: Axis, index: usize, fixed: bool) {
        let mut track = self.track(axis).write();
        if fixed {
            track.pixel_overrides.insert(index);
        } else {
            track.pixel_overrides.remove(&index);
        }
        drop(track);
        self.invalidate(axis);
    }

    /// Resizes one entry and fires a resize event.
    pub fn set_size(&self, axis: Axis, position: usize, size: u32) {
        if position >= self.count(axis) {
            return;
        }
        let count = self.count(axis);
        self.track(axis).write().set_size(position, size, count);
        self.invalidate(axis);
        self.core.fire(StructuralEvent::PositionsResized {
            axis,
            ranges: vec![Range::single(position)],
        });
    }

    /// Sets one entry's explicit percentage share and fires a resize event
    /// covering the axis, since every participant's share may move.
    pub fn set_percentage(&self, axis: Axis, index: usize, percentage: f64) {
        self.track(axis).write().percentages.insert(index, percentage);
        self.invalidate(axis);
        self.core.fire(StructuralEvent::PositionsResized {
            axis,
            ranges: vec![Range::new(0, self.count(axis))],
        });
    }

    /// Restores default sizing on an axis.
    ///
    /// The refresh event can be suppressed for batched reconfiguration.
    pub fn reset_sizing(&self, axis: Axis, fire_event: bool) {
        self.track(axis).write().reset();
        self.invalidate(axis);
        if fire_event {
            self.core.fire(StructuralEvent::PositionsResized {
                axis,
                ranges: vec![Range::new(0, self.count(axis))],
            });
        }
    }

    /// The client space percentages resolve against.
    pub fn set_available_space(&self, axis: Axis, px: u32) {
        self.track(axis).write().available = px;
        self.invalidate(axis);
    }

    /// Announces that the provider grew by `count` entries at `at`.
    ///
    /// Call after the provider reflects the insertion; per-index sizing state
    /// shifts with the data and an insert event propagates up the stack.
    pub fn announce_inserted(&self, axis: Axis, at: usize, count: usize) {
        self.track(axis).write().shift_on_insert(at, count);
        self.invalidate(axis);
        self.core.fire(StructuralEvent::PositionsInserted {
            axis,
            ranges: vec![Range::new(at, at + count)],
        });
    }

    /// Announces that the provider lost the entries in `range`.
    pub fn announce_deleted(&self, axis: Axis, range: Range) {
        self.track(axis).write().shift_on_delete(range);
        self.invalidate(axis);
        self.core.fire(StructuralEvent::PositionsDeleted {
            axis,
            ranges: vec![range],
        });
    }
}

impl Layer for DataLayer {
    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn underlying(&self) -> Option<&dyn Layer> {
        None
    }

    fn count(&self, axis: Axis) -> usize {
        match axis {
            Axis::Column => self.provider.column_count(),
            Axis::Row => self.provider.row_count(),
        }
    }

    fn underlying_position(&self, axis: Axis, position: usize) -> Option<usize> {
        (position < self.count(axis)).then_some(position)
    }

    fn position_of_underlying(&self, axis: Axis, underlying: usize) -> Option<usize> {
        (underlying < self.count(axis)).then_some(underlying)
    }

    fn extent(&self, axis: Axis, position: usize) -> Option<u32> {
        self.resolved_size(axis, position)
    }

    fn value(&self, column: usize, row: usize) -> CellValue {
        if column >= self.count(Axis::Column) || row >= self.count(Axis::Row) {
            return CellValue::None;
        }
        self.provider.value(column, row)
    }

    fn set_value(&self, column: usize, row: usize, value: CellValue) -> bool {
        if column >= self.count(Axis::Column) || row >= self.count(Axis::Row) {
            return false;
        }
        self.provider.set_value(column, row, value)
    }

    fn handle_command(&self, command: &GridCommand) -> bool {
        match command {
            GridCommand::ResizePosition {
                axis,
                position,
                size,
            } => {
                self.set_size(*axis, *position, *size);
                true
            }
            GridCommand::MultiResize {
                axis,
                positions,
                size,
            } => {
                let count = self.count(*axis);
                let valid: Vec<usize> =
                    positions.iter().copied().filter(|&p| p < count).collect();
                if !valid.is_empty() {
                    let mut track = self.track(*axis).write();
                    for &position in &valid {
                        track.set_size(position, *size, count);
                    }
                    drop(track);
                    self.invalidate(*axis);
                    self.core.fire(StructuralEvent::PositionsResized {
                        axis: *axis,
                        ranges: Range::coalesce(&valid),
                    });
                }
                true
            }
            GridCommand::ResetSizing { axis, fire_event } => {
                self.reset_sizing(*axis, *fire_event);
                true
            }
            GridCommand::ClientAreaResize { width, height } => {
                self.set_available_space(Axis::Column, *width);
                self.set_available_space(Axis::Row, *height);
                true
            }
            GridCommand::UpdateData { column, row, value } => {
                if self.set_value(*column, *row, value.clone()) {
                    self.core.fire(StructuralEvent::CellRefresh {
                        column: *column,
                        row: *row,
                    });
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn provider(columns: usize, rows: usize) -> Arc<VecDataProvider> {
        let data = (0..rows)
            .map(|r| {
                (0..columns)
                    .map(|c| CellValue::from((r * columns + c) as i64))
                    .collect()
            })
            .collect();
        Arc::new(VecDataProvider::new(data))
    }

    fn layer(columns: usize, rows: usize) -> DataLayer {
        DataLayer::new(provider(columns, rows), &GridConfig::default())
    }

    fn captured_events(layer: &DataLayer) -> Arc<Mutex<Vec<StructuralEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        layer.events().connect(move |event: &StructuralEvent| {
            sink.lock().push(event.clone());
        });
        events
    }

    #[test]
    fn test_counts_and_values_come_from_provider() {
        let layer = layer(3, 2);
        assert_eq!(layer.count(Axis::Column), 3);
        assert_eq!(layer.count(Axis::Row), 2);
        assert_eq!(layer.value(2, 1), CellValue::from(5i64));
        assert_eq!(layer.value(3, 0), CellValue::None);
    }

    #[test]
    fn test_position_equals_index_at_leaf() {
        let layer = layer(3, 2);
        assert_eq!(layer.index_of(Axis::Column, 2), Some(2));
        assert_eq!(layer.position_of(Axis::Column, 2), Some(2));
        assert_eq!(layer.index_of(Axis::Column, 3), None);
    }

    #[test]
    fn test_default_and_min_sizes() {
        let layer = layer(3, 2);
        assert_eq!(layer.extent(Axis::Column, 0), Some(100));
        assert_eq!(layer.extent(Axis::Row, 0), Some(20));

        layer.set_size(Axis::Column, 1, 2); // clamped to min
        assert_eq!(layer.extent(Axis::Column, 1), Some(5));
    }

    #[test]
    fn test_resize_fires_event() {
        let layer = layer(3, 2);
        let events = captured_events(&layer);

        layer.set_size(Axis::Column, 1, 60);
        assert_eq!(
            *events.lock(),
            vec![StructuralEvent::PositionsResized {
                axis: Axis::Column,
                ranges: vec![Range::single(1)],
            }]
        );
        assert_eq!(layer.extent(Axis::Column, 1), Some(60));
    }

    #[test]
    fn test_reset_sizing_event_can_be_suppressed() {
        let layer = layer(3, 2);
        layer.set_size(Axis::Column, 0, 60);

        let events = captured_events(&layer);
        layer.reset_sizing(Axis::Column, false);
        assert!(events.lock().is_empty());
        assert_eq!(layer.extent(Axis::Column, 0), Some(100));

        layer.set_size(Axis::Column, 0, 60);
        events.lock().clear();
        layer.reset_sizing(Axis::Column, true);
        assert_eq!(events.lock().len(), 1);
    }

    #[test]
    fn test_percentage_sizing_resolves_against_client_area() {
        let layer = layer(3, 2);
        layer.set_percentage_sizing(Axis::Column, true);
        layer.set_available_space(Axis::Column, 600);
        layer.set_percentage(Axis::Column, 0, 25.0);
        layer.set_percentage(Axis::Column, 1, 25.0);
        layer.set_percentage(Axis::Column, 2, 50.0);

        assert_eq!(layer.extent(Axis::Column, 0), Some(150));
        assert_eq!(layer.extent(Axis::Column, 1), Some(150));
        assert_eq!(layer.extent(Axis::Column, 2), Some(300));
        assert_eq!(layer.total_extent(Axis::Column), 600);
    }

    #[test]
    fn test_percentage_resize_scenario() {
        // 25/25/50 over 600px, resized to 50/25/25, must yield 300/150/150.
        let layer = layer(3, 2);
        layer.set_percentage_sizing(Axis::Column, true);
        layer.set_available_space(Axis::Column, 600);
        layer.set_percentage(Axis::Column, 0, 25.0);
        layer.set_percentage(Axis::Column, 1, 25.0);
        layer.set_percentage(Axis::Column, 2, 50.0);

        layer.set_percentage(Axis::Column, 0, 50.0);
        layer.set_percentage(Axis::Column, 2, 25.0);

        assert_eq!(layer.extent(Axis::Column, 0), Some(300));
        assert_eq!(layer.extent(Axis::Column, 1), Some(150));
        assert_eq!(layer.extent(Axis::Column, 2), Some(150));
    }

    #[test]
    fn test_percentage_rounding_remainder_goes_to_last() {
        let layer = layer(3, 2);
        layer.set_percentage_sizing(Axis::Column, true);
        layer.set_available_space(Axis::Column, 100);
        // No explicit percentages: three equal participants.
        assert_eq!(layer.extent(Axis::Column, 0), Some(33));
        assert_eq!(layer.extent(Axis::Column, 1), Some(33));
        assert_eq!(layer.extent(Axis::Column, 2), Some(34));
        assert_eq!(layer.total_extent(Axis::Column), 100);
    }

    #[test]
    fn test_oversubscribed_percentages_scale_down() {
        let layer = layer(2, 2);
        layer.set_percentage_sizing(Axis::Column, true);
        layer.set_available_space(Axis::Column, 300);
        layer.set_percentage(Axis::Column, 0, 100.0);
        layer.set_percentage(Axis::Column, 1, 50.0);

        assert_eq!(layer.extent(Axis::Column, 0), Some(200));
        assert_eq!(layer.extent(Axis::Column, 1), Some(100));
        assert_eq!(layer.total_extent(Axis::Column), 300);
    }

    #[test]
    fn test_pixel_override_excluded_from_percentage_budget() {
        let layer = layer(3, 2);
        layer.set_percentage_sizing(Axis::Column, true);
        layer.set_available_space(Axis::Column, 600);
        layer.set_fixed_pixel(Axis::Column, 0, true);
        layer.set_size(Axis::Column, 0, 100);
        layer.set_percentage(Axis::Column, 1, 50.0);
        layer.set_percentage(Axis::Column, 2, 50.0);

        assert_eq!(layer.extent(Axis::Column, 0), Some(100));
        assert_eq!(layer.extent(Axis::Column, 1), Some(250));
        assert_eq!(layer.extent(Axis::Column, 2), Some(250));
        assert_eq!(layer.total_extent(Axis::Column), 600);
    }

    #[test]
    fn test_resize_command_routes_to_sizing() {
        let layer = layer(3, 2);
        assert!(layer.do_command(&GridCommand::ResizePosition {
            axis: Axis::Row,
            position: 1,
            size: 44,
        }));
        assert_eq!(layer.extent(Axis::Row, 1), Some(44));

        assert!(layer.do_command(&GridCommand::MultiResize {
            axis: Axis::Column,
            positions: vec![0, 2],
            size: 70,
        }));
        assert_eq!(layer.extent(Axis::Column, 0), Some(70));
        assert_eq!(layer.extent(Axis::Column, 1), Some(100));
        assert_eq!(layer.extent(Axis::Column, 2), Some(70));
    }

    #[test]
    fn test_update_data_command_writes_through_and_refreshes() {
        let layer = layer(3, 2);
        let events = captured_events(&layer);

        assert!(layer.do_command(&GridCommand::UpdateData {
            column: 1,
            row: 1,
            value: CellValue::from("edited"),
        }));
        assert_eq!(layer.value(1, 1), CellValue::from("edited"));
        assert_eq!(
            *events.lock(),
            vec![StructuralEvent::CellRefresh { column: 1, row: 1 }]
        );

        // Out of range writes are rejected, not panics.
        assert!(!layer.do_command(&GridCommand::UpdateData {
            column: 9,
            row: 0,
            value: CellValue::from(1i64),
        }));
    }

    #[test]
    fn test_insert_shifts_sizing_state() {
        let source = provider(2, 4);
        let layer = DataLayer::new(source.clone(), &GridConfig::default());
        layer.set_size(Axis::Row, 2, 60);

        let events = captured_events(&layer);
        source.insert_rows(1, vec![vec![CellValue::None; 2]; 2]);
        layer.announce_inserted(Axis::Row, 1, 2);

        // Old index 2 is now index 4.
        assert_eq!(layer.count(Axis::Row), 6);
        assert_eq!(layer.extent(Axis::Row, 4), Some(60));
        assert_eq!(layer.extent(Axis::Row, 2), Some(20));
        assert_eq!(
            *events.lock(),
            vec![StructuralEvent::PositionsInserted {
                axis: Axis::Row,
                ranges: vec![Range::new(1, 3)],
            }]
        );
    }

    #[test]
    fn test_delete_drops_and_shifts_sizing_state() {
        let source = provider(2, 4);
        let layer = DataLayer::new(source.clone(), &GridConfig::default());
        layer.set_size(Axis::Row, 1, 50);
        layer.set_size(Axis::Row, 3, 60);

        source.remove_rows(Range::new(1, 2));
        layer.announce_deleted(Axis::Row, Range::new(1, 2));

        // Index 1's size died with it; index 3 is now index 2.
        assert_eq!(layer.count(Axis::Row), 3);
        assert_eq!(layer.extent(Axis::Row, 1), Some(20));
        assert_eq!(layer.extent(Axis::Row, 2), Some(60));
    }
}
