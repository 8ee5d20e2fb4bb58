//! Summary row layer.
//!
//! Appends one row after the underlying rows whose cells aggregate their
//! column's values through a per-column [`SummaryFunction`]. Aggregation can
//! be expensive, so it runs through an [`Executor`] off the UI thread; until
//! the result arrives, reads return [`CellValue::Pending`] instead of
//! blocking, and a cell refresh event is fired once the value resolves on the
//! UI thread.
//!
//! Results are stamped with a generation taken before the computation reads
//! its inputs. Any structural or data change beneath this layer bumps the
//! generation, so a result that raced with a mutation is discarded instead of
//! applied; the next read schedules a fresh computation.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use trellis_core::logging::targets;
use trellis_core::{Generation, UiQueue};

use crate::cell::CellValue;
use crate::coords::Axis;
use crate::event::StructuralEvent;
use crate::layer::{forward_event, Layer, LayerCore};

/// Aggregates a column's values into one summary value.
pub trait SummaryFunction: Send + Sync {
    /// Computes the summary over the column's values, top to bottom.
    fn summarize(&self, values: &[CellValue]) -> CellValue;
}

impl<F> SummaryFunction for F
where
    F: Fn(&[CellValue]) -> CellValue + Send + Sync,
{
    fn summarize(&self, values: &[CellValue]) -> CellValue {
        self(values)
    }
}

/// Sums numeric values, ignoring everything non-numeric.
pub struct SumFunction;

impl SummaryFunction for SumFunction {
    fn summarize(&self, values: &[CellValue]) -> CellValue {
        let mut sum = 0.0;
        let mut numeric = false;
        for value in values {
            if let Some(v) = value.as_float() {
                sum += v;
                numeric = true;
            }
        }
        if numeric {
            CellValue::Float(sum)
        } else {
            CellValue::None
        }
    }
}

/// Runs summary computations.
///
/// Production code uses [`ThreadExecutor`]; tests and headless hosts can use
/// [`InlineExecutor`] for deterministic, same-thread execution. Either way
/// results travel back through the [`UiQueue`].
pub trait Executor: Send + Sync {
    /// Runs a job, possibly on another thread.
    fn execute(&self, job: Box<dyn FnOnce() + Send>);
}

/// Spawns each job on its own worker thread.
pub struct ThreadExecutor;

impl Executor for ThreadExecutor {
    fn execute(&self, job: Box<dyn FnOnce() + Send>) {
        std::thread::spawn(job);
    }
}

/// Runs each job immediately on the calling thread.
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, job: Box<dyn FnOnce() + Send>) {
        job();
    }
}

/// The layer appending an aggregated summary row.
pub struct SummaryRowLayer<U> {
    core: LayerCore,
    underlying: Arc<U>,
    /// Summary functions keyed by column index.
    functions: RwLock<HashMap<usize, Arc<dyn SummaryFunction>>>,
    /// Resolved values keyed by column index, with their generation stamp.
    cache: RwLock<HashMap<usize, (u64, CellValue)>>,
    /// Columns with a computation in flight, to avoid duplicate scheduling.
    in_flight: Mutex<HashSet<usize>>,
    generation: Generation,
    queue: UiQueue,
    executor: Arc<dyn Executor>,
    row_extent: u32,
    /// Needed by the apply closure to reach back into the layer.
    this: RwLock<Weak<Self>>,
}

impl<U: Layer + 'static> SummaryRowLayer<U> {
    /// Creates a summary row over `underlying`.
    ///
    /// `queue` must be drained by the host's UI loop; `row_extent` is the
    /// summary row's pixel height.
    pub fn new(
        underlying: Arc<U>,
        executor: Arc<dyn Executor>,
        queue: UiQueue,
        row_extent: u32,
    ) -> Arc<Self> {
        let layer = Arc::new(Self {
            core: LayerCore::new(),
            underlying,
            functions: RwLock::new(HashMap::new()),
            cache: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashSet::new()),
            generation: Generation::new(),
            queue,
            executor,
            row_extent,
            this: RwLock::new(Weak::new()),
        });
        *layer.this.write() = Arc::downgrade(&layer);

        let weak = Arc::downgrade(&layer);
        let guard = layer.underlying.events().connect_scoped(move |event| {
            if let Some(layer) = weak.upgrade() {
                layer.on_underlying_event(event);
            }
        });
        layer.core.retain_guard(guard);
        layer
    }

    /// Installs the summary function for a column index.
    pub fn set_function(&self, column_index: usize, function: Arc<dyn SummaryFunction>) {
        self.functions.write().insert(column_index, function);
        self.cache.write().remove(&column_index);
    }

    /// The summary row's position.
    pub fn summary_row(&self) -> usize {
        self.underlying.count(Axis::Row)
    }

    /// The summary value for a column position: the cached result, or
    /// `Pending` with a computation scheduled, or `None` when the column has
    /// no summary function.
    fn summary_value(&self, column: usize) -> CellValue {
        let Some(index) = self.underlying.index_of(Axis::Column, column) else {
            return CellValue::None;
        };
        if let Some((stamp, value)) = self.cache.read().get(&index) {
            if self.generation.is_current(*stamp) {
                return value.clone();
            }
        }
        let Some(function) = self.functions.read().get(&index).cloned() else {
            return CellValue::None;
        };
        self.schedule(index, column, function);
        CellValue::Pending
    }

    /// Dispatches the aggregation for one column to the executor.
    fn schedule(&self, index: usize, column: usize, function: Arc<dyn SummaryFunction>) {
        if !self.in_flight.lock().insert(index) {
            return;
        }
        // Inputs are gathered synchronously on the UI thread; only the
        // aggregation itself leaves it.
        let row_count = self.underlying.count(Axis::Row);
        let values: Vec<CellValue> = (0..row_count)
            .map(|row| self.underlying.value(column, row))
            .collect();
        let stamp = self.generation.current();
        let generation = self.generation.clone();
        let queue = self.queue.clone();
        let weak = self.this.read().clone();

        tracing::trace!(target: targets::SUMMARY, index, stamp, "scheduling summary");
        self.executor.execute(Box::new(move || {
            let result = function.summarize(&values);
            queue.post(move || {
                let Some(layer) = weak.upgrade() else {
                    return;
                };
                layer.in_flight.lock().remove(&index);
                if !generation.is_current(stamp) {
                    // The inputs changed while we were computing.
                    tracing::trace!(target: targets::SUMMARY, index, stamp, "discarding stale summary");
                    return;
                }
                layer.cache.write().insert(index, (stamp, result));
                if let Some(column) = layer.position_of(Axis::Column, index) {
                    let row = layer.summary_row();
                    layer
                        .core
                        .fire(StructuralEvent::CellRefresh { column, row });
                }
            });
        }));
    }

    fn on_underlying_event(&self, event: &StructuralEvent) {
        // Row mutations and cell edits change the aggregation inputs; any
        // in-flight result for the old data must not be applied.
        let invalidates = matches!(
            event,
            StructuralEvent::CellRefresh { .. }
                | StructuralEvent::PositionsHidden { axis: Axis::Row, .. }
                | StructuralEvent::PositionsShown { axis: Axis::Row, .. }
                | StructuralEvent::PositionsInserted { axis: Axis::Row, .. }
                | StructuralEvent::PositionsDeleted { axis: Axis::Row, .. }
                | StructuralEvent::PositionsReordered { axis: Axis::Row, .. }
        );
        if invalidates {
            self.generation.bump();
            self.cache.write().clear();
        }
        forward_event(self, event);
    }
}

impl<U: Layer + 'static> Layer for SummaryRowLayer<U> {
    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn underlying(&self) -> Option<&dyn Layer> {
        Some(self.underlying.as_ref())
    }

    fn count(&self, axis: Axis) -> usize {
        match axis {
            Axis::Column => self.underlying.count(axis),
            Axis::Row => self.underlying.count(axis) + 1,
        }
    }

    fn underlying_position(&self, axis: Axis, position: usize) -> Option<usize> {
        let count = self.underlying.count(axis);
        match axis {
            Axis::Column => (position < count).then_some(position),
            // The summary row itself has no underlying row.
            Axis::Row => (position < count).then_some(position),
        }
    }

    fn position_of_underlying(&self, axis: Axis, underlying: usize) -> Option<usize> {
        (underlying < self.underlying.count(axis)).then_some(underlying)
    }

    fn extent(&self, axis: Axis, position: usize) -> Option<u32> {
        if axis == Axis::Row && position == self.summary_row() {
            return Some(self.row_extent);
        }
        let underlying_position = self.underlying_position(axis, position)?;
        self.underlying.extent(axis, underlying_position)
    }

    fn value(&self, column: usize, row: usize) -> CellValue {
        if row == self.summary_row() {
            return self.summary_value(column);
        }
        if column >= self.count(Axis::Column) || row >= self.underlying.count(Axis::Row) {
            return CellValue::None;
        }
        self.underlying.value(column, row)
    }

    fn set_value(&self, column: usize, row: usize, value: CellValue) -> bool {
        if row >= self.underlying.count(Axis::Row) {
            // The summary row is computed, never written.
            return false;
        }
        self.underlying.set_value(column, row, value)
    }
}
