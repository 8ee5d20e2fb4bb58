//! UI-thread marshaling queue.
//!
//! Trellis layer state is owned by the UI thread; there is no internal
//! locking discipline for concurrent mutation because there is no concurrent
//! mutation path. The one sanctioned exception is a computation that runs on
//! a worker thread (for example a summary aggregation) whose result must be
//! applied to layer state. Such results are posted to a [`UiQueue`] and the
//! host drains the queue from its event loop, which executes the posted
//! closures on the UI thread in submission order.
//!
//! Results can go stale while they are in flight: if the data a computation
//! read has changed by the time the result is applied, the result must be
//! discarded rather than applied. [`Generation`] provides the version stamp
//! for that check.
//!
//! # Example
//!
//! ```
//! use trellis_core::{Generation, UiQueue};
//!
//! let queue = UiQueue::new();
//! let generation = Generation::new();
//!
//! let stamp = generation.current();
//! let gen_clone = generation.clone();
//! queue.post(move || {
//!     if gen_clone.is_current(stamp) {
//!         // apply the computed value
//!     }
//! });
//!
//! assert_eq!(queue.drain(), 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::logging::targets;
use crate::thread_affinity::ThreadAffinity;

type Job = Box<dyn FnOnce() + Send>;

/// An unbounded queue of closures to run on the UI thread.
///
/// Construct the queue on the UI thread: cloning it clones the channel
/// handles and any clone may post from any thread, but
/// [`drain`](Self::drain) asserts (in debug builds) that it runs on the
/// constructing thread.
#[derive(Clone)]
pub struct UiQueue {
    sender: Sender<Job>,
    receiver: Receiver<Job>,
    affinity: ThreadAffinity,
}

impl Default for UiQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl UiQueue {
    /// Create an empty queue, bound to the calling (UI) thread.
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            affinity: ThreadAffinity::current(),
        }
    }

    /// Post a closure for later execution on the UI thread.
    ///
    /// May be called from any thread.
    pub fn post<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        // The receiver half lives as long as self, so send cannot fail.
        let _ = self.sender.send(Box::new(job));
    }

    /// Execute all currently pending closures, in submission order.
    ///
    /// Returns the number of closures executed. Closures posted while
    /// draining are executed in the same drain.
    pub fn drain(&self) -> usize {
        self.affinity.debug_check();
        let mut executed = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job();
            executed += 1;
        }
        if executed > 0 {
            tracing::trace!(target: targets::QUEUE, executed, "drained ui queue");
        }
        executed
    }

    /// Number of closures waiting to be drained.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

/// A monotonic version stamp for discarding stale asynchronous results.
///
/// A producer captures [`current`](Self::current) before reading the data it
/// computes over; the consumer checks [`is_current`](Self::is_current) before
/// applying the result. Any mutation of the underlying data calls
/// [`bump`](Self::bump), invalidating every in-flight stamp.
#[derive(Clone, Default)]
pub struct Generation {
    counter: Arc<AtomicU64>,
}

impl Generation {
    /// Create a new generation counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current stamp.
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    /// Invalidate all stamps taken so far.
    pub fn bump(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Whether `stamp` is still the current generation.
    pub fn is_current(&self, stamp: u64) -> bool {
        self.current() == stamp
    }
}

impl std::fmt::Debug for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Generation").field(&self.current()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_post_and_drain_in_order() {
        let queue = UiQueue::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let o = order.clone();
            queue.post(move || o.lock().push(i));
        }

        assert_eq!(queue.pending(), 3);
        assert_eq!(queue.drain(), 3);
        assert_eq!(*order.lock(), vec![0, 1, 2]);
        assert_eq!(queue.drain(), 0);
    }

    #[test]
    fn test_post_from_worker_thread() {
        let queue = UiQueue::new();
        let hit = Arc::new(AtomicU64::new(0));

        let q = queue.clone();
        let h = hit.clone();
        let handle = std::thread::spawn(move || {
            q.post(move || {
                h.fetch_add(1, Ordering::SeqCst);
            });
        });
        handle.join().unwrap();

        assert_eq!(queue.drain(), 1);
        assert_eq!(hit.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_generation_staleness() {
        let generation = Generation::new();
        let stamp = generation.current();
        assert!(generation.is_current(stamp));

        generation.bump();
        assert!(!generation.is_current(stamp));
        assert!(generation.is_current(generation.current()));
    }

    #[test]
    fn test_stale_result_discarded() {
        let queue = UiQueue::new();
        let generation = Generation::new();
        let applied = Arc::new(AtomicU64::new(0));

        let stamp = generation.current();
        let g = generation.clone();
        let a = applied.clone();
        queue.post(move || {
            if g.is_current(stamp) {
                a.fetch_add(1, Ordering::SeqCst);
            }
        });

        // Data changed while the result was in flight.
        generation.bump();
        queue.drain();
        assert_eq!(applied.load(Ordering::SeqCst), 0);
    }
}
