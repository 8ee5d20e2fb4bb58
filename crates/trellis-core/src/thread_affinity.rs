//! Thread affinity checks.
//!
//! Layer state must only be mutated from the UI thread. [`ThreadAffinity`]
//! records the owning thread at construction time and offers a debug-level
//! assertion for mutation paths plus an always-on check for critical
//! operations.
//!
//! ```
//! use trellis_core::ThreadAffinity;
//!
//! struct Model {
//!     affinity: ThreadAffinity,
//! }
//!
//! impl Model {
//!     fn mutate(&mut self) {
//!         self.affinity.debug_check();
//!         // ... mutate state ...
//!     }
//! }
//! # let mut m = Model { affinity: ThreadAffinity::current() };
//! # m.mutate();
//! ```

use std::thread::{self, ThreadId};

/// Records the thread an object belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadAffinity {
    owner: ThreadId,
}

impl ThreadAffinity {
    /// Bind to the calling thread.
    pub fn current() -> Self {
        Self {
            owner: thread::current().id(),
        }
    }

    /// Whether the calling thread is the owning thread.
    pub fn is_owner(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Panic if called from a foreign thread. Debug builds only.
    #[track_caller]
    pub fn debug_check(&self) {
        debug_assert!(
            self.is_owner(),
            "accessed from a thread other than the owning (UI) thread"
        );
    }

    /// Panic if called from a foreign thread, in all build profiles.
    #[track_caller]
    pub fn check(&self) {
        assert!(
            self.is_owner(),
            "accessed from a thread other than the owning (UI) thread"
        );
    }
}
