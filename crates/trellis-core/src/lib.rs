//! Core systems for Trellis.
//!
//! This crate carries the plumbing the grid layers are built on, kept free of
//! any grid-specific types:
//!
//! - [`Signal`] / [`SubscriptionGuard`]: the synchronous observer mechanism
//!   used as the event bus between layers, with RAII subscription cleanup.
//! - [`UiQueue`] / [`Generation`]: marshaling of worker-thread results onto
//!   the UI thread, with stale-result detection.
//! - [`ThreadAffinity`]: debug assertions that state is touched from the
//!   owning thread only.
//! - [`logging`]: `tracing` target constants for filterable instrumentation.
//!
//! # Threading model
//!
//! Trellis is single-threaded and cooperative: all command dispatch, event
//! propagation and layer mutation happen on the host toolkit's UI thread.
//! Worker threads only ever hand results back through a [`UiQueue`].

pub mod logging;
mod queue;
mod signal;
mod thread_affinity;

pub use queue::{Generation, UiQueue};
pub use signal::{ConnectionId, Signal, SubscriptionGuard};
pub use thread_affinity::ThreadAffinity;
