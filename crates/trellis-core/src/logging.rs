//! Logging facilities for Trellis.
//!
//! Trellis uses the `tracing` crate for instrumentation. To see logs, install
//! a tracing subscriber in the host application:
//!
//! ```ignore
//! tracing_subscriber::fmt::init();
//! ```
//!
//! The constants in [`targets`] can be used with `tracing` filter directives
//! to enable logs for a specific subsystem, e.g.
//! `RUST_LOG=trellis::command=trace`.

/// Target names for log filtering.
pub mod targets {
    /// Core plumbing target.
    pub const CORE: &str = "trellis_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "trellis_core::signal";
    /// UI-thread queue target.
    pub const QUEUE: &str = "trellis_core::queue";
    /// Command dispatch target.
    pub const COMMAND: &str = "trellis::command";
    /// Structural event propagation target.
    pub const EVENT: &str = "trellis::event";
    /// Layer lifecycle target.
    pub const LAYER: &str = "trellis::layer";
    /// Grouping operations target.
    pub const GROUP: &str = "trellis::group";
    /// Tree operations target.
    pub const TREE: &str = "trellis::tree";
    /// Viewport/scrolling target.
    pub const VIEWPORT: &str = "trellis::viewport";
    /// Summary computation target.
    pub const SUMMARY: &str = "trellis::summary";
}
