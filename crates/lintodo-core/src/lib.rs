//! lintodo-core library.
//!
//! Freezes existing lint violations as decaying todos. A run takes the
//! analyzer's [`model::FileReport`]s, reconciles them against the
//! `.lint-todo` store and returns the reports with suppressed violations
//! projected to `todo`, `warn` or `error` by age.

pub mod cleanup;
pub mod config;
pub mod decay;
pub mod error;
pub mod fingerprint;
pub mod lock;
pub mod model;
pub mod pipeline;
pub mod project;
pub mod reconcile;
pub mod report;
pub mod store;
pub mod todo;

/// # Conventions
///
/// - **Errors**: module-level `thiserror` enums, each mapped to an
///   [`error::ErrorCode`].
/// - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`).
pub use pipeline::{RunError, RunOptions, RunOutcome, TodoInfo, run};
