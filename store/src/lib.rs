//! Persisted state for DASHMET notification sync.
//!
//! Two stores, one per execution context:
//!
//! - [`CacheStore`] - the worker context's versioned cache of response
//!   bodies plus its sync checkpoint. Invalidated wholesale by a version
//!   bump, never per entry.
//! - [`LocalStore`] - the page context's JSON settings file holding its own
//!   independent sync checkpoint and user preferences.
//!
//! The two checkpoints are intentionally not unified; see DESIGN.md.

mod cache;
mod local;

pub use cache::CacheStore;
pub use local::LocalStore;
