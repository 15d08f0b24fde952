//! Refresh policy: when to resolve a manifest and whether to trust the cache
//!
//! - [`coordinator`]: entry points for open / change / periodic triggers
//! - [`visits`]: per-document pass counters driving the first-view follow-up and
//!   keeping superseded passes from rendering

pub mod coordinator;
pub mod visits;

pub use coordinator::{RefreshCoordinator, spawn_periodic_refresh};
pub use visits::{PassGenerations, VisitCounter};
