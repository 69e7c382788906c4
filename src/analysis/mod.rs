//! Analysis modules.
//!
//! Aggregation queries over the trade store and the dashboard views
//! built on top of them.

pub mod aggregator;
pub mod dashboard;

pub use aggregator::*;
pub use dashboard::{DashboardView, DEFAULT_TOP_N};
