//! Dashboard module
//!
//! Provides the overview page with headline numbers, UTM rankings and charts.
//! The chart and card components are shared with the qualitative page.

pub(crate) mod cards;
pub(crate) mod charts;
mod handlers;

pub use handlers::{DashboardState, TimelineQuery, get_dashboard_page};
