//! Appointment funnel metrics for the weekly shop activity export.
//!
//! Ingestion reads the export, keeps a rolling window of weeks and prorates
//! the residual "Other Areas" bucket. The views in [`reports`] roll the
//! resulting snapshot up by area, by week and by shop.

pub mod cache;
pub mod config;
pub mod error;
pub mod loader;
pub mod output;
pub mod proration;
pub mod rates;
pub mod reports;
pub mod selection;
pub mod types;
pub mod util;

pub use cache::SnapshotCache;
pub use config::ReportConfig;
pub use error::{ReportError, Result};
pub use loader::{Snapshot, Window};
pub use proration::ResidualPolicy;
pub use reports::View;
