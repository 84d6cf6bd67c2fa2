//! Durable, queryable record of published videos, their performance
//! samples, generated feedback, and the template change log.
//!
//! Backed by SQLite. All four tables are append-only: repeated analytics
//! runs for the same published video insert additional rows rather than
//! updating in place.

pub mod error;
pub mod store;

pub use error::{MetricsError, MetricsResult};
pub use store::MetricsStore;
