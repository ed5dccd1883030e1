//! Roadmap Store
//!
//! SQLite persistence for the usage counters and saved reports.
//!
//! [`SqliteStore`] implements both [`roadmap_core::UsageStore`] and
//! [`roadmap_core::ReportStore`] over one connection pool. The schema is
//! applied idempotently on open.
//!
//! # Example
//!
//! ```rust,ignore
//! use roadmap_store::{SqliteConfig, SqliteStore};
//!
//! let store = Arc::new(SqliteStore::open(&SqliteConfig::new("data/roadmap.db")).await?);
//! let governor = UsageGovernor::new(store.clone());
//! let reports = ReportService::new(store);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod reports;
mod sqlite;
mod usage;

pub use error::OpenError;
pub use sqlite::{SqliteConfig, SqliteStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
