//! Roadmap Core
//!
//! Quota-governed generation and ownership-scoped report storage.
//!
//! # Architecture
//!
//! ```text
//! request -> IdentityResolver -> UsageGovernor.check
//!         -> ContentGenerator (bounded by a timeout)
//!         -> UsageGovernor.increment -> render + checksum -> response
//!
//! save/list/get/delete -> ReportService -> ReportStore (owner-filtered)
//! ```
//!
//! # Core Concepts
//!
//! - [`QuotaIdentity`]: network-address key for the usage counters
//! - [`OwnershipIdentity`]: caller token scoping saved reports
//! - [`UsageGovernor`]: check (fail-open) and atomic increment (fail-closed)
//! - [`GenerationOrchestrator`]: the generation state machine
//! - [`ReportService`]: save/list/get/delete with ownership enforced
//!
//! Storage is behind [`UsageStore`] and [`ReportStore`]; the [`memory`]
//! module holds single-process implementations.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod generator;
pub mod governor;
pub mod identity;
pub mod memory;
pub mod orchestrator;
pub mod reports;
pub mod types;

pub use error::{
    CoreError, GenerationCause, GenerationError, Result, StoreError, ValidationError,
};
pub use generator::ContentGenerator;
pub use governor::{IncrementOutcome, UsageCheck, UsageGovernor, UsageSnapshot, UsageStore};
pub use identity::{
    IdentityError, IdentityResolver, OwnershipIdentity, QuotaIdentity, FORWARDED_FOR_HEADER,
    OWNERSHIP_HEADER,
};
pub use memory::{MemoryReportStore, MemoryUsageStore};
pub use orchestrator::{GenerateRequest, GenerationOrchestrator, GenerationResponse, GenerationStage};
pub use reports::{RenderedReport, ReportService, ReportStore, ReportSummary, SaveReport};
pub use types::{CoreConfig, ReportId, Tool, ToolkitGroup, LEGACY_TOOLKIT_ALIASES, USAGE_LIMIT};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
