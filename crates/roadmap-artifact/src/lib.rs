//! Roadmap Artifacts
//!
//! Documents that flow through the roadmap service, and the pure functions
//! over them.
//!
//! # Core Concepts
//!
//! - [`BusinessProfile`]: caller-supplied business identification and credit metrics
//! - [`GeneratedContent`]: normalized language-model output (total normalization)
//! - [`render()`]: deterministic `(profile, content) -> html`
//! - [`Checksum`]: Blake3 digest of exact rendered HTML, for drift detection
//! - [`export_document`]: timestamped wrapper that leaves the hashed region untouched
//!
//! # Example
//!
//! ```rust,ignore
//! use roadmap_artifact::{BusinessProfile, GeneratedContent, RenderedHtml};
//!
//! let profile = BusinessProfile::new("Acme Plumbing LLC", 712.0);
//! let content = GeneratedContent::from_value(model_json);
//! let rendered = RenderedHtml::new(&profile, &content);
//! assert!(rendered.checksum.matches(&rendered.html));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod checksum;
mod content;
mod export;
mod lenient;
mod profile;
mod render;

pub use checksum::{Checksum, ChecksumError, CHECKSUM_HEX_LEN};
pub use content::{
    ApprovalOdds, GeneratedContent, NarrativeField, Recommendation, RecommendationList,
    MISSING_RATIONALE, UNNAMED_RECOMMENDATION,
};
pub use export::{export_document, export_filename, extract_body, verify_export, ExportError};
pub use profile::{BusinessProfile, FieldIssue, ProfileError};
pub use render::{escape, format_currency, render, sorted, RenderedHtml, RENDER_VERSION};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
