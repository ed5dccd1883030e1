//! Content generator seam
//!
//! The language model call is opaque: a fallible async function returning a
//! JSON document. Normalization into [`roadmap_artifact::GeneratedContent`]
//! happens once, in the orchestrator.

use crate::error::GenerationError;
use crate::types::Tool;
use async_trait::async_trait;
use roadmap_artifact::BusinessProfile;
use serde_json::Value;

/// External content generator
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Produce raw roadmap content for a validated profile
    async fn generate(&self, tool: Tool, profile: &BusinessProfile) -> Result<Value, GenerationError>;
}
