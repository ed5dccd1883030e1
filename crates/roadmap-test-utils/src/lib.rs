//! Testing utilities for the roadmap workspace
//!
//! Shared fixtures, scripted generators and failing stores.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use roadmap_artifact::{BusinessProfile, GeneratedContent};
use roadmap_core::{
    ContentGenerator, CoreConfig, GenerationCause, GenerationError, GenerationOrchestrator,
    OwnershipIdentity, QuotaIdentity, RenderedReport, ReportId, ReportStore, ReportSummary,
    StoreError, Tool, ToolkitGroup, UsageGovernor, UsageStore,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub use roadmap_core::{MemoryReportStore, MemoryUsageStore};

pub fn ip(addr: &str) -> QuotaIdentity {
    QuotaIdentity::from_ip(addr.parse().unwrap())
}

pub fn owner(token: &str) -> OwnershipIdentity {
    OwnershipIdentity::parse(token).unwrap()
}

pub fn sample_profile() -> BusinessProfile {
    let mut profile = BusinessProfile::new("Acme Plumbing LLC", 712.0);
    profile.industry = Some("Construction".to_string());
    profile.entity_type = Some("LLC".to_string());
    profile.state = Some("TX".to_string());
    profile.years_in_business = Some(3.0);
    profile.annual_revenue = Some(480_000.0);
    profile.funding_goal = Some(150_000.0);
    profile.funding_purpose = Some("Second service van".to_string());
    profile
}

/// Profile as a web form would submit it
pub fn sample_profile_json() -> Value {
    json!({
        "businessName": "Acme Plumbing LLC",
        "industry": "Construction",
        "personalCreditScore": "712",
        "annualRevenue": "$480,000",
        "fundingGoal": 150000,
        "favoriteColor": "teal",
    })
}

pub fn sample_content_json() -> Value {
    json!({
        "executiveSummary": "Acme can qualify for an SBA Express line within six months.",
        "creditAssessment": "Personal credit is strong; business files are thin.",
        "strengths": "Three years of steady deposits.",
        "riskFactors": "Single-customer concentration.",
        "actionPlan90Days": "Open two net-30 trade lines.\n\nRegister with D&B.",
        "longTermStrategy": "Build a PAYDEX above 80.",
        "closingNotes": "Revisit in one quarter.",
        "fundingRecommendations": [
            {"name": "SBA Express", "odds": "medium", "rationale": "Time in business qualifies", "rank": 2},
            {"name": "Equipment financing", "odds": "high", "rationale": "Collateralized by the van", "rank": 1},
        ],
        "creditCardRecommendations": [
            {"name": "Business cash card", "odds": "high", "rationale": "Score above 700"},
        ],
    })
}

pub fn sample_content() -> GeneratedContent {
    GeneratedContent::from_value(sample_content_json())
}

/// Generator returning a fixed document and counting calls
#[derive(Debug)]
pub struct ScriptedGenerator {
    response: Value,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(response: Value) -> Self {
        Self {
            response,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::new(sample_content_json())
    }
}

#[async_trait]
impl ContentGenerator for ScriptedGenerator {
    async fn generate(&self, _tool: Tool, _profile: &BusinessProfile) -> Result<Value, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

/// Generator that always fails with one cause
#[derive(Debug, Clone, Copy)]
pub struct FailingGenerator(pub GenerationCause);

#[async_trait]
impl ContentGenerator for FailingGenerator {
    async fn generate(&self, _tool: Tool, _profile: &BusinessProfile) -> Result<Value, GenerationError> {
        Err(GenerationError::new(self.0, "provider said no"))
    }
}

fn down() -> StoreError {
    StoreError::Unavailable("connection refused".to_string())
}

/// Usage store whose every call fails
#[derive(Debug, Default)]
pub struct DownUsageStore;

#[async_trait]
impl UsageStore for DownUsageStore {
    async fn read_count(&self, _: &QuotaIdentity, _: Tool) -> Result<u32, StoreError> {
        Err(down())
    }

    async fn try_increment(
        &self,
        _: &QuotaIdentity,
        _: Tool,
        _: u32,
        _: DateTime<Utc>,
    ) -> Result<Option<u32>, StoreError> {
        Err(down())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(down())
    }
}

/// Report store whose every call fails
#[derive(Debug, Default)]
pub struct DownReportStore;

#[async_trait]
impl ReportStore for DownReportStore {
    async fn insert(&self, _: &RenderedReport) -> Result<(), StoreError> {
        Err(down())
    }

    async fn list(&self, _: &OwnershipIdentity, _: &[ToolkitGroup]) -> Result<Vec<ReportSummary>, StoreError> {
        Err(down())
    }

    async fn get(&self, _: &OwnershipIdentity, _: ReportId) -> Result<Option<RenderedReport>, StoreError> {
        Err(down())
    }

    async fn delete(&self, _: &OwnershipIdentity, _: ReportId) -> Result<bool, StoreError> {
        Err(down())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(down())
    }
}

/// Orchestrator over an in-memory counter
pub fn setup_orchestrator(
    generator: Arc<dyn ContentGenerator>,
) -> (GenerationOrchestrator, Arc<MemoryUsageStore>) {
    let store = Arc::new(MemoryUsageStore::new());
    let orchestrator = GenerationOrchestrator::new(
        UsageGovernor::new(store.clone()),
        generator,
        &CoreConfig::default(),
    );
    (orchestrator, store)
}
