//! Generation Orchestrator
//!
//! Drives one generation request through its stages:
//!
//! ```text
//! Idle -> QuotaChecked -> Generated -> QuotaIncremented -> Responded
//!   \________\_______________\______________\______________-> Failed
//! ```
//!
//! The counter is only written after a successful generation, so failed or
//! timed-out calls are never charged. If the increment loses a race at the
//! limit, the generated content is discarded and the caller sees the same
//! quota error as a pre-generation refusal.

use crate::error::{CoreError, GenerationError, Result, ValidationError};
use crate::generator::ContentGenerator;
use crate::governor::{UsageGovernor, UsageSnapshot};
use crate::identity::QuotaIdentity;
use crate::types::{CoreConfig, Tool};
use roadmap_artifact::{BusinessProfile, Checksum, FieldIssue, GeneratedContent, RenderedHtml};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

/// Request stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationStage {
    Idle,
    QuotaChecked,
    Generated,
    QuotaIncremented,
    Responded,
    Failed,
}

impl GenerationStage {
    /// Check if moving to `next` is legal
    #[must_use]
    pub fn can_transition_to(self, next: GenerationStage) -> bool {
        use GenerationStage::{Failed, Generated, Idle, QuotaChecked, QuotaIncremented, Responded};
        matches!(
            (self, next),
            (Idle, QuotaChecked)
                | (QuotaChecked, Generated)
                | (Generated, QuotaIncremented)
                | (QuotaIncremented, Responded)
                | (Idle | QuotaChecked | Generated | QuotaIncremented, Failed)
        )
    }

    /// Check if no further transitions are possible
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, GenerationStage::Responded | GenerationStage::Failed)
    }
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GenerationStage::Idle => "idle",
            GenerationStage::QuotaChecked => "quota_checked",
            GenerationStage::Generated => "generated",
            GenerationStage::QuotaIncremented => "quota_incremented",
            GenerationStage::Responded => "responded",
            GenerationStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Body of `POST /generate`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerateRequest {
    /// Tool wire name, validated against [`Tool`]
    pub tool: String,
    /// Business profile
    pub profile: BusinessProfile,
}

impl GenerateRequest {
    /// Request for a known tool
    #[must_use]
    pub fn new(tool: Tool, profile: BusinessProfile) -> Self {
        Self {
            tool: tool.as_str().to_string(),
            profile,
        }
    }

    /// Parse the tool and validate the profile, reporting every bad field
    ///
    /// # Errors
    /// Returns [`ValidationError`] listing all offending fields
    pub fn validate(&self) -> std::result::Result<Tool, ValidationError> {
        let tool = self.tool.parse::<Tool>();
        let mut fields = Vec::new();
        if tool.is_err() {
            fields.push(FieldIssue::new(
                "tool",
                "must be 'business-credit' or 'funding-readiness'",
            ));
        }
        if let Err(e) = self.profile.validate() {
            fields.extend_from_slice(e.issues());
        }
        match tool {
            Ok(tool) if fields.is_empty() => Ok(tool),
            _ => Err(ValidationError { fields }),
        }
    }
}

/// Successful generation
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResponse {
    pub tool: Tool,
    pub content: GeneratedContent,
    pub html: String,
    pub checksum: Checksum,
    pub usage: UsageSnapshot,
}

/// Quota-gated generation pipeline
#[derive(Clone)]
pub struct GenerationOrchestrator {
    governor: UsageGovernor,
    generator: Arc<dyn ContentGenerator>,
    timeout: Duration,
}

impl fmt::Debug for GenerationOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationOrchestrator")
            .field("governor", &self.governor)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl GenerationOrchestrator {
    /// Create orchestrator
    #[must_use]
    pub fn new(
        governor: UsageGovernor,
        generator: Arc<dyn ContentGenerator>,
        config: &CoreConfig,
    ) -> Self {
        Self {
            governor,
            generator,
            timeout: config.generation_timeout(),
        }
    }

    /// Override the generation timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Quota governor
    #[inline]
    #[must_use]
    pub fn governor(&self) -> &UsageGovernor {
        &self.governor
    }

    /// Run one generation request
    ///
    /// Not idempotent: a success consumes one use.
    ///
    /// # Errors
    /// - [`CoreError::Validation`] before anything else runs
    /// - [`CoreError::QuotaExceeded`] before or after generation
    /// - [`CoreError::Generation`] with the counter untouched
    pub async fn generate(
        &self,
        identity: Option<&QuotaIdentity>,
        request: GenerateRequest,
    ) -> Result<GenerationResponse> {
        let mut stage = GenerationStage::Idle;
        let result = self.run(identity, request, &mut stage).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(CoreError::QuotaExceeded { .. }) => "quota_exceeded",
            Err(CoreError::Validation(_)) => "invalid",
            Err(CoreError::Generation(_)) => "generation_failed",
            Err(_) => "error",
        };
        metrics::counter!("roadmap_generations_total", "outcome" => outcome).increment(1);

        if let Err(e) = &result {
            advance(&mut stage, GenerationStage::Failed);
            match failure_level(e) {
                Level::INFO => tracing::info!(error = %e, "generation refused"),
                Level::DEBUG => tracing::debug!(error = %e, "generation rejected"),
                _ => tracing::warn!("Generation failed: {}", e),
            }
        }
        result
    }

    async fn run(
        &self,
        identity: Option<&QuotaIdentity>,
        request: GenerateRequest,
        stage: &mut GenerationStage,
    ) -> Result<GenerationResponse> {
        let tool = request.validate()?;
        let profile = request.profile;
        let limit = self.governor.limit();

        let check = self.governor.check(identity, tool).await;
        let (true, Some(identity)) = (check.allowed, identity) else {
            return Err(CoreError::QuotaExceeded {
                tool,
                count: check.count,
                limit,
            });
        };
        advance(stage, GenerationStage::QuotaChecked);
        tracing::info!(%identity, %tool, count = check.count, "generating roadmap");

        let raw = match tokio::time::timeout(self.timeout, self.generator.generate(tool, &profile)).await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(GenerationError::timeout(self.timeout).into()),
        };
        if !raw.is_object() {
            return Err(GenerationError::unexpected("generator returned a non-object document").into());
        }
        let content = GeneratedContent::from_value(raw);
        advance(stage, GenerationStage::Generated);

        let outcome = self.governor.increment(identity, tool).await;
        if outcome.limit_reached {
            tracing::info!(%identity, %tool, "discarding generated content, limit reached");
            return Err(CoreError::QuotaExceeded {
                tool,
                count: outcome.count,
                limit,
            });
        }
        advance(stage, GenerationStage::QuotaIncremented);

        let rendered = RenderedHtml::new(&profile, &content);
        advance(stage, GenerationStage::Responded);
        tracing::debug!(checksum = %rendered.checksum.short(), "roadmap rendered");

        Ok(GenerationResponse {
            tool,
            content,
            html: rendered.html,
            checksum: rendered.checksum,
            usage: UsageSnapshot::new(tool, outcome.count, limit),
        })
    }
}

/// Quota refusals are routine; other caller mistakes are noise; the rest need attention
fn failure_level(err: &CoreError) -> Level {
    match err {
        CoreError::QuotaExceeded { .. } => Level::INFO,
        e if e.is_client_error() => Level::DEBUG,
        _ => Level::WARN,
    }
}

fn advance(stage: &mut GenerationStage, next: GenerationStage) {
    debug_assert!(
        stage.can_transition_to(next),
        "illegal generation transition {stage} -> {next}"
    );
    tracing::trace!(from = %stage, to = %next, "generation stage");
    *stage = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GenerationCause, StoreError};
    use crate::generator::MockContentGenerator;
    use crate::governor::UsageStore;
    use crate::memory::MemoryUsageStore;
    use crate::types::USAGE_LIMIT;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::{json, Value};

    fn ip() -> QuotaIdentity {
        QuotaIdentity::from_ip("10.0.0.1".parse().unwrap())
    }

    fn request() -> GenerateRequest {
        GenerateRequest::new(Tool::BusinessCredit, BusinessProfile::new("Acme", 700.0))
    }

    fn orchestrator(
        store: Arc<MemoryUsageStore>,
        generator: impl ContentGenerator + 'static,
    ) -> GenerationOrchestrator {
        GenerationOrchestrator::new(
            UsageGovernor::new(store),
            Arc::new(generator),
            &CoreConfig::default(),
        )
    }

    fn succeeding() -> MockContentGenerator {
        let mut mock = MockContentGenerator::new();
        mock.expect_generate()
            .returning(|_, _| Ok(json!({"executiveSummary": "Fundable."})));
        mock
    }

    #[test]
    fn stage_transitions() {
        use GenerationStage::*;
        assert!(Idle.can_transition_to(QuotaChecked));
        assert!(QuotaChecked.can_transition_to(Failed));
        assert!(!Idle.can_transition_to(Generated));
        assert!(!Responded.can_transition_to(Failed));
        assert!(Failed.is_terminal());
    }

    #[test]
    fn refusals_log_below_warn() {
        let refused = CoreError::QuotaExceeded {
            tool: Tool::BusinessCredit,
            count: 30,
            limit: 30,
        };
        assert_eq!(failure_level(&refused), Level::INFO);
        assert_eq!(failure_level(&CoreError::NotFound), Level::DEBUG);
        assert_eq!(
            failure_level(&GenerationError::timeout(Duration::from_secs(1)).into()),
            Level::WARN
        );
        assert_eq!(
            failure_level(&StoreError::Unavailable("down".into()).into()),
            Level::WARN
        );
    }

    #[tokio::test]
    async fn success_charges_once_and_renders() {
        let store = Arc::new(MemoryUsageStore::new());
        let orch = orchestrator(store.clone(), succeeding());

        let response = orch.generate(Some(&ip()), request()).await.unwrap();
        assert_eq!(response.usage.count, 1);
        assert_eq!(response.usage.remaining, USAGE_LIMIT - 1);
        assert!(response.checksum.matches(&response.html));
        assert!(response.html.contains("Fundable."));
        assert_eq!(store.read_count(&ip(), Tool::BusinessCredit).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn invalid_request_never_calls_generator() {
        let mut mock = MockContentGenerator::new();
        mock.expect_generate().times(0);
        let orch = orchestrator(Arc::new(MemoryUsageStore::new()), mock);

        let bad = GenerateRequest {
            tool: "nope".into(),
            profile: BusinessProfile::default(),
        };
        match orch.generate(Some(&ip()), bad).await {
            Err(CoreError::Validation(v)) => {
                let fields: Vec<_> = v.fields.iter().map(|f| f.field).collect();
                assert_eq!(fields, vec!["tool", "businessName", "personalCreditScore"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn exhausted_quota_never_calls_generator() {
        let store = Arc::new(MemoryUsageStore::new());
        for _ in 0..USAGE_LIMIT {
            store
                .try_increment(&ip(), Tool::BusinessCredit, USAGE_LIMIT, Utc::now())
                .await
                .unwrap();
        }
        let mut mock = MockContentGenerator::new();
        mock.expect_generate().times(0);
        let orch = orchestrator(store, mock);

        match orch.generate(Some(&ip()), request()).await {
            Err(CoreError::QuotaExceeded { tool, count, limit }) => {
                assert_eq!((tool, count, limit), (Tool::BusinessCredit, 30, 30));
            }
            other => panic!("expected quota error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unresolved_identity_is_refused() {
        let mut mock = MockContentGenerator::new();
        mock.expect_generate().times(0);
        let orch = orchestrator(Arc::new(MemoryUsageStore::new()), mock);
        assert!(matches!(
            orch.generate(None, request()).await,
            Err(CoreError::QuotaExceeded { count: 30, .. })
        ));
    }

    #[tokio::test]
    async fn failed_generation_is_not_charged() {
        let store = Arc::new(MemoryUsageStore::new());
        let mut mock = MockContentGenerator::new();
        mock.expect_generate()
            .times(1)
            .returning(|_, _| Err(GenerationError::new(GenerationCause::RateLimited, "429")));
        let orch = orchestrator(store.clone(), mock);

        match orch.generate(Some(&ip()), request()).await {
            Err(CoreError::Generation(e)) => assert_eq!(e.cause, GenerationCause::RateLimited),
            other => panic!("expected generation error, got {other:?}"),
        }
        assert_eq!(store.read_count(&ip(), Tool::BusinessCredit).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn non_object_payload_is_unexpected_and_not_charged() {
        let store = Arc::new(MemoryUsageStore::new());
        let mut mock = MockContentGenerator::new();
        mock.expect_generate().returning(|_, _| Ok(json!(["not", "an", "object"])));
        let orch = orchestrator(store.clone(), mock);

        match orch.generate(Some(&ip()), request()).await {
            Err(CoreError::Generation(e)) => assert_eq!(e.cause, GenerationCause::Unexpected),
            other => panic!("expected generation error, got {other:?}"),
        }
        assert_eq!(store.read_count(&ip(), Tool::BusinessCredit).await.unwrap(), 0);
    }

    struct Slow;

    #[async_trait]
    impl ContentGenerator for Slow {
        async fn generate(&self, _: Tool, _: &BusinessProfile) -> std::result::Result<Value, GenerationError> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(json!({}))
        }
    }

    #[tokio::test]
    async fn timeout_is_distinguishable_and_not_charged() {
        let store = Arc::new(MemoryUsageStore::new());
        let orch = orchestrator(store.clone(), Slow).with_timeout(Duration::from_millis(20));

        match orch.generate(Some(&ip()), request()).await {
            Err(CoreError::Generation(e)) => assert_eq!(e.cause, GenerationCause::Timeout),
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(store.read_count(&ip(), Tool::BusinessCredit).await.unwrap(), 0);
    }

    /// Fills the last slot while "generating", as a concurrent request would.
    struct RacingGenerator {
        store: Arc<MemoryUsageStore>,
    }

    #[async_trait]
    impl ContentGenerator for RacingGenerator {
        async fn generate(&self, tool: Tool, _: &BusinessProfile) -> std::result::Result<Value, GenerationError> {
            self.store
                .try_increment(&ip(), tool, USAGE_LIMIT, Utc::now())
                .await
                .map_err(|e: StoreError| GenerationError::unexpected(e.to_string()))?;
            Ok(json!({"strengths": "lost the race"}))
        }
    }

    #[tokio::test]
    async fn lost_race_discards_content_with_same_quota_shape() {
        let store = Arc::new(MemoryUsageStore::new());
        for _ in 0..USAGE_LIMIT - 1 {
            store
                .try_increment(&ip(), Tool::BusinessCredit, USAGE_LIMIT, Utc::now())
                .await
                .unwrap();
        }
        let orch = orchestrator(
            store.clone(),
            RacingGenerator {
                store: store.clone(),
            },
        );

        match orch.generate(Some(&ip()), request()).await {
            Err(CoreError::QuotaExceeded { count, limit, .. }) => {
                assert_eq!((count, limit), (USAGE_LIMIT, USAGE_LIMIT));
            }
            other => panic!("expected quota error, got {other:?}"),
        }
        assert_eq!(
            store.read_count(&ip(), Tool::BusinessCredit).await.unwrap(),
            USAGE_LIMIT
        );
    }

    #[tokio::test]
    async fn sequential_requests_stop_at_limit() {
        let store = Arc::new(MemoryUsageStore::new());
        let orch = orchestrator(store, succeeding());

        for expected in 1..=USAGE_LIMIT {
            let response = orch.generate(Some(&ip()), request()).await.unwrap();
            assert_eq!(response.usage.count, expected);
        }
        assert!(matches!(
            orch.generate(Some(&ip()), request()).await,
            Err(CoreError::QuotaExceeded { count: 30, limit: 30, .. })
        ));
    }
}
