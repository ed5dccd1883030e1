//! Usage Governor
//!
//! Enforces the per-(identity, tool) generation quota.
//!
//! - [`UsageGovernor::check`] is read-only and fails **open** on store errors
//! - [`UsageGovernor::increment`] is a single conditional write and fails
//!   **closed** on store errors
//!
//! Mutual exclusion comes from the store's atomic `count < limit` predicate.
//! The governor holds no locks of its own.

use crate::error::StoreError;
use crate::identity::QuotaIdentity;
use crate::types::{Tool, USAGE_LIMIT};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Persistent counter storage
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Current count; zero when no row exists
    async fn read_count(&self, identity: &QuotaIdentity, tool: Tool) -> Result<u32, StoreError>;

    /// Atomically add one if the stored count is below `limit`
    ///
    /// Creates the row at 1 when absent. Returns the new count, or `None`
    /// when the row is already at `limit` and nothing was written.
    async fn try_increment(
        &self,
        identity: &QuotaIdentity,
        tool: Tool,
        limit: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<u32>, StoreError>;

    /// Liveness probe
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Result of a read-only quota check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageCheck {
    /// Whether a generation may start
    pub allowed: bool,
    /// Count observed
    pub count: u32,
}

/// Result of an increment attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncrementOutcome {
    /// Whether this call consumed one use
    pub success: bool,
    /// Count after the attempt
    pub count: u32,
    /// Counter was already full (or the store failed)
    pub limit_reached: bool,
}

/// Read view served by `GET /usage`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageSnapshot {
    /// Tool the counter belongs to
    pub tool: Tool,
    /// Uses consumed
    pub count: u32,
    /// Configured limit
    pub limit: u32,
    /// Uses left
    pub remaining: u32,
}

impl UsageSnapshot {
    /// Snapshot for `count` of `limit`
    #[inline]
    #[must_use]
    pub fn new(tool: Tool, count: u32, limit: u32) -> Self {
        Self {
            tool,
            count,
            limit,
            remaining: limit.saturating_sub(count),
        }
    }
}

/// Quota enforcer over a [`UsageStore`]
#[derive(Clone)]
pub struct UsageGovernor {
    store: Arc<dyn UsageStore>,
    limit: u32,
}

impl std::fmt::Debug for UsageGovernor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageGovernor")
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

impl UsageGovernor {
    /// Governor with the standard limit
    #[must_use]
    pub fn new(store: Arc<dyn UsageStore>) -> Self {
        Self {
            store,
            limit: USAGE_LIMIT,
        }
    }

    /// Configured limit
    #[inline]
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn UsageStore> {
        &self.store
    }

    /// Read-only check
    ///
    /// An unresolved identity is never allowed. A store error is allowed
    /// with count 0, so a counter outage does not block users.
    pub async fn check(&self, identity: Option<&QuotaIdentity>, tool: Tool) -> UsageCheck {
        let Some(identity) = identity else {
            tracing::warn!(%tool, "quota check without a resolvable identity");
            metrics::counter!("roadmap_quota_checks_total", "decision" => "unresolved")
                .increment(1);
            return UsageCheck {
                allowed: false,
                count: self.limit,
            };
        };

        match self.store.read_count(identity, tool).await {
            Ok(count) => {
                let allowed = count < self.limit;
                metrics::counter!(
                    "roadmap_quota_checks_total",
                    "decision" => if allowed { "allowed" } else { "denied" }
                )
                .increment(1);
                UsageCheck { allowed, count }
            }
            Err(e) => {
                tracing::warn!(%identity, %tool, error = %e, "usage check failed, allowing");
                metrics::counter!("roadmap_quota_checks_total", "decision" => "fail_open")
                    .increment(1);
                UsageCheck {
                    allowed: true,
                    count: 0,
                }
            }
        }
    }

    /// Consume one use, if any remain
    ///
    /// A store error is reported as `limit_reached` so the caller refuses
    /// the request.
    pub async fn increment(&self, identity: &QuotaIdentity, tool: Tool) -> IncrementOutcome {
        match self
            .store
            .try_increment(identity, tool, self.limit, Utc::now())
            .await
        {
            Ok(Some(count)) => {
                tracing::debug!(%identity, %tool, count, "usage incremented");
                IncrementOutcome {
                    success: true,
                    count,
                    limit_reached: false,
                }
            }
            Ok(None) => {
                let count = self
                    .store
                    .read_count(identity, tool)
                    .await
                    .unwrap_or(self.limit);
                tracing::info!(%identity, %tool, count, "usage limit reached on increment");
                IncrementOutcome {
                    success: false,
                    count,
                    limit_reached: true,
                }
            }
            Err(e) => {
                tracing::error!(%identity, %tool, error = %e, "usage increment failed, refusing");
                IncrementOutcome {
                    success: false,
                    count: self.limit,
                    limit_reached: true,
                }
            }
        }
    }

    /// Read view, same failure policy as [`check`](Self::check)
    pub async fn usage(&self, identity: Option<&QuotaIdentity>, tool: Tool) -> UsageSnapshot {
        let check = self.check(identity, tool).await;
        UsageSnapshot::new(tool, check.count, self.limit)
    }
}
