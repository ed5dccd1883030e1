//! Report storage contract
//!
//! [`ReportStore`] is the persistence seam. [`ReportService`] layers the
//! access rules on top of it:
//! - the owner always comes from the resolved header, never the body
//! - the checksum must match the html at save time (computed when omitted)
//! - listing a current toolkit also returns rows under its legacy alias
//! - absent and non-owned reports are indistinguishable ([`CoreError::NotFound`])

use crate::error::{CoreError, Result, StoreError, ValidationError};
use crate::identity::OwnershipIdentity;
use crate::types::{ReportId, ToolkitGroup};
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use roadmap_artifact::{Checksum, FieldIssue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Maximum report name length, in characters
pub const MAX_NAME_CHARS: usize = 200;

const TOOLKIT_RULE: &str = "must be 1-64 of a-z, 0-9, '-', '_'";

/// A stored report; immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedReport {
    pub id: ReportId,
    #[serde(skip_serializing)]
    pub owner: OwnershipIdentity,
    pub toolkit: ToolkitGroup,
    pub name: String,
    pub html: String,
    pub checksum: Checksum,
    /// Serialized profile the report was rendered from
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl RenderedReport {
    /// Listing view
    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            id: self.id,
            toolkit: self.toolkit.clone(),
            name: self.name.clone(),
            checksum: self.checksum,
            created_at: self.created_at,
        }
    }
}

/// Report without its html and metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub id: ReportId,
    pub toolkit: ToolkitGroup,
    pub name: String,
    pub checksum: Checksum,
    pub created_at: DateTime<Utc>,
}

/// Body of a save request
///
/// Unknown fields (including any attempt to name an owner) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaveReport {
    #[serde(alias = "toolkitGroup")]
    pub toolkit: String,
    pub name: String,
    pub html: String,
    pub checksum: Option<String>,
    pub metadata: Option<Value>,
}

/// Report persistence
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Insert a new report
    async fn insert(&self, report: &RenderedReport) -> std::result::Result<(), StoreError>;

    /// Summaries owned by `owner` in any of `groups`, newest first (ties by id, descending)
    async fn list(
        &self,
        owner: &OwnershipIdentity,
        groups: &[ToolkitGroup],
    ) -> std::result::Result<Vec<ReportSummary>, StoreError>;

    /// Report `id` if owned by `owner`
    async fn get(
        &self,
        owner: &OwnershipIdentity,
        id: ReportId,
    ) -> std::result::Result<Option<RenderedReport>, StoreError>;

    /// Delete report `id` if owned by `owner`; `false` when nothing matched
    async fn delete(
        &self,
        owner: &OwnershipIdentity,
        id: ReportId,
    ) -> std::result::Result<bool, StoreError>;

    /// Liveness probe
    async fn ping(&self) -> std::result::Result<(), StoreError> {
        Ok(())
    }
}

/// Ownership-scoped report operations
#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn ReportStore>,
}

impl std::fmt::Debug for ReportService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportService").finish_non_exhaustive()
    }
}

impl ReportService {
    /// Create service over a store
    #[must_use]
    pub fn new(store: Arc<dyn ReportStore>) -> Self {
        Self { store }
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ReportStore> {
        &self.store
    }

    /// Persist a report for `owner`
    ///
    /// # Errors
    /// [`CoreError::Validation`] for bad fields or a checksum that does not
    /// match the html; [`CoreError::Store`] when the write fails
    pub async fn save(&self, owner: &OwnershipIdentity, request: SaveReport) -> Result<RenderedReport> {
        let mut issues = Vec::new();

        let toolkit = match ToolkitGroup::parse(&request.toolkit) {
            Ok(group) => Some(group),
            Err(_) => {
                issues.push(FieldIssue::new("toolkit", TOOLKIT_RULE));
                None
            }
        };

        let name = request.name.trim().to_string();
        let name_len = name.chars().count();
        if name_len == 0 {
            issues.push(FieldIssue::new("name", "is required"));
        } else if name_len > MAX_NAME_CHARS {
            issues.push(FieldIssue::new("name", "must be at most 200 characters"));
        }

        if request.html.trim().is_empty() {
            issues.push(FieldIssue::new("html", "is required"));
        }

        let checksum = match request.checksum.as_deref().map(str::trim) {
            None | Some("") => Some(Checksum::of(&request.html)),
            Some(raw) => match raw.parse::<Checksum>() {
                Ok(c) if c.matches(&request.html) => Some(c),
                Ok(_) => {
                    issues.push(FieldIssue::new("checksum", "does not match html"));
                    None
                }
                Err(_) => {
                    issues.push(FieldIssue::new("checksum", "must be 64 hex characters"));
                    None
                }
            },
        };

        let (Some(toolkit), Some(checksum), true) = (toolkit, checksum, issues.is_empty()) else {
            return Err(ValidationError { fields: issues }.into());
        };

        let report = RenderedReport {
            id: ReportId::new(),
            owner: owner.clone(),
            toolkit,
            name,
            html: request.html,
            checksum,
            metadata: request.metadata.map(|m| match m {
                Value::String(s) => s,
                other => other.to_string(),
            }),
            created_at: Utc::now().trunc_subsecs(6),
        };

        self.store.insert(&report).await?;
        tracing::info!(
            report_id = %report.id,
            toolkit = %report.toolkit,
            checksum = %report.checksum.short(),
            "report saved"
        );
        Ok(report)
    }

    /// Summaries for `owner` under `toolkit` (and its legacy aliases)
    ///
    /// # Errors
    /// [`CoreError::Validation`] for a malformed toolkit
    pub async fn list(&self, owner: &OwnershipIdentity, toolkit: &str) -> Result<Vec<ReportSummary>> {
        let group = ToolkitGroup::parse(toolkit)
            .map_err(|_| ValidationError::field("toolkit", TOOLKIT_RULE))?;
        Ok(self.store.list(owner, &group.with_legacy_aliases()).await?)
    }

    /// Full report
    ///
    /// # Errors
    /// [`CoreError::NotFound`] when absent, malformed, or owned by someone else
    pub async fn get(&self, owner: &OwnershipIdentity, id: &str) -> Result<RenderedReport> {
        let id: ReportId = id.parse().map_err(|_| CoreError::NotFound)?;
        self.store.get(owner, id).await?.ok_or(CoreError::NotFound)
    }

    /// Delete a report
    ///
    /// # Errors
    /// [`CoreError::NotFound`] when absent, malformed, or owned by someone else
    pub async fn delete(&self, owner: &OwnershipIdentity, id: &str) -> Result<()> {
        let id: ReportId = id.parse().map_err(|_| CoreError::NotFound)?;
        if self.store.delete(owner, id).await? {
            tracing::info!(report_id = %id, "report deleted");
            Ok(())
        } else {
            Err(CoreError::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryReportStore;
    use serde_json::json;

    const HTML: &str = "<article class=\"credit-roadmap\"></article>\n";

    fn service() -> ReportService {
        ReportService::new(Arc::new(MemoryReportStore::new()))
    }

    fn owner(s: &str) -> OwnershipIdentity {
        OwnershipIdentity::parse(s).unwrap()
    }

    fn request(toolkit: &str, name: &str) -> SaveReport {
        SaveReport {
            toolkit: toolkit.to_string(),
            name: name.to_string(),
            html: HTML.to_string(),
            ..SaveReport::default()
        }
    }

    fn issue_fields(err: CoreError) -> Vec<&'static str> {
        match err {
            CoreError::Validation(v) => v.fields.iter().map(|f| f.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn save_computes_missing_checksum() {
        let saved = service()
            .save(&owner("alice"), request("business-credit", "Q3 plan"))
            .await
            .unwrap();
        assert_eq!(saved.checksum, Checksum::of(HTML));
        assert_eq!(saved.owner, owner("alice"));
    }

    #[tokio::test]
    async fn save_rejects_mismatched_checksum() {
        let mut req = request("business-credit", "Q3 plan");
        req.checksum = Some(Checksum::of("other").to_string());
        let err = service().save(&owner("alice"), req).await.unwrap_err();
        assert_eq!(issue_fields(err), vec!["checksum"]);
    }

    #[tokio::test]
    async fn save_reports_all_bad_fields() {
        let req = SaveReport {
            toolkit: "bad toolkit".into(),
            name: "   ".into(),
            html: String::new(),
            checksum: Some("zz".into()),
            metadata: None,
        };
        let err = service().save(&owner("alice"), req).await.unwrap_err();
        assert_eq!(issue_fields(err), vec!["toolkit", "name", "html", "checksum"]);
    }

    #[tokio::test]
    async fn body_cannot_choose_owner() {
        let req: SaveReport = serde_json::from_value(json!({
            "toolkit": "business-credit",
            "name": "mine",
            "html": HTML,
            "owner": "victim",
            "ownershipIdentity": "victim",
        }))
        .unwrap();
        let svc = service();
        let saved = svc.save(&owner("alice"), req).await.unwrap();
        assert_eq!(saved.owner, owner("alice"));
        assert!(svc.list(&owner("victim"), "business-credit").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn metadata_objects_are_serialized() {
        let mut req = request("business-credit", "plan");
        req.metadata = Some(json!({"businessName": "Acme"}));
        let saved = service().save(&owner("alice"), req).await.unwrap();
        assert_eq!(saved.metadata.as_deref(), Some(r#"{"businessName":"Acme"}"#));
    }

    #[tokio::test]
    async fn ownership_isolation() {
        let svc = service();
        let saved = svc
            .save(&owner("alice"), request("business-credit", "plan"))
            .await
            .unwrap();
        let id = saved.id.to_string();

        assert!(matches!(svc.get(&owner("bob"), &id).await, Err(CoreError::NotFound)));
        assert!(matches!(svc.delete(&owner("bob"), &id).await, Err(CoreError::NotFound)));
        assert!(svc.list(&owner("bob"), "business-credit").await.unwrap().is_empty());

        // Bob's failed delete left Alice's report in place.
        assert_eq!(svc.get(&owner("alice"), &id).await.unwrap(), saved);
        svc.delete(&owner("alice"), &id).await.unwrap();
        assert!(matches!(svc.get(&owner("alice"), &id).await, Err(CoreError::NotFound)));
    }

    #[tokio::test]
    async fn malformed_id_is_not_found() {
        assert!(matches!(
            service().get(&owner("alice"), "nope").await,
            Err(CoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn list_includes_legacy_alias_and_orders_newest_first() {
        let svc = service();
        let alice = owner("alice");
        svc.save(&alice, request("credit-roadmap", "legacy")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        svc.save(&alice, request("business-credit", "current")).await.unwrap();
        svc.save(&alice, request("funding-readiness", "other")).await.unwrap();

        let names: Vec<_> = svc
            .list(&alice, "business-credit")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["current", "legacy"]);

        let legacy_only = svc.list(&alice, "credit-roadmap").await.unwrap();
        assert_eq!(legacy_only.len(), 1);
    }
}
