//! Saved reports on SQLite
//!
//! Every statement filters on `owner`, so a non-owned id behaves exactly
//! like an absent one.

use crate::error::{corrupt, db_err};
use crate::sqlite::SqliteStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use roadmap_artifact::Checksum;
use roadmap_core::{
    OwnershipIdentity, RenderedReport, ReportId, ReportStore, ReportSummary, StoreError,
    ToolkitGroup,
};

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    id: String,
    toolkit: String,
    name: String,
    checksum: String,
    created_at: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct ReportRow {
    id: String,
    owner: String,
    toolkit: String,
    name: String,
    html: String,
    checksum: String,
    metadata: Option<String>,
    created_at: i64,
}

fn decode_time(micros: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_micros(micros).ok_or_else(|| corrupt("created_at", micros))
}

fn decode_id(raw: &str) -> Result<ReportId, StoreError> {
    raw.parse().map_err(|e| corrupt("report id", e))
}

fn decode_toolkit(raw: &str) -> Result<ToolkitGroup, StoreError> {
    ToolkitGroup::parse(raw).map_err(|e| corrupt("toolkit", e))
}

fn decode_checksum(raw: &str) -> Result<Checksum, StoreError> {
    raw.parse().map_err(|e| corrupt("checksum", e))
}

impl TryFrom<SummaryRow> for ReportSummary {
    type Error = StoreError;

    fn try_from(row: SummaryRow) -> Result<Self, Self::Error> {
        Ok(ReportSummary {
            id: decode_id(&row.id)?,
            toolkit: decode_toolkit(&row.toolkit)?,
            name: row.name,
            checksum: decode_checksum(&row.checksum)?,
            created_at: decode_time(row.created_at)?,
        })
    }
}

impl TryFrom<ReportRow> for RenderedReport {
    type Error = StoreError;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        Ok(RenderedReport {
            id: decode_id(&row.id)?,
            owner: OwnershipIdentity::parse(&row.owner).map_err(|e| corrupt("owner", e))?,
            toolkit: decode_toolkit(&row.toolkit)?,
            name: row.name,
            html: row.html,
            checksum: decode_checksum(&row.checksum)?,
            metadata: row.metadata,
            created_at: decode_time(row.created_at)?,
        })
    }
}

#[async_trait]
impl ReportStore for SqliteStore {
    async fn insert(&self, report: &RenderedReport) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO reports (id, owner, toolkit, name, html, checksum, metadata, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(report.id.to_string())
        .bind(report.owner.as_str())
        .bind(report.toolkit.as_str())
        .bind(&report.name)
        .bind(&report.html)
        .bind(report.checksum.to_string())
        .bind(report.metadata.as_deref())
        .bind(report.created_at.timestamp_micros())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn list(
        &self,
        owner: &OwnershipIdentity,
        groups: &[ToolkitGroup],
    ) -> Result<Vec<ReportSummary>, StoreError> {
        if groups.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; groups.len()].join(", ");
        let sql = format!(
            "SELECT id, toolkit, name, checksum, created_at FROM reports
             WHERE owner = ? AND toolkit IN ({placeholders})
             ORDER BY created_at DESC, id DESC"
        );

        let mut query = sqlx::query_as::<_, SummaryRow>(&sql).bind(owner.as_str());
        for group in groups {
            query = query.bind(group.as_str());
        }
        let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;
        rows.into_iter().map(ReportSummary::try_from).collect()
    }

    async fn get(
        &self,
        owner: &OwnershipIdentity,
        id: ReportId,
    ) -> Result<Option<RenderedReport>, StoreError> {
        let row = sqlx::query_as::<_, ReportRow>(
            "SELECT id, owner, toolkit, name, html, checksum, metadata, created_at
             FROM reports WHERE id = ? AND owner = ?",
        )
        .bind(id.to_string())
        .bind(owner.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(RenderedReport::try_from).transpose()
    }

    async fn delete(&self, owner: &OwnershipIdentity, id: ReportId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM reports WHERE id = ? AND owner = ?")
            .bind(id.to_string())
            .bind(owner.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::SubsecRound;

    fn report(owner: &str, toolkit: &str, name: &str) -> RenderedReport {
        let html = format!("<article>{name}</article>\n");
        RenderedReport {
            id: ReportId::new(),
            owner: OwnershipIdentity::parse(owner).unwrap(),
            toolkit: ToolkitGroup::parse(toolkit).unwrap(),
            name: name.to_string(),
            checksum: Checksum::of(&html),
            html,
            metadata: Some("{\"businessName\":\"Acme\"}".to_string()),
            created_at: Utc::now().trunc_subsecs(6),
        }
    }

    #[tokio::test]
    async fn insert_then_get_round_trips_exactly() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let saved = report("alice", "business-credit", "plan");
        store.insert(&saved).await.unwrap();

        let fetched = store.get(&saved.owner, saved.id).await.unwrap().unwrap();
        assert_eq!(fetched, saved);
    }

    #[tokio::test]
    async fn duplicate_id_is_a_conflict() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let saved = report("alice", "business-credit", "plan");
        store.insert(&saved).await.unwrap();

        let err = store.insert(&saved).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)), "{err}");
    }

    #[tokio::test]
    async fn get_and_delete_are_owner_scoped() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let saved = report("alice", "business-credit", "plan");
        store.insert(&saved).await.unwrap();
        let bob = OwnershipIdentity::parse("bob").unwrap();

        assert_eq!(store.get(&bob, saved.id).await.unwrap(), None);
        assert!(!store.delete(&bob, saved.id).await.unwrap());
        assert!(store.delete(&saved.owner, saved.id).await.unwrap());
        assert!(!store.delete(&saved.owner, saved.id).await.unwrap());
    }

    #[tokio::test]
    async fn ties_on_created_at_break_by_id() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let first = report("alice", "business-credit", "first");
        let mut second = report("alice", "business-credit", "second");
        second.created_at = first.created_at;
        store.insert(&first).await.unwrap();
        store.insert(&second).await.unwrap();

        let owner = first.owner.clone();
        let listed = store
            .list(&owner, &[ToolkitGroup::parse("business-credit").unwrap()])
            .await
            .unwrap();
        let mut expected = vec![first.id, second.id];
        expected.sort_by(|a, b| b.cmp(a));
        assert_eq!(listed.iter().map(|s| s.id).collect::<Vec<_>>(), expected);
    }

    #[tokio::test]
    async fn corrupt_rows_surface_as_errors() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO reports (id, owner, toolkit, name, html, checksum, metadata, created_at)
             VALUES ('01ARZ3NDEKTSV4RRFFQ69G5FAV', 'alice', 'business-credit', 'n', 'h', 'not-hex', NULL, 0)",
        )
        .execute(store.pool())
        .await
        .unwrap();
        let owner = OwnershipIdentity::parse("alice").unwrap();
        let err = store
            .list(&owner, &[ToolkitGroup::parse("business-credit").unwrap()])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }
}
