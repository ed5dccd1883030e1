//! Usage counters on SQLite
//!
//! The increment is one statement: an upsert whose update branch only fires
//! while `count < limit`. When the row is full the statement writes nothing
//! and returns no row.

use crate::error::{corrupt, db_err};
use crate::sqlite::SqliteStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use roadmap_core::{QuotaIdentity, StoreError, Tool, UsageStore};

const READ_COUNT: &str = "SELECT count FROM usage_counters WHERE identity = ? AND tool = ?";

const TRY_INCREMENT: &str = "\
INSERT INTO usage_counters (identity, tool, count, last_updated)
VALUES (?1, ?2, 1, ?3)
ON CONFLICT (identity, tool) DO UPDATE
    SET count = count + 1,
        last_updated = excluded.last_updated
    WHERE usage_counters.count < ?4
RETURNING count";

fn to_count(raw: i64) -> Result<u32, StoreError> {
    u32::try_from(raw).map_err(|e| corrupt("usage count", e))
}

#[async_trait]
impl UsageStore for SqliteStore {
    async fn read_count(&self, identity: &QuotaIdentity, tool: Tool) -> Result<u32, StoreError> {
        let count: Option<i64> = sqlx::query_scalar(READ_COUNT)
            .bind(identity.as_str())
            .bind(tool.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        count.map_or(Ok(0), to_count)
    }

    async fn try_increment(
        &self,
        identity: &QuotaIdentity,
        tool: Tool,
        limit: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<u32>, StoreError> {
        if limit == 0 {
            return Ok(None);
        }
        let count: Option<i64> = sqlx::query_scalar(TRY_INCREMENT)
            .bind(identity.as_str())
            .bind(tool.as_str())
            .bind(now.timestamp_micros())
            .bind(i64::from(limit))
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        count.map(to_count).transpose()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.health_check().await
    }
}
