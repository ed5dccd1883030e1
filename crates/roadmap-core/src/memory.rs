//! In-memory stores
//!
//! Single-process implementations of [`UsageStore`] and [`ReportStore`] for
//! tests and `--database memory` development runs. The usage counter relies on
//! the DashMap entry lock for its `count < limit` predicate, so it is only
//! atomic within one process.

use crate::error::StoreError;
use crate::governor::UsageStore;
use crate::identity::{OwnershipIdentity, QuotaIdentity};
use crate::reports::{RenderedReport, ReportStore, ReportSummary};
use crate::types::{ReportId, Tool, ToolkitGroup};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::cmp::Reverse;

#[derive(Debug, Clone, Copy)]
struct Counter {
    count: u32,
    last_updated: DateTime<Utc>,
}

/// DashMap-backed usage counters
#[derive(Debug, Default)]
pub struct MemoryUsageStore {
    counters: DashMap<(QuotaIdentity, Tool), Counter>,
}

impl MemoryUsageStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// When the counter was last written
    #[must_use]
    pub fn last_updated(&self, identity: &QuotaIdentity, tool: Tool) -> Option<DateTime<Utc>> {
        self.counters
            .get(&(identity.clone(), tool))
            .map(|c| c.last_updated)
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn read_count(&self, identity: &QuotaIdentity, tool: Tool) -> Result<u32, StoreError> {
        Ok(self
            .counters
            .get(&(identity.clone(), tool))
            .map_or(0, |c| c.count))
    }

    async fn try_increment(
        &self,
        identity: &QuotaIdentity,
        tool: Tool,
        limit: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<u32>, StoreError> {
        // The entry guard holds the shard lock for the whole read-compare-write.
        match self.counters.entry((identity.clone(), tool)) {
            Entry::Occupied(mut entry) => {
                let counter = entry.get_mut();
                if counter.count >= limit {
                    return Ok(None);
                }
                counter.count += 1;
                counter.last_updated = now;
                Ok(Some(counter.count))
            }
            Entry::Vacant(entry) => {
                if limit == 0 {
                    return Ok(None);
                }
                entry.insert(Counter {
                    count: 1,
                    last_updated: now,
                });
                Ok(Some(1))
            }
        }
    }
}

/// DashMap-backed report store
#[derive(Debug, Default)]
pub struct MemoryReportStore {
    reports: DashMap<ReportId, RenderedReport>,
}

impl MemoryReportStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total reports across all owners
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    /// Check if no reports are stored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn insert(&self, report: &RenderedReport) -> Result<(), StoreError> {
        match self.reports.entry(report.id) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "duplicate report id {}",
                report.id
            ))),
            Entry::Vacant(entry) => {
                entry.insert(report.clone());
                Ok(())
            }
        }
    }

    async fn list(
        &self,
        owner: &OwnershipIdentity,
        groups: &[ToolkitGroup],
    ) -> Result<Vec<ReportSummary>, StoreError> {
        let mut summaries: Vec<ReportSummary> = self
            .reports
            .iter()
            .filter(|r| &r.owner == owner && groups.contains(&r.toolkit))
            .map(|r| r.summary())
            .collect();
        summaries.sort_by_key(|s| Reverse((s.created_at, s.id)));
        Ok(summaries)
    }

    async fn get(
        &self,
        owner: &OwnershipIdentity,
        id: ReportId,
    ) -> Result<Option<RenderedReport>, StoreError> {
        Ok(self
            .reports
            .get(&id)
            .filter(|r| &r.owner == owner)
            .map(|r| r.value().clone()))
    }

    async fn delete(&self, owner: &OwnershipIdentity, id: ReportId) -> Result<bool, StoreError> {
        Ok(self.reports.remove_if(&id, |_, r| &r.owner == owner).is_some())
    }
}
