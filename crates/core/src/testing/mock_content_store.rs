//! In-memory content store for testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use crate::content::{
    ContentRecord, ContentStore, ContentStoreError, ProjectEntry, ProjectIndex, RateLimitSnapshot,
    UpdateOutcome,
};

/// Holds records in a map and reports a configurable quota on updates.
#[derive(Debug)]
pub struct MockContentStore {
    records: Arc<RwLock<HashMap<String, ContentRecord>>>,
    index: Arc<RwLock<ProjectIndex>>,
    remaining: Arc<RwLock<u64>>,
    report_rate_limit: Arc<RwLock<bool>>,
    limit: u64,
    next_error: Arc<RwLock<Option<ContentStoreError>>>,
    next_id: Arc<RwLock<u64>>,
}

impl Default for MockContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockContentStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            index: Arc::new(RwLock::new(ProjectIndex::default())),
            remaining: Arc::new(RwLock::new(5000)),
            report_rate_limit: Arc::new(RwLock::new(true)),
            limit: 5000,
            next_error: Arc::new(RwLock::new(None)),
            next_id: Arc::new(RwLock::new(1)),
        }
    }

    pub async fn insert(&self, id: &str, record: ContentRecord) {
        self.records.write().await.insert(id.to_string(), record);
    }

    pub async fn record(&self, id: &str) -> Option<ContentRecord> {
        self.records.read().await.get(id).cloned()
    }

    /// Quota reported by the next updates.
    pub async fn set_remaining(&self, remaining: u64) {
        *self.remaining.write().await = remaining;
    }

    /// Whether updates report rate-limit telemetry at all.
    pub async fn set_report_rate_limit(&self, report: bool) {
        *self.report_rate_limit.write().await = report;
    }

    /// Fail the next operation with `error`.
    pub async fn set_next_error(&self, error: ContentStoreError) {
        *self.next_error.write().await = Some(error);
    }

    async fn take_error(&self) -> Option<ContentStoreError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl ContentStore for MockContentStore {
    async fn get(&self, id: &str) -> Result<ContentRecord, ContentStoreError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.record(id)
            .await
            .ok_or_else(|| ContentStoreError::NotFound(id.to_string()))
    }

    async fn update(
        &self,
        id: &str,
        record: &ContentRecord,
    ) -> Result<UpdateOutcome, ContentStoreError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        let mut records = self.records.write().await;
        if !records.contains_key(id) {
            return Err(ContentStoreError::NotFound(id.to_string()));
        }
        records.insert(id.to_string(), record.clone());

        let mut remaining = self.remaining.write().await;
        let snapshot = RateLimitSnapshot {
            remaining: *remaining,
            limit: self.limit,
            reset_at: Utc::now() + Duration::hours(1),
        };
        *remaining = remaining.saturating_sub(1);

        let rate_limit = if *self.report_rate_limit.read().await {
            Some(snapshot)
        } else {
            None
        };
        Ok(UpdateOutcome {
            rate_limit,
            attempts: 1,
        })
    }

    async fn create(&self, name: &str) -> Result<String, ContentStoreError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        let mut next_id = self.next_id.write().await;
        let id = format!("mock-gist-{}", *next_id);
        *next_id += 1;

        self.records
            .write()
            .await
            .insert(id.clone(), ContentRecord::empty(name));
        self.index.write().await.projects.push(ProjectEntry {
            name: name.to_string(),
            id: id.clone(),
        });
        Ok(id)
    }

    async fn list(&self) -> Result<ProjectIndex, ContentStoreError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        Ok(self.index.read().await.clone())
    }
}
