use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::AppError;
use crate::storage::db::SurrealDbClient;
use crate::utils::config::{AppConfig, CountStoreKind};

/// Rows per UPSERT statement in the persistent backend, kept well under the
/// server's query parameter budget.
const UPSERT_CHUNK_ROWS: usize = 1000;

/// System of record for how many source files each coupon code appeared in.
///
/// `bulk_increment` is atomic with respect to concurrent `get`: a reader never
/// observes a partially applied batch at the entry level.
#[async_trait]
pub trait CouponCountRepository: Send + Sync {
    /// Point lookup; `None` when the code has never been counted.
    async fn get(&self, code: &str) -> Result<Option<u32>, AppError>;

    /// Add every `(code, n)` of the batch to the stored counts, creating
    /// absent entries.
    async fn bulk_increment(&self, batch: HashMap<String, u32>) -> Result<(), AppError>;

    /// Drop all entries. Called at the start of every ingestion pass.
    async fn reset(&self) -> Result<(), AppError>;

    /// Copy of all entries, for operator inspection. O(N) in entries.
    async fn snapshot(&self) -> Result<HashMap<String, u32>, AppError>;

    /// Release backend resources.
    async fn close(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// Create the count repository selected by configuration.
pub async fn create_count_repository(
    config: &AppConfig,
) -> Result<Arc<dyn CouponCountRepository>, AppError> {
    match config.count_store {
        CountStoreKind::Memory => Ok(Arc::new(InMemoryCountRepository::new())),
        CountStoreKind::Surreal => {
            let address = config
                .surrealdb_address
                .as_deref()
                .ok_or_else(|| AppError::Validation("surrealdb_address is required".into()))?;
            let db = SurrealDbClient::new(
                address,
                config.surrealdb_username.as_deref().unwrap_or("root"),
                config.surrealdb_password.as_deref().unwrap_or("root"),
                config.surrealdb_namespace.as_deref().unwrap_or("promo"),
                config.surrealdb_database.as_deref().unwrap_or("promo"),
            )
            .await?;
            let repository = SurrealCountRepository::new(Arc::new(db)).await?;
            Ok(Arc::new(repository))
        }
    }
}

/// Default backend: one hash map behind a reader/writer lock. Lookups take
/// the shared side; batch writes and resets take the exclusive side.
#[derive(Default)]
pub struct InMemoryCountRepository {
    counts: RwLock<HashMap<String, u32>>,
}

impl InMemoryCountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CouponCountRepository for InMemoryCountRepository {
    async fn get(&self, code: &str) -> Result<Option<u32>, AppError> {
        Ok(self.counts.read().await.get(code).copied())
    }

    async fn bulk_increment(&self, batch: HashMap<String, u32>) -> Result<(), AppError> {
        let mut counts = self.counts.write().await;
        for (code, increment) in batch {
            *counts.entry(code).or_insert(0) += increment;
        }
        Ok(())
    }

    async fn reset(&self) -> Result<(), AppError> {
        self.counts.write().await.clear();
        Ok(())
    }

    async fn snapshot(&self) -> Result<HashMap<String, u32>, AppError> {
        Ok(self.counts.read().await.clone())
    }
}

#[derive(Debug, Clone, Serialize)]
struct CountRow {
    code: String,
    count: u32,
}

#[derive(Debug, Deserialize)]
struct SnapshotRow {
    code: String,
    count: u32,
}

/// Persistent backend over SurrealDB.
///
/// `bulk_increment` runs batched UPSERTs inside a single transaction: either
/// the whole batch lands or none of it does.
pub struct SurrealCountRepository {
    db: Arc<SurrealDbClient>,
}

impl SurrealCountRepository {
    pub async fn new(db: Arc<SurrealDbClient>) -> Result<Self, AppError> {
        db.ensure_initialized().await?;
        Ok(Self { db })
    }
}

#[async_trait]
impl CouponCountRepository for SurrealCountRepository {
    async fn get(&self, code: &str) -> Result<Option<u32>, AppError> {
        let mut response = self
            .db
            .query("SELECT VALUE count FROM type::thing('coupon_count', $code)")
            .bind(("code", code.to_string()))
            .await?;
        let counts: Vec<u32> = response.take(0)?;

        Ok(counts.into_iter().next())
    }

    async fn bulk_increment(&self, batch: HashMap<String, u32>) -> Result<(), AppError> {
        if batch.is_empty() {
            return Ok(());
        }

        let rows: Vec<CountRow> = batch
            .into_iter()
            .map(|(code, count)| CountRow { code, count })
            .collect();

        let mut query = self.db.query("BEGIN TRANSACTION");
        for (chunk_index, chunk) in rows.chunks(UPSERT_CHUNK_ROWS).enumerate() {
            let param = format!("rows_{chunk_index}");
            let statement = format!(
                "FOR $row IN ${param} {{ \
                 UPSERT type::thing('coupon_count', $row.code) SET count += $row.count; \
                 }}"
            );
            query = query.query(statement).bind((param, chunk.to_vec()));
        }
        let response = query.query("COMMIT TRANSACTION").await?;
        response.check()?;

        Ok(())
    }

    async fn reset(&self) -> Result<(), AppError> {
        self.db.query("DELETE coupon_count").await?.check()?;
        info!("coupon_count table truncated");
        Ok(())
    }

    async fn snapshot(&self) -> Result<HashMap<String, u32>, AppError> {
        let mut response = self
            .db
            .query("SELECT record::id(id) AS code, count FROM coupon_count")
            .await?;
        let rows: Vec<SnapshotRow> = response.take(0)?;

        Ok(rows.into_iter().map(|row| (row.code, row.count)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn batch(entries: &[(&str, u32)]) -> HashMap<String, u32> {
        entries
            .iter()
            .map(|(code, count)| (code.to_string(), *count))
            .collect()
    }

    #[tokio::test]
    async fn in_memory_counts_accumulate_across_batches() {
        let repository = InMemoryCountRepository::new();

        repository
            .bulk_increment(batch(&[("AAAAAAAA", 1), ("BBBBBBBB", 1)]))
            .await
            .expect("first batch");
        repository
            .bulk_increment(batch(&[("AAAAAAAA", 1)]))
            .await
            .expect("second batch");

        assert_eq!(repository.get("AAAAAAAA").await.expect("get"), Some(2));
        assert_eq!(repository.get("BBBBBBBB").await.expect("get"), Some(1));
        assert_eq!(repository.get("MISSING0").await.expect("get"), None);
    }

    #[tokio::test]
    async fn in_memory_batch_split_is_associative() {
        let one_shot = InMemoryCountRepository::new();
        let split = InMemoryCountRepository::new();

        one_shot
            .bulk_increment(batch(&[("AAAAAAAA", 3), ("BBBBBBBB", 2)]))
            .await
            .expect("one shot");

        split
            .bulk_increment(batch(&[("AAAAAAAA", 1), ("BBBBBBBB", 2)]))
            .await
            .expect("first split");
        split
            .bulk_increment(batch(&[("AAAAAAAA", 2)]))
            .await
            .expect("second split");

        assert_eq!(
            one_shot.snapshot().await.expect("snapshot"),
            split.snapshot().await.expect("snapshot")
        );
    }

    #[tokio::test]
    async fn in_memory_reset_clears_all_entries() {
        let repository = InMemoryCountRepository::new();

        repository
            .bulk_increment(batch(&[("AAAAAAAA", 2)]))
            .await
            .expect("batch");
        repository.reset().await.expect("reset");

        assert_eq!(repository.get("AAAAAAAA").await.expect("get"), None);
        assert!(repository.snapshot().await.expect("snapshot").is_empty());
    }

    async fn surreal_repository() -> SurrealCountRepository {
        let database = Uuid::new_v4().to_string();
        let db = SurrealDbClient::memory("test_ns", &database)
            .await
            .expect("Failed to start in-memory surrealdb");

        SurrealCountRepository::new(Arc::new(db))
            .await
            .expect("Failed to create repository")
    }

    #[tokio::test]
    async fn surreal_counts_accumulate_across_batches() {
        let repository = surreal_repository().await;

        repository
            .bulk_increment(batch(&[("AAAAAAAA", 1), ("BBBBBBBB", 1)]))
            .await
            .expect("first batch");
        repository
            .bulk_increment(batch(&[("AAAAAAAA", 1)]))
            .await
            .expect("second batch");

        assert_eq!(repository.get("AAAAAAAA").await.expect("get"), Some(2));
        assert_eq!(repository.get("BBBBBBBB").await.expect("get"), Some(1));
        assert_eq!(repository.get("MISSING0").await.expect("get"), None);
    }

    #[tokio::test]
    async fn surreal_bulk_increment_spans_multiple_chunks() {
        let repository = surreal_repository().await;

        // 2.5x the chunk size forces three statements inside one transaction.
        let large: HashMap<String, u32> = (0..2500)
            .map(|n| (format!("CODE{n:06}"), 1))
            .collect();
        repository
            .bulk_increment(large)
            .await
            .expect("chunked batch");

        let snapshot = repository.snapshot().await.expect("snapshot");
        assert_eq!(snapshot.len(), 2500);
        assert_eq!(repository.get("CODE000000").await.expect("get"), Some(1));
        assert_eq!(repository.get("CODE002499").await.expect("get"), Some(1));
    }

    #[tokio::test]
    async fn surreal_reset_clears_all_entries() {
        let repository = surreal_repository().await;

        repository
            .bulk_increment(batch(&[("AAAAAAAA", 2), ("BBBBBBBB", 1)]))
            .await
            .expect("batch");
        repository.reset().await.expect("reset");

        assert!(repository.snapshot().await.expect("snapshot").is_empty());
    }
}
