use crate::schema::{Tally, VoteSummary};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Where harvested records live between runs.
///
/// Writes are append-only; nothing is deduplicated here.
#[async_trait]
pub trait VoteStore: Send + Sync {
    async fn find_summaries_by_url(&self, url: &str) -> Result<Vec<VoteSummary>, StoreError>;
    async fn find_all_summaries(&self) -> Result<Vec<VoteSummary>, StoreError>;
    async fn find_tallies_by_name(&self, name: &str) -> Result<Vec<Tally>, StoreError>;
    async fn insert_many_summaries(&self, records: &[VoteSummary]) -> Result<usize, StoreError>;
    async fn insert_many_tallies(&self, records: &[Tally]) -> Result<usize, StoreError>;
    async fn delete_all_summaries(&self) -> Result<usize, StoreError>;
    async fn delete_all_tallies(&self) -> Result<usize, StoreError>;

    /// Full database clear.
    async fn clear(&self) -> Result<(), StoreError> {
        let tallies = self.delete_all_tallies().await?;
        let summaries = self.delete_all_summaries().await?;
        tracing::info!(tallies, summaries, "cleared vote store");
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    summaries: Mutex<Vec<VoteSummary>>,
    tallies: Mutex<Vec<Tally>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn tallies(&self) -> Vec<Tally> {
        self.tallies.lock().await.clone()
    }
}

#[async_trait]
impl VoteStore for MemoryStore {
    async fn find_summaries_by_url(&self, url: &str) -> Result<Vec<VoteSummary>, StoreError> {
        let summaries = self.summaries.lock().await;
        Ok(summaries.iter().filter(|s| s.url == url).cloned().collect())
    }

    async fn find_all_summaries(&self) -> Result<Vec<VoteSummary>, StoreError> {
        Ok(self.summaries.lock().await.clone())
    }

    async fn find_tallies_by_name(&self, name: &str) -> Result<Vec<Tally>, StoreError> {
        let tallies = self.tallies.lock().await;
        Ok(tallies.iter().filter(|t| t.name == name).cloned().collect())
    }

    async fn insert_many_summaries(&self, records: &[VoteSummary]) -> Result<usize, StoreError> {
        self.summaries.lock().await.extend_from_slice(records);
        Ok(records.len())
    }

    async fn insert_many_tallies(&self, records: &[Tally]) -> Result<usize, StoreError> {
        self.tallies.lock().await.extend_from_slice(records);
        Ok(records.len())
    }

    async fn delete_all_summaries(&self) -> Result<usize, StoreError> {
        let mut summaries = self.summaries.lock().await;
        let removed = summaries.len();
        summaries.clear();
        Ok(removed)
    }

    async fn delete_all_tallies(&self) -> Result<usize, StoreError> {
        let mut tallies = self.tallies.lock().await;
        let removed = tallies.len();
        tallies.clear();
        Ok(removed)
    }
}
