use crate::db::Repository;
use crate::domain::LedgerSnapshot;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Application context shared by every view: the store plus a lazily loaded
/// snapshot of it. Writers must call `invalidate` after changing the store.
pub struct LedgerContext {
    repo: Arc<Repository>,
    cached: RwLock<Option<Arc<LedgerSnapshot>>>,
}

impl LedgerContext {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self {
            repo,
            cached: RwLock::new(None),
        }
    }

    pub fn repo(&self) -> &Arc<Repository> {
        &self.repo
    }

    /// Current snapshot, loading it from the store on first use after an invalidation.
    pub async fn snapshot(&self) -> Result<Arc<LedgerSnapshot>, sqlx::Error> {
        if let Some(snapshot) = self.cached.read().await.as_ref() {
            return Ok(snapshot.clone());
        }

        let mut slot = self.cached.write().await;
        // Another task may have loaded it while we waited for the write lock.
        if let Some(snapshot) = slot.as_ref() {
            return Ok(snapshot.clone());
        }
        let snapshot = Arc::new(self.repo.load_snapshot().await?);
        debug!(
            assets = snapshot.assets.len(),
            transactions = snapshot.transactions.len(),
            accounts = snapshot.accounts.len(),
            "Ledger snapshot loaded"
        );
        *slot = Some(snapshot.clone());
        Ok(snapshot)
    }

    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }
}
