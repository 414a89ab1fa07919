use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use common::{Database, Ledger, Transaction, WalletBalance};
use tokio::sync::Mutex;

pub struct AppState {
    pub db: Database,
    pub views: ViewCache,
}

impl AppState {
    pub async fn new(database_url: &str, acquire_timeout: Duration) -> Result<Self> {
        let db = Database::new(database_url, acquire_timeout).await?;
        log::info!("Database initialized successfully!");

        Ok(AppState {
            db,
            views: ViewCache::default(),
        })
    }

    pub fn ledger(&self) -> Ledger<'_> {
        Ledger::new(&self.db)
    }
}

#[derive(Default, Clone)]
struct UserViews {
    generation: u64,
    balance: Option<WalletBalance>,
    transactions: Option<Vec<Transaction>>,
}

/// Per-user cache of the wallet balance and transaction history views.
/// Any write to a user's wallet or transactions must call [`ViewCache::invalidate`].
///
/// Readers take [`ViewCache::generation`] before querying the database and
/// pass it back when storing. A store whose generation was bumped by an
/// invalidation in the meantime is dropped.
#[derive(Default)]
pub struct ViewCache {
    users: Mutex<HashMap<i64, UserViews>>,
}

impl ViewCache {
    pub async fn generation(&self, user_id: i64) -> u64 {
        let guard = self.users.lock().await;
        guard.get(&user_id).map(|v| v.generation).unwrap_or(0)
    }

    pub async fn balance(&self, user_id: i64) -> Option<WalletBalance> {
        let guard = self.users.lock().await;
        guard.get(&user_id).and_then(|v| v.balance)
    }

    pub async fn store_balance(&self, user_id: i64, generation: u64, balance: WalletBalance) {
        let mut guard = self.users.lock().await;
        let views = guard.entry(user_id).or_default();
        if views.generation == generation {
            views.balance = Some(balance);
        } else {
            log::debug!("Dropped stale balance view for user {}", user_id);
        }
    }

    pub async fn transactions(&self, user_id: i64) -> Option<Vec<Transaction>> {
        let guard = self.users.lock().await;
        guard.get(&user_id).and_then(|v| v.transactions.clone())
    }

    pub async fn store_transactions(
        &self,
        user_id: i64,
        generation: u64,
        transactions: Vec<Transaction>,
    ) {
        let mut guard = self.users.lock().await;
        let views = guard.entry(user_id).or_default();
        if views.generation == generation {
            views.transactions = Some(transactions);
        } else {
            log::debug!("Dropped stale history view for user {}", user_id);
        }
    }

    pub async fn invalidate(&self, user_id: i64) {
        let mut guard = self.users.lock().await;
        let views = guard.entry(user_id).or_default();
        views.generation += 1;
        views.balance = None;
        views.transactions = None;
        log::debug!("Invalidated cached views for user {}", user_id);
    }
}
