use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{error, info};

use crate::monkey::Monkey;
use crate::source::{FetchError, MonkeySource};

pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Error, PartialEq)]
pub enum MonkeyError {
    #[error("Monkey name cannot be null or empty")]
    EmptyName,
    #[error("Monkey '{0}' not found")]
    NotFound(String),
}

#[derive(Default)]
struct Snapshot {
    monkeys: Arc<Vec<Monkey>>,
    refreshed_at: Option<Instant>,
}

impl Snapshot {
    fn is_expired(&self, expiration: Duration) -> bool {
        self.refreshed_at.is_none_or(|at| at.elapsed() > expiration)
    }
}

/// Time-bounded copy of the remote monkey collection.
///
/// Expiry is checked lazily on access. Refreshes are serialized by
/// `refresh_lock`; the snapshot itself sits behind a separate lock that is
/// only held for the swap, so readers never wait on a fetch in progress
/// unless they need a refresh themselves. Callers that queue behind a fetch
/// take its outcome, successful or not, instead of fetching again.
pub struct MonkeyCache {
    source: Box<dyn MonkeySource>,
    expiration: Duration,
    snapshot: RwLock<Snapshot>,
    refresh_lock: Mutex<()>,
    // Completed fetches, successful or not.
    attempts: AtomicU64,
}

impl MonkeyCache {
    pub fn new(source: impl MonkeySource + 'static, expiration: Duration) -> Self {
        Self {
            source: Box::new(source),
            expiration,
            snapshot: RwLock::new(Snapshot::default()),
            refresh_lock: Mutex::new(()),
            attempts: AtomicU64::new(0),
        }
    }

    /// All monkeys, refreshing first if the snapshot has expired.
    ///
    /// A failed refresh falls back to the last good snapshot, or an empty
    /// list if nothing was ever loaded.
    pub async fn get_all(&self) -> Arc<Vec<Monkey>> {
        if let Some(monkeys) = self.fresh() {
            return monkeys;
        }

        let seen = self.attempts.load(Ordering::Acquire);
        let _guard = self.refresh_lock.lock().await;
        // Another caller may have fetched while we waited.
        if let Some(monkeys) = self.fresh() {
            return monkeys;
        }
        if self.attempts.load(Ordering::Acquire) == seen {
            let _ = self.load().await;
        }

        self.snapshot.read().monkeys.clone()
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Monkey, MonkeyError> {
        if name.trim().is_empty() {
            return Err(MonkeyError::EmptyName);
        }

        self.get_all()
            .await
            .iter()
            .find(|m| m.matches_name(name))
            .cloned()
            .ok_or_else(|| MonkeyError::NotFound(name.to_string()))
    }

    /// Fetches unconditionally. The snapshot is only replaced on success.
    pub async fn force_refresh(&self) -> Result<usize, FetchError> {
        let _guard = self.refresh_lock.lock().await;
        self.load().await
    }

    fn fresh(&self) -> Option<Arc<Vec<Monkey>>> {
        let snapshot = self.snapshot.read();
        if snapshot.is_expired(self.expiration) {
            None
        } else {
            Some(snapshot.monkeys.clone())
        }
    }

    // Caller must hold `refresh_lock`.
    async fn load(&self) -> Result<usize, FetchError> {
        info!("loading monkeys from source");

        let fetched = self.source.fetch().await;
        self.attempts.fetch_add(1, Ordering::Release);

        match fetched {
            Ok(monkeys) => {
                let count = monkeys.len();
                *self.snapshot.write() = Snapshot {
                    monkeys: Arc::new(monkeys),
                    refreshed_at: Some(Instant::now()),
                };
                info!(count, "loaded monkeys");
                Ok(count)
            }
            Err(e) => {
                error!(error = %e, "failed to load monkeys");
                Err(e)
            }
        }
    }
}
