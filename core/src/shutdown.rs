//! Graceful shutdown (§5): stop accepting events, cancel all timers, await
//! in-flight enforcements with a bounded timeout (default 30s), then flush
//! the persistent store. Grounded in the teacher's `Shutdown` marker-event
//! pattern, extended here with the bounded-wait sequence the spec requires.

use crate::timer::TimerManager;
use riskguard_store::Store;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Shutdown signal carried on the event bus / engine command channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
pub struct Shutdown;

/// Default bound on waiting for in-flight enforcement to finish before
/// shutdown proceeds anyway (§5).
pub const DEFAULT_ENFORCEMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Drives the shutdown sequence. Constructed once the engine decides to
/// stop; `run` consumes it.
pub struct ShutdownSequence {
    pub timers: Arc<TimerManager>,
    pub store: Arc<dyn Store>,
    pub enforcement_timeout: Duration,
}

impl std::fmt::Debug for ShutdownSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownSequence").finish_non_exhaustive()
    }
}

impl ShutdownSequence {
    pub fn new(timers: Arc<TimerManager>, store: Arc<dyn Store>) -> Self {
        Self {
            timers,
            store,
            enforcement_timeout: DEFAULT_ENFORCEMENT_TIMEOUT,
        }
    }

    /// Runs the sequence: cancel timers, await `in_flight` (capped at
    /// `enforcement_timeout`), then flush the store. `in_flight` is
    /// whatever future the caller is using to track outstanding
    /// enforcement dispatches - a no-op future when nothing is pending.
    pub async fn run<F>(self, in_flight: F) -> Result<(), riskguard_store::StoreError>
    where
        F: std::future::Future<Output = ()>,
    {
        self.timers.shutdown();
        if tokio::time::timeout(self.enforcement_timeout, in_flight).await.is_err() {
            tracing::warn!(
                timeout_secs = self.enforcement_timeout.as_secs(),
                "shutdown proceeding before in-flight enforcement finished"
            );
        }
        self.store.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskguard_store::MemoryStore;

    #[tokio::test]
    async fn run_flushes_store_even_when_enforcement_future_is_slow() {
        let timers = Arc::new(TimerManager::new());
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let sequence = ShutdownSequence {
            timers,
            store,
            enforcement_timeout: Duration::from_millis(20),
        };
        sequence.run(tokio::time::sleep(Duration::from_secs(5))).await.unwrap();
    }

    #[tokio::test]
    async fn run_completes_immediately_when_nothing_in_flight() {
        let timers = Arc::new(TimerManager::new());
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let sequence = ShutdownSequence::new(timers, store);
        sequence.run(async {}).await.unwrap();
    }
}
