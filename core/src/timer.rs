//! Timer Manager (C4, §4.4). Named one-shot timers with a ~1s sweep,
//! driving callbacks back onto the event bus rather than mutating engine
//! state directly from the sweep task (§5's "post triggers back through
//! the event bus so all mutations stay on the engine loop" - the one
//! exception being `no_stop_loss_grace`'s direct close, see DESIGN.md).

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use riskguard_integration::collection::FnvIndexMap;
use riskguard_risk::context::{TimerCallback, TimerCommand};
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;

struct TimerEntry {
    fires_at: DateTime<Utc>,
    callback: TimerCallback,
}

#[derive(Default)]
struct Inner {
    timers: FnvIndexMap<String, TimerEntry>,
}

/// Holds named timers and sweeps for expiry. `start_timer` replacing an
/// existing same-named timer (idempotent) and `shutdown` dropping all
/// pending timers without firing are both §4.4 requirements.
pub struct TimerManager {
    inner: Arc<Mutex<Inner>>,
    fired: Arc<Mutex<Vec<TimerCallback>>>,
    sweep: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for TimerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerManager").finish_non_exhaustive()
    }
}

impl Default for TimerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerManager {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            fired: Arc::new(Mutex::new(Vec::new())),
            sweep: Mutex::new(None),
        }
    }

    /// Spawns the ≤1s sweep task. Fired callbacks accumulate in an
    /// internal queue; the engine loop drains them with [`Self::drain_fired`]
    /// and turns each into the appropriate action (§4.4: "callbacks run on
    /// the shared scheduler").
    pub fn spawn_sweep(self: &Arc<Self>) {
        let inner = Arc::clone(&self.inner);
        let fired = Arc::clone(&self.fired);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            loop {
                interval.tick().await;
                let now = Utc::now();
                let mut due = Vec::new();
                {
                    let mut inner = inner.lock();
                    let expired: Vec<String> = inner
                        .timers
                        .iter()
                        .filter(|(_, entry)| entry.fires_at <= now)
                        .map(|(name, _)| name.clone())
                        .collect();
                    for name in expired {
                        if let Some(entry) = inner.timers.shift_remove(&name) {
                            due.push(entry.callback);
                        }
                    }
                }
                if !due.is_empty() {
                    fired.lock().extend(due);
                }
            }
        });
        *self.sweep.lock() = Some(handle);
    }

    /// Callbacks the sweep has fired since the last drain, in fire order.
    pub fn drain_fired(&self) -> Vec<TimerCallback> {
        std::mem::take(&mut *self.fired.lock())
    }

    pub fn get_remaining_time(&self, name: &str) -> Option<ChronoDuration> {
        let inner = self.inner.lock();
        inner.timers.get(name).map(|entry| entry.fires_at - Utc::now())
    }

    /// Aborts the sweep task and drops every pending timer - no callback
    /// fires after this returns (§4.4).
    pub fn shutdown(&self) {
        if let Some(handle) = self.sweep.lock().take() {
            handle.abort();
        }
        self.inner.lock().timers.clear();
        self.fired.lock().clear();
    }
}

impl TimerCommand for TimerManager {
    fn start_timer(&self, name: String, duration: Duration, callback: TimerCallback) {
        let fires_at = Utc::now()
            + ChronoDuration::from_std(duration).unwrap_or_else(|_| ChronoDuration::seconds(0));
        self.inner.lock().timers.insert(name, TimerEntry { fires_at, callback });
    }

    fn cancel_timer(&self, name: &str) {
        self.inner.lock().timers.shift_remove(name);
    }

    fn has_timer(&self, name: &str) -> bool {
        self.inner.lock().timers.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskguard_sdk::{AccountId, ContractId, SymbolRoot};

    fn callback() -> TimerCallback {
        TimerCallback::CloseOnGraceExpiry {
            account_id: AccountId::from("A".to_string()),
            symbol: SymbolRoot::from("MNQ".to_string()),
            contract_id: ContractId::from("MNQZ25".to_string()),
        }
    }

    #[test]
    fn start_timer_is_idempotent_by_name() {
        let mgr = TimerManager::new();
        mgr.start_timer("t1".to_string(), Duration::from_secs(60), callback());
        assert!(mgr.has_timer("t1"));
        mgr.start_timer("t1".to_string(), Duration::from_secs(120), callback());
        assert_eq!(mgr.inner.lock().timers.len(), 1);
    }

    #[test]
    fn cancel_timer_is_a_no_op_when_absent() {
        let mgr = TimerManager::new();
        mgr.cancel_timer("nonexistent");
        assert!(!mgr.has_timer("nonexistent"));
    }

    #[tokio::test]
    async fn shutdown_drops_pending_timers_without_firing() {
        let mgr = Arc::new(TimerManager::new());
        mgr.spawn_sweep();
        mgr.start_timer("t1".to_string(), Duration::from_millis(10), callback());
        mgr.shutdown();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(mgr.drain_fired().is_empty());
    }
}
