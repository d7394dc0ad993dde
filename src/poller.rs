use crate::host::HostClient;
use crate::metrics::Metrics;
use crate::mock;
use crate::settings::SettingsStore;
use crate::state::PanelState;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{watch, RwLock};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

// The polling loop and the manual refresh endpoint share one sampler, so
// every fetch goes through the same sequence-stamping discipline.
#[derive(Clone)]
pub struct Sampler {
    state: Arc<RwLock<PanelState>>,
    settings: SettingsStore,
    host: HostClient,
    metrics: Arc<Metrics>,
    seq: Arc<AtomicU64>,
}

impl Sampler {
    pub fn new(
        state: Arc<RwLock<PanelState>>,
        settings: SettingsStore,
        host: HostClient,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            state,
            settings,
            host,
            metrics,
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn fetch_once(&self) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;

        // mock_mode is read at fetch time, so a settings change takes
        // effect on the next cycle and never mid-cycle.
        let result = if self.settings.mock_mode().await {
            Ok(mock::synthetic_snapshot())
        } else {
            self.host.get_sensor_data().await
        };

        let now = now_unix();
        let mut guard = self.state.write().await;
        match result {
            Ok(snapshot) => {
                if guard.apply_success(seq, snapshot, now) {
                    debug!(seq, "снимок применён");
                } else {
                    debug!(seq, "устаревший результат отброшен");
                }
            }
            Err(err) => {
                if guard.apply_failure(seq, err.to_string()) {
                    warn!(seq, error = %err, "не удалось получить снимок с хоста");
                }
            }
        }
        let applied = guard.clone();
        drop(guard);

        self.metrics.update_from_state(&applied);
    }

    // After stop the state discards every late-arriving result.
    pub async fn stop(&self) {
        self.state.write().await.mark_stopped();
    }
}

// One eager fetch, then a fixed cadence. Each tick spawns an independent
// fetch, so a hung request delays only its own cycle. No backoff: a
// restarted host reconnects within one interval.
pub fn spawn(
    sampler: Sampler,
    interval_ms: u64,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    sampler.stop().await;
                    info!("опрос датчиков остановлен");
                    break;
                }
                _ = ticker.tick() => {
                    let sampler = sampler.clone();
                    tokio::spawn(async move { sampler.fetch_once().await });
                }
            }
        }
    })
}

pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
