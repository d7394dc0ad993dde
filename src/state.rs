use crate::snapshot::{ConnStatus, SensorSnapshot};

// The latest snapshot plus the bookkeeping that keeps overlapping fetches
// from being applied out of acquisition order.
#[derive(Debug, Clone, Default)]
pub struct PanelState {
    pub started_at_unix: i64,
    pub snapshot: Option<SensorSnapshot>,
    pub is_loading: bool,
    pub last_error: Option<String>,
    pub captured_at_unix: Option<i64>,
    pub poll_total: u64,
    pub poll_errors: u64,
    last_applied_seq: u64,
    stopped: bool,
}

impl PanelState {
    pub fn new(now_unix: i64) -> Self {
        Self {
            started_at_unix: now_unix,
            is_loading: true,
            ..Self::default()
        }
    }

    // Results older than the last applied one, or arriving after stop, are
    // discarded. Returns whether the snapshot was applied.
    pub fn apply_success(
        &mut self,
        seq: u64,
        mut snapshot: SensorSnapshot,
        now_unix: i64,
    ) -> bool {
        if !self.accept(seq) {
            return false;
        }

        self.poll_total += 1;
        self.last_error = None;
        if snapshot.status == ConnStatus::Connected {
            snapshot.captured_at_unix = Some(now_unix);
            self.captured_at_unix = Some(now_unix);
        } else {
            snapshot.captured_at_unix = None;
        }
        self.snapshot = Some(snapshot);
        true
    }

    // The last-known-good snapshot is retained on failure; only the error
    // slot changes.
    pub fn apply_failure(&mut self, seq: u64, error: String) -> bool {
        if !self.accept(seq) {
            return false;
        }

        self.poll_total += 1;
        self.poll_errors += 1;
        self.last_error = Some(error);
        true
    }

    pub fn mark_stopped(&mut self) {
        self.stopped = true;
    }

    pub fn connected(&self) -> bool {
        self.snapshot
            .as_ref()
            .is_some_and(|s| s.status == ConnStatus::Connected)
    }

    fn accept(&mut self, seq: u64) -> bool {
        if self.stopped || seq <= self.last_applied_seq {
            return false;
        }
        self.last_applied_seq = seq;
        self.is_loading = false;
        true
    }
}
