use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

/// Per-probe timeout classes, each floored through `within()`.
pub const PAGE_TIMEOUT_MS: u64 = 6_000;
pub const ASSET_TIMEOUT_MS: u64 = 2_000;
pub const SMALL_TIMEOUT_MS: u64 = 2_500;
pub const PSI_TIMEOUT_MS: u64 = 3_000;

/// No probe gets less than this, even with the budget nearly gone.
const MIN_PROBE_TIMEOUT_MS: u64 = 150;

/// Wall-clock deadline plus a discretionary sub-request quota, owned by one
/// audit from start to return.
pub struct Budget {
    started: Instant,
    overall: Duration,
    quota: AtomicI64,
}

impl Budget {
    pub fn start(overall_ms: u64, quota: u32) -> Self {
        Self {
            started: Instant::now(),
            overall: Duration::from_millis(overall_ms),
            quota: AtomicI64::new(quota as i64),
        }
    }

    pub fn overall_ms(&self) -> u64 {
        self.overall.as_millis() as u64
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn time_left(&self) -> Duration {
        self.overall.saturating_sub(self.started.elapsed())
    }

    pub fn time_left_ms(&self) -> u64 {
        self.time_left().as_millis() as u64
    }

    /// Shape a per-probe timeout so its deadline never exceeds the overall
    /// budget: `clamp(ms, 150ms, time_left)`.
    pub fn within(&self, ms: u64) -> Duration {
        let shaped = ms.min(self.time_left_ms()).max(MIN_PROBE_TIMEOUT_MS);
        Duration::from_millis(shaped)
    }

    /// Charge `n` discretionary sub-requests. False means the quota is
    /// exhausted and the probe must be skipped.
    pub fn spend(&self, n: u32) -> bool {
        let n = n as i64;
        let prev = self.quota.fetch_sub(n, Ordering::SeqCst);
        if prev < n {
            self.quota.fetch_add(n, Ordering::SeqCst);
            false
        } else {
            true
        }
    }

    pub fn remaining_quota(&self) -> u32 {
        self.quota.load(Ordering::SeqCst).max(0) as u32
    }
}
