//! `StatsTimer` (1 Hz sampler over active outputs) and `ReplayStopTimer`
//! (bounded watchdog for a stuck replay finalization), spec §4.8.
//!
//! Both post their tick as a message onto the command worker rather than
//! touching orchestrator state directly, preserving the single-writer
//! discipline of spec §5.

use std::sync::mpsc::Sender;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::dispatcher::WorkerMsg;
use crate::engine::{EngineSignal, OutputKind};

pub const STATS_TICK_INTERVAL: Duration = Duration::from_secs(1);
pub const REPLAY_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// One per-output warning latch. Spec §4.8: at most one `OBS_WARNING` fires
/// per condition onset; it resets only when the condition clears.
#[derive(Debug, Clone, Copy, Default)]
pub struct WarningLatch {
    pub high_cpu_active: bool,
}

/// A tick the stats timer posts once per second for the orchestrator to
/// sample engine counters against (spec §4.8). Sampling the counters
/// themselves happens inside the orchestrator, which owns `Engine`; the
/// timer's only job is to produce ticks on schedule.
pub struct StatsTimer {
    handle: JoinHandle<()>,
}

impl StatsTimer {
    pub fn start(worker_tx: Sender<WorkerMsg>) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(STATS_TICK_INTERVAL);
            loop {
                interval.tick().await;
                if worker_tx
                    .send(WorkerMsg::EngineSignal(EngineSignal::StatsTick))
                    .is_err()
                {
                    break;
                }
            }
        });
        Self { handle }
    }
}

impl Drop for StatsTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// One-shot 10s watchdog started when the game exits while a replay capture
/// is in progress (spec §4.2.3, §4.8). If the capture hasn't finalized by
/// the deadline, posts a force-stop signal.
pub struct ReplayStopTimer {
    handle: JoinHandle<()>,
}

impl ReplayStopTimer {
    pub fn start(worker_tx: Sender<WorkerMsg>) -> Self {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(REPLAY_STOP_TIMEOUT).await;
            let _ = worker_tx.send(WorkerMsg::EngineSignal(EngineSignal::ReplayStopTimeout));
        });
        Self { handle }
    }

    /// Cancels the watchdog, e.g. because the capture finalized in time.
    pub fn cancel(self) {
        self.handle.abort();
    }
}

/// A stop-capture completion deadline — 60s of *encoded* time, not wall
/// clock (spec §4.5 Timeout, §5). Tracked by the replay output itself by
/// comparing `encoder_last_pts - save_ts`; this helper centralizes the
/// threshold so the orchestrator and `ReplayBuffer` agree on it.
pub fn capture_stop_has_timed_out(encoder_last_pts_usec: i64, save_ts_usec: i64) -> bool {
    encoder_last_pts_usec - save_ts_usec > crate::outputs::replay::CAPTURE_STOP_TIMEOUT_USEC
}

pub const fn output_kind_label(kind: OutputKind) -> &'static str {
    match kind {
        OutputKind::Recording => "recording",
        OutputKind::Replay => "replay",
        OutputKind::Streaming => "streaming",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_stop_timeout_boundary() {
        assert!(!capture_stop_has_timed_out(60_000_000, 0));
        assert!(capture_stop_has_timed_out(60_000_001, 0));
    }
}
