//! `OutputBase`: lifecycle states and frame statistics shared by the
//! recorder, replay buffer and streamer (spec §4, §8 invariants).

use crate::protocol::Identifier;

/// Warm-up baseline: the first N drawn frames are excluded from both drawn
/// and lagged counts (spec §3 OutputStatistics).
pub const K_DELAY_FRAME_COUNTER: u64 = 1000;

/// `idle → delayed → active → stopping → idle` (spec §2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    Idle,
    DelayActive,
    Active,
    Stopping,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputStatistics {
    pub drawn_frames: u64,
    pub lagged_frames: u64,
    pub percentage_lagged: f64,
    pub dropped_frames: u64,
    pub total_frames: u64,
    pub percentage_dropped: f64,
    pub skipped_frames: u64,
}

/// Raw engine counters before the warm-up baseline is subtracted.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCounters {
    pub drawn_frames: u64,
    pub lagged_frames: u64,
    pub dropped_frames: u64,
    pub total_frames: u64,
    pub skipped_frames: u64,
}

/// Common lifecycle and statistics state, embedded by `Recorder`,
/// `ReplayBuffer`, and `Streamer` (spec §4 OutputBase).
#[derive(Debug, Clone)]
pub struct OutputBase {
    pub identifier: Identifier,
    pub state: OutputState,
    /// Drawn-frame count captured the first time this output sampled
    /// counters after becoming active; used to apply the warm-up baseline.
    baseline_drawn: Option<u64>,
    baseline_lagged: Option<u64>,
    /// Last `percentage_lagged` at which an `OBS_WARNING` fired, so a
    /// repeat only fires on a further +5% increase (spec §4.8).
    pub last_warned_lag_percentage: Option<f64>,
    /// Whether a high-cpu warning is currently "latched" (spec §4.8).
    pub high_cpu_warning_active: bool,
}

impl Default for OutputBase {
    fn default() -> Self {
        Self {
            identifier: Identifier::NONE,
            state: OutputState::Idle,
            baseline_drawn: None,
            baseline_lagged: None,
            last_warned_lag_percentage: None,
            high_cpu_warning_active: false,
        }
    }
}

impl OutputBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn start_delay(&mut self, identifier: Identifier) {
        self.identifier = identifier;
        self.state = OutputState::DelayActive;
    }

    pub fn start_active(&mut self, identifier: Identifier) {
        self.identifier = identifier;
        self.state = OutputState::Active;
        self.baseline_drawn = None;
        self.baseline_lagged = None;
    }

    pub fn begin_stopping(&mut self) {
        self.state = OutputState::Stopping;
    }

    pub fn finish_stop(&mut self) {
        self.state = OutputState::Idle;
        self.baseline_drawn = None;
        self.baseline_lagged = None;
        self.last_warned_lag_percentage = None;
        self.high_cpu_warning_active = false;
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, OutputState::Idle)
    }

    pub fn is_delayed(&self) -> bool {
        matches!(self.state, OutputState::DelayActive)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, OutputState::Active)
    }

    /// Applies the `K_DELAY_FRAME_COUNTER` warm-up baseline to raw engine
    /// counters and derives the percentage fields (spec §3).
    pub fn derive_statistics(&mut self, raw: RawCounters) -> OutputStatistics {
        let baseline_drawn = *self.baseline_drawn.get_or_insert(raw.drawn_frames);
        let baseline_lagged = *self.baseline_lagged.get_or_insert(raw.lagged_frames);

        let drawn = raw.drawn_frames.saturating_sub(baseline_drawn);
        let lagged = raw.lagged_frames.saturating_sub(baseline_lagged);

        let percentage_lagged = if drawn > 0 {
            (lagged as f64 / drawn as f64) * 100.0
        } else {
            0.0
        };
        let percentage_dropped = if raw.total_frames > 0 {
            (raw.dropped_frames as f64 / raw.total_frames as f64) * 100.0
        } else {
            0.0
        };

        OutputStatistics {
            drawn_frames: drawn,
            lagged_frames: lagged,
            percentage_lagged,
            dropped_frames: raw.dropped_frames,
            total_frames: raw.total_frames,
            percentage_dropped,
            skipped_frames: raw.skipped_frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_1000_drawn_frames_excluded_from_lag_percentage() {
        let mut base = OutputBase::new();
        base.start_active(Identifier(1));
        // Warm-up sample: 1000 drawn, 50 lagged.
        let stats = base.derive_statistics(RawCounters {
            drawn_frames: 1000,
            lagged_frames: 50,
            dropped_frames: 0,
            total_frames: 1000,
            skipped_frames: 0,
        });
        assert_eq!(stats.drawn_frames, 0);
        assert_eq!(stats.lagged_frames, 0);

        // 100 more frames drawn, 10 more lagged, after baseline.
        let stats = base.derive_statistics(RawCounters {
            drawn_frames: 1100,
            lagged_frames: 60,
            dropped_frames: 0,
            total_frames: 1100,
            skipped_frames: 0,
        });
        assert_eq!(stats.drawn_frames, 100);
        assert_eq!(stats.lagged_frames, 10);
        assert!((stats.percentage_lagged - 10.0).abs() < 1e-9);
    }
}
