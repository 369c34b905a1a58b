//! `BlackTextureProbe`: an off-band render tap that samples the composed
//! frame and, on N consecutive black samples, signals a switch to
//! compatibility mode (spec §4.2.4).

use std::time::Duration;

/// The source kind a probe result applies to. Only monitor and game
/// sources are probed (spec §4.2.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeTarget {
    Monitor,
    Game,
}

impl ProbeTarget {
    /// Sampling interval for this target.
    pub fn interval(self) -> Duration {
        match self {
            ProbeTarget::Monitor => Duration::from_millis(250),
            ProbeTarget::Game => Duration::from_secs(3),
        }
    }

    /// Consecutive black samples required to declare the source black.
    pub fn max_consecutive(self) -> u32 {
        match self {
            ProbeTarget::Monitor => 4,
            ProbeTarget::Game => 10,
        }
    }
}

/// Minimum colored pixels in a single sampled frame to call it "colored".
pub const MIN_COLORED_PIXEL_COUNT: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeEvent {
    BlackDetected(ProbeTarget),
    ColoredDetected(ProbeTarget),
}

#[derive(Debug, Default, Clone, Copy)]
struct Counter {
    consecutive_black: u32,
    registered: bool,
}

/// Tracks black/colored sample streaks per probed target. A target is
/// "registered" (actively sampled) only while its source is visible;
/// unregistering does not reset the streak — spec §4.2.4 only says
/// registration happens on demand and unregistration follows a detection
/// result, so a re-registration after an unrelated visibility flicker
/// resumes rather than restarts.
#[derive(Debug, Default)]
pub struct BlackTextureProbe {
    monitor: Counter,
    game: Counter,
}

impl BlackTextureProbe {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&mut self, target: ProbeTarget) -> &mut Counter {
        match target {
            ProbeTarget::Monitor => &mut self.monitor,
            ProbeTarget::Game => &mut self.game,
        }
    }

    pub fn register(&mut self, target: ProbeTarget) {
        self.counter(target).registered = true;
    }

    pub fn unregister(&mut self, target: ProbeTarget) {
        let counter = self.counter(target);
        counter.registered = false;
        counter.consecutive_black = 0;
    }

    pub fn is_registered(&self, target: ProbeTarget) -> bool {
        match target {
            ProbeTarget::Monitor => self.monitor.registered,
            ProbeTarget::Game => self.game.registered,
        }
    }

    /// Resets the game sub-state, e.g. when the game process exits
    /// (spec §4.2.3).
    pub fn reset_game(&mut self) {
        self.game = Counter::default();
    }

    /// Feeds one sampled frame's colored-pixel count. Returns an event when
    /// the sample flips the probe's verdict.
    pub fn sample(&mut self, target: ProbeTarget, colored_pixel_count: u32) -> Option<ProbeEvent> {
        if !self.is_registered(target) {
            return None;
        }

        if colored_pixel_count >= MIN_COLORED_PIXEL_COUNT {
            let counter = self.counter(target);
            let was_black_streak = counter.consecutive_black > 0;
            counter.consecutive_black = 0;
            if was_black_streak {
                return Some(ProbeEvent::ColoredDetected(target));
            }
            return None;
        }

        let max = target.max_consecutive();
        let counter = self.counter(target);
        counter.consecutive_black += 1;
        if counter.consecutive_black == max {
            Some(ProbeEvent::BlackDetected(target))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monitor_needs_four_consecutive_black_samples() {
        let mut probe = BlackTextureProbe::new();
        probe.register(ProbeTarget::Monitor);
        assert_eq!(probe.sample(ProbeTarget::Monitor, 0), None);
        assert_eq!(probe.sample(ProbeTarget::Monitor, 0), None);
        assert_eq!(probe.sample(ProbeTarget::Monitor, 0), None);
        assert_eq!(
            probe.sample(ProbeTarget::Monitor, 0),
            Some(ProbeEvent::BlackDetected(ProbeTarget::Monitor))
        );
    }

    #[test]
    fn three_consecutive_black_do_not_trigger_five_do() {
        let mut probe = BlackTextureProbe::new();
        probe.register(ProbeTarget::Monitor);
        for _ in 0..3 {
            assert_eq!(probe.sample(ProbeTarget::Monitor, 0), None);
        }
        // 4th sample triggers.
        assert!(probe.sample(ProbeTarget::Monitor, 0).is_some());
        // A 5th beyond the threshold does not re-fire.
        assert_eq!(probe.sample(ProbeTarget::Monitor, 0), None);
    }

    #[test]
    fn game_needs_ten_consecutive_black_samples() {
        let mut probe = BlackTextureProbe::new();
        probe.register(ProbeTarget::Game);
        for _ in 0..9 {
            assert_eq!(probe.sample(ProbeTarget::Game, 0), None);
        }
        assert_eq!(
            probe.sample(ProbeTarget::Game, 0),
            Some(ProbeEvent::BlackDetected(ProbeTarget::Game))
        );
    }

    #[test]
    fn colored_frame_after_black_streak_reports_colored_and_resets() {
        let mut probe = BlackTextureProbe::new();
        probe.register(ProbeTarget::Monitor);
        probe.sample(ProbeTarget::Monitor, 0);
        probe.sample(ProbeTarget::Monitor, 0);
        let event = probe.sample(ProbeTarget::Monitor, 600);
        assert_eq!(event, Some(ProbeEvent::ColoredDetected(ProbeTarget::Monitor)));
        // Streak reset: needs 4 more black samples to trigger again.
        for _ in 0..3 {
            assert_eq!(probe.sample(ProbeTarget::Monitor, 0), None);
        }
        assert!(probe.sample(ProbeTarget::Monitor, 0).is_some());
    }

    #[test]
    fn unregistered_target_is_not_sampled() {
        let mut probe = BlackTextureProbe::new();
        assert_eq!(probe.sample(ProbeTarget::Monitor, 0), None);
    }
}
