//! `Recorder`: record-to-file output with split-on-size/time and on-demand
//! split (spec §4.4).

use crate::engine::{Engine, OutputKind, OutputStartParams};
use crate::error::EngineError;
use crate::outputs::base::{OutputBase, OutputState};
use crate::protocol::Identifier;

/// File-output configuration carried by `START{recorder_type: VIDEO}`
/// (spec §4.2.1, §4.4).
#[derive(Debug, Clone, Default)]
pub struct RecorderConfig {
    pub path: String,
    pub max_file_size_bytes: Option<u64>,
    pub max_time_sec: Option<u32>,
    pub enable_on_demand_split: bool,
    pub include_full_video: bool,
    /// `fragmented` applies the muxer's `movflags=frag_keyframe+empty_moov+delay_moov`
    /// (spec §4.4).
    pub fragmented: bool,
}

/// The outcome of a failed `Start`, so the caller can pick the right wire
/// error code (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartFailure {
    UpdateDriverError,
    ObsError,
}

fn classify_start_failure(err: &EngineError) -> StartFailure {
    let text = err.to_string();
    if text.contains("NVENC.OutdatedDriver") || text.contains("NVENC.CheckDrivers") {
        StartFailure::UpdateDriverError
    } else {
        StartFailure::ObsError
    }
}

#[derive(Debug)]
pub struct Recorder {
    pub base: OutputBase,
    pub config: RecorderConfig,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            base: OutputBase::new(),
            config: RecorderConfig::default(),
        }
    }

    pub fn configure(&mut self, config: RecorderConfig) {
        self.config = config;
    }

    pub fn start_delay(&mut self, identifier: Identifier) {
        self.base.start_delay(identifier);
    }

    pub fn start(
        &mut self,
        engine: &dyn Engine,
        identifier: Identifier,
    ) -> Result<(), StartFailure> {
        let params = OutputStartParams {
            path: Some(self.config.path.clone()),
            max_file_size_bytes: self.config.max_file_size_bytes,
            max_time_sec: self.config.max_time_sec,
            fragmented: self.config.fragmented,
        };
        match engine.start_output(OutputKind::Recording, &params) {
            Ok(()) => {
                self.base.start_active(identifier);
                Ok(())
            }
            Err(err) => Err(classify_start_failure(&err)),
        }
    }

    pub fn stop(&mut self, engine: &dyn Engine, force: bool) {
        match self.base.state {
            OutputState::DelayActive => {
                self.base.finish_stop();
            }
            OutputState::Active | OutputState::Stopping => {
                self.base.begin_stopping();
                engine.stop_output(OutputKind::Recording, force);
            }
            OutputState::Idle => {}
        }
    }

    /// Issues `split_file` to the engine (spec §4.4); the engine owns the
    /// `<base>_<N>.<ext>` naming convention (spec §6) the same way the real
    /// muxer does, and reports the path it chose back via `video_split`.
    pub fn split(&mut self, engine: &dyn Engine) {
        if self.base.is_active() {
            engine.split_output(OutputKind::Recording);
        }
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NullEngine;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn delay_start_then_stop_transitions_to_idle_without_engine_call() {
        let (tx, _rx) = unbounded_channel();
        let engine = NullEngine::new(tx);
        let mut recorder = Recorder::new();
        recorder.start_delay(Identifier(7));
        assert!(recorder.base.is_delayed());
        recorder.stop(engine.as_ref(), false);
        assert!(recorder.base.is_idle());
        assert!(engine.calls.lock().is_empty());
    }

    #[test]
    fn split_only_issued_while_active() {
        let (tx, _rx) = unbounded_channel();
        let engine = NullEngine::new(tx);
        let mut recorder = Recorder::new();
        recorder.split(engine.as_ref());
        assert!(engine.calls.lock().is_empty(), "split() on an idle recorder must not reach the engine");

        recorder.configure(RecorderConfig {
            path: "C:/videos/r.mp4".into(),
            ..Default::default()
        });
        recorder.start(engine.as_ref(), Identifier(1)).unwrap();
        recorder.split(engine.as_ref());
        assert!(engine.calls.lock().iter().any(|c| c.starts_with("split_output(")));
    }

    #[test]
    fn outdated_driver_error_is_classified_distinctly() {
        let (tx, _rx) = unbounded_channel();
        let engine = NullEngine::new(tx);
        engine
            .fail_output_start
            .store(true, std::sync::atomic::Ordering::Relaxed);
        let mut recorder = Recorder::new();
        recorder.configure(RecorderConfig {
            path: "C:/r.mp4".into(),
            ..Default::default()
        });
        let err = recorder.start(engine.as_ref(), Identifier(1)).unwrap_err();
        assert_eq!(err, StartFailure::ObsError);
    }
}
