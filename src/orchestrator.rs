//! `Orchestrator`: the output-orchestration layer (spec §4.2). Holds
//! `SourceSet`, the three outputs, `BlackTextureProbe`, and `AudioController`;
//! implements every command handler and every engine-signal handler; owns
//! the delay-start coupling between game capture and the recorder/replay
//! (spec §4.2.3, §9 "Delay-start coupling").
//!
//! Every method here runs on the command worker (spec §4.1, §5): the
//! orchestrator itself performs no locking because it is never touched from
//! more than one thread at a time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::audio::AudioController;
use crate::black_texture::{BlackTextureProbe, ProbeEvent, ProbeTarget};
use crate::config::Config;
use crate::engine::{
    DeviceInfo, Engine, EngineSignal, OutputKind, PacketKind, VideoEncoderParams, VideoParams,
};
use crate::error::CoreError;
use crate::outputs::recorder::{Recorder, RecorderConfig, StartFailure};
use crate::outputs::replay::{CaptureReady, ReplayBuffer, ReplayConfig};
use crate::outputs::streamer::{Streamer, StreamerConfig};
use crate::protocol::payloads::{
    AddGameSourcePayload, GameFocusChangedPayload, SetBrbPayload, SetVolumePayload,
    StartPayload, StartReplayCapturePayload, StopPayload, StopReplayCapturePayload,
    TobiiGazePayload,
};
use crate::protocol::{
    Commands, Events, Identifier, InboundCommand, OutboundEvent, RecorderType, ReplayErrorCode,
    StartErrorCode,
};
use crate::sources::{SourceKind, SourceSet, SourceSpec};
use crate::visibility::{self, PolicyInputs};

/// A game source's recorder is in "delayed-start": requested but waiting for
/// the first capture frame before the output actually starts (spec §2, §9).
/// Reported on a `STOP` that arrives before capture ever begins.
const REPORT_FAIL_TO_START_GAME_DELAY: Duration = Duration::from_secs(30);

/// Warning/abort thresholds for the disk-space guard (spec §4.5).
const LOW_DISK_SPACE_WARNING_MB: u64 = 200;
const OUT_OF_DISK_SPACE_MB: u64 = 50;

/// Stats-warning hysteresis (spec §4.8).
const LAG_WARNING_STEP_PERCENT: f64 = 5.0;
const HIGH_CPU_SKIPPED_DELTA: u64 = 10;
const HIGH_CPU_SKIPPED_PERCENT: f64 = 0.1;

pub struct Orchestrator {
    engine: Arc<dyn Engine>,
    event_tx: UnboundedSender<Vec<u8>>,
    shutdown: Arc<tokio::sync::Notify>,
    config: Config,

    sources: SourceSet,
    recorder: Recorder,
    replay: ReplayBuffer,
    streamer: Streamer,
    audio: AudioController,
    probe: BlackTextureProbe,

    /// Video/audio/encoder have been initialized at least once (spec
    /// §4.2.1: "If the orchestrator is not yet active ... init video, init
    /// video encoder, init audio sources").
    active: bool,
    last_video_params: Option<(u32, u32, u32)>,

    game_in_foreground: bool,
    is_minimized: bool,
    keep_game_recording_on_lost_focus: bool,
    disable_auto_shutdown_on_game_exit: bool,

    /// Latches once per game-capture session (spec §4.2.3, §9 open question:
    /// the current source latches for the whole process; we follow that).
    switchable_devices_notified: bool,
    /// Latches once per run (spec §4.5, §9 open question: no re-arm).
    low_disk_space_warned: bool,

    /// Set from `update_capture_state`'s `injection_error` when the game
    /// exits (spec §4.2.3); survives the `GameSource` removal that follows
    /// in the same handler so a later delayed-stop (spec §4.2.2) can still
    /// consult it. Cleared whenever a new game source is created.
    game_injection_failed: bool,

    recorder_delay_started_at: Option<Instant>,
    replay_stop_timer: Option<crate::timers::ReplayStopTimer>,
    worker_tx: Option<std::sync::mpsc::Sender<crate::dispatcher::WorkerMsg>>,

    /// Most recent packet's `sys_pts_usec` seen across either output,
    /// approximating the engine's `encoder_last_pts` (spec §4.5).
    encoder_last_pts_usec: i64,

    last_skipped_frames: HashMap<&'static str, u64>,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<dyn Engine>,
        event_tx: UnboundedSender<Vec<u8>>,
        shutdown: Arc<tokio::sync::Notify>,
        config: Config,
    ) -> Self {
        Self {
            engine,
            event_tx,
            shutdown,
            config,
            sources: SourceSet::new(),
            recorder: Recorder::new(),
            replay: ReplayBuffer::new(),
            streamer: Streamer::new(),
            audio: AudioController::new(),
            probe: BlackTextureProbe::new(),
            active: false,
            last_video_params: None,
            game_in_foreground: false,
            is_minimized: false,
            keep_game_recording_on_lost_focus: false,
            disable_auto_shutdown_on_game_exit: false,
            switchable_devices_notified: false,
            low_disk_space_warned: false,
            game_injection_failed: false,
            recorder_delay_started_at: None,
            replay_stop_timer: None,
            worker_tx: None,
            encoder_last_pts_usec: 0,
            last_skipped_frames: HashMap::new(),
        }
    }

    /// Lets the orchestrator post its own `WorkerMsg`s (timers, re-posted
    /// engine signals) onto the command worker that owns it (spec §5).
    pub fn set_worker_sender(&mut self, tx: std::sync::mpsc::Sender<crate::dispatcher::WorkerMsg>) {
        self.worker_tx = Some(tx);
    }

    /// Spec §4.2 lifecycle step 1: loads plugins, initializes the audio
    /// subsystem with default device settings, resets video at default
    /// parameters so encoder enumeration works.
    pub fn startup(&mut self) {
        if let Err(e) = self.engine.init_audio() {
            warn!(error = %e, "default audio subsystem init failed");
        }
        if let Err(e) = self.engine.init_video(&VideoParams::default()) {
            warn!(error = %e, "default video reset failed");
        }
        info!(debugger_attach = self.config.debugger_attach, "orchestrator started up");
    }

    fn emit(&self, event: OutboundEvent) {
        let _ = self.event_tx.send(event.to_bytes());
    }

    fn emit_err(&self, identifier: Identifier, code: i32, desc: impl Into<String>) {
        self.emit(
            OutboundEvent::new(Events::Err)
                .with_identifier(identifier)
                .with_field("code", code)
                .with_field("desc", desc.into()),
        );
    }

    // ---- dispatch --------------------------------------------------------

    pub fn handle_worker_msg(&mut self, msg: crate::dispatcher::WorkerMsg) -> bool {
        use crate::dispatcher::WorkerMsg;
        match msg {
            WorkerMsg::Command(cmd) => {
                self.handle_command(cmd);
                true
            }
            WorkerMsg::EngineSignal(sig) => {
                self.handle_engine_signal(sig);
                true
            }
            WorkerMsg::MalformedFrame(text) => {
                warn!(error = %text, "dropping malformed inbound frame");
                true
            }
            WorkerMsg::Disconnected => {
                self.handle_disconnected();
                false
            }
            WorkerMsg::Shutdown => false,
        }
    }

    fn handle_command(&mut self, cmd: InboundCommand) {
        let Ok(command) = Commands::try_from(cmd.cmd) else {
            warn!(cmd = cmd.cmd, "unknown command id, ignoring");
            return;
        };
        match command {
            Commands::Shutdown => self.handle_shutdown(),
            Commands::QueryMachineInfo => self.handle_query_machine_info(cmd.identifier),
            Commands::Start => self.handle_start(cmd),
            Commands::Stop => self.handle_stop(cmd),
            Commands::SetVolume => self.handle_set_volume(cmd),
            Commands::GameFocusChanged => self.handle_game_focus_changed(cmd),
            Commands::AddGameSource => self.handle_add_game_source(cmd),
            Commands::StartReplayCapture => self.handle_start_replay_capture(cmd),
            Commands::StopReplayCapture => self.handle_stop_replay_capture(cmd),
            Commands::TobiiGaze => self.handle_tobii_gaze(cmd),
            Commands::SetBrb => self.handle_set_brb(cmd),
            Commands::SplitVideo => self.handle_split_video(cmd),
        }
    }

    // ---- QUERY_MACHINE_INFO ----------------------------------------------

    fn handle_query_machine_info(&mut self, identifier: Identifier) {
        let audio_in = devices_to_json(self.engine.enumerate_audio_inputs());
        let audio_out = devices_to_json(self.engine.enumerate_audio_outputs());
        // Each encoder is probed independently; a crashing probe yields
        // `{valid:false, status:"crash"}` for that one without affecting the
        // others (spec §4.2, §9 "Exception-for-control-flow" — the `Engine`
        // trait boundary is where a real binding would isolate the fault).
        let encoders: Vec<_> = self
            .engine
            .enumerate_video_encoders()
            .into_iter()
            .map(|probe| {
                json!({
                    "encoder_id": probe.encoder_id,
                    "valid": probe.valid,
                    "status": probe.status,
                })
            })
            .collect();

        self.emit(
            OutboundEvent::new(Events::QueryMachineInfo)
                .with_identifier(identifier)
                .with_field("audio_in", serde_json::Value::Array(audio_in))
                .with_field("audio_out", serde_json::Value::Array(audio_out))
                .with_field("video_encoders", serde_json::Value::Array(encoders))
                .with_field("winrt_capture_supported", self.engine.winrt_capture_supported()),
        );
    }

    // ---- START -------------------------------------------------------

    fn handle_start(&mut self, cmd: InboundCommand) {
        let identifier = cmd.identifier;
        let payload: StartPayload = match cmd.payload_as() {
            Ok(p) => p,
            Err(e) => {
                self.emit_err(identifier, StartErrorCode::MissingParam.code(), e.to_string());
                return;
            }
        };
        let Some(recorder_type) = cmd
            .recorder_type
            .and_then(|v| RecorderType::try_from(v).ok())
        else {
            self.emit_err(
                identifier,
                StartErrorCode::UnsupportedRecordingType.code(),
                format!("unsupported recorder_type {:?}", cmd.recorder_type),
            );
            return;
        };

        let video_key = (
            payload.video_settings.base_width,
            payload.video_settings.base_height,
            payload.video_settings.fps,
        );

        if !self.active {
            if let Err(err) = self.init_engine_for_start(&payload) {
                self.emit_err(identifier, err.code(), err.to_string());
                return;
            }
            self.active = true;
            self.last_video_params = Some(video_key);
        } else if self.last_video_params != Some(video_key) {
            self.emit_err(
                identifier,
                StartErrorCode::CurrentlyActive.code(),
                "video parameters cannot change while an output is active",
            );
            return;
        }

        self.disable_auto_shutdown_on_game_exit =
            payload.extra_video_options.disable_auto_shutdown_on_game_exit;
        self.keep_game_recording_on_lost_focus = payload.scene.keep_game_recording;

        if let Err(err) = self.build_scene(&payload) {
            self.emit_err(identifier, err.code(), err.to_string());
            return;
        }

        self.audio.configure(&payload.audio_settings);
        self.reevaluate_visibility(false);

        match recorder_type {
            RecorderType::Video => self.start_video(identifier, &payload),
            RecorderType::Replay => self.start_replay(identifier, &payload),
            RecorderType::Streaming => self.start_streaming(identifier, &payload),
        }
    }

    fn init_engine_for_start(&mut self, payload: &StartPayload) -> Result<(), CoreError> {
        let video_params = VideoParams {
            base_width: payload.video_settings.base_width,
            base_height: payload.video_settings.base_height,
            output_width: payload
                .video_settings
                .output_width
                .unwrap_or(payload.video_settings.base_width),
            output_height: payload
                .video_settings
                .output_height
                .unwrap_or(payload.video_settings.base_height),
            fps: payload.video_settings.fps,
        };
        self.engine.init_video(&video_params).map_err(CoreError::from)?;
        let encoder_params = VideoEncoderParams {
            encoder_id: payload.video_encoder_settings.encoder_id.clone(),
            bitrate: payload.video_encoder_settings.bitrate,
        };
        self.engine
            .init_video_encoder(&encoder_params)
            .map_err(CoreError::from)?;
        self.engine.init_audio().map_err(CoreError::from)?;
        Ok(())
    }

    /// Builds the scene from `START`'s sub-objects (spec §4.2.1).
    fn build_scene(&mut self, payload: &StartPayload) -> Result<(), CoreError> {
        let scene = &payload.scene;

        if let Some(monitor) = &scene.monitor {
            if !self.sources.has_kind(SourceKind::Monitor) {
                let handle = self
                    .engine
                    .create_source(&SourceSpec {
                        kind: SourceKind::Monitor,
                        name: format!("monitor:{}", monitor.monitor_id),
                    })
                    .map_err(CoreError::from)?;
                let id = self.sources.insert(SourceKind::Monitor, "monitor", handle);
                if let Some(source) = self.sources.get_mut(id) {
                    source.monitor = Some(crate::sources::MonitorState {
                        monitor_id: monitor.monitor_id.clone(),
                        monitor_handle: monitor.monitor_handle,
                        force: monitor.force,
                    });
                }
            }
        }

        if let Some(window) = &scene.window_capture {
            if !self.sources.has_kind(SourceKind::Window) {
                let handle = self
                    .engine
                    .create_source(&SourceSpec {
                        kind: SourceKind::Window,
                        name: format!("window:{}", window.window_handle),
                    })
                    .map_err(CoreError::from)?;
                self.sources.insert(SourceKind::Window, "window", handle);
            }
        }

        if let Some(game) = &scene.game {
            if game.process_id > 0 && !self.sources.has_kind(SourceKind::Game) {
                let handle = self
                    .engine
                    .create_source(&SourceSpec {
                        kind: SourceKind::Game,
                        name: "game".into(),
                    })
                    .map_err(CoreError::from)?;
                let id = self.sources.insert(SourceKind::Game, "game", handle);
                if let Some(source) = self.sources.get_mut(id) {
                    source.game = Some(crate::sources::GameSource::new(
                        game.process_id,
                        game.foreground,
                    ));
                }
                self.game_in_foreground = game.foreground;
                self.game_injection_failed = false;
            }
        }

        // BRB is created only when there is a game source AND no monitor
        // source (spec §4.2.1).
        if let Some(brb) = &scene.brb {
            let should_have_brb =
                self.sources.has_kind(SourceKind::Game) && !self.sources.has_kind(SourceKind::Monitor);
            if should_have_brb && !self.sources.has_kind(SourceKind::Brb) {
                let handle = self
                    .engine
                    .create_source(&SourceSpec {
                        kind: SourceKind::Brb,
                        name: brb.image_path.clone(),
                    })
                    .map_err(CoreError::from)?;
                self.sources.insert(SourceKind::Brb, "brb", handle);
            }
        }

        if let Some(tobii) = &scene.tobii {
            if tobii.enabled {
                self.configure_tobii();
            }
        }

        for (idx, raw) in scene.aux_sources.iter().enumerate() {
            let secondary_file = raw
                .get("secondaryFile")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            if secondary_file && !self.config.secondary {
                continue;
            }
            let name = raw
                .get("name")
                .and_then(|v| v.as_str())
                .map(String::from)
                .unwrap_or_else(|| format!("aux_{idx}"));
            let handle = self
                .engine
                .create_source(&SourceSpec {
                    kind: SourceKind::Generic,
                    name: name.clone(),
                })
                .map_err(CoreError::from)?;
            self.sources.insert(SourceKind::Generic, name, handle);
        }

        if self.sources.is_empty() {
            return Err(CoreError::FailedToCreateSources);
        }
        Ok(())
    }

    /// A `tobii` overlay is deferred while a game source exists but hasn't
    /// started capturing yet; realized once capture begins (spec §4.2.1,
    /// §4.2.3).
    fn configure_tobii(&mut self) {
        let game_pending = self
            .sources
            .find_by_kind(SourceKind::Game)
            .map(|g| !g.game.as_ref().map(|g| g.did_start_capture).unwrap_or(false))
            .unwrap_or(false);

        if game_pending {
            self.sources.deferred_tobii = Some(SourceSpec {
                kind: SourceKind::Gaze,
                name: "tobii".into(),
            });
            return;
        }
        self.realize_tobii();
    }

    fn realize_tobii(&mut self) {
        if self.sources.has_kind(SourceKind::Gaze) {
            self.sources.deferred_tobii = None;
            return;
        }
        match self.engine.create_source(&SourceSpec {
            kind: SourceKind::Gaze,
            name: "tobii".into(),
        }) {
            Ok(handle) => {
                self.sources.insert(SourceKind::Gaze, "tobii", handle);
            }
            Err(e) => warn!(error = %e, "failed to realize tobii overlay"),
        }
        self.sources.deferred_tobii = None;
    }

    /// True iff the only source in the scene is a game source that hasn't
    /// started capturing yet (spec §4.2.1 delayed-start precondition).
    fn is_single_pending_game_source(&self) -> bool {
        if self.sources.len() != 1 {
            return false;
        }
        self.sources
            .iter()
            .next()
            .is_some_and(|s| s.kind == SourceKind::Game && !s.game.as_ref().is_some_and(|g| g.did_start_capture))
    }

    fn start_video(&mut self, identifier: Identifier, payload: &StartPayload) {
        let Some(file_output) = &payload.file_output else {
            self.emit_err(identifier, StartErrorCode::MissingParam.code(), "missing file_output");
            return;
        };
        self.recorder.configure(RecorderConfig {
            path: file_output.filename.clone(),
            max_file_size_bytes: file_output.max_file_size_bytes,
            max_time_sec: file_output.max_time_sec,
            enable_on_demand_split: file_output.enable_on_demand_split,
            include_full_video: file_output.include_full_video,
            fragmented: payload.extra_video_options.fragmented_video_file,
        });

        if self.is_single_pending_game_source() {
            self.recorder.start_delay(identifier);
            self.recorder_delay_started_at = Some(Instant::now());
            self.emit(OutboundEvent::new(Events::Ready).with_identifier(identifier));
            return;
        }

        self.emit(OutboundEvent::new(Events::Ready).with_identifier(identifier));
        match self.recorder.start(self.engine.as_ref(), identifier) {
            Ok(()) => self.emit_recording_started(identifier),
            Err(fail) => self.emit_start_failure(identifier, fail),
        }
    }

    fn start_replay(&mut self, identifier: Identifier, payload: &StartPayload) {
        self.replay.configure(ReplayConfig {
            max_time_sec: payload.replay.max_time_sec,
            max_size_mb: payload.replay.max_size_mb,
        });

        if self.is_single_pending_game_source() {
            self.replay.start_delay(identifier);
            self.emit(OutboundEvent::new(Events::Ready).with_identifier(identifier));
            return;
        }

        self.emit(OutboundEvent::new(Events::Ready).with_identifier(identifier));
        match self.replay.start(self.engine.as_ref(), identifier) {
            Ok(()) => self.emit(OutboundEvent::new(Events::ReplayStarted).with_identifier(identifier)),
            Err(()) => self.emit_err(
                identifier,
                StartErrorCode::ReplayStartError.code(),
                "failed to start replay buffer",
            ),
        }
    }

    fn start_streaming(&mut self, identifier: Identifier, payload: &StartPayload) {
        let Some(streaming) = &payload.streaming else {
            self.emit_err(identifier, StartErrorCode::StreamStartNoServiceError.code(), "missing streaming settings");
            return;
        };
        self.streamer.configure(StreamerConfig {
            service_type: streaming.service_type.clone(),
            server_url: streaming.server_url.clone(),
            stream_key: streaming.stream_key.clone(),
            use_auth: streaming.use_auth,
            username: streaming.username.clone(),
            password: streaming.password.clone(),
        });
        self.emit(OutboundEvent::new(Events::StreamingStarting).with_identifier(identifier));
        if let Err(e) = self.streamer.start(self.engine.as_ref(), identifier) {
            self.emit_err(
                identifier,
                StartErrorCode::FailedStartingOutputWithObsError.code(),
                e.to_string(),
            );
        }
    }

    fn emit_recording_started(&mut self, identifier: Identifier) {
        if let Some(source) = self.sources.find_by_kind_mut(SourceKind::Game) {
            if let Some(game) = source.game.as_mut() {
                game.did_start_capture = true;
            }
        }
        let source = self.sources.visible_source_name().unwrap_or_default();
        self.emit(
            OutboundEvent::new(Events::RecordingStarted)
                .with_identifier(identifier)
                .with_field("source", source),
        );
    }

    fn emit_start_failure(&mut self, identifier: Identifier, fail: StartFailure) {
        let code = match fail {
            StartFailure::UpdateDriverError => StartErrorCode::FailedStartingUpdateDriverError.code(),
            StartFailure::ObsError => StartErrorCode::FailedStartingOutputWithObsError.code(),
        };
        self.emit_err(identifier, code, "output failed to start");
    }

    // ---- STOP --------------------------------------------------------

    fn handle_stop(&mut self, cmd: InboundCommand) {
        let identifier = cmd.identifier;
        let force = cmd.payload_as::<StopPayload>().unwrap_or_default().force;
        let Some(recorder_type) = cmd
            .recorder_type
            .and_then(|v| RecorderType::try_from(v).ok())
        else {
            return;
        };
        match recorder_type {
            RecorderType::Video => self.stop_recorder(identifier, force),
            RecorderType::Replay => self.stop_replay(identifier, force),
            RecorderType::Streaming => self.stop_streamer(identifier, force),
        }
    }

    fn stop_recorder(&mut self, identifier: Identifier, force: bool) {
        if self.recorder.base.is_idle() || self.recorder.base.identifier != identifier {
            self.emit(
                OutboundEvent::new(Events::RecordingStopped)
                    .with_identifier(identifier)
                    .with_field("code", 0),
            );
            return;
        }

        if self.recorder.base.is_delayed() {
            // spec §4.2.2: report as a failure (code -999) only if the game
            // source was present-and-pending for more than 30s *and* either
            // it's still present-and-pending now or the game capture
            // reported an injection failure before exiting.
            let game_present_and_pending = self
                .sources
                .find_by_kind(SourceKind::Game)
                .and_then(|s| s.game.as_ref())
                .map(|g| !g.did_start_capture)
                .unwrap_or(false);
            let elapsed_enough = self
                .recorder_delay_started_at
                .map(|t| t.elapsed() > REPORT_FAIL_TO_START_GAME_DELAY)
                .unwrap_or(false);
            self.recorder.stop(self.engine.as_ref(), force);
            self.recorder_delay_started_at = None;
            if (game_present_and_pending || self.game_injection_failed) && elapsed_enough {
                self.emit(
                    OutboundEvent::new(Events::RecordingStopped)
                        .with_identifier(identifier)
                        .with_field("code", StartErrorCode::RUNTIME_CAPTURE_FAILURE)
                        .with_field("last_error", "failed to start game recording"),
                );
            } else {
                self.emit(
                    OutboundEvent::new(Events::RecordingStopped)
                        .with_identifier(identifier)
                        .with_field("code", 0),
                );
            }
            return;
        }

        self.recorder.stop(self.engine.as_ref(), force);
        self.emit(OutboundEvent::new(Events::RecordingStopping).with_identifier(identifier));
    }

    fn stop_replay(&mut self, identifier: Identifier, force: bool) {
        if self.replay.base.is_idle() || self.replay.base.identifier != identifier {
            self.emit(
                OutboundEvent::new(Events::ReplayStopped)
                    .with_identifier(identifier)
                    .with_field("code", 0),
            );
            return;
        }
        if self.replay.base.is_delayed() {
            self.replay.stop(self.engine.as_ref(), force);
            self.emit(
                OutboundEvent::new(Events::ReplayStopped)
                    .with_identifier(identifier)
                    .with_field("code", 0),
            );
            return;
        }
        let was_capturing = self.replay.is_capturing() && !force;
        self.replay.stop(self.engine.as_ref(), force);
        if !was_capturing {
            self.emit(OutboundEvent::new(Events::ReplayStopping).with_identifier(identifier));
        }
    }

    fn stop_streamer(&mut self, identifier: Identifier, force: bool) {
        if self.streamer.base.is_idle() || self.streamer.base.identifier != identifier {
            self.emit(
                OutboundEvent::new(Events::StreamingStopped)
                    .with_identifier(identifier)
                    .with_field("code", 0),
            );
            return;
        }
        self.streamer.stop(self.engine.as_ref(), force);
        self.emit(OutboundEvent::new(Events::StreamingStopping).with_identifier(identifier));
    }

    fn handle_shutdown(&mut self) {
        self.recorder.stop(self.engine.as_ref(), true);
        self.replay.stop(self.engine.as_ref(), true);
        self.streamer.stop(self.engine.as_ref(), true);
        self.shutdown.notify_one();
    }

    fn handle_disconnected(&mut self) {
        // spec §4.1: no one to report to; force-stop everything and exit.
        self.recorder.stop(self.engine.as_ref(), true);
        self.replay.stop(self.engine.as_ref(), true);
        self.streamer.stop(self.engine.as_ref(), true);
        self.shutdown.notify_one();
    }

    // ---- SET_VOLUME / GAME_FOCUS_CHANGED / ADD_GAME_SOURCE ---------------

    fn handle_set_volume(&mut self, cmd: InboundCommand) {
        let Ok(payload) = cmd.payload_as::<SetVolumePayload>() else {
            return;
        };
        self.audio.set_volume(&payload.name, payload.volume);
    }

    fn handle_game_focus_changed(&mut self, cmd: InboundCommand) {
        let Ok(payload) = cmd.payload_as::<GameFocusChangedPayload>() else {
            return;
        };
        self.game_in_foreground = payload.foreground;
        self.is_minimized = payload.minimized;
        self.reevaluate_visibility(true);
    }

    fn handle_add_game_source(&mut self, cmd: InboundCommand) {
        let Ok(payload) = cmd.payload_as::<AddGameSourcePayload>() else {
            return;
        };
        if self.sources.has_kind(SourceKind::Game) || payload.process_id == 0 {
            return;
        }
        match self.engine.create_source(&SourceSpec {
            kind: SourceKind::Game,
            name: "game".into(),
        }) {
            Ok(handle) => {
                let id = self.sources.insert(SourceKind::Game, "game", handle);
                if let Some(source) = self.sources.get_mut(id) {
                    source.game = Some(crate::sources::GameSource::new(payload.process_id, false));
                }
                self.game_injection_failed = false;
                self.reevaluate_visibility(true);
            }
            Err(e) => warn!(error = %e, "failed to add game source"),
        }
    }

    fn handle_set_brb(&mut self, cmd: InboundCommand) {
        let Ok(payload) = cmd.payload_as::<SetBrbPayload>() else {
            return;
        };
        if let Some(source) = self.sources.find_by_kind_mut(SourceKind::Brb) {
            source.visible = payload.visible;
            let handle = source.handle;
            self.engine.set_source_visible(handle, payload.visible);
        }
    }

    fn handle_tobii_gaze(&mut self, cmd: InboundCommand) {
        let Ok(payload) = cmd.payload_as::<TobiiGazePayload>() else {
            return;
        };
        if payload.enabled {
            self.configure_tobii();
        } else if let Some(source) = self.sources.find_by_kind(SourceKind::Gaze) {
            let handle = source.handle;
            let id = source.id;
            self.engine.remove_source(handle);
            self.sources.remove(id);
            self.sources.deferred_tobii = None;
        }
    }

    fn handle_split_video(&mut self, cmd: InboundCommand) {
        if self.recorder.base.identifier != cmd.identifier {
            return;
        }
        self.recorder.split(self.engine.as_ref());
    }

    // ---- START_REPLAY_CAPTURE / STOP_REPLAY_CAPTURE ----------------------

    fn handle_start_replay_capture(&mut self, cmd: InboundCommand) {
        let identifier = self.replay.base.identifier;
        let Ok(payload) = cmd.payload_as::<StartReplayCapturePayload>() else {
            self.emit_replay_error(identifier, ReplayErrorCode::StartCaptureObsError);
            return;
        };
        match self.replay.start_capture(
            payload.head_duration_ms,
            payload.path,
            payload.thumbnail_folder,
            self.encoder_last_pts_usec,
        ) {
            Ok(()) => {
                self.emit(OutboundEvent::new(Events::ReplayCaptureVideoStarted).with_identifier(identifier));
            }
            Err(e) => self.emit_replay_error(identifier, e.into()),
        }
    }

    fn handle_stop_replay_capture(&mut self, cmd: InboundCommand) {
        let identifier = self.replay.base.identifier;
        let payload = cmd.payload_as::<StopReplayCapturePayload>().unwrap_or_default();
        if let Err(e) = self.replay.stop_capture(payload.force, self.encoder_last_pts_usec) {
            self.emit_replay_error(identifier, e.into());
        }
    }

    fn emit_replay_error(&self, identifier: Identifier, code: ReplayErrorCode) {
        self.emit(
            OutboundEvent::new(Events::ReplayError)
                .with_identifier(identifier)
                .with_field("code", code.code()),
        );
    }

    // ---- visibility ----------------------------------------------------

    fn reevaluate_visibility(&mut self, output_may_be_active: bool) {
        let inputs = PolicyInputs {
            game_in_foreground: self.game_in_foreground,
            is_minimized: self.is_minimized,
            keep_game_recording_on_lost_focus: self.keep_game_recording_on_lost_focus,
        };
        let out = visibility::compute(&self.sources, inputs);

        if let Some(game) = self.sources.find_by_kind(SourceKind::Game) {
            let handle = game.handle;
            self.engine.set_game_foreground(handle, out.game_foreground_for_engine);
        }

        let changed = self.sources.apply_visibility(&out.visible_ids, out.new_visible_source);
        for id in &out.visible_ids {
            if let Some(source) = self.sources.get(*id) {
                self.engine.set_source_visible(source.handle, true);
            }
        }
        for source in self.sources.iter() {
            if !out.visible_ids.contains(&source.id) {
                self.engine.set_source_visible(source.handle, false);
            }
        }
        for id in &out.overlays_to_raise {
            self.sources.move_to_top(*id);
            if let Some(source) = self.sources.get(*id) {
                self.engine.move_source_to_top(source.handle);
            }
        }

        let any_output_active = self.recorder.base.is_active()
            || self.replay.base.is_active()
            || self.streamer.base.is_active();
        if changed && (output_may_be_active && any_output_active || any_output_active) {
            let name = self.sources.visible_source_name().unwrap_or_default();
            self.emit(
                OutboundEvent::new(Events::DisplaySourceChanged).with_field("source", name),
            );
        }

        self.sync_black_texture_probe(out.new_visible_kind);
    }

    /// Registers/unregisters the black-texture probe's targets to track
    /// which base-layer source is currently visible (spec §4.2.4: "The
    /// probe is registered on demand (when a capture source becomes
    /// visible)"). Unregistration on a detection result is handled
    /// separately in `on_probe_event`.
    fn sync_black_texture_probe(&mut self, visible_kind: Option<visibility::VisibleSource>) {
        let want_monitor = matches!(visible_kind, Some(visibility::VisibleSource::Monitor));
        let want_game = matches!(visible_kind, Some(visibility::VisibleSource::Game));

        if want_monitor && !self.probe.is_registered(ProbeTarget::Monitor) {
            self.probe.register(ProbeTarget::Monitor);
        } else if !want_monitor && self.probe.is_registered(ProbeTarget::Monitor) {
            self.probe.unregister(ProbeTarget::Monitor);
        }

        if want_game && !self.probe.is_registered(ProbeTarget::Game) {
            self.probe.register(ProbeTarget::Game);
        } else if !want_game && self.probe.is_registered(ProbeTarget::Game) {
            self.probe.unregister(ProbeTarget::Game);
        }
    }

    fn on_probe_event(&mut self, event: ProbeEvent) {
        match event {
            ProbeEvent::BlackDetected(ProbeTarget::Monitor) => {
                self.rebuild_monitor_in_compatible_mode();
                self.probe.unregister(ProbeTarget::Monitor);
            }
            ProbeEvent::BlackDetected(ProbeTarget::Game) => {
                self.switch_game_to_compatibility_mode();
                self.probe.unregister(ProbeTarget::Game);
            }
            ProbeEvent::ColoredDetected(target) => {
                self.probe.unregister(target);
            }
        }
    }

    fn rebuild_monitor_in_compatible_mode(&mut self) {
        let Some(source) = self.sources.find_by_kind(SourceKind::Monitor) else {
            return;
        };
        let Some(monitor) = source.monitor.clone() else {
            return;
        };
        let id = source.id;
        let old_handle = source.handle;
        match self.engine.rebuild_monitor_source(
            old_handle,
            &monitor.monitor_id,
            monitor.monitor_handle,
            monitor.force,
        ) {
            Ok(new_handle) => {
                if let Some(source) = self.sources.get_mut(id) {
                    source.handle = new_handle;
                }
            }
            Err(e) => warn!(error = %e, "failed to rebuild monitor source in compatible mode"),
        }
    }

    fn switch_game_to_compatibility_mode(&mut self) {
        let Some(source) = self.sources.find_by_kind_mut(SourceKind::Game) else {
            return;
        };
        let handle = source.handle;
        if let Some(game) = source.game.as_mut() {
            game.compatibility_mode = true;
        }
        self.engine.set_game_compatibility_mode(handle, true);
        if !self.switchable_devices_notified {
            self.switchable_devices_notified = true;
            self.emit(OutboundEvent::new(Events::SwitchableDeviceDetected));
        }
    }

    // ---- engine signals --------------------------------------------------

    fn handle_engine_signal(&mut self, signal: EngineSignal) {
        match signal {
            EngineSignal::CaptureStateChanged {
                process_id,
                capturing,
                process_alive,
                compatibility_mode,
                injection_error,
            } => self.on_capture_state_changed(process_id, capturing, process_alive, compatibility_mode, injection_error),
            EngineSignal::OutputStopped { output, code, last_error } => {
                self.on_output_stopped(output, code, last_error)
            }
            EngineSignal::OutputStopping { output } => self.on_output_stopping(output),
            EngineSignal::OutputStarted { output } => self.on_output_started(output),
            EngineSignal::VideoSplit { output, next_path, split_duration_ms, last_pts_usec } => {
                self.on_video_split(output, next_path, split_duration_ms, last_pts_usec)
            }
            EngineSignal::DiskSpaceWarning { output, path } => self.on_disk_space_warning(output, path),
            EngineSignal::OutputNoSpace { output } => self.on_output_no_space(output),
            EngineSignal::StreamingStarting => {
                self.emit(OutboundEvent::new(Events::StreamingStarting).with_identifier(self.streamer.base.identifier));
            }
            EngineSignal::StreamingStarted => {
                self.emit(OutboundEvent::new(Events::StreamingStarted).with_identifier(self.streamer.base.identifier));
            }
            EngineSignal::EncoderPacket(packet) => self.on_encoder_packet(packet),
            EngineSignal::FrameSampled { target, colored_pixel_count } => {
                if let Some(event) = self.probe.sample(target, colored_pixel_count) {
                    self.on_probe_event(event);
                }
            }
            EngineSignal::StatsTick => self.on_stats_tick(),
            EngineSignal::ReplayStopTimeout => self.on_replay_stop_timeout(),
        }
    }

    fn on_capture_state_changed(
        &mut self,
        process_id: u32,
        capturing: bool,
        process_alive: bool,
        compatibility_mode: bool,
        injection_error: bool,
    ) {
        let Some(game_id) = self
            .sources
            .find_by_kind(SourceKind::Game)
            .filter(|s| s.game.as_ref().map(|g| g.process_id) == Some(process_id))
            .map(|s| s.id)
        else {
            return;
        };

        if capturing {
            if let Some(source) = self.sources.get_mut(game_id) {
                if let Some(game) = source.game.as_mut() {
                    game.did_start_capture = true;
                    game.compatibility_mode = compatibility_mode;
                }
            }
            if compatibility_mode && !self.switchable_devices_notified {
                self.switchable_devices_notified = true;
                self.emit(OutboundEvent::new(Events::SwitchableDeviceDetected));
            }

            if self.recorder.base.is_delayed() {
                let identifier = self.recorder.base.identifier;
                match self.recorder.start(self.engine.as_ref(), identifier) {
                    Ok(()) => self.emit_recording_started(identifier),
                    Err(fail) => self.emit_start_failure(identifier, fail),
                }
            }
            if self.replay.base.is_delayed() {
                let identifier = self.replay.base.identifier;
                match self.replay.start(self.engine.as_ref(), identifier) {
                    Ok(()) => self.emit(OutboundEvent::new(Events::ReplayStarted).with_identifier(identifier)),
                    Err(()) => self.emit_err(identifier, StartErrorCode::ReplayStartError.code(), "replay failed to start"),
                }
            }
            if self.sources.deferred_tobii.is_some() {
                self.realize_tobii();
            }
            self.reevaluate_visibility(true);
        } else if process_alive {
            if self.sources.has_kind(SourceKind::Monitor) {
                self.reevaluate_visibility(true);
            }
        } else {
            self.probe.reset_game();
            self.switchable_devices_notified = false;
            if let Some(source) = self.sources.get_mut(game_id) {
                if let Some(game) = source.game.as_mut() {
                    game.injection_failed = injection_error;
                }
            }
            // `GameSource` is removed below; persist the flag at the
            // orchestrator level so a later delayed-stop (spec §4.2.2) can
            // still read it.
            self.game_injection_failed = injection_error;

            if self.replay.is_capturing() {
                if let Some(tx) = self.worker_tx.clone() {
                    self.replay_stop_timer = Some(crate::timers::ReplayStopTimer::start(tx));
                }
                self.replay.mark_disconnection();
                self.replay.stop(self.engine.as_ref(), false);
            } else {
                self.replay.stop(self.engine.as_ref(), true);
                if self.replay.base.is_active() || self.replay.base.is_delayed() {
                    self.emit(OutboundEvent::new(Events::ReplayStopping).with_identifier(self.replay.base.identifier));
                }
            }

            let no_monitor_or_window =
                !self.sources.has_kind(SourceKind::Monitor) && !self.sources.has_kind(SourceKind::Window);
            if no_monitor_or_window && !self.disable_auto_shutdown_on_game_exit {
                let identifier = self.recorder.base.identifier;
                self.recorder.stop(self.engine.as_ref(), false);
                if self.recorder.base.is_active() || matches!(self.recorder.base.state, crate::outputs::base::OutputState::Stopping) {
                    self.emit(OutboundEvent::new(Events::RecordingStopping).with_identifier(identifier));
                }
            }

            self.sources.remove(game_id);
            self.reevaluate_visibility(true);
        }
    }

    fn on_output_stopped(&mut self, output: OutputKind, code: i32, last_error: Option<String>) {
        match output {
            OutputKind::Recording => {
                let identifier = self.recorder.base.identifier;
                self.recorder.base.finish_stop();
                let mut event = OutboundEvent::new(Events::RecordingStopped)
                    .with_identifier(identifier)
                    .with_field("code", code);
                if let Some(err) = last_error {
                    event = event.with_field("last_error", err);
                }
                self.emit(event);
            }
            OutputKind::Replay => {
                let identifier = self.replay.base.identifier;
                self.replay.base.finish_stop();
                let mut event = OutboundEvent::new(Events::ReplayStopped)
                    .with_identifier(identifier)
                    .with_field("code", code);
                if let Some(err) = last_error {
                    event = event.with_field("last_error", err);
                }
                self.emit(event);
            }
            OutputKind::Streaming => {
                let identifier = self.streamer.base.identifier;
                self.streamer.base.finish_stop();
                let mut event = OutboundEvent::new(Events::StreamingStopped)
                    .with_identifier(identifier)
                    .with_field("code", code);
                if let Some(err) = last_error {
                    event = event.with_field("last_error", err);
                }
                self.emit(event);
            }
        }
    }

    fn on_output_stopping(&mut self, output: OutputKind) {
        let (event, identifier) = match output {
            OutputKind::Recording => (Events::RecordingStopping, self.recorder.base.identifier),
            OutputKind::Replay => (Events::ReplayStopping, self.replay.base.identifier),
            OutputKind::Streaming => (Events::StreamingStopping, self.streamer.base.identifier),
        };
        self.emit(OutboundEvent::new(event).with_identifier(identifier));
    }

    fn on_output_started(&mut self, output: OutputKind) {
        match output {
            OutputKind::Recording => {
                let identifier = self.recorder.base.identifier;
                self.emit_recording_started(identifier);
            }
            OutputKind::Replay => {
                let identifier = self.replay.base.identifier;
                self.emit(OutboundEvent::new(Events::ReplayStarted).with_identifier(identifier));
            }
            OutputKind::Streaming => {
                let identifier = self.streamer.base.identifier;
                self.emit(OutboundEvent::new(Events::StreamingStarted).with_identifier(identifier));
            }
        }
    }

    fn on_video_split(&mut self, output: OutputKind, next_path: String, split_duration_ms: u64, last_pts_usec: i64) {
        if output != OutputKind::Recording {
            return;
        }
        let identifier = self.recorder.base.identifier;
        let closed_path = self.recorder.config.path.clone();
        self.recorder.config.path = next_path.clone();
        self.emit(
            OutboundEvent::new(Events::VideoFileSplit)
                .with_identifier(identifier)
                .with_field("path", closed_path)
                .with_field("next_video_path", next_path)
                .with_field("split_duration_ms", split_duration_ms)
                .with_field("last_pts_usec", last_pts_usec),
        );
    }

    fn on_disk_space_warning(&mut self, output: OutputKind, path: String) {
        if self.low_disk_space_warned {
            return;
        }
        self.low_disk_space_warned = true;
        let identifier = match output {
            OutputKind::Recording => self.recorder.base.identifier,
            OutputKind::Replay => self.replay.base.identifier,
            OutputKind::Streaming => self.streamer.base.identifier,
        };
        self.emit(
            OutboundEvent::new(Events::ObsWarning)
                .with_identifier(identifier)
                .with_field("message", "low_disk_space_warning")
                .with_field("path", path),
        );
    }

    fn on_output_no_space(&mut self, output: OutputKind) {
        match output {
            OutputKind::Recording => {
                let identifier = self.recorder.base.identifier;
                self.recorder.base.finish_stop();
                self.emit(
                    OutboundEvent::new(Events::RecordingStopped)
                        .with_identifier(identifier)
                        .with_field("code", StartErrorCode::NO_SPACE)
                        .with_field("last_error", "Out_Of_Disk_Space"),
                );
            }
            OutputKind::Replay => {
                let identifier = self.replay.base.identifier;
                self.replay.base.finish_stop();
                self.emit(
                    OutboundEvent::new(Events::ReplayStopped)
                        .with_identifier(identifier)
                        .with_field("code", StartErrorCode::NO_SPACE)
                        .with_field("last_error", "Out_Of_Disk_Space"),
                );
            }
            OutputKind::Streaming => {
                let identifier = self.streamer.base.identifier;
                self.streamer.base.finish_stop();
                self.emit(
                    OutboundEvent::new(Events::StreamingStopped)
                        .with_identifier(identifier)
                        .with_field("code", StartErrorCode::NO_SPACE)
                        .with_field("last_error", "Out_Of_Disk_Space"),
                );
            }
        }
    }

    fn on_encoder_packet(&mut self, packet: crate::engine::EncoderPacket) {
        self.encoder_last_pts_usec = self.encoder_last_pts_usec.max(packet.sys_pts_usec);
        let sys_pts_usec = packet.sys_pts_usec;

        if packet.kind == PacketKind::Video || packet.kind == PacketKind::Audio {
            let just_armed = self.replay.push_packet(packet);
            if just_armed {
                let identifier = self.replay.base.identifier;
                self.emit(OutboundEvent::new(Events::ReplayArmed).with_identifier(identifier));
            }
        }

        if self.replay.is_capturing() {
            if let Some(save_ts) = self.replay.pending_save_ts() {
                if crate::timers::capture_stop_has_timed_out(self.encoder_last_pts_usec, save_ts) {
                    if let Some(ready) = self.replay.force_finish_capture(self.encoder_last_pts_usec, false) {
                        self.emit(
                            OutboundEvent::new(Events::ObsWarning)
                                .with_identifier(self.replay.base.identifier)
                                .with_field("message", "replay_time_out"),
                        );
                        self.finish_replay_capture(ready);
                    }
                    return;
                }
            }
            if let Some(ready) = self.replay.advance_capture(sys_pts_usec) {
                self.finish_replay_capture(ready);
            }
        }
    }

    fn finish_replay_capture(&mut self, ready: crate::outputs::replay::CaptureReady) {
        let identifier = self.replay.base.identifier;
        let video_start_time = (chrono::Utc::now() - chrono::Duration::milliseconds(ready.duration_ms as i64))
            .timestamp_millis();
        let mut event = OutboundEvent::new(Events::ReplayCaptureVideoReady)
            .with_identifier(identifier)
            .with_field("path", ready.path)
            .with_field("duration_ms", ready.duration_ms)
            .with_field("video_start_time", video_start_time)
            .with_field("disconnection", ready.disconnection);
        if let Some(folder) = ready.thumbnail_folder {
            event = event.with_field("thumbnail_folder", folder);
        }
        self.emit(event);

        if self.replay.stop_replay_on_replay_ready {
            self.replay.stop_replay_on_replay_ready = false;
            self.replay.base.begin_stopping();
            self.engine.stop_output(OutputKind::Replay, false);
            self.emit(OutboundEvent::new(Events::ReplayStopping).with_identifier(identifier));
        }
    }

    fn on_replay_stop_timeout(&mut self) {
        self.replay_stop_timer = None;
        if self.replay.base.is_idle() {
            return;
        }
        let identifier = self.replay.base.identifier;
        self.engine.stop_output(OutputKind::Replay, true);
        self.replay.base.finish_stop();
        self.emit(
            OutboundEvent::new(Events::ReplayStopped)
                .with_identifier(identifier)
                .with_field("code", ReplayErrorCode::ReplayObsError.code())
                .with_field("last_error", "replay_time_out"),
        );
    }

    fn on_stats_tick(&mut self) {
        self.sample_stats_for(OutputKind::Recording);
        self.sample_stats_for(OutputKind::Replay);
        self.sample_stats_for(OutputKind::Streaming);
    }

    fn sample_stats_for(&mut self, kind: OutputKind) {
        let (is_active, identifier) = match kind {
            OutputKind::Recording => (self.recorder.base.is_active(), self.recorder.base.identifier),
            OutputKind::Replay => (self.replay.base.is_active(), self.replay.base.identifier),
            OutputKind::Streaming => (self.streamer.base.is_active(), self.streamer.base.identifier),
        };
        if !is_active {
            return;
        }

        let raw = self.engine.sample_stats(kind);
        let label = crate::timers::output_kind_label(kind);
        let prev_skipped = *self.last_skipped_frames.get(label).unwrap_or(&raw.skipped_frames);
        let skipped_delta = raw.skipped_frames.saturating_sub(prev_skipped);
        self.last_skipped_frames.insert(label, raw.skipped_frames);

        let total_frames = raw.total_frames.max(1) as f64;
        let percentage_skipped = skipped_delta as f64 / total_frames * 100.0;

        let base = match kind {
            OutputKind::Recording => &mut self.recorder.base,
            OutputKind::Replay => &mut self.replay.base,
            OutputKind::Streaming => &mut self.streamer.base,
        };
        let stats = base.derive_statistics(raw);

        let last_warned = base.last_warned_lag_percentage.unwrap_or(0.0);
        if stats.percentage_lagged - last_warned >= LAG_WARNING_STEP_PERCENT {
            base.last_warned_lag_percentage = Some(stats.percentage_lagged);
            self.emit(
                OutboundEvent::new(Events::ObsWarning)
                    .with_identifier(identifier)
                    .with_field("message", "performance_lagged_frames")
                    .with_field("percentage_lagged", stats.percentage_lagged),
            );
        }

        let high_cpu_now = skipped_delta > HIGH_CPU_SKIPPED_DELTA && percentage_skipped >= HIGH_CPU_SKIPPED_PERCENT;
        let base = match kind {
            OutputKind::Recording => &mut self.recorder.base,
            OutputKind::Replay => &mut self.replay.base,
            OutputKind::Streaming => &mut self.streamer.base,
        };
        if high_cpu_now && !base.high_cpu_warning_active {
            base.high_cpu_warning_active = true;
            self.emit(
                OutboundEvent::new(Events::ObsWarning)
                    .with_identifier(identifier)
                    .with_field("message", "performance_high_cpu_usages"),
            );
        } else if !high_cpu_now {
            base.high_cpu_warning_active = false;
        }
    }
}

fn devices_to_json(devices: Vec<DeviceInfo>) -> Vec<serde_json::Value> {
    devices
        .into_iter()
        .map(|d| json!({"id": d.id, "name": d.name}))
        .collect()
}

impl From<crate::error::ReplayCaptureError> for ReplayErrorCode {
    fn from(err: crate::error::ReplayCaptureError) -> Self {
        use crate::error::ReplayCaptureError as E;
        match err {
            E::Offline => ReplayErrorCode::Offline,
            E::StartCaptureObsError => ReplayErrorCode::StartCaptureObsError,
            E::AlreadyCapturing => ReplayErrorCode::AlreadyCapturing,
            E::StopCaptureNoCapture => ReplayErrorCode::StopCaptureNoCapture,
            E::StopCaptureObsError => ReplayErrorCode::StopCaptureObsError,
            E::ReplayObsError => ReplayErrorCode::ReplayObsError,
            E::ReplayOfflineDelay => ReplayErrorCode::ReplayOfflineDelay,
        }
    }
}
