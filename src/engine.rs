//! The native capture/encode engine, treated as a black box (spec §1).
//!
//! Everything the orchestration layer needs from the engine is expressed as
//! a trait so the core can be built and tested without a real binding. A
//! production build would supply an `Engine` impl that talks to libobs (or
//! whatever encoder/muxer/capture library backs it); `NullEngine` below is
//! the deterministic test double used by this crate's own test suite.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::black_texture::ProbeTarget;
use crate::error::EngineError;
use crate::sources::SourceSpec;

/// Opaque handle to a scene-item the engine created for a `Source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceHandle(pub u64);

/// Which of the three concurrent outputs a signal or start/stop call
/// pertains to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Recording,
    Replay,
    Streaming,
}

#[derive(Debug, Clone, Default)]
pub struct VideoParams {
    pub base_width: u32,
    pub base_height: u32,
    pub output_width: u32,
    pub output_height: u32,
    pub fps: u32,
}

#[derive(Debug, Clone, Default)]
pub struct VideoEncoderParams {
    pub encoder_id: String,
    pub bitrate: u32,
}

#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct EncoderProbeResult {
    pub encoder_id: String,
    pub valid: bool,
    pub status: String,
}

#[derive(Debug, Clone, Default)]
pub struct OutputStartParams {
    pub path: Option<String>,
    pub max_file_size_bytes: Option<u64>,
    pub max_time_sec: Option<u32>,
    pub fragmented: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StreamingParams {
    pub service_type: String,
    pub server_url: String,
    pub stream_key: String,
    pub use_auth: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// One encoded A/V packet, as pushed into the replay ring (spec §3
/// ReplayBufferEntry) or muxed straight to a recorder/streamer file.
#[derive(Debug, Clone)]
pub struct EncoderPacket {
    pub pts_usec: i64,
    pub dts_usec: i64,
    pub sys_pts_usec: i64,
    pub data: Vec<u8>,
    pub size: usize,
    pub keyframe: bool,
    pub track_idx: u32,
    pub kind: PacketKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Video,
    Audio,
}

/// Asynchronous notifications the engine raises on its own threads (spec
/// §4.2.3, §4.4, §4.6, §5 T6). The orchestrator re-posts every one of these
/// onto the command worker before acting on it.
#[derive(Debug, Clone)]
pub enum EngineSignal {
    CaptureStateChanged {
        process_id: u32,
        capturing: bool,
        process_alive: bool,
        compatibility_mode: bool,
        injection_error: bool,
    },
    OutputStarted {
        output: OutputKind,
    },
    OutputStopping {
        output: OutputKind,
    },
    OutputStopped {
        output: OutputKind,
        code: i32,
        last_error: Option<String>,
    },
    VideoSplit {
        output: OutputKind,
        next_path: String,
        split_duration_ms: u64,
        last_pts_usec: i64,
    },
    DiskSpaceWarning {
        output: OutputKind,
        path: String,
    },
    OutputNoSpace {
        output: OutputKind,
    },
    StreamingStarting,
    StreamingStarted,
    EncoderPacket(EncoderPacket),
    /// One off-band render-tap sample for the black-texture probe (spec
    /// §4.2.4). A real binding would post this from the engine's render
    /// thread at the target's own sampling interval.
    FrameSampled {
        target: ProbeTarget,
        colored_pixel_count: u32,
    },
    /// Posted once per second by `timers::StatsTimer` (spec §4.8).
    StatsTick,
    /// Posted by `timers::ReplayStopTimer` if a replay capture hasn't
    /// finalized within its 10s deadline (spec §4.2.3, §4.8).
    ReplayStopTimeout,
}

/// Everything the orchestration layer drives on the black-box engine.
pub trait Engine: Send + Sync {
    fn init_video(&self, params: &VideoParams) -> Result<(), EngineError>;
    fn init_video_encoder(&self, params: &VideoEncoderParams) -> Result<(), EngineError>;
    fn init_audio(&self) -> Result<(), EngineError>;

    fn enumerate_audio_inputs(&self) -> Vec<DeviceInfo>;
    fn enumerate_audio_outputs(&self) -> Vec<DeviceInfo>;
    /// Probes every known video encoder in a guard that contains the fault
    /// to the encoder being probed (spec §9: a crashing probe must not take
    /// down the others). `NullEngine` never fails; a real binding would
    /// isolate each probe (subprocess, signal handler, or catch_unwind
    /// around FFI) and fold any resulting panic/crash into `valid: false`.
    fn enumerate_video_encoders(&self) -> Vec<EncoderProbeResult>;
    fn winrt_capture_supported(&self) -> bool;

    fn create_source(&self, spec: &SourceSpec) -> Result<SourceHandle, EngineError>;
    fn remove_source(&self, handle: SourceHandle);
    fn set_source_visible(&self, handle: SourceHandle, visible: bool);
    fn move_source_to_top(&self, handle: SourceHandle);
    fn set_game_foreground(&self, handle: SourceHandle, foreground: bool);

    /// Switches a game source to the shared-memory compatibility fallback
    /// (spec §4.2.4 `OnBlackTextureDetected(Game)`).
    fn set_game_compatibility_mode(&self, handle: SourceHandle, enabled: bool);

    /// Rebuilds a monitor source in "compatible" mode, preserving
    /// `monitor_id`/`monitor_handle`/`force` (spec §4.2.4
    /// `OnBlackTextureDetected(Monitor)`). Returns the new handle; the old
    /// one is considered destroyed.
    fn rebuild_monitor_source(
        &self,
        old: SourceHandle,
        monitor_id: &str,
        monitor_handle: i64,
        force: bool,
    ) -> Result<SourceHandle, EngineError>;

    fn start_output(
        &self,
        output: OutputKind,
        params: &OutputStartParams,
    ) -> Result<(), EngineError>;
    fn stop_output(&self, output: OutputKind, force: bool);
    fn split_output(&self, output: OutputKind);

    fn start_streaming(&self, params: &StreamingParams) -> Result<(), EngineError>;

    /// Raw frame counters for the given output, sampled by `StatsTimer`
    /// (spec §3 OutputStatistics, §4.8).
    fn sample_stats(&self, output: OutputKind) -> crate::outputs::base::RawCounters;

    /// Free space, in megabytes, on the drive backing the recorder's
    /// output file (spec §4.5 Disk-space guard).
    fn free_disk_space_mb(&self, output: OutputKind) -> Option<u64>;
}

/// Deterministic test double: every call succeeds and records what it was
/// asked to do so tests can assert on it; signals are only emitted when a
/// test explicitly calls `fire`.
pub struct NullEngine {
    signal_tx: UnboundedSender<EngineSignal>,
    next_handle: std::sync::atomic::AtomicU64,
    pub calls: parking_lot::Mutex<Vec<String>>,
    pub fail_video_init: std::sync::atomic::AtomicBool,
    pub fail_output_start: std::sync::atomic::AtomicBool,
}

impl NullEngine {
    pub fn new(signal_tx: UnboundedSender<EngineSignal>) -> Arc<Self> {
        Arc::new(Self {
            signal_tx,
            next_handle: std::sync::atomic::AtomicU64::new(1),
            calls: parking_lot::Mutex::new(Vec::new()),
            fail_video_init: std::sync::atomic::AtomicBool::new(false),
            fail_output_start: std::sync::atomic::AtomicBool::new(false),
        })
    }

    fn log(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    /// Test helper: push a signal as if it arrived from an engine thread.
    pub fn fire(&self, signal: EngineSignal) {
        let _ = self.signal_tx.send(signal);
    }
}

impl Engine for NullEngine {
    fn init_video(&self, params: &VideoParams) -> Result<(), EngineError> {
        self.log(format!("init_video({}x{}@{})", params.base_width, params.base_height, params.fps));
        if self.fail_video_init.load(std::sync::atomic::Ordering::Relaxed) {
            return Err(EngineError::VideoInit("forced test failure".into()));
        }
        Ok(())
    }

    fn init_video_encoder(&self, params: &VideoEncoderParams) -> Result<(), EngineError> {
        self.log(format!("init_video_encoder({})", params.encoder_id));
        Ok(())
    }

    fn init_audio(&self) -> Result<(), EngineError> {
        self.log("init_audio");
        Ok(())
    }

    fn enumerate_audio_inputs(&self) -> Vec<DeviceInfo> {
        vec![DeviceInfo {
            id: "default-input".into(),
            name: "Default Microphone".into(),
        }]
    }

    fn enumerate_audio_outputs(&self) -> Vec<DeviceInfo> {
        vec![DeviceInfo {
            id: "default-output".into(),
            name: "Default Speakers".into(),
        }]
    }

    fn enumerate_video_encoders(&self) -> Vec<EncoderProbeResult> {
        vec![
            EncoderProbeResult {
                encoder_id: "obs_x264".into(),
                valid: true,
                status: "ok".into(),
            },
            EncoderProbeResult {
                encoder_id: "jim_nvenc".into(),
                valid: true,
                status: "ok".into(),
            },
        ]
    }

    fn winrt_capture_supported(&self) -> bool {
        true
    }

    fn create_source(&self, spec: &SourceSpec) -> Result<SourceHandle, EngineError> {
        let id = self.next_handle.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.log(format!("create_source({:?})", spec));
        Ok(SourceHandle(id))
    }

    fn remove_source(&self, handle: SourceHandle) {
        self.log(format!("remove_source({})", handle.0));
    }

    fn set_source_visible(&self, handle: SourceHandle, visible: bool) {
        self.log(format!("set_source_visible({}, {visible})", handle.0));
    }

    fn move_source_to_top(&self, handle: SourceHandle) {
        self.log(format!("move_source_to_top({})", handle.0));
    }

    fn set_game_foreground(&self, handle: SourceHandle, foreground: bool) {
        self.log(format!("set_game_foreground({}, {foreground})", handle.0));
    }

    fn set_game_compatibility_mode(&self, handle: SourceHandle, enabled: bool) {
        self.log(format!("set_game_compatibility_mode({}, {enabled})", handle.0));
    }

    fn rebuild_monitor_source(
        &self,
        old: SourceHandle,
        monitor_id: &str,
        monitor_handle: i64,
        force: bool,
    ) -> Result<SourceHandle, EngineError> {
        self.log(format!(
            "rebuild_monitor_source({}, {monitor_id}, {monitor_handle}, force={force})",
            old.0
        ));
        let id = self.next_handle.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(SourceHandle(id))
    }

    fn start_output(
        &self,
        output: OutputKind,
        _params: &OutputStartParams,
    ) -> Result<(), EngineError> {
        self.log(format!("start_output({output:?})"));
        if self.fail_output_start.load(std::sync::atomic::Ordering::Relaxed) {
            return Err(EngineError::OutputStart("forced test failure".into()));
        }
        Ok(())
    }

    fn stop_output(&self, output: OutputKind, force: bool) {
        self.log(format!("stop_output({output:?}, force={force})"));
    }

    fn split_output(&self, output: OutputKind) {
        self.log(format!("split_output({output:?})"));
    }

    fn start_streaming(&self, _params: &StreamingParams) -> Result<(), EngineError> {
        self.log("start_streaming");
        Ok(())
    }

    fn sample_stats(&self, _output: OutputKind) -> crate::outputs::base::RawCounters {
        crate::outputs::base::RawCounters::default()
    }

    fn free_disk_space_mb(&self, _output: OutputKind) -> Option<u64> {
        None
    }
}
