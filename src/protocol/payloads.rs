//! Typed payload sub-objects pulled out of `InboundCommand::payload` by the
//! handlers that need them (spec §4.2.1, §4.7, §6).

use serde::Deserialize;

use crate::audio::AudioTrackMask;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct VideoSettings {
    pub base_width: u32,
    pub base_height: u32,
    pub output_width: Option<u32>,
    pub output_height: Option<u32>,
    pub fps: u32,
    #[serde(default)]
    pub compatibility_mode: bool,
    #[serde(default)]
    pub game_cursor: bool,
    #[serde(default)]
    pub color_format: Option<String>,
    #[serde(default)]
    pub color_space: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct VideoEncoderSettings {
    pub encoder_id: String,
    pub bitrate: u32,
    #[serde(default)]
    pub rate_control: Option<String>,
    #[serde(default)]
    pub custom_parameters: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ExtraVideoOptions {
    #[serde(default)]
    pub disable_auto_shutdown_on_game_exit: bool,
    #[serde(default)]
    pub custom_sources: Vec<serde_json::Value>,
    #[serde(default)]
    pub fragmented_video_file: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AudioDeviceOptions {
    #[serde(default)]
    pub device_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioSourceSpecWire {
    pub name: String,
    pub device_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub volume: f32,
    #[serde(default)]
    pub mono: bool,
    #[serde(default)]
    pub use_device_timing: bool,
    #[serde(default)]
    pub tracks: u8,
    #[serde(default = "default_true")]
    pub enable: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessAudioSpecWire {
    pub process_name: String,
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default)]
    pub mono: bool,
    #[serde(default)]
    pub volume: f32,
    #[serde(default)]
    pub tracks: u8,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AudioSettings {
    #[serde(default)]
    pub sample_rate: u32,
    #[serde(default)]
    pub output: Option<AudioDeviceOptions>,
    #[serde(default)]
    pub input: Option<AudioDeviceOptions>,
    #[serde(default)]
    pub separate_tracks: bool,
    #[serde(default)]
    pub tracks: Option<u8>,
    #[serde(default)]
    pub extra_options: Option<AudioExtraOptions>,
    #[serde(default)]
    pub audio_capture_process2: Vec<ProcessAudioSpecWire>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AudioExtraOptions {
    #[serde(default)]
    pub audio_sources: Vec<AudioSourceSpecWire>,
}

impl AudioSettings {
    pub fn explicit_track_mask(&self) -> Option<AudioTrackMask> {
        self.tracks.map(AudioTrackMask::from_bits_truncate)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct GameSourceSettings {
    pub process_id: u32,
    #[serde(default)]
    pub foreground: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MonitorSourceSettings {
    pub monitor_id: String,
    #[serde(default)]
    pub monitor_handle: i64,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct WindowSourceSettings {
    pub window_handle: i64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct BrbSourceSettings {
    pub image_path: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TobiiSourceSettings {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SceneSettings {
    #[serde(default)]
    pub monitor: Option<MonitorSourceSettings>,
    #[serde(default)]
    pub window_capture: Option<WindowSourceSettings>,
    #[serde(default)]
    pub game: Option<GameSourceSettings>,
    #[serde(default)]
    pub brb: Option<BrbSourceSettings>,
    #[serde(default)]
    pub tobii: Option<TobiiSourceSettings>,
    #[serde(default)]
    pub aux_sources: Vec<serde_json::Value>,
    #[serde(default)]
    pub keep_game_recording: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ReplaySettings {
    #[serde(default = "default_replay_time")]
    pub max_time_sec: u32,
    #[serde(default = "default_replay_size")]
    pub max_size_mb: u32,
}

fn default_replay_time() -> u32 {
    60
}

fn default_replay_size() -> u32 {
    1000
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StreamingSettings {
    #[serde(rename = "type")]
    pub service_type: String,
    pub server_url: String,
    pub stream_key: String,
    #[serde(default)]
    pub use_auth: bool,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FileOutputSettings {
    pub filename: String,
    #[serde(default)]
    pub max_file_size_bytes: Option<u64>,
    #[serde(default)]
    pub enable_on_demand_split: bool,
    #[serde(default)]
    pub include_full_video: bool,
    #[serde(default)]
    pub max_time_sec: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StartPayload {
    #[serde(default)]
    pub video_settings: VideoSettings,
    #[serde(default)]
    pub video_encoder_settings: VideoEncoderSettings,
    #[serde(default)]
    pub extra_video_options: ExtraVideoOptions,
    #[serde(default)]
    pub audio_settings: AudioSettings,
    #[serde(default)]
    pub scene: SceneSettings,
    #[serde(default)]
    pub replay: ReplaySettings,
    #[serde(default)]
    pub streaming: Option<StreamingSettings>,
    #[serde(default)]
    pub file_output: Option<FileOutputSettings>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StopPayload {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetVolumePayload {
    pub name: String,
    pub volume: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameFocusChangedPayload {
    #[serde(default)]
    pub foreground: bool,
    #[serde(default)]
    pub minimized: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddGameSourcePayload {
    pub process_id: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartReplayCapturePayload {
    pub head_duration_ms: u64,
    pub path: String,
    #[serde(default)]
    pub thumbnail_folder: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StopReplayCapturePayload {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TobiiGazePayload {
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetBrbPayload {
    pub visible: bool,
}
