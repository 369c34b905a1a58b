//! `AudioController`: audio source construction, mixer-track assignment,
//! and volume handling (spec §3 AudioTrack/AudioSource, §4.7).

use std::collections::HashMap;

use crate::protocol::payloads::{AudioSettings, ProcessAudioSpecWire};

/// Number of parallel mixer tracks the engine exposes.
pub const MAX_AUDIO_MIXES: u8 = 6;

/// Bitmask over tracks 1..=6. Bit 0 corresponds to track 1. Invariant:
/// track 1 is always enabled on any non-empty mask actually applied to an
/// output (spec §3); `AudioTrackMask` itself does not enforce that — the
/// controller does, at the point an `AudioSource` is finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioTrackMask(u8);

impl AudioTrackMask {
    pub const TRACK_1: AudioTrackMask = AudioTrackMask(0b0000_0001);
    pub const TRACK_2: AudioTrackMask = AudioTrackMask(0b0000_0010);
    pub const TRACK_3: AudioTrackMask = AudioTrackMask(0b0000_0100);

    pub fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & ((1 << MAX_AUDIO_MIXES) - 1))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn with_track(track: u8) -> Self {
        assert!((1..=MAX_AUDIO_MIXES).contains(&track));
        Self(1 << (track - 1))
    }

    pub fn union(self, other: AudioTrackMask) -> AudioTrackMask {
        Self(self.0 | other.0)
    }

    pub fn contains(self, track: u8) -> bool {
        self.0 & (1 << (track - 1)) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn ensure_track_one(self) -> Self {
        self.union(Self::TRACK_1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSourceKind {
    WasapiInput,
    WasapiOutput,
    ProcessOutput,
}

#[derive(Debug, Clone)]
pub struct AudioSource {
    pub name: String,
    pub kind: AudioSourceKind,
    pub device_id: Option<String>,
    pub process_name: Option<String>,
    pub volume_percent: f32,
    pub mono: bool,
    pub muted: bool,
    pub use_device_timing: bool,
    pub tracks: AudioTrackMask,
}

impl AudioSource {
    /// Clamp to `[0, 2000]` percent (spec §3 AudioSource.volume).
    pub fn clamp_volume(volume: f32) -> f32 {
        volume.clamp(0.0, 2000.0)
    }

    /// Engine-applied gain: a cubic fader curve at or below 100%, a raw
    /// multiplier above it (spec §4.7). `volume=-1` means "leave it
    /// unchanged" and is handled by the caller before this is reached.
    pub fn engine_gain(volume_percent: f32) -> f32 {
        let v = Self::clamp_volume(volume_percent);
        if v <= 100.0 {
            let fraction = v / 100.0;
            fraction * fraction * fraction
        } else {
            v / 100.0
        }
    }

    pub fn set_volume(&mut self, volume_percent: f32) {
        if volume_percent < 0.0 {
            return; // "-1 means ignore, do not change" (spec §4.7).
        }
        self.volume_percent = Self::clamp_volume(volume_percent);
    }
}

/// Builds the set of `AudioSource`s for a `START` command, following the
/// legacy/V2/process-audio precedence of spec §4.7.
#[derive(Debug, Default)]
pub struct AudioController {
    pub sources: HashMap<String, AudioSource>,
}

impl AudioController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the controller's source set from a `START` payload's
    /// `audio_settings`. V2 (`extra_options.audio_sources`) fully supersedes
    /// the legacy `output`/`input` sub-objects when present.
    pub fn configure(&mut self, settings: &AudioSettings) {
        self.sources.clear();

        let separate_tracks = settings.separate_tracks;
        let explicit_mask = settings.explicit_track_mask();

        if let Some(extra) = &settings.extra_options {
            if !extra.audio_sources.is_empty() {
                for wire in &extra.audio_sources {
                    if !wire.enable {
                        continue;
                    }
                    let kind = match wire.kind.as_str() {
                        "input" => AudioSourceKind::WasapiInput,
                        _ => AudioSourceKind::WasapiOutput,
                    };
                    let tracks = explicit_mask
                        .unwrap_or_else(|| AudioTrackMask::from_bits_truncate(wire.tracks))
                        .ensure_track_one();
                    self.sources.insert(
                        wire.name.clone(),
                        AudioSource {
                            name: wire.name.clone(),
                            kind,
                            device_id: Some(wire.device_id.clone()),
                            process_name: None,
                            volume_percent: AudioSource::clamp_volume(wire.volume),
                            mono: wire.mono,
                            muted: false,
                            use_device_timing: wire.use_device_timing,
                            tracks,
                        },
                    );
                }
                self.configure_process_sources(&settings.audio_capture_process2, explicit_mask);
                return;
            }
        }

        // Legacy path: one desktop source from `output`, one mic from `input`.
        if let Some(output) = &settings.output {
            if let Some(device_id) = enabled_device_id(output.device_id.as_deref()) {
                let tracks = explicit_mask.unwrap_or(if separate_tracks {
                    AudioTrackMask::with_track(1).union(AudioTrackMask::with_track(2))
                } else {
                    AudioTrackMask::TRACK_1
                });
                self.sources.insert(
                    "desktop".to_string(),
                    AudioSource {
                        name: "desktop".to_string(),
                        kind: AudioSourceKind::WasapiOutput,
                        device_id: Some(device_id),
                        process_name: None,
                        volume_percent: 100.0,
                        mono: false,
                        muted: false,
                        use_device_timing: false,
                        tracks: tracks.ensure_track_one(),
                    },
                );
            }
        }

        if let Some(input) = &settings.input {
            if let Some(device_id) = enabled_device_id(input.device_id.as_deref()) {
                let tracks = explicit_mask.unwrap_or(if separate_tracks {
                    AudioTrackMask::with_track(1).union(AudioTrackMask::with_track(3))
                } else {
                    AudioTrackMask::TRACK_1
                });
                self.sources.insert(
                    "mic".to_string(),
                    AudioSource {
                        name: "mic".to_string(),
                        kind: AudioSourceKind::WasapiInput,
                        device_id: Some(device_id),
                        process_name: None,
                        volume_percent: 100.0,
                        mono: false,
                        muted: false,
                        use_device_timing: false,
                        tracks: tracks.ensure_track_one(),
                    },
                );
            }
        }

        self.configure_process_sources(&settings.audio_capture_process2, explicit_mask);
    }

    fn configure_process_sources(
        &mut self,
        specs: &[ProcessAudioSpecWire],
        explicit_mask: Option<AudioTrackMask>,
    ) {
        // Duplicate process names are coalesced (spec §4.7): last one wins,
        // mirroring HashMap insert-by-key semantics used for every source.
        for spec in specs {
            if !spec.enable {
                continue;
            }
            let tracks = explicit_mask
                .unwrap_or_else(|| AudioTrackMask::from_bits_truncate(spec.tracks))
                .ensure_track_one();
            self.sources.insert(
                spec.process_name.clone(),
                AudioSource {
                    name: spec.process_name.clone(),
                    kind: AudioSourceKind::ProcessOutput,
                    device_id: None,
                    process_name: Some(spec.process_name.clone()),
                    volume_percent: AudioSource::clamp_volume(spec.volume),
                    mono: spec.mono,
                    muted: false,
                    use_device_timing: false,
                    tracks,
                },
            );
        }
    }

    /// The union of `tracks` across every enabled source (spec §4.7).
    pub fn active_tracks(&self) -> AudioTrackMask {
        self.sources
            .values()
            .filter(|s| !s.muted)
            .fold(AudioTrackMask::default(), |acc, s| acc.union(s.tracks))
    }

    pub fn set_volume(&mut self, name: &str, volume_percent: f32) -> bool {
        match self.sources.get_mut(name) {
            Some(source) => {
                source.set_volume(volume_percent);
                true
            }
            None => false,
        }
    }
}

fn enabled_device_id(device_id: Option<&str>) -> Option<String> {
    match device_id {
        None => None,
        Some("") => None,
        Some("disabled") => None,
        Some(id) => Some(id.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::payloads::AudioDeviceOptions;

    #[test]
    fn volume_minus_one_leaves_previous_value_unchanged() {
        let mut source = AudioSource {
            name: "mic".into(),
            kind: AudioSourceKind::WasapiInput,
            device_id: None,
            process_name: None,
            volume_percent: 80.0,
            mono: false,
            muted: false,
            use_device_timing: false,
            tracks: AudioTrackMask::TRACK_1,
        };
        source.set_volume(-1.0);
        assert_eq!(source.volume_percent, 80.0);
    }

    #[test]
    fn volume_clamped_to_0_2000_range() {
        assert_eq!(AudioSource::clamp_volume(3000.0), 2000.0);
        assert_eq!(AudioSource::clamp_volume(-5.0), 0.0);
    }

    #[test]
    fn separate_tracks_assigns_desktop_to_1_2_and_mic_to_1_3() {
        let mut controller = AudioController::new();
        let settings = AudioSettings {
            sample_rate: 48000,
            output: Some(AudioDeviceOptions {
                device_id: Some("speakers".into()),
            }),
            input: Some(AudioDeviceOptions {
                device_id: Some("mic".into()),
            }),
            separate_tracks: true,
            tracks: None,
            extra_options: None,
            audio_capture_process2: vec![],
        };
        controller.configure(&settings);
        let desktop = &controller.sources["desktop"];
        let mic = &controller.sources["mic"];
        assert!(desktop.tracks.contains(1) && desktop.tracks.contains(2));
        assert!(mic.tracks.contains(1) && mic.tracks.contains(3));
    }

    #[test]
    fn disabled_device_id_creates_no_source() {
        let mut controller = AudioController::new();
        let settings = AudioSettings {
            output: Some(AudioDeviceOptions {
                device_id: Some("disabled".into()),
            }),
            ..Default::default()
        };
        controller.configure(&settings);
        assert!(controller.sources.is_empty());
    }

    #[test]
    fn v2_sources_supersede_legacy_sub_objects() {
        use crate::protocol::payloads::{AudioExtraOptions, AudioSourceSpecWire};
        let mut controller = AudioController::new();
        let settings = AudioSettings {
            output: Some(AudioDeviceOptions {
                device_id: Some("speakers".into()),
            }),
            extra_options: Some(AudioExtraOptions {
                audio_sources: vec![AudioSourceSpecWire {
                    name: "custom".into(),
                    device_id: "dev1".into(),
                    kind: "output".into(),
                    volume: 50.0,
                    mono: false,
                    use_device_timing: false,
                    tracks: 0b0000_0010,
                    enable: true,
                }],
            }),
            ..Default::default()
        };
        controller.configure(&settings);
        assert_eq!(controller.sources.len(), 1);
        assert!(controller.sources.contains_key("custom"));
        assert!(!controller.sources.contains_key("desktop"));
    }

    #[test]
    fn active_tracks_is_union_of_enabled_sources() {
        let mut controller = AudioController::new();
        controller.sources.insert(
            "a".into(),
            AudioSource {
                name: "a".into(),
                kind: AudioSourceKind::WasapiOutput,
                device_id: None,
                process_name: None,
                volume_percent: 100.0,
                mono: false,
                muted: false,
                use_device_timing: false,
                tracks: AudioTrackMask::with_track(2),
            },
        );
        controller.sources.insert(
            "b".into(),
            AudioSource {
                name: "b".into(),
                kind: AudioSourceKind::WasapiOutput,
                device_id: None,
                process_name: None,
                volume_percent: 100.0,
                mono: false,
                muted: true,
                use_device_timing: false,
                tracks: AudioTrackMask::with_track(4),
            },
        );
        let active = controller.active_tracks();
        assert!(active.contains(2));
        assert!(!active.contains(4)); // muted source excluded
    }
}
