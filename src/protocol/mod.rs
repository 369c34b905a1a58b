//! Wire protocol: the JSON command/event surface the controller speaks.
//!
//! Every inbound frame is one JSON object carrying `cmd: Commands` and most
//! carry `identifier`; every outbound frame carries `event: Events`. The
//! enums below fix the integer wire values from spec §6 — renumbering any
//! of them breaks wire compatibility with the controller.

mod envelope;
mod errors;
pub mod payloads;

pub use envelope::{InboundCommand, OutboundEvent};
pub use errors::{ReplayErrorCode, StartErrorCode};

use serde::{Deserialize, Serialize};

/// Correlation key supplied by the controller on every start command and
/// echoed on every event. `NONE` ("-1") denotes "no output"/idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(pub i64);

impl Identifier {
    pub const NONE: Identifier = Identifier(-1);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl Default for Identifier {
    fn default() -> Self {
        Self::NONE
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! wire_enum {
    ($name:ident { $($variant:ident = $value:expr),* $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(i32)]
        pub enum $name {
            $($variant = $value),*
        }

        impl $name {
            pub fn as_i32(self) -> i32 {
                self as i32
            }
        }

        impl TryFrom<i32> for $name {
            type Error = i32;

            fn try_from(value: i32) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok(Self::$variant),)*
                    other => Err(other),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_i32(self.as_i32())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let value = i32::deserialize(deserializer)?;
                $name::try_from(value).map_err(|v| {
                    serde::de::Error::custom(format!("unknown {} value {v}", stringify!($name)))
                })
            }
        }
    };
}

wire_enum!(Commands {
    Shutdown = 1,
    QueryMachineInfo = 2,
    Start = 3,
    Stop = 4,
    SetVolume = 5,
    GameFocusChanged = 6,
    AddGameSource = 7,
    StartReplayCapture = 8,
    StopReplayCapture = 9,
    TobiiGaze = 10,
    SetBrb = 11,
    SplitVideo = 12,
});

wire_enum!(RecorderType {
    Video = 1,
    Replay = 2,
    Streaming = 3,
});

wire_enum!(Events {
    QueryMachineInfo = 1,
    Err = 2,
    Ready = 3,
    RecordingStarted = 4,
    RecordingStopping = 5,
    RecordingStopped = 6,
    DisplaySourceChanged = 7,
    VideoFileSplit = 8,
    ReplayStarted = 9,
    ReplayStopping = 10,
    ReplayStopped = 11,
    ReplayArmed = 12,
    ReplayCaptureVideoStarted = 13,
    ReplayCaptureVideoReady = 14,
    ReplayError = 15,
    StreamingStarting = 16,
    StreamingStarted = 17,
    StreamingStopping = 18,
    StreamingStopped = 19,
    SwitchableDeviceDetected = 20,
    ObsWarning = 21,
});
