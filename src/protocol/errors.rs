//! Error code tables from spec §6/§7. Negative integers, selected subset.

/// Errors reported on the `ERR` event for `START`/`QUERY_MACHINE_INFO` failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum StartErrorCode {
    CurrentlyActive = -1,
    FailedToInit = -2,
    FailedToCreateScene = -3,
    FailedToCreateSources = -4,
    MissingParam = -5,
    UnsupportedVideoEncoder = -6,
    FailedCreatingOutputFile = -7,
    FailedCreatingVidEncoder = -8,
    FailedCreatingAudEncoder = -9,
    FailedStartingUpdateDriverError = -10,
    FailedCreatingOutputSignals = -12,
    FailedStartingOutputAlreadyRunning = -13,
    UnsupportedRecordingType = -14,
    ReplayStartError = -15,
    StreamStartNoServiceError = -16,
    FailedStartingOutputWithObsError = -17,
    GameInjectionError = -18,
}

impl StartErrorCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Synthetic "stopped while delayed and the game never started
    /// capturing" code from spec §4.2.2. Not part of the negative-code
    /// table proper, so it isn't a variant of this enum.
    pub const RUNTIME_CAPTURE_FAILURE: i32 = -999;

    /// Disk exhausted while writing (spec §8 scenario 5). Shares the wire
    /// value of `FailedCreatingOutputFile`; the distinguishing context is
    /// which event (`RECORDING_STOPPED` with `Out_Of_Disk_Space`) carries it.
    pub const NO_SPACE: i32 = -7;
}

/// Errors specific to the replay-capture control plane (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ReplayErrorCode {
    Offline = -1,
    StartCaptureObsError = -2,
    AlreadyCapturing = -3,
    StopCaptureNoCapture = -4,
    StopCaptureObsError = -5,
    ReplayObsError = -6,
    ReplayOfflineDelay = -7,
}

impl ReplayErrorCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}
