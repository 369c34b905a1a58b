use thiserror::Error;

use crate::protocol::{ReplayErrorCode, StartErrorCode};

/// Errors surfaced by the `Engine` trait boundary (spec §1: "the engine
/// itself ... treated as a black box"). Mirrors the shape of
/// `media_engine::error::EngineError` from the teacher crate: one flat enum
/// with a string payload per failure family, produced at the boundary where
/// a real binding would otherwise hand back a raw status code.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("video init failed: {0}")]
    VideoInit(String),
    #[error("video encoder init failed: {0}")]
    VideoEncoderInit(String),
    #[error("audio init failed: {0}")]
    AudioInit(String),
    #[error("scene construction failed: {0}")]
    SceneConstruction(String),
    #[error("output start failed: {0}")]
    OutputStart(String),
    #[error("output start failed (driver): {0}")]
    OutputStartDriver(String),
    #[error("encoder probe crashed: {0}")]
    EncoderProbeCrash(String),
}

/// The five-kind error taxonomy from spec §7, collapsed into one type so
/// handlers can turn any failure into a wire error code with `.code()`.
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    #[error("missing or invalid parameter: {0}")]
    Misconfiguration(String),
    #[error(transparent)]
    EngineInit(#[from] EngineError),
    #[error("runtime capture failure: {0}")]
    RuntimeCapture(String),
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
    #[error("unsupported recorder_type {0}")]
    UnsupportedRecorderType(i32),
    #[error("currently active")]
    CurrentlyActive,
    #[error("failed to create sources")]
    FailedToCreateSources,
}

impl CoreError {
    /// The negative wire code this error reports on the `ERR` event.
    pub fn code(&self) -> i32 {
        match self {
            CoreError::Misconfiguration(_) => StartErrorCode::MissingParam.code(),
            CoreError::EngineInit(EngineError::VideoInit(_)) => StartErrorCode::FailedToInit.code(),
            CoreError::EngineInit(EngineError::VideoEncoderInit(_)) => {
                StartErrorCode::UnsupportedVideoEncoder.code()
            }
            CoreError::EngineInit(EngineError::AudioInit(_)) => StartErrorCode::FailedToInit.code(),
            CoreError::EngineInit(EngineError::SceneConstruction(_)) => {
                StartErrorCode::FailedToCreateScene.code()
            }
            CoreError::EngineInit(EngineError::OutputStart(_)) => {
                StartErrorCode::FailedStartingOutputWithObsError.code()
            }
            CoreError::EngineInit(EngineError::OutputStartDriver(_)) => {
                StartErrorCode::FailedStartingUpdateDriverError.code()
            }
            CoreError::EngineInit(EngineError::EncoderProbeCrash(_)) => {
                StartErrorCode::UnsupportedVideoEncoder.code()
            }
            CoreError::RuntimeCapture(_) => StartErrorCode::RUNTIME_CAPTURE_FAILURE,
            CoreError::ResourceExhausted(_) => StartErrorCode::NO_SPACE,
            CoreError::UnsupportedRecorderType(_) => StartErrorCode::UnsupportedRecordingType.code(),
            CoreError::CurrentlyActive => StartErrorCode::CurrentlyActive.code(),
            CoreError::FailedToCreateSources => StartErrorCode::FailedToCreateSources.code(),
        }
    }
}

/// Errors from the replay-capture control plane, reported on `REPLAY_ERROR`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayCaptureError {
    #[error("replay output offline")]
    Offline,
    #[error("start-capture failed in the engine")]
    StartCaptureObsError,
    #[error("a capture is already in progress")]
    AlreadyCapturing,
    #[error("stop-capture requested with no capture in progress")]
    StopCaptureNoCapture,
    #[error("stop-capture failed in the engine")]
    StopCaptureObsError,
    #[error("replay engine error")]
    ReplayObsError,
    #[error("replay offline, delayed start pending")]
    ReplayOfflineDelay,
}

impl ReplayCaptureError {
    pub fn code(self) -> i32 {
        let code = match self {
            ReplayCaptureError::Offline => ReplayErrorCode::Offline,
            ReplayCaptureError::StartCaptureObsError => ReplayErrorCode::StartCaptureObsError,
            ReplayCaptureError::AlreadyCapturing => ReplayErrorCode::AlreadyCapturing,
            ReplayCaptureError::StopCaptureNoCapture => ReplayErrorCode::StopCaptureNoCapture,
            ReplayCaptureError::StopCaptureObsError => ReplayErrorCode::StopCaptureObsError,
            ReplayCaptureError::ReplayObsError => ReplayErrorCode::ReplayObsError,
            ReplayCaptureError::ReplayOfflineDelay => ReplayErrorCode::ReplayOfflineDelay,
        };
        code.code()
    }
}
