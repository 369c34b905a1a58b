//! Exercises the replay buffer end to end through the orchestrator: start
//! the replay output, push encoder packets until the ring arms, then run a
//! `START_REPLAY_CAPTURE` → `STOP_REPLAY_CAPTURE` cycle to a finished clip.

use std::sync::Arc;

use capture_core::config::Config;
use capture_core::dispatcher::WorkerMsg;
use capture_core::engine::{EncoderPacket, EngineSignal, NullEngine, OutputKind, PacketKind};
use capture_core::orchestrator::Orchestrator;
use capture_core::protocol::InboundCommand;
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedReceiver;

fn config() -> Config {
    Config {
        channel: None,
        secondary: false,
        debugger_attach: false,
    }
}

fn command(value: Value) -> InboundCommand {
    serde_json::from_value(value).unwrap()
}

fn drain(rx: &mut UnboundedReceiver<Vec<u8>>) -> Vec<Value> {
    let mut out = Vec::new();
    while let Ok(bytes) = rx.try_recv() {
        out.push(serde_json::from_slice(&bytes).unwrap());
    }
    out
}

fn keyframe(dts_usec: i64, size: usize) -> EncoderPacket {
    EncoderPacket {
        pts_usec: dts_usec,
        dts_usec,
        sys_pts_usec: dts_usec,
        data: vec![0; size],
        size,
        keyframe: true,
        track_idx: 0,
        kind: PacketKind::Video,
    }
}

#[test]
fn replay_buffer_arms_then_captures_a_clip() {
    let (engine_tx, _engine_rx) = tokio::sync::mpsc::unbounded_channel();
    let engine = NullEngine::new(engine_tx);
    let (event_tx, mut events) = tokio::sync::mpsc::unbounded_channel();
    let shutdown = Arc::new(tokio::sync::Notify::new());
    let mut orchestrator = Orchestrator::new(engine, event_tx, shutdown, config());
    orchestrator.startup();

    let start = json!({
        "cmd": 3,
        "identifier": 5,
        "recorder_type": 2,
        "video_settings": {"base_width": 1920, "base_height": 1080, "fps": 60},
        "video_encoder_settings": {"encoder_id": "obs_x264", "bitrate": 6000},
        "scene": {"monitor": {"monitor_id": "monitor-0", "monitor_handle": 1}},
        "replay": {"max_time_sec": 1000, "max_size_mb": 1}
    });
    orchestrator.handle_worker_msg(WorkerMsg::Command(command(start)));
    let startup_events = drain(&mut events);
    assert!(startup_events.iter().any(|e| e["event"] == 9), "expected REPLAY_STARTED");

    // Push enough keyframed packets to overflow the 1MB ring (spec §4.5):
    // the first keyframe eviction arms the buffer exactly once.
    let chunk = 200_000;
    for i in 0..40i64 {
        orchestrator.handle_worker_msg(WorkerMsg::EngineSignal(EngineSignal::EncoderPacket(keyframe(
            i * 1000,
            chunk,
        ))));
    }
    let armed_events: Vec<_> = drain(&mut events).into_iter().filter(|e| e["event"] == 12).collect();
    assert_eq!(armed_events.len(), 1, "REPLAY_ARMED should fire exactly once");

    // START_REPLAY_CAPTURE, then STOP_REPLAY_CAPTURE forced so it finalizes
    // on the very next packet.
    orchestrator.handle_worker_msg(WorkerMsg::Command(command(json!({
        "cmd": 8,
        "head_duration_ms": 5000,
        "path": "C:/clip.mp4"
    }))));
    let capture_started: Vec<_> = drain(&mut events).into_iter().filter(|e| e["event"] == 13).collect();
    assert_eq!(capture_started.len(), 1, "REPLAY_CAPTURE_VIDEO_STARTED expected");

    orchestrator.handle_worker_msg(WorkerMsg::Command(command(json!({
        "cmd": 9,
        "force": true
    }))));

    // Any further packet's sys_pts_usec is >= save_ts(=1) when forced, so the
    // capture finalizes and emits REPLAY_CAPTURE_VIDEO_READY.
    orchestrator.handle_worker_msg(WorkerMsg::EngineSignal(EngineSignal::EncoderPacket(keyframe(
        41_000, chunk,
    ))));
    let ready: Vec<_> = drain(&mut events).into_iter().filter(|e| e["event"] == 14).collect();
    assert_eq!(ready.len(), 1, "REPLAY_CAPTURE_VIDEO_READY expected");
    assert_eq!(ready[0]["path"], "C:/clip.mp4");
}

#[test]
fn stop_replay_capture_with_no_active_capture_reports_an_error() {
    let (engine_tx, _engine_rx) = tokio::sync::mpsc::unbounded_channel();
    let engine = NullEngine::new(engine_tx);
    let (event_tx, mut events) = tokio::sync::mpsc::unbounded_channel();
    let shutdown = Arc::new(tokio::sync::Notify::new());
    let mut orchestrator = Orchestrator::new(engine, event_tx, shutdown, config());
    orchestrator.startup();

    orchestrator.handle_worker_msg(WorkerMsg::Command(command(json!({
        "cmd": 9,
        "force": false
    }))));

    let events = drain(&mut events);
    let errs: Vec<_> = events.iter().filter(|e| e["event"] == 15).collect();
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0]["code"], -4); // StopCaptureNoCapture
}

/// `free-standing` sanity check that `OutputKind` round-trips through the
/// engine's signal variant used above (guards against the enum drifting
/// without the test catching it).
#[test]
fn replay_output_kind_is_distinct_from_recording_and_streaming() {
    assert_ne!(OutputKind::Replay, OutputKind::Recording);
    assert_ne!(OutputKind::Replay, OutputKind::Streaming);
}
