//! Drives the orchestrator through a `START` that builds a scene, then feeds
//! `FrameSampled` engine signals to exercise the black-texture probe wired up
//! in §4.2.4: a monitor source rebuilt in compatible mode, and a game source
//! switched to shared-memory capture with `SWITCHABLE_DEVICE_DETECTED`.

use std::sync::Arc;

use capture_core::config::Config;
use capture_core::dispatcher::WorkerMsg;
use capture_core::engine::{EngineSignal, NullEngine};
use capture_core::black_texture::ProbeTarget;
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

#[test]
fn monitor_black_texture_rebuilds_the_source_in_compatible_mode() {
    let (engine_tx, _engine_rx) = tokio::sync::mpsc::unbounded_channel();
    let engine = NullEngine::new(engine_tx);
    let (event_tx, mut events) = tokio::sync::mpsc::unbounded_channel();
    let shutdown = Arc::new(tokio::sync::Notify::new());
    let mut orchestrator = Orchestrator::new(engine.clone(), event_tx, shutdown, config());
    orchestrator.startup();

    let start = json!({
        "cmd": 3,
        "identifier": 1,
        "recorder_type": 1,
        "video_settings": {"base_width": 1920, "base_height": 1080, "fps": 60},
        "video_encoder_settings": {"encoder_id": "obs_x264", "bitrate": 6000},
        "scene": {"monitor": {"monitor_id": "monitor-0", "monitor_handle": 7, "force": true}},
        "file_output": {"filename": "C:/out.mp4"}
    });
    orchestrator.handle_worker_msg(WorkerMsg::Command(command(start)));
    drain(&mut events);

    // Monitor needs 4 consecutive near-black samples before it's declared
    // black (spec §4.2.4).
    for _ in 0..4 {
        orchestrator.handle_worker_msg(WorkerMsg::EngineSignal(EngineSignal::FrameSampled {
            target: ProbeTarget::Monitor,
            colored_pixel_count: 0,
        }));
    }

    let calls = engine.calls.lock();
    assert!(
        calls.iter().any(|c| c.starts_with("rebuild_monitor_source(")),
        "expected the engine to rebuild the monitor source, calls were: {calls:?}"
    );
    assert!(calls.iter().any(|c| c.contains("monitor-0") && c.contains("force=true")));
}

#[test]
fn game_black_texture_switches_compatibility_mode_and_notifies_once() {
    let (engine_tx, _engine_rx) = tokio::sync::mpsc::unbounded_channel();
    let engine = NullEngine::new(engine_tx);
    let (event_tx, mut events) = tokio::sync::mpsc::unbounded_channel();
    let shutdown = Arc::new(tokio::sync::Notify::new());
    let mut orchestrator = Orchestrator::new(engine.clone(), event_tx, shutdown, config());
    orchestrator.startup();

    let start = json!({
        "cmd": 3,
        "identifier": 1,
        "recorder_type": 1,
        "video_settings": {"base_width": 1280, "base_height": 720, "fps": 30},
        "video_encoder_settings": {"encoder_id": "obs_x264", "bitrate": 4000},
        "scene": {"game": {"process_id": 4321, "foreground": true}},
        "file_output": {"filename": "C:/out.mp4"}
    });
    orchestrator.handle_worker_msg(WorkerMsg::Command(command(start)));
    let startup_events = drain(&mut events);
    // Delayed start: only READY, no RECORDING_STARTED yet (spec §4.2.2).
    assert!(startup_events.iter().any(|e| e["event"] == 3));
    assert!(!startup_events.iter().any(|e| e["event"] == 4));

    // Game needs 10 consecutive near-black samples (spec §4.2.4).
    for _ in 0..10 {
        orchestrator.handle_worker_msg(WorkerMsg::EngineSignal(EngineSignal::FrameSampled {
            target: ProbeTarget::Game,
            colored_pixel_count: 0,
        }));
    }

    let calls = engine.calls.lock();
    assert!(calls.iter().any(|c| c.starts_with("set_game_compatibility_mode(") && c.ends_with("true)")));
    drop(calls);

    let after = drain(&mut events);
    let switchable: Vec<_> = after.iter().filter(|e| e["event"] == 20).collect();
    assert_eq!(switchable.len(), 1, "SWITCHABLE_DEVICE_DETECTED should fire exactly once");
}
