//! End-to-end command/event lifecycle through `Orchestrator`, exercised over
//! its public `handle_worker_msg` entry point with a `NullEngine` and a
//! plain `UnboundedReceiver<Vec<u8>>` standing in for the channel.

use std::sync::Arc;

use capture_core::config::Config;
use capture_core::dispatcher::WorkerMsg;
use capture_core::engine::NullEngine;
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

fn new_orchestrator() -> (Orchestrator, UnboundedReceiver<Vec<u8>>) {
    let (engine_tx, _engine_rx) = tokio::sync::mpsc::unbounded_channel();
    let engine = NullEngine::new(engine_tx);
    let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel();
    let shutdown = Arc::new(tokio::sync::Notify::new());
    let mut orchestrator = Orchestrator::new(engine, event_tx, shutdown, config());
    orchestrator.startup();
    (orchestrator, event_rx)
}

fn command(value: Value) -> InboundCommand {
    serde_json::from_value(value).unwrap()
}

fn next_event(rx: &mut UnboundedReceiver<Vec<u8>>) -> Value {
    let bytes = rx.try_recv().expect("expected a queued outbound event");
    serde_json::from_slice(&bytes).unwrap()
}

#[test]
fn query_machine_info_reports_devices_and_encoders() {
    let (mut orchestrator, mut events) = new_orchestrator();
    orchestrator.handle_worker_msg(WorkerMsg::Command(command(json!({
        "cmd": 2,
        "identifier": 42
    }))));

    let event = next_event(&mut events);
    assert_eq!(event["event"], 1); // QueryMachineInfo
    assert_eq!(event["identifier"], 42);
    assert!(event["audio_in"].as_array().unwrap().len() >= 1);
    assert!(event["video_encoders"].as_array().unwrap().len() >= 1);
}

#[test]
fn start_and_stop_a_monitor_recording() {
    let (mut orchestrator, mut events) = new_orchestrator();
    let start = json!({
        "cmd": 3,
        "identifier": 7,
        "recorder_type": 1,
        "video_settings": {"base_width": 1920, "base_height": 1080, "fps": 60},
        "video_encoder_settings": {"encoder_id": "obs_x264", "bitrate": 6000},
        "scene": {"monitor": {"monitor_id": "\\\\.\\DISPLAY1", "monitor_handle": 1}},
        "file_output": {"filename": "C:/out.mp4"}
    });
    orchestrator.handle_worker_msg(WorkerMsg::Command(command(start)));

    let ready = next_event(&mut events);
    assert_eq!(ready["event"], 3); // Ready
    let started = next_event(&mut events);
    assert_eq!(started["event"], 4); // RecordingStarted
    assert_eq!(started["identifier"], 7);

    let stop = json!({"cmd": 4, "identifier": 7, "recorder_type": 1});
    orchestrator.handle_worker_msg(WorkerMsg::Command(command(stop)));
    let stopping = next_event(&mut events);
    assert_eq!(stopping["event"], 5); // RecordingStopping
}

#[test]
fn start_with_unsupported_recorder_type_emits_error() {
    let (mut orchestrator, mut events) = new_orchestrator();
    let start = json!({
        "cmd": 3,
        "identifier": 1,
        "recorder_type": 99,
        "video_settings": {"base_width": 1280, "base_height": 720, "fps": 30},
        "video_encoder_settings": {"encoder_id": "obs_x264", "bitrate": 4000},
        "scene": {"monitor": {"monitor_id": "m", "monitor_handle": 1}}
    });
    orchestrator.handle_worker_msg(WorkerMsg::Command(command(start)));

    let err = next_event(&mut events);
    assert_eq!(err["event"], 2); // Err
    assert_eq!(err["identifier"], 1);
    assert_eq!(err["code"], -14); // UnsupportedRecordingType
}

#[test]
fn unknown_command_id_is_dropped_without_reply() {
    let (mut orchestrator, mut events) = new_orchestrator();
    orchestrator.handle_worker_msg(WorkerMsg::Command(command(json!({"cmd": 255}))));
    assert!(events.try_recv().is_err());
}

#[test]
fn malformed_frame_does_not_panic_the_worker() {
    let (mut orchestrator, mut events) = new_orchestrator();
    orchestrator.handle_worker_msg(WorkerMsg::MalformedFrame("unexpected end of input".into()));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn shutdown_command_notifies_the_shutdown_handle() {
    let (engine_tx, _rx) = tokio::sync::mpsc::unbounded_channel();
    let engine = NullEngine::new(engine_tx);
    let (event_tx, _event_rx) = tokio::sync::mpsc::unbounded_channel();
    let shutdown = Arc::new(tokio::sync::Notify::new());
    let mut orchestrator = Orchestrator::new(engine, event_tx, shutdown.clone(), config());
    orchestrator.startup();

    // SHUTDOWN arrives as a Command (not WorkerMsg::Shutdown, which is the
    // worker's own teardown signal), so the worker loop keeps running.
    assert!(orchestrator.handle_worker_msg(WorkerMsg::Command(command(json!({"cmd": 1})))));

    tokio::time::timeout(std::time::Duration::from_millis(100), shutdown.notified())
        .await
        .expect("handle_shutdown() should have called shutdown.notify_one()");
}
