//! The command worker: a single serial task queue that gives the
//! orchestrator its single-writer discipline (spec §4.1, §5).
//!
//! The `Channel`'s `on_data` callback parses one JSON object per frame and
//! enqueues a `WorkerMsg::Command`; `EngineSignal`s from engine threads are
//! wrapped the same way. The worker thread drains the queue in FIFO order,
//! running each handler to completion before considering the next — this
//! is the project's primary synchronization tool (spec §4.1).

use std::sync::mpsc::{Receiver, Sender};
use std::thread::JoinHandle;

use tracing::error;

use crate::engine::EngineSignal;
use crate::protocol::InboundCommand;

/// Everything that crosses onto the command worker.
pub enum WorkerMsg {
    Command(InboundCommand),
    EngineSignal(EngineSignal),
    /// A raw frame failed to parse as JSON or was missing `cmd` — still
    /// handled on the worker so it's ordered with everything else.
    MalformedFrame(String),
    /// The channel's `on_disconnected` callback fired (spec §4.1): force-stop
    /// everything and quit, re-posted here for single-writer discipline.
    Disconnected,
    Shutdown,
}

/// Parses one inbound frame into a `WorkerMsg` (spec §4.1 Dispatcher).
pub fn parse_frame(bytes: &[u8]) -> WorkerMsg {
    match serde_json::from_slice::<InboundCommand>(bytes) {
        Ok(cmd) => WorkerMsg::Command(cmd),
        Err(e) => WorkerMsg::MalformedFrame(e.to_string()),
    }
}

/// A dedicated OS thread draining a `std::sync::mpsc` queue, matching the
/// teacher's `std::thread::spawn` + channel pattern (spec SPEC_FULL
/// Concurrency). `handler` runs on the worker thread and must not block
/// for long — spec §5 requires inbound command processing to never block
/// the controller.
pub struct CommandWorker {
    tx: Sender<WorkerMsg>,
    handle: Option<JoinHandle<()>>,
}

impl CommandWorker {
    pub fn spawn<F>(mut handler: F) -> Self
    where
        F: FnMut(WorkerMsg) + Send + 'static,
    {
        let (tx, rx): (Sender<WorkerMsg>, Receiver<WorkerMsg>) = std::sync::mpsc::channel();
        let handle = std::thread::Builder::new()
            .name("command-worker".into())
            .spawn(move || {
                while let Ok(msg) = rx.recv() {
                    let is_shutdown = matches!(msg, WorkerMsg::Shutdown);
                    handler(msg);
                    if is_shutdown {
                        break;
                    }
                }
            })
            .expect("failed to spawn command worker thread");
        Self { tx, handle: Some(handle) }
    }

    /// Like `spawn`, but `handler_factory` receives a clone of the worker's
    /// own sender before the handler is built — the only way for a handler
    /// that owns orchestrator state to post back onto its own queue (spec
    /// §5: timers and re-posted engine signals go through that same sender).
    pub fn spawn_with<F, H>(handler_factory: F) -> Self
    where
        F: FnOnce(Sender<WorkerMsg>) -> H,
        H: FnMut(WorkerMsg) + Send + 'static,
    {
        let (tx, rx): (Sender<WorkerMsg>, Receiver<WorkerMsg>) = std::sync::mpsc::channel();
        let mut handler = handler_factory(tx.clone());
        let handle = std::thread::Builder::new()
            .name("command-worker".into())
            .spawn(move || {
                while let Ok(msg) = rx.recv() {
                    let is_shutdown = matches!(msg, WorkerMsg::Shutdown);
                    handler(msg);
                    if is_shutdown {
                        break;
                    }
                }
            })
            .expect("failed to spawn command worker thread");
        Self { tx, handle: Some(handle) }
    }

    pub fn sender(&self) -> Sender<WorkerMsg> {
        self.tx.clone()
    }

    pub fn post(&self, msg: WorkerMsg) {
        if self.tx.send(msg).is_err() {
            error!("command worker queue is closed, dropping message");
        }
    }

    pub fn shutdown_and_join(mut self) {
        let _ = self.tx.send(WorkerMsg::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CommandWorker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.tx.send(WorkerMsg::Shutdown);
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn handlers_run_in_fifo_order() {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let worker = CommandWorker::spawn(move |msg| {
            if let WorkerMsg::MalformedFrame(text) = msg {
                seen_clone.lock().push(text);
            }
        });
        for i in 0..5 {
            worker.post(WorkerMsg::MalformedFrame(format!("msg-{i}")));
        }
        worker.shutdown_and_join();
        let order = seen.lock();
        assert_eq!(*order, vec!["msg-0", "msg-1", "msg-2", "msg-3", "msg-4"]);
    }

    #[test]
    fn malformed_json_parses_to_malformed_frame_variant() {
        match parse_frame(b"not json") {
            WorkerMsg::MalformedFrame(_) => {}
            _ => panic!("expected MalformedFrame"),
        }
    }

    #[test]
    fn well_formed_command_parses() {
        let bytes = serde_json::to_vec(&serde_json::json!({"cmd": 1})).unwrap();
        match parse_frame(&bytes) {
            WorkerMsg::Command(cmd) => assert_eq!(cmd.cmd, 1),
            _ => panic!("expected Command"),
        }
    }
}
