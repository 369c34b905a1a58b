//! Binary entry point: OS-specific startup glue (spec §1) that parses the
//! CLI, wires the channel transport, and hands everything off to the
//! orchestrator running on its own command worker thread.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use capture_core::channel::{write_framed, Channel, NamedPipeTransport, StdioTransport};
use capture_core::config::Config;
use capture_core::dispatcher::{parse_frame, CommandWorker, WorkerMsg};
use capture_core::engine::NullEngine;
use capture_core::orchestrator::Orchestrator;
use capture_core::timers::StatsTimer;

/// Bounded window given to the outbound writer to flush queued events after
/// a shutdown is requested, before the process exits anyway (spec §5).
const SHUTDOWN_DRAIN_WINDOW: Duration = Duration::from_millis(250);

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if config.debugger_attach {
        tracing::info!("--debugger-attach set; a real build blocks on a modal here for a debugger to attach");
    }

    let shutdown = Arc::new(tokio::sync::Notify::new());
    let (engine_signal_tx, mut engine_signal_rx) = tokio::sync::mpsc::unbounded_channel();
    let engine = NullEngine::new(engine_signal_tx);
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<Vec<u8>>();

    let orchestrator_shutdown = shutdown.clone();
    let orchestrator_config = config.clone();
    let worker = CommandWorker::spawn_with(move |tx| {
        let mut orchestrator = Orchestrator::new(engine, event_tx, orchestrator_shutdown, orchestrator_config);
        orchestrator.set_worker_sender(tx);
        orchestrator.startup();
        move |msg| {
            orchestrator.handle_worker_msg(msg);
        }
    });
    let worker_tx = worker.sender();

    // Re-post engine signals onto the command worker (spec §4.1, §5): the
    // engine's own threads never touch orchestrator state directly.
    let signal_worker_tx = worker_tx.clone();
    let signal_task = tokio::spawn(async move {
        while let Some(signal) = engine_signal_rx.recv().await {
            if signal_worker_tx.send(WorkerMsg::EngineSignal(signal)).is_err() {
                break;
            }
        }
    });

    let _stats_timer = StatsTimer::start(worker_tx.clone());

    // Outbound events go straight to stdout's own framed writer: stdin and
    // stdout are independent OS handles, so the write side doesn't need to
    // share a `Channel` with the read loop below.
    let writer_task = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(bytes) = event_rx.recv().await {
            if write_framed(&mut stdout, &bytes).await.is_err() {
                break;
            }
        }
    });

    let data_tx = worker_tx.clone();
    let on_data = move |frame: Vec<u8>| {
        let _ = data_tx.send(parse_frame(&frame));
    };
    let on_connected = || tracing::info!("channel connected");
    let disconnected_tx = worker_tx.clone();
    let on_disconnected = move || {
        let _ = disconnected_tx.send(WorkerMsg::Disconnected);
    };

    let shutdown_fut = shutdown.notified();
    tokio::pin!(shutdown_fut);

    if config.uses_named_pipe() {
        let channel_name = config.channel.clone().unwrap_or_default();
        let channel = Channel::new(NamedPipeTransport::new(channel_name), true);
        tokio::select! {
            _ = channel.run(on_data, on_connected, on_disconnected) => {}
            _ = &mut shutdown_fut => {
                tracing::info!("shutdown requested, closing channel");
            }
        }
    } else {
        let channel = Channel::new(StdioTransport::new(), false);
        tokio::select! {
            _ = channel.run(on_data, on_connected, on_disconnected) => {}
            _ = &mut shutdown_fut => {
                tracing::info!("shutdown requested, closing channel");
            }
        }
    }

    tokio::time::sleep(SHUTDOWN_DRAIN_WINDOW).await;
    writer_task.abort();
    signal_task.abort();
    worker.shutdown_and_join();
}
