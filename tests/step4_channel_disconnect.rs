//! Exercises `Channel` over the in-process `LoopbackTransport` end to end,
//! including the disconnect path that `main.rs` wires to `WorkerMsg::Disconnected`.

use std::sync::{Arc, Mutex};

use capture_core::channel::{Channel, LoopbackTransport};

#[tokio::test]
async fn data_frames_are_delivered_in_order_and_disconnect_fires_once() {
    let (controller, subprocess) = LoopbackTransport::pair();
    let mut controller = Channel::new(controller, false);
    let subprocess = Channel::new(subprocess, false);

    let received = Arc::new(Mutex::new(Vec::new()));
    let received_clone = received.clone();
    let disconnected = Arc::new(Mutex::new(0u32));
    let disconnected_clone = disconnected.clone();

    let run_handle = tokio::spawn(async move {
        subprocess
            .run(
                move |frame| received_clone.lock().unwrap().push(frame),
                || {},
                move || {
                    *disconnected_clone.lock().unwrap() += 1;
                },
            )
            .await;
    });

    controller.send(b"one").await.unwrap();
    controller.send(b"two").await.unwrap();
    drop(controller);

    run_handle.await.unwrap();

    let frames = received.lock().unwrap();
    assert_eq!(*frames, vec![b"one".to_vec(), b"two".to_vec()]);
    assert_eq!(*disconnected.lock().unwrap(), 1);
}

#[tokio::test]
async fn handshake_mismatch_disconnects_without_calling_on_data() {
    use capture_core::channel::HANDSHAKE_MAGIC;

    let (mut controller, subprocess) = LoopbackTransport::pair();
    let subprocess = Channel::new(subprocess, true);

    controller.send(&0xBADC0FFEu32.to_le_bytes()).await.unwrap();

    let data_seen = Arc::new(Mutex::new(false));
    let data_seen_clone = data_seen.clone();
    let disconnected = Arc::new(Mutex::new(false));
    let disconnected_clone = disconnected.clone();

    subprocess
        .run(
            move |_frame| *data_seen_clone.lock().unwrap() = true,
            || {},
            move || *disconnected_clone.lock().unwrap() = true,
        )
        .await;

    assert!(!*data_seen.lock().unwrap());
    assert!(*disconnected.lock().unwrap());
    let _ = HANDSHAKE_MAGIC;
}
