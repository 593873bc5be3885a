//! Unit tests for per-frame handling in the connection reader.

use tokio::sync::mpsc;

use remote_console::protocol::codec::PONG_FRAME;
use remote_console::transport::reader::{handle_text, Flow};
use remote_console::transport::OutboundTx;

/// Every inbound ping produces exactly one pong and no event.
#[tokio::test]
async fn ping_replies_with_single_pong() {
    let (outbound, mut frames) = OutboundTx::channel();
    let (event_tx, mut events) = mpsc::channel(4);

    for _ in 0..3 {
        let flow = handle_text("2", &outbound, &event_tx)
            .await
            .expect("pong queued");
        assert_eq!(flow, Flow::Continue);
        assert_eq!(frames.try_recv().expect("pong"), PONG_FRAME);
        assert!(frames.try_recv().is_err(), "exactly one frame per ping");
    }
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn event_frame_is_forwarded() {
    let (outbound, mut frames) = OutboundTx::channel();
    let (event_tx, mut events) = mpsc::channel(4);

    handle_text(
        r#"42["execute_command",{"command":"uname"}]"#,
        &outbound,
        &event_tx,
    )
    .await
    .expect("handled");

    let event = events.try_recv().expect("event forwarded");
    assert_eq!(event.execute_command().as_deref(), Some("uname"));
    assert!(frames.try_recv().is_err(), "events are not answered by the reader");
}

#[tokio::test]
async fn malformed_and_control_frames_are_dropped() {
    let (outbound, mut frames) = OutboundTx::channel();
    let (event_tx, mut events) = mpsc::channel(4);

    for raw in ["", "42[\"execute_command\",", "40", "0{\"sid\":\"s\"}", "3", "6"] {
        let flow = handle_text(raw, &outbound, &event_tx)
            .await
            .expect("never fatal");
        assert_eq!(flow, Flow::Continue, "frame {raw:?}");
    }

    assert!(frames.try_recv().is_err());
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn close_frame_stops_reader() {
    let (outbound, _frames) = OutboundTx::channel();
    let (event_tx, _events) = mpsc::channel(4);

    assert_eq!(
        handle_text("1", &outbound, &event_tx).await.expect("handled"),
        Flow::Stop
    );
    assert_eq!(
        handle_text("41", &outbound, &event_tx).await.expect("handled"),
        Flow::Stop
    );
}

#[tokio::test]
async fn ping_after_writer_stopped_is_an_error() {
    let (outbound, frames) = OutboundTx::channel();
    let (event_tx, _events) = mpsc::channel(4);
    drop(frames);

    assert!(handle_text("2", &outbound, &event_tx).await.is_err());
}
