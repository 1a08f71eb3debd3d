use tokio::sync::mpsc;

use super::{OutboundFrame, SocketHandle};

/// Channel-backed socket handle with no network behind it. The paired
/// receiver observes every frame the session queues, so tests can assert on
/// wire writes without a server.
pub fn socket(generation: u64) -> (SocketHandle, mpsc::UnboundedReceiver<OutboundFrame>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SocketHandle::new(generation, tx, None), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observes_queued_frames() {
        let (handle, mut wire) = socket(7);
        assert_eq!(handle.generation(), 7);
        handle.send_text("cmd1").expect("queue frame");
        assert_eq!(wire.try_recv(), Ok(OutboundFrame::Text("cmd1".to_string())));
    }

    #[test]
    fn send_fails_once_receiver_is_gone() {
        let (handle, wire) = socket(1);
        drop(wire);
        assert!(handle.send_text("cmd1").is_err());
    }
}
