//! In-process boundary: two byte-frame channels, one per direction.

use tokio::sync::mpsc;

/// One end of a boundary. Frames are encoded protobuf messages.
///
/// The host end and the view end look the same; what differs is which
/// message type each side writes.
#[derive(Debug)]
pub struct BoundaryLink {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl BoundaryLink {
    /// Two connected ends.
    pub fn pair() -> (BoundaryLink, BoundaryLink) {
        let (left_tx, right_rx) = mpsc::unbounded_channel();
        let (right_tx, left_rx) = mpsc::unbounded_channel();
        (
            BoundaryLink {
                tx: left_tx,
                rx: left_rx,
            },
            BoundaryLink {
                tx: right_tx,
                rx: right_rx,
            },
        )
    }

    /// Returns `false` once the other end is gone.
    pub fn send(&self, frame: Vec<u8>) -> bool {
        self.tx.send(frame).is_ok()
    }

    /// `None` once the other end is gone and every frame has been read.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.rx.recv().await
    }

    pub fn into_parts(
        self,
    ) -> (
        mpsc::UnboundedSender<Vec<u8>>,
        mpsc::UnboundedReceiver<Vec<u8>>,
    ) {
        (self.tx, self.rx)
    }
}
