//! The [`Connection`] type, a bidirectional channel built from two pipes.

use crate::{Packet, Pipe, PipeError};
use std::sync::Arc;

/// One endpoint of a bidirectional packet channel.
///
/// Packets written with [`write`](Connection::write) become available to the
/// peer endpoint's [`read`](Connection::read) and vice versa. Endpoints only
/// exist in pairs; see [`pair`](Connection::pair).
///
/// Each endpoint owns exactly the pipe it writes to and closing the endpoint
/// closes that pipe. The split keeps both peers from racing to close the
/// same pipe, and it means closing one endpoint never prevents the peer from
/// draining packets already in flight toward it.
pub struct Connection {
    send: Arc<dyn Pipe>,
    recv: Arc<dyn Pipe>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

impl Connection {
    /// Constructs a pair of peer endpoints over the given pipes.
    ///
    /// The first endpoint writes using `a` and reads using `b`; the second
    /// endpoint writes using `b` and reads using `a`.
    pub fn pair(a: Arc<dyn Pipe>, b: Arc<dyn Pipe>) -> (Self, Self) {
        (
            Self {
                send: a.clone(),
                recv: b.clone(),
            },
            Self { send: b, recv: a },
        )
    }

    /// Queues the packet for delivery to the peer endpoint. Never blocks.
    ///
    /// Fails with [`PipeError::Closed`] once this endpoint has closed.
    pub fn write(&self, packet: Packet) -> Result<(), PipeError> {
        self.send.send(packet)
    }

    /// Reads the next packet from the peer, waiting until one is available.
    ///
    /// Fails with [`PipeError::EndOfStream`] once the peer has closed and
    /// every queued packet has been read.
    pub async fn read(&self) -> Result<Packet, PipeError> {
        self.recv.recv().await
    }

    /// Closes the locally owned pipe. Packets already queued are still
    /// delivered to the peer before it observes end-of-stream.
    ///
    /// Fails with [`PipeError::AlreadyClosed`] on a second close.
    pub fn close(&self) -> Result<(), PipeError> {
        self.send.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BasicPipe;

    fn basic_pair() -> (Connection, Connection) {
        Connection::pair(Arc::new(BasicPipe::new()), Arc::new(BasicPipe::new()))
    }

    #[tokio::test]
    async fn writes_are_readable_on_the_peer() {
        let (first, second) = basic_pair();
        first.write(Packet::new(b"to second".to_vec())).unwrap();
        second.write(Packet::new(b"to first".to_vec())).unwrap();
        assert_eq!(second.read().await.unwrap().payload, b"to second");
        assert_eq!(first.read().await.unwrap().payload, b"to first");
    }

    #[tokio::test]
    async fn preserves_write_order() {
        let (first, second) = basic_pair();
        for seq in 0..20 {
            first
                .write(Packet {
                    seq,
                    ..Packet::default()
                })
                .unwrap();
        }
        for seq in 0..20 {
            assert_eq!(second.read().await.unwrap().seq, seq);
        }
    }

    #[tokio::test]
    async fn peer_drains_in_flight_packets_after_close() {
        let (first, second) = basic_pair();
        first.write(Packet::new(b"parting words".to_vec())).unwrap();
        first.close().unwrap();
        assert_eq!(second.read().await.unwrap().payload, b"parting words");
        assert_eq!(second.read().await, Err(PipeError::EndOfStream));
    }

    #[tokio::test]
    async fn close_affects_only_the_local_direction() {
        let (first, second) = basic_pair();
        first.close().unwrap();
        // The closed endpoint can no longer write
        assert_eq!(first.write(Packet::default()), Err(PipeError::Closed));
        // But the reverse direction still works
        second.write(Packet::new(b"still open".to_vec())).unwrap();
        assert_eq!(first.read().await.unwrap().payload, b"still open");
    }

    #[tokio::test]
    async fn both_endpoints_may_close_their_own_pipe() {
        let (first, second) = basic_pair();
        assert_eq!(first.close(), Ok(()));
        assert_eq!(second.close(), Ok(()));
        assert_eq!(first.close(), Err(PipeError::AlreadyClosed));
        assert_eq!(second.close(), Err(PipeError::AlreadyClosed));
    }
}
