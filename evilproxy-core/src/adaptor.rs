//! Adaptors bridging packet-oriented connections to byte streams.
//!
//! Real sockets speak bytes while the simulated transport speaks packets.
//! [`ConnectionWriter`] packages outbound byte runs into packets and
//! [`ConnectionReader`] unpacks inbound packets back into bytes, preserving
//! every byte across the boundary in both directions.

use crate::{Connection, Packet, PipeError};
use std::sync::Arc;

/// Presents a [`Connection`]'s inbound packet traffic as a byte stream.
pub struct ConnectionReader {
    connection: Arc<Connection>,
    /// The packet currently being consumed, kept while its payload spans
    /// more than one read.
    current: Option<Packet>,
}

impl ConnectionReader {
    pub fn new(connection: Arc<Connection>) -> Self {
        Self {
            connection,
            current: None,
        }
    }

    /// Fills `buf` with as many bytes as the current packet can supply,
    /// reading the next packet from the connection when none is buffered.
    ///
    /// An unconsumed payload remainder is retained for the next call, so
    /// end-of-stream or any other connection error is only surfaced once
    /// every buffered byte has been handed out.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, PipeError> {
        let mut packet = match self.current.take() {
            Some(packet) => packet,
            None => self.connection.read().await?,
        };
        let count = buf.len().min(packet.payload.len());
        buf[..count].copy_from_slice(&packet.payload[..count]);
        if count < packet.payload.len() {
            packet.payload.drain(..count);
            self.current = Some(packet);
        }
        Ok(count)
    }
}

/// Presents a [`Connection`]'s outbound side as a byte sink.
pub struct ConnectionWriter {
    connection: Arc<Connection>,
}

impl ConnectionWriter {
    pub fn new(connection: Arc<Connection>) -> Self {
        Self { connection }
    }

    /// Packages `bytes` into a single data-only packet and queues it for
    /// the peer. Either every byte is accepted or the connection's error is
    /// returned; there are no partial writes.
    pub fn write(&self, bytes: &[u8]) -> Result<(), PipeError> {
        self.connection.write(Packet::new(bytes.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BasicPipe;

    fn adaptor_pair() -> (ConnectionWriter, ConnectionReader) {
        let (first, second) =
            Connection::pair(Arc::new(BasicPipe::new()), Arc::new(BasicPipe::new()));
        (
            ConnectionWriter::new(Arc::new(first)),
            ConnectionReader::new(Arc::new(second)),
        )
    }

    #[tokio::test]
    async fn round_trips_bytes() {
        let (writer, mut reader) = adaptor_pair();
        writer.write(b"hello there").unwrap();
        let mut buf = [0u8; 32];
        let count = reader.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..count], b"hello there");
    }

    #[tokio::test]
    async fn splits_a_payload_across_small_reads() {
        let (writer, mut reader) = adaptor_pair();
        let sent = b"the quick brown fox jumps over the lazy dog";
        writer.write(sent).unwrap();

        let mut received = Vec::new();
        let mut buf = [0u8; 5];
        while received.len() < sent.len() {
            let count = reader.read(&mut buf).await.unwrap();
            assert!(count > 0);
            received.extend_from_slice(&buf[..count]);
        }
        assert_eq!(received, sent);
    }

    #[tokio::test]
    async fn coalesces_multiple_writes_in_order() {
        let (writer, mut reader) = adaptor_pair();
        writer.write(b"one ").unwrap();
        writer.write(b"two ").unwrap();
        writer.write(b"three").unwrap();

        let mut received = Vec::new();
        let mut buf = [0u8; 3];
        while received.len() < 13 {
            let count = reader.read(&mut buf).await.unwrap();
            received.extend_from_slice(&buf[..count]);
        }
        assert_eq!(received, b"one two three");
    }

    #[tokio::test]
    async fn buffered_bytes_outlive_the_peer_closing() {
        let (first, second) =
            Connection::pair(Arc::new(BasicPipe::new()), Arc::new(BasicPipe::new()));
        let first = Arc::new(first);
        let mut reader = ConnectionReader::new(Arc::new(second));

        ConnectionWriter::new(first.clone()).write(b"unread").unwrap();
        first.close().unwrap();

        // Every byte must come out before end-of-stream is surfaced
        let mut received = Vec::new();
        let mut buf = [0u8; 2];
        loop {
            match reader.read(&mut buf).await {
                Ok(count) => received.extend_from_slice(&buf[..count]),
                Err(PipeError::EndOfStream) => break,
                Err(error) => panic!("unexpected error: {error}"),
            }
        }
        assert_eq!(received, b"unread");
    }

    #[tokio::test]
    async fn write_fails_once_the_connection_closes() {
        let (first, second) =
            Connection::pair(Arc::new(BasicPipe::new()), Arc::new(BasicPipe::new()));
        let first = Arc::new(first);
        let writer = ConnectionWriter::new(first.clone());
        first.close().unwrap();
        assert_eq!(writer.write(b"too late"), Err(PipeError::Closed));
        drop(second);
    }
}
