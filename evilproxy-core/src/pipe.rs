//! The [`Pipe`] trait and the pipes that implement it.

use crate::Packet;
use async_trait::async_trait;
use thiserror::Error as ThisError;

mod basic;
pub use basic::BasicPipe;

mod latent;
pub use latent::LatentPipe;

/// A thread-safe, unidirectional channel for transmitting packets.
///
/// Packets sent with [`send`](Pipe::send) become available, in send order, on
/// the pipe's own [`recv`](Pipe::recv). Every pipe owns a dedicated worker
/// task that holds all of its queue state; the public methods only exchange
/// messages with that worker, so a pipe may be shared freely across tasks.
///
/// Closing is a two-phase affair. [`close`](Pipe::close) refuses new sends
/// immediately, but packets accepted before the close are still delivered
/// before receivers observe end-of-stream. A pipe never drops an accepted
/// packet.
#[async_trait]
pub trait Pipe: Send + Sync {
    /// Queues the packet for delivery. Never blocks the caller.
    ///
    /// Returns [`PipeError::Closed`] if the pipe has already begun closing.
    fn send(&self, packet: Packet) -> Result<(), PipeError>;

    /// Receives the next packet, waiting until one is available.
    ///
    /// Returns [`PipeError::EndOfStream`] once the pipe is closed and every
    /// queued packet has been received.
    async fn recv(&self) -> Result<Packet, PipeError>;

    /// Closes the pipe for new sends. Packets already queued are still
    /// delivered.
    ///
    /// Returns [`PipeError::AlreadyClosed`] if the pipe was closed before.
    fn close(&self) -> Result<(), PipeError>;
}

/// An error produced by a [`Pipe`] operation.
#[derive(Debug, ThisError, PartialEq, Eq, Clone, Copy)]
pub enum PipeError {
    /// The pipe has begun closing and refuses new sends. Sending on a closed
    /// pipe is a lifecycle bug in the caller.
    #[error("The pipe is closed for sending")]
    Closed,
    /// The pipe was closed twice. The second close is an error rather than a
    /// no-op so lifecycle bugs surface early.
    #[error("The pipe was already closed")]
    AlreadyClosed,
    /// The pipe closed and every queued packet has been received. This is
    /// the natural end of a conversation, not a misuse.
    #[error("The pipe is closed and all queued packets have been received")]
    EndOfStream,
}
