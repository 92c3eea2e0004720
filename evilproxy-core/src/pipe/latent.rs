//! A pipe that takes some amount of time to transfer packets.

use super::{Pipe, PipeError};
use crate::Packet;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

/// A pipe that delays each packet's visibility by a fixed latency.
///
/// Note that this is different from low bandwidth. Packets can be sent at an
/// arbitrarily high rate, but there is a delay before they arrive. Because
/// the latency is a per-pipe constant, arrival order always equals send
/// order.
///
/// The wrapped pipe is used purely as the delivery and blocking mechanism
/// for packets whose latency has elapsed; [`recv`](Pipe::recv) delegates to
/// it directly.
pub struct LatentPipe {
    input: Mutex<Option<mpsc::UnboundedSender<InTransit>>>,
    inner: Arc<dyn Pipe>,
    latency: Duration,
}

/// A packet on its way through the pipe, stamped with the time it is
/// scheduled to arrive.
struct InTransit {
    packet: Packet,
    arrival: Instant,
}

impl LatentPipe {
    /// Creates a new pipe that holds every packet for `latency` before
    /// handing it to `inner` for delivery. Must be called from within a
    /// tokio runtime.
    ///
    /// A zero latency still routes packets through the in-transit queue, so
    /// delivery remains asynchronous relative to the send; only the dwell
    /// time shrinks to nothing.
    pub fn new(inner: Arc<dyn Pipe>, latency: Duration) -> Self {
        let (input, worker_input) = mpsc::unbounded_channel();
        tokio::spawn(worker(worker_input, inner.clone()));
        Self {
            input: Mutex::new(Some(input)),
            inner,
            latency,
        }
    }
}

#[async_trait]
impl Pipe for LatentPipe {
    fn send(&self, packet: Packet) -> Result<(), PipeError> {
        let guard = self.input.lock().unwrap();
        let input = guard.as_ref().ok_or(PipeError::Closed)?;
        let in_transit = InTransit {
            packet,
            arrival: Instant::now() + self.latency,
        };
        input.send(in_transit).map_err(|_| PipeError::Closed)
    }

    async fn recv(&self) -> Result<Packet, PipeError> {
        self.inner.recv().await
    }

    fn close(&self) -> Result<(), PipeError> {
        self.input
            .lock()
            .unwrap()
            .take()
            .map(drop)
            .ok_or(PipeError::AlreadyClosed)
    }
}

/// Owns the in-transit queue. A single timer tracks the queue head's
/// arrival time and is re-armed after each delivery rather than keeping one
/// timer per packet. Sends arrive stamped, in FIFO order, with a constant
/// latency, so the queue is always sorted by arrival time. Once the input
/// channel closes and the queue drains, the inner pipe is closed so its own
/// drain semantics finish the job.
async fn worker(mut input: mpsc::UnboundedReceiver<InTransit>, inner: Arc<dyn Pipe>) {
    let mut in_transit: VecDeque<InTransit> = VecDeque::new();
    let mut closing = false;
    loop {
        if closing && in_transit.is_empty() {
            if let Err(error) = inner.close() {
                tracing::error!(%error, "latent pipe could not close its inner pipe");
            }
            return;
        }
        let deadline = in_transit.front().map(|head| head.arrival);
        tokio::select! {
            item = input.recv(), if !closing => match item {
                Some(item) => in_transit.push_back(item),
                None => closing = true,
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if let Some(head) = in_transit.pop_front() {
                    if let Err(error) = inner.send(head.packet) {
                        tracing::error!(%error, "latent pipe could not forward an arrived packet");
                    }
                }
            }
        }
    }
}
