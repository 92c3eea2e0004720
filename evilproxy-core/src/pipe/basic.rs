//! The simplest pipe: faithful FIFO delivery with no simulated adversity.

use super::{Pipe, PipeError};
use crate::Packet;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// A pipe that delivers packets exactly as they were sent.
///
/// Sends enqueue onto an unbounded channel and return immediately; there is
/// no backpressure, so a fast sender grows memory without bound. Receives
/// wait on the worker task actively offering the current queue head.
pub struct BasicPipe {
    /// Present until the pipe closes. Dropping the sender is what tells the
    /// worker to begin its shutdown drain.
    input: Mutex<Option<mpsc::UnboundedSender<Packet>>>,
    output: tokio::sync::Mutex<mpsc::Receiver<Packet>>,
}

impl BasicPipe {
    /// Creates a new pipe and spawns its worker task. Must be called from
    /// within a tokio runtime.
    pub fn new() -> Self {
        let (input, worker_input) = mpsc::unbounded_channel();
        let (worker_output, output) = mpsc::channel(1);
        tokio::spawn(worker(worker_input, worker_output));
        Self {
            input: Mutex::new(Some(input)),
            output: tokio::sync::Mutex::new(output),
        }
    }
}

impl Default for BasicPipe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Pipe for BasicPipe {
    fn send(&self, packet: Packet) -> Result<(), PipeError> {
        self.input
            .lock()
            .unwrap()
            .as_ref()
            .ok_or(PipeError::Closed)?
            .send(packet)
            .map_err(|_| PipeError::Closed)
    }

    async fn recv(&self) -> Result<Packet, PipeError> {
        self.output
            .lock()
            .await
            .recv()
            .await
            .ok_or(PipeError::EndOfStream)
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

/// Owns all queue state for one pipe. Waits on two event sources at once:
/// newly sent packets and a receiver becoming ready to accept the queue
/// head. Shutdown is two-phase: once the input channel closes the worker
/// stops taking sends but keeps offering queued packets until none remain,
/// then exits. Dropping the output sender is what receivers observe as
/// end-of-stream.
async fn worker(mut input: mpsc::UnboundedReceiver<Packet>, output: mpsc::Sender<Packet>) {
    let mut queued: VecDeque<Packet> = VecDeque::new();
    let mut closing = false;
    loop {
        if closing && queued.is_empty() {
            return;
        }
        tokio::select! {
            packet = input.recv(), if !closing => match packet {
                Some(packet) => queued.push_back(packet),
                None => closing = true,
            },
            permit = output.reserve(), if !queued.is_empty() => match permit {
                Ok(permit) => {
                    if let Some(packet) = queued.pop_front() {
                        permit.send(packet);
                    }
                }
                // The pipe itself was dropped; nobody is left to receive
                Err(_) => return,
            },
        }
    }
}
