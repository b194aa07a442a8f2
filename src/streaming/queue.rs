//! Completion queues handing worker results back to the consumer thread.
//!
//! Workers push a [`CompletionEnvelope`] (the result plus the callback that
//! consumes it) through a [`CompletionSender`]. The consumer thread drains the
//! queue and runs each callback there, so callbacks never run on a worker.

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::core::Result;
use crate::generation::chunk::ChunkId;

/// Consumer-side continuation. Receives the drain context and the worker result.
pub type Completion<T, C> = Box<dyn FnOnce(&C, T) -> Result<()> + Send>;

/// How many envelopes one drain call may invoke
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrainMode {
    /// At most one envelope
    One,
    /// Every envelope queued when the drain started
    All,
}

/// A finished piece of work waiting for the consumer thread
pub struct CompletionEnvelope<T, C> {
    pub chunk: ChunkId,
    value: T,
    callback: Completion<T, C>,
}

impl<T, C> CompletionEnvelope<T, C> {
    pub fn new(chunk: ChunkId, value: T, callback: Completion<T, C>) -> Self {
        Self { chunk, value, callback }
    }

    /// Hand the value to its callback.
    pub fn invoke(self, context: &C) -> Result<()> {
        (self.callback)(context, self.value)
    }
}

/// Producer handle given to workers
pub struct CompletionSender<T, C> {
    tx: Sender<CompletionEnvelope<T, C>>,
}

impl<T, C> Clone for CompletionSender<T, C> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<T, C> CompletionSender<T, C> {
    /// Enqueue an envelope. Returns false if the queue has been dropped.
    pub fn send(&self, envelope: CompletionEnvelope<T, C>) -> bool {
        self.tx.send(envelope).is_ok()
    }
}

/// Unbounded multi-producer queue drained by a single consumer.
pub struct CompletionQueue<T, C> {
    tx: Sender<CompletionEnvelope<T, C>>,
    rx: Receiver<CompletionEnvelope<T, C>>,
}

impl<T, C> Default for CompletionQueue<T, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C> CompletionQueue<T, C> {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> CompletionSender<T, C> {
        CompletionSender { tx: self.tx.clone() }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Invoke queued callbacks in FIFO order.
    ///
    /// The queue length is read once on entry; envelopes pushed while draining
    /// (including by the callbacks themselves) wait for the next drain. If a
    /// callback fails, the error is returned and the envelopes behind it stay
    /// queued.
    pub fn drain(&self, context: &C, mode: DrainMode) -> Result<usize> {
        let budget = match mode {
            DrainMode::One => self.rx.len().min(1),
            DrainMode::All => self.rx.len(),
        };

        let mut invoked = 0;
        for _ in 0..budget {
            let Ok(envelope) = self.rx.try_recv() else {
                break;
            };
            invoked += 1;
            envelope.invoke(context)?;
        }
        Ok(invoked)
    }

    /// Drop every queued envelope without invoking it. Returns the chunks they belonged to.
    pub fn clear(&self) -> Vec<ChunkId> {
        self.rx.try_iter().map(|envelope| envelope.chunk).collect()
    }
}
