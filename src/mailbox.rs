//! Per-worker inbox of pending envelopes.
//!
//! A [`Mailbox`] is written by any worker and read only by its owner. The
//! queue is guarded by its own lock, so unrelated worker pairs never contend.
//! Receivers block on a condition variable that every push signals; nothing
//! polls.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use crate::envelope::Envelope;
use crate::status::Status;

/// Unbounded FIFO of envelopes addressed to one worker.
#[derive(Debug, Default)]
pub(crate) struct Mailbox {
    queue: Mutex<VecDeque<Envelope>>,
    arrived: Condvar,
}

impl Mailbox {
    /// Create an empty mailbox.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append an envelope and wake any waiting receiver.
    pub(crate) fn push(&self, envelope: Envelope) {
        self.queue.lock().push_back(envelope);
        self.arrived.notify_all();
    }

    /// Remove and return the first envelope matching `(source, tag)`.
    ///
    /// Scans in arrival order; ties are broken by arrival only.
    pub(crate) fn take_matching(&self, source: i32, tag: i32) -> Option<Envelope> {
        let mut queue = self.queue.lock();
        Self::remove_first(&mut queue, source, tag)
    }

    /// Block until an envelope matching `(source, tag)` is queued, then take it.
    ///
    /// There is no timeout: if no matching envelope is ever pushed this
    /// never returns.
    pub(crate) fn wait_matching(&self, source: i32, tag: i32) -> Envelope {
        let mut queue = self.queue.lock();
        loop {
            if let Some(envelope) = Self::remove_first(&mut queue, source, tag) {
                return envelope;
            }
            self.arrived.wait(&mut queue);
        }
    }

    /// Describe the first matching envelope without removing it.
    pub(crate) fn peek_matching(&self, source: i32, tag: i32) -> Option<Status> {
        let queue = self.queue.lock();
        Self::find_first(&queue, source, tag)
    }

    /// Block until a matching envelope is queued and describe it.
    pub(crate) fn wait_peek(&self, source: i32, tag: i32) -> Status {
        let mut queue = self.queue.lock();
        loop {
            if let Some(status) = Self::find_first(&queue, source, tag) {
                return status;
            }
            self.arrived.wait(&mut queue);
        }
    }

    /// Number of envelopes currently queued.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Whether no envelopes are queued.
    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    fn remove_first(queue: &mut VecDeque<Envelope>, source: i32, tag: i32) -> Option<Envelope> {
        let index = queue.iter().position(|e| e.matches(source, tag))?;
        queue.remove(index)
    }

    fn find_first(queue: &VecDeque<Envelope>, source: i32, tag: i32) -> Option<Status> {
        queue
            .iter()
            .find(|e| e.matches(source, tag))
            .map(|e| Status {
                source: e.source(),
                tag: e.tag(),
                bytes: e.len(),
            })
    }

    /// Like [`wait_matching`](Self::wait_matching) but gives up after `timeout`.
    #[cfg(test)]
    pub(crate) fn wait_matching_for(
        &self,
        source: i32,
        tag: i32,
        timeout: std::time::Duration,
    ) -> Option<Envelope> {
        let deadline = std::time::Instant::now() + timeout;
        let mut queue = self.queue.lock();
        loop {
            if let Some(envelope) = Self::remove_first(&mut queue, source, tag) {
                return Some(envelope);
            }
            if self.arrived.wait_until(&mut queue, deadline).timed_out() {
                return Self::remove_first(&mut queue, source, tag);
            }
        }
    }
}
