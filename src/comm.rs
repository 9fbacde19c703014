//! Per-worker communicator and point-to-point transport.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::mailbox::Mailbox;
use crate::status::Status;
use crate::topology::{Axis, CartGrid};
use crate::{Datatype, Shared, ANY_SOURCE, ANY_TAG};

/// A worker's handle onto the runtime.
///
/// Carries the worker's own rank, so every operation knows who the caller is.
/// Sends can target any rank; receives always read the caller's own mailbox.
///
/// # Example
///
/// ```
/// use threadmpi::{Config, Runtime};
///
/// let runtime = Runtime::new(Config::new(3)).unwrap();
/// runtime.run(|world| {
///     println!("I am rank {} of {}", world.rank(), world.size());
///     Ok(())
/// }).unwrap();
/// ```
#[derive(Clone)]
pub struct Communicator {
    shared: Arc<Shared>,
    rank: i32,
}

impl Communicator {
    pub(crate) fn new(shared: Arc<Shared>, rank: i32) -> Self {
        Communicator { shared, rank }
    }

    /// Get the rank of the calling worker.
    pub fn rank(&self) -> i32 {
        self.rank
    }

    /// Get the number of workers.
    pub fn size(&self) -> i32 {
        self.shared.size()
    }

    /// Seconds elapsed since the runtime was created.
    ///
    /// Monotonic and shared by all workers, suitable for benchmarking.
    pub fn wtime(&self) -> f64 {
        self.shared.started.elapsed().as_secs_f64()
    }

    // ========================================================================
    // Synchronization
    // ========================================================================

    /// Barrier synchronization.
    ///
    /// All workers must call this function. No worker returns until all have
    /// entered the barrier.
    pub fn barrier(&self) {
        self.shared.barrier.wait();
    }

    // ========================================================================
    // Point-to-Point Communication
    // ========================================================================

    /// Send `count` elements of `element_size` bytes from `data` to `dest`.
    ///
    /// The bytes are copied before returning. A destination outside
    /// `0..size` is dropped silently; callers must validate ranks themselves
    /// if they need delivery.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTag`] for tags below [`ANY_TAG`];
    /// [`Error::InvalidBuffer`] if `data` is shorter than
    /// `count * element_size`.
    pub fn send_bytes(
        &self,
        data: &[u8],
        count: usize,
        element_size: usize,
        dest: i32,
        tag: i32,
    ) -> Result<()> {
        check_tag(tag)?;
        self.post(data, count, element_size, dest, tag)
    }

    /// Receive up to `count` elements of `element_size` bytes into `buf`.
    ///
    /// Blocks until an envelope matching `(source, tag)` is queued. Copies
    /// the shorter of the requested and the queued length; the rest of the
    /// payload is discarded. Use [`ANY_SOURCE`] and [`ANY_TAG`] as
    /// wildcards.
    ///
    /// Returns the actual source, tag and bytes copied.
    pub fn recv_bytes(
        &self,
        buf: &mut [u8],
        count: usize,
        element_size: usize,
        source: i32,
        tag: i32,
    ) -> Result<Status> {
        self.check_source(source)?;
        check_tag(tag)?;
        self.take(buf, count, element_size, source, tag)
    }

    /// Receive without blocking.
    ///
    /// Returns `Ok(None)` if no matching envelope is queued right now.
    pub fn try_recv_bytes(
        &self,
        buf: &mut [u8],
        count: usize,
        element_size: usize,
        source: i32,
        tag: i32,
    ) -> Result<Option<Status>> {
        self.check_source(source)?;
        check_tag(tag)?;
        let needed = Error::check_len(count, element_size, buf.len())?;
        Ok(self
            .own_mailbox()
            .take_matching(source, tag)
            .map(|envelope| self.deliver(envelope, &mut buf[..needed])))
    }

    /// Send a slice of elements to another worker.
    pub fn send<T: Datatype>(&self, data: &[T], dest: i32, tag: i32) -> Result<()> {
        self.send_bytes(
            bytemuck::cast_slice(data),
            data.len(),
            std::mem::size_of::<T>(),
            dest,
            tag,
        )
    }

    /// Receive a slice of elements from another worker.
    ///
    /// Use `source = ANY_SOURCE` and `tag = ANY_TAG` as wildcards.
    pub fn recv<T: Datatype>(&self, buf: &mut [T], source: i32, tag: i32) -> Result<Status> {
        let count = buf.len();
        self.recv_bytes(
            bytemuck::cast_slice_mut(buf),
            count,
            std::mem::size_of::<T>(),
            source,
            tag,
        )
    }

    /// Receive a slice of elements without blocking.
    pub fn try_recv<T: Datatype>(
        &self,
        buf: &mut [T],
        source: i32,
        tag: i32,
    ) -> Result<Option<Status>> {
        let count = buf.len();
        self.try_recv_bytes(
            bytemuck::cast_slice_mut(buf),
            count,
            std::mem::size_of::<T>(),
            source,
            tag,
        )
    }

    /// Send to `dest` and then receive from `source`.
    ///
    /// Cannot deadlock against a matching `sendrecv` on the peer because
    /// sends never block.
    pub fn sendrecv<T: Datatype>(
        &self,
        send: &[T],
        dest: i32,
        sendtag: i32,
        recv: &mut [T],
        source: i32,
        recvtag: i32,
    ) -> Result<Status> {
        self.send(send, dest, sendtag)?;
        self.recv(recv, source, recvtag)
    }

    /// Send `buf` to `dest`, then overwrite it with a message from `source`.
    ///
    /// This is one step of a ring rotation, typically with ranks from
    /// [`cart_shift`](Self::cart_shift).
    pub fn sendrecv_replace<T: Datatype>(
        &self,
        buf: &mut [T],
        dest: i32,
        source: i32,
        tag: i32,
    ) -> Result<Status> {
        self.send(buf, dest, tag)?;
        self.recv(buf, source, tag)
    }

    /// Block until a matching message is queued and describe it without
    /// receiving it.
    pub fn probe(&self, source: i32, tag: i32) -> Result<Status> {
        self.check_source(source)?;
        check_tag(tag)?;
        Ok(self.own_mailbox().wait_peek(source, tag))
    }

    /// Describe the first matching queued message, if any, without receiving
    /// it.
    pub fn iprobe(&self, source: i32, tag: i32) -> Result<Option<Status>> {
        self.check_source(source)?;
        check_tag(tag)?;
        Ok(self.own_mailbox().peek_matching(source, tag))
    }

    // ========================================================================
    // Topology
    // ========================================================================

    /// Build a `rows x columns` grid over this runtime's workers.
    pub fn cart_grid(&self, rows: i32, columns: i32) -> Result<CartGrid> {
        CartGrid::new(rows, columns, self.size())
    }

    /// Neighbors of the calling worker for a shift of `disp` along `axis`.
    ///
    /// Returns `(source, dest)`: receive from `source`, send to `dest`.
    pub fn cart_shift(&self, grid: &CartGrid, axis: Axis, disp: i32) -> Result<(i32, i32)> {
        grid.shift(self.rank, axis, disp)
    }

    // ========================================================================
    // Internals shared with collectives
    // ========================================================================

    /// Copy and enqueue without tag validation.
    pub(crate) fn post(
        &self,
        data: &[u8],
        count: usize,
        element_size: usize,
        dest: i32,
        tag: i32,
    ) -> Result<()> {
        let len = Error::check_len(count, element_size, data.len())?;
        let Some(mailbox) = self.shared.mailbox(dest) else {
            debug!(rank = self.rank, dest, tag, "dropping send to invalid rank");
            return Ok(());
        };
        mailbox.push(Envelope::copy_from(&data[..len], self.rank, tag));
        trace!(rank = self.rank, dest, tag, bytes = len, "sent");
        Ok(())
    }

    /// Blocking receive without filter validation.
    pub(crate) fn take(
        &self,
        buf: &mut [u8],
        count: usize,
        element_size: usize,
        source: i32,
        tag: i32,
    ) -> Result<Status> {
        let needed = Error::check_len(count, element_size, buf.len())?;
        let envelope = self.own_mailbox().wait_matching(source, tag);
        Ok(self.deliver(envelope, &mut buf[..needed]))
    }

    /// Block until a matching envelope arrives and drop it unread.
    pub(crate) fn discard(&self, source: i32, tag: i32) {
        let envelope = self.own_mailbox().wait_matching(source, tag);
        trace!(rank = self.rank, source, tag, bytes = envelope.len(), "discarded");
    }

    pub(crate) fn check_rank(&self, rank: i32) -> Result<()> {
        if (0..self.size()).contains(&rank) {
            Ok(())
        } else {
            Err(Error::InvalidRank(rank))
        }
    }

    fn check_source(&self, source: i32) -> Result<()> {
        if source == ANY_SOURCE {
            Ok(())
        } else {
            self.check_rank(source)
        }
    }

    fn own_mailbox(&self) -> &Mailbox {
        &self.shared.mailboxes[self.rank as usize]
    }

    fn deliver(&self, envelope: Envelope, buf: &mut [u8]) -> Status {
        let source = envelope.source();
        let tag = envelope.tag();
        let bytes = envelope.deliver(buf);
        trace!(rank = self.rank, source, tag, bytes, "received");
        Status { source, tag, bytes }
    }
}

impl std::fmt::Debug for Communicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Communicator")
            .field("rank", &self.rank)
            .field("size", &self.size())
            .finish()
    }
}

/// User tags are non-negative or `ANY_TAG`; lower values belong to collectives.
fn check_tag(tag: i32) -> Result<()> {
    if tag >= ANY_TAG {
        Ok(())
    } else {
        Err(Error::InvalidTag(tag))
    }
}
