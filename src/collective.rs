//! Collective operations built from point-to-point transport.
//!
//! Every collective here is a fixed sequence of sends and blocking receives
//! over the runtime's mailboxes. They are not synchronized beyond that: every
//! participant must call the same collective, with the same root or group, in
//! the same order, or the call blocks forever.
//!
//! Collective traffic uses reserved negative tags, so it never matches a
//! receive with an explicit user tag. An `ANY_TAG` receive issued while a
//! collective is in flight can still steal its messages.

use bytemuck::Zeroable;
use tracing::debug;

use crate::comm::Communicator;
use crate::datatype::fold_into;
use crate::error::{Error, Result};
use crate::group::Group;
use crate::{Datatype, ReduceOp};

const REDUCE_TAG: i32 = -2;
const ALLREDUCE_TAG: i32 = -3;
const GATHER_TAG: i32 = -4;

impl Communicator {
    // ========================================================================
    // Blocking Collectives
    // ========================================================================

    /// Reduce values to the root worker.
    ///
    /// Non-roots send `send` to `root`. The root copies its own `send` into
    /// `recv`, then receives from every other rank in ascending order and
    /// folds each contribution in with `op`. A contribution shorter than the
    /// root's `send` only folds into the leading elements.
    ///
    /// If the root's `recv` is too small, the root still drains every peer's
    /// contribution before returning [`Error::InvalidBuffer`], so the next
    /// reduce at that root starts from an empty queue.
    ///
    /// # Arguments
    ///
    /// * `send` - Data to send from this worker
    /// * `recv` - Buffer for result (only significant at root, must hold
    ///   `send.len()` elements there)
    /// * `op` - Reduction operation
    /// * `root` - Rank of the root worker
    pub fn reduce<T: Datatype>(
        &self,
        send: &[T],
        recv: &mut [T],
        op: ReduceOp,
        root: i32,
    ) -> Result<()> {
        self.check_rank(root)?;
        let count = send.len();
        let size = std::mem::size_of::<T>();

        if self.rank() != root {
            return self.post(bytemuck::cast_slice(send), count, size, root, REDUCE_TAG);
        }

        if let Err(err) = check_elements(count, recv.len(), size) {
            for peer in (0..self.size()).filter(|&r| r != root) {
                self.discard(peer, REDUCE_TAG);
            }
            return Err(err);
        }
        let result = &mut recv[..count];
        result.copy_from_slice(send);

        let mut scratch = vec![T::zeroed(); count];
        for peer in (0..self.size()).filter(|&r| r != root) {
            self.fold_from(result, &mut scratch, op, peer, REDUCE_TAG)?;
        }
        debug!(rank = self.rank(), count, "reduce complete");
        Ok(())
    }

    /// Reduce a single value to the root worker.
    ///
    /// Returns `Some(result)` at the root and `None` elsewhere.
    pub fn reduce_scalar<T: Datatype>(
        &self,
        value: T,
        op: ReduceOp,
        root: i32,
    ) -> Result<Option<T>> {
        let mut recv = [T::zeroed()];
        self.reduce(&[value], &mut recv, op, root)?;
        Ok((self.rank() == root).then_some(recv[0]))
    }

    /// All-reduce among the members of `group`.
    ///
    /// Each member sends `send` to every member (itself included), zeroes
    /// `recv`, then receives one contribution from each member in ascending
    /// rank order and folds it in with `op`. This costs `P^2` messages for
    /// `P` members.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRank`] if the caller is not a member or a member is
    /// outside `0..size`; [`Error::InvalidBuffer`] if `recv` is shorter than
    /// `send`. In the latter case this member has already sent its
    /// contribution and drains every member's before returning.
    pub fn all_reduce<T: Datatype>(
        &self,
        send: &[T],
        recv: &mut [T],
        op: ReduceOp,
        group: &Group,
    ) -> Result<()> {
        let members = group.members();
        if !members.contains(&self.rank()) {
            return Err(Error::InvalidRank(self.rank()));
        }
        for &member in &members {
            self.check_rank(member)?;
        }
        let count = send.len();
        let size = std::mem::size_of::<T>();

        for &member in &members {
            self.post(bytemuck::cast_slice(send), count, size, member, ALLREDUCE_TAG)?;
        }

        if let Err(err) = check_elements(count, recv.len(), size) {
            for &member in &members {
                self.discard(member, ALLREDUCE_TAG);
            }
            return Err(err);
        }
        let result = &mut recv[..count];
        result.fill(T::zeroed());

        let mut scratch = vec![T::zeroed(); count];
        for &member in &members {
            self.fold_from(result, &mut scratch, op, member, ALLREDUCE_TAG)?;
        }
        debug!(
            rank = self.rank(),
            count,
            members = members.len(),
            "all-reduce complete"
        );
        Ok(())
    }

    /// All-reduce a single value among the members of `group`.
    pub fn allreduce_scalar<T: Datatype>(
        &self,
        value: T,
        op: ReduceOp,
        group: &Group,
    ) -> Result<T> {
        let mut recv = [T::zeroed()];
        self.all_reduce(&[value], &mut recv, op, group)?;
        Ok(recv[0])
    }

    /// Gather `count` elements of `element_size` bytes from every worker to
    /// the root.
    ///
    /// Every worker, the root included, sends to `root`. The root receives
    /// exactly one message from each rank `0..size` in ascending order and
    /// stores rank `i`'s bytes at offset `i * count * element_size` of
    /// `recv`. `recv` is untouched on non-roots.
    ///
    /// If the root's `recv` is too small, the root sends nothing and drains
    /// every peer's chunk before returning [`Error::InvalidBuffer`].
    pub fn gather_bytes(
        &self,
        send: &[u8],
        recv: &mut [u8],
        count: usize,
        element_size: usize,
        root: i32,
    ) -> Result<()> {
        self.check_rank(root)?;
        let chunk = Error::check_len(count, element_size, send.len())?;
        if self.rank() == root {
            let total = chunk.saturating_mul(self.size() as usize);
            if let Err(err) = Error::check_buffer(total, recv.len()) {
                for peer in (0..self.size()).filter(|&r| r != root) {
                    self.discard(peer, GATHER_TAG);
                }
                return Err(err);
            }
        }

        self.post(send, count, element_size, root, GATHER_TAG)?;

        if self.rank() == root {
            for peer in 0..self.size() {
                let offset = peer as usize * chunk;
                self.take(
                    &mut recv[offset..offset + chunk],
                    count,
                    element_size,
                    peer,
                    GATHER_TAG,
                )?;
            }
            debug!(rank = self.rank(), chunk, "gather complete");
        }
        Ok(())
    }

    /// Gather slices from every worker to the root.
    ///
    /// # Arguments
    ///
    /// * `send` - Data to send from this worker
    /// * `recv` - Buffer for received data (only significant at root, must be
    ///   at least `send.len() * size` elements there)
    /// * `root` - Rank of the root worker
    pub fn gather<T: Datatype>(&self, send: &[T], recv: &mut [T], root: i32) -> Result<()> {
        self.gather_bytes(
            bytemuck::cast_slice(send),
            bytemuck::cast_slice_mut(recv),
            send.len(),
            std::mem::size_of::<T>(),
            root,
        )
    }

    /// Receive one contribution into `scratch` and fold the delivered prefix
    /// into `acc`.
    fn fold_from<T: Datatype>(
        &self,
        acc: &mut [T],
        scratch: &mut [T],
        op: ReduceOp,
        source: i32,
        tag: i32,
    ) -> Result<()> {
        let count = scratch.len();
        let status = self.take(
            bytemuck::cast_slice_mut(scratch),
            count,
            std::mem::size_of::<T>(),
            source,
            tag,
        )?;
        fold_into(acc, &scratch[..status.count::<T>()], op);
        Ok(())
    }
}

/// `recv` must hold at least `count` elements.
fn check_elements(count: usize, available: usize, element_size: usize) -> Result<()> {
    Error::check_len(count, element_size, available.saturating_mul(element_size)).map(drop)
}
