//! Participant sets for all-reduce.

use std::collections::BTreeSet;

use parking_lot::RwLock;

/// An ordered set of ranks taking part in a collective.
///
/// Workers may insert themselves concurrently through a shared reference,
/// then synchronize (for example with
/// [`Communicator::barrier`](crate::Communicator::barrier)) before any of
/// them uses the group. Every participant must see the same membership when
/// it enters the collective.
///
/// # Example
///
/// ```
/// use threadmpi::{Config, Group, ReduceOp, Runtime};
///
/// let runtime = Runtime::new(Config::new(4)).unwrap();
/// let evens = Group::new();
/// let sums = runtime.run(|world| {
///     if world.rank() % 2 == 0 {
///         evens.insert(world.rank());
///     }
///     world.barrier();
///     if evens.contains(world.rank()) {
///         world.allreduce_scalar(1i32, ReduceOp::Sum, &evens).map(Some)
///     } else {
///         Ok(None)
///     }
/// }).unwrap();
/// assert_eq!(sums, vec![Some(2), None, Some(2), None]);
/// ```
#[derive(Debug, Default)]
pub struct Group {
    members: RwLock<BTreeSet<i32>>,
}

impl Group {
    /// Create an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Group containing ranks `0..size`.
    pub fn world(size: i32) -> Self {
        (0..size).collect()
    }

    /// Add a rank. Returns `false` if it was already a member.
    pub fn insert(&self, rank: i32) -> bool {
        self.members.write().insert(rank)
    }

    /// Whether `rank` is a member.
    pub fn contains(&self, rank: i32) -> bool {
        self.members.read().contains(&rank)
    }

    /// Members in ascending rank order.
    pub fn members(&self) -> Vec<i32> {
        self.members.read().iter().copied().collect()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    /// Whether the group has no members.
    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }
}

impl FromIterator<i32> for Group {
    fn from_iter<I: IntoIterator<Item = i32>>(iter: I) -> Self {
        Group {
            members: RwLock::new(iter.into_iter().collect()),
        }
    }
}
