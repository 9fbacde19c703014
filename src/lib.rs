//! # threadmpi
//!
//! MPI-style message passing between the threads of one process.
//!
//! A fixed pool of workers, each identified by a rank in `0..N`, exchanges
//! copied byte buffers through per-worker mailboxes. On top of that the crate
//! provides:
//! - Blocking point-to-point `send`/`recv` with source and tag filters
//! - Collectives built purely from point-to-point calls: reduce, all-reduce
//!   over a participant [`Group`], gather
//! - A Cartesian [`CartGrid`] topology with wrap-around neighbor shifts
//!
//! ## Quick Start
//!
//! ```
//! use threadmpi::{Config, Group, ReduceOp, Runtime};
//!
//! fn main() -> Result<(), threadmpi::Error> {
//!     let runtime = Runtime::new(Config::new(4))?;
//!     let sums = runtime.run(|world| {
//!         let everyone = Group::world(world.size());
//!         world.allreduce_scalar(world.rank() as f64, ReduceOp::Sum, &everyone)
//!     })?;
//!     assert_eq!(sums, vec![6.0; 4]);
//!     Ok(())
//! }
//! ```
//!
//! ## Matching rules
//!
//! Receives select the first queued envelope, in arrival order, whose sender
//! matches the source filter and whose tag matches the tag filter.
//! [`ANY_SOURCE`] and [`ANY_TAG`] are wildcards. A message sent with
//! `ANY_TAG` is only matched by an `ANY_TAG` receive.
//!
//! ## Blocking
//!
//! `send` never blocks beyond copying the payload. `recv` and every collective
//! block until a matching envelope exists, with no timeout. Collectives must
//! be entered by every participant, in the same order on every worker.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

mod collective;
mod comm;
mod config;
mod datatype;
mod envelope;
mod error;
mod group;
mod mailbox;
mod status;
mod topology;

pub use comm::Communicator;
pub use config::{Config, STACK_SIZE_ENV, WORKERS_ENV};
pub use datatype::Datatype;
pub use error::{Error, Result};
pub use group::Group;
pub use status::Status;
pub use topology::{Axis, CartGrid, NO_COORDS};

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Instant;

use crossbeam_utils::CachePadded;
use tracing::{debug, info};

use crate::mailbox::Mailbox;

/// Wildcard source filter for receives.
pub const ANY_SOURCE: i32 = -1;

/// Wildcard tag: on a send, marks the message untagged; on a receive,
/// matches any tag.
pub const ANY_TAG: i32 = -1;

/// Reduction operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
#[non_exhaustive]
pub enum ReduceOp {
    /// Sum of values
    Sum = 0,
}

/// State shared by every worker of one runtime.
pub(crate) struct Shared {
    pub(crate) mailboxes: Box<[CachePadded<Mailbox>]>,
    pub(crate) barrier: Barrier,
    pub(crate) started: Instant,
}

impl Shared {
    pub(crate) fn size(&self) -> i32 {
        self.mailboxes.len() as i32
    }

    pub(crate) fn mailbox(&self, rank: i32) -> Option<&Mailbox> {
        usize::try_from(rank)
            .ok()
            .and_then(|r| self.mailboxes.get(r))
            .map(|m| &**m)
    }
}

/// The message-passing runtime.
///
/// Owns one mailbox per rank for its whole lifetime. Workers talk to it
/// through [`Communicator`] handles, either handed out by [`run`](Self::run)
/// or created with [`communicator`](Self::communicator) for threads the
/// caller manages.
///
/// # Example
///
/// ```
/// use threadmpi::{Config, Runtime, ANY_TAG};
///
/// let runtime = Runtime::new(Config::new(2)).unwrap();
/// let received = runtime
///     .run(|world| {
///         let peer = 1 - world.rank();
///         let mut buf = [0i32];
///         world.sendrecv(&[world.rank()], peer, 0, &mut buf, peer, ANY_TAG)?;
///         Ok(buf[0])
///     })
///     .unwrap();
/// assert_eq!(received, vec![1, 0]);
/// ```
pub struct Runtime {
    shared: Arc<Shared>,
    config: Config,
}

impl Runtime {
    /// Create a runtime with `config.workers` mailboxes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the worker count is zero or does
    /// not fit a rank.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let mailboxes = (0..config.workers)
            .map(|_| CachePadded::new(Mailbox::new()))
            .collect();
        let shared = Arc::new(Shared {
            mailboxes,
            barrier: Barrier::new(config.workers),
            started: Instant::now(),
        });
        debug!(workers = config.workers, "runtime created");
        Ok(Runtime { shared, config })
    }

    /// Number of workers.
    pub fn size(&self) -> i32 {
        self.shared.size()
    }

    /// The configuration this runtime was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the handle for worker `rank`.
    ///
    /// Each rank's handle should be used by one thread at a time; two threads
    /// receiving as the same rank race for the same mailbox.
    pub fn communicator(&self, rank: i32) -> Result<Communicator> {
        if self.shared.mailbox(rank).is_none() {
            return Err(Error::InvalidRank(rank));
        }
        Ok(Communicator::new(Arc::clone(&self.shared), rank))
    }

    /// Run `f` on every worker of a freshly spawned pool and collect the
    /// results in rank order.
    ///
    /// The first error in rank order is returned. A worker that panics is
    /// reported as [`Error::WorkerPanicked`]; if its peers are blocked waiting
    /// for it they stay blocked, so a panic inside a collective hangs the pool.
    pub fn run<F, R>(&self, f: F) -> Result<Vec<R>>
    where
        F: Fn(Communicator) -> Result<R> + Sync,
        R: Send,
    {
        let size = self.size();
        info!(workers = size, "starting worker pool");

        let outcomes: Vec<Result<R>> = thread::scope(|scope| {
            let f = &f;
            let mut handles = Vec::with_capacity(size as usize);
            for rank in 0..size {
                let comm = Communicator::new(Arc::clone(&self.shared), rank);
                let mut builder =
                    thread::Builder::new().name(format!("{}-{rank}", self.config.thread_name));
                if let Some(bytes) = self.config.stack_size {
                    builder = builder.stack_size(bytes);
                }
                match builder.spawn_scoped(scope, move || f(comm)) {
                    Ok(handle) => handles.push((rank, Some(handle))),
                    Err(e) => {
                        tracing::error!(rank, error = %e, "failed to spawn worker");
                        handles.push((rank, None));
                    }
                }
            }

            handles
                .into_iter()
                .map(|(rank, handle)| match handle {
                    Some(handle) => handle.join().unwrap_or(Err(Error::WorkerPanicked(rank))),
                    None => Err(Error::Configuration(format!(
                        "failed to spawn worker {rank}"
                    ))),
                })
                .collect()
        });

        info!(workers = size, "worker pool finished");
        outcomes.into_iter().collect()
    }
}
