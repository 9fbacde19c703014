//! All-reduce over a randomly chosen subset of workers.
//!
//! Every worker except rank 0 flips a coin to join the group, the members
//! all-reduce the value 1.0, and the slowest member's time is reported.
//!
//! Run with: THREADMPI_WORKERS=20 cargo run --example allreduce

use parking_lot::Mutex;
use rand::Rng;
use threadmpi::{Config, Group, ReduceOp, Result, Runtime};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let runtime = Runtime::new(Config::from_env())?;
    let workers = Group::new();
    let max_time = Mutex::new(0.0f64);

    runtime.run(|world| {
        let rank = world.rank();
        let is_worker = rank == 0 || rand::thread_rng().gen_bool(0.5);
        if is_worker {
            workers.insert(rank);
        }
        world.barrier();

        if is_worker {
            let start = world.wtime();
            let sum = world.allreduce_scalar(1.0f64, ReduceOp::Sum, &workers)?;
            let elapsed = world.wtime() - start;
            assert_eq!(sum, workers.len() as f64);

            let mut max = max_time.lock();
            *max = max.max(elapsed);
        }
        Ok(())
    })?;

    println!("Participants: {:?}", workers.members());
    println!("Elapsed time: {:.7}", *max_time.lock());
    Ok(())
}
