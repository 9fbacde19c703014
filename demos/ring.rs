//! Ring communication example - point-to-point communication.
//!
//! Each worker sends data to the next worker in a ring pattern.
//!
//! Run with: THREADMPI_WORKERS=4 cargo run --example ring

use threadmpi::{Config, Result, Runtime};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let runtime = Runtime::new(Config::from_env())?;

    runtime.run(|world| {
        let rank = world.rank();
        let size = world.size();

        if size < 2 {
            if rank == 0 {
                eprintln!("This example requires at least 2 workers");
            }
            return Ok(());
        }

        // Calculate neighbors in the ring
        let next = (rank + 1) % size;
        let prev = (rank + size - 1) % size;

        let send_data = vec![rank as f64 * 100.0 + 1.0, rank as f64 * 100.0 + 2.0];
        let mut recv_data = vec![0.0; 2];

        println!("Rank {rank}: sending {send_data:?} to rank {next}");

        // Sends never block, so no even/odd ordering is needed
        let status = world.sendrecv(&send_data, next, 0, &mut recv_data, prev, 0)?;
        println!(
            "Rank {}: received {:?} from rank {} (tag={}, bytes={})",
            rank, recv_data, status.source, status.tag, status.bytes
        );

        let expected = vec![prev as f64 * 100.0 + 1.0, prev as f64 * 100.0 + 2.0];
        assert_eq!(recv_data, expected, "Data mismatch!");

        world.barrier();

        if rank == 0 {
            println!("\nRing communication test passed!");
        }

        Ok(())
    })?;

    Ok(())
}
