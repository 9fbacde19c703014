//! Cannon block matrix multiplication benchmark.
//!
//! A square grid of workers, one block per worker. Rank 0 generates A and B,
//! scatters the blocks, every worker skews and rotates its blocks around the
//! periodic grid, and the C blocks are gathered back to rank 0.
//!
//! Run with: cargo run --release --example cannon -- [grid] [matrix_size]

use rand::Rng;
use threadmpi::{Axis, Config, Error, Result, Runtime};
use tracing_subscriber::EnvFilter;

type Element = i32;

const TAG_SCATTER_A: i32 = 1;
const TAG_SCATTER_B: i32 = 2;
const TAG_SKEW_A: i32 = 3;
const TAG_SKEW_B: i32 = 4;
const TAG_ROTATE_A: i32 = 5;
const TAG_ROTATE_B: i32 = 6;

struct Matrix {
    size: usize,
    data: Vec<Element>,
}

impl Matrix {
    fn random(size: usize) -> Self {
        let mut rng = rand::thread_rng();
        Matrix {
            size,
            data: (0..size * size).map(|_| rng.gen_range(0..100)).collect(),
        }
    }

    fn block(&self, row: usize, col: usize, block: usize) -> Vec<Element> {
        let mut out = Vec::with_capacity(block * block);
        for r in 0..block {
            let start = (row * block + r) * self.size + col * block;
            out.extend_from_slice(&self.data[start..start + block]);
        }
        out
    }
}

fn multiply_add(a: &[Element], b: &[Element], c: &mut [Element], n: usize) {
    for i in 0..n {
        for k in 0..n {
            let aik = a[i * n + k];
            for j in 0..n {
                c[i * n + j] = c[i * n + j].wrapping_add(aik.wrapping_mul(b[k * n + j]));
            }
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let grid_dim: i32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(4);
    let matrix_size: usize = args.next().and_then(|s| s.parse().ok()).unwrap_or(512);
    if grid_dim <= 0 || matrix_size % grid_dim as usize != 0 {
        return Err(Error::Configuration(format!(
            "matrix size {matrix_size} must be a multiple of grid dimension {grid_dim}"
        )));
    }
    let block = matrix_size / grid_dim as usize;

    let workers = (grid_dim * grid_dim) as usize;
    let runtime = Runtime::new(Config::new(workers).with_thread_name("cannon"))?;

    let elapsed = runtime.run(|world| {
        let grid = world.cart_grid(grid_dim, grid_dim)?;
        let (row, col) = grid.coords_of(world.rank());
        let mut block_a = vec![0; block * block];
        let mut block_b = vec![0; block * block];

        world.barrier();
        let start = world.wtime();

        if world.rank() == 0 {
            let a = Matrix::random(matrix_size);
            let b = Matrix::random(matrix_size);
            for r in 0..grid_dim {
                for c in 0..grid_dim {
                    let dest = grid.id_at(r, c)?;
                    world.send(&a.block(r as usize, c as usize, block), dest, TAG_SCATTER_A)?;
                    world.send(&b.block(r as usize, c as usize, block), dest, TAG_SCATTER_B)?;
                }
            }
        }
        world.recv(&mut block_a, 0, TAG_SCATTER_A)?;
        world.recv(&mut block_b, 0, TAG_SCATTER_B)?;

        let (source, dest) = world.cart_shift(&grid, Axis::Column, -row)?;
        world.sendrecv_replace(&mut block_a, dest, source, TAG_SKEW_A)?;
        let (source, dest) = world.cart_shift(&grid, Axis::Row, -col)?;
        world.sendrecv_replace(&mut block_b, dest, source, TAG_SKEW_B)?;

        let mut block_c = vec![0; block * block];
        let (a_source, a_dest) = world.cart_shift(&grid, Axis::Column, -1)?;
        let (b_source, b_dest) = world.cart_shift(&grid, Axis::Row, -1)?;
        for _ in 0..grid_dim {
            multiply_add(&block_a, &block_b, &mut block_c, block);
            world.sendrecv_replace(&mut block_a, a_dest, a_source, TAG_ROTATE_A)?;
            world.sendrecv_replace(&mut block_b, b_dest, b_source, TAG_ROTATE_B)?;
        }

        let mut gathered = if world.rank() == 0 {
            vec![0; matrix_size * matrix_size]
        } else {
            Vec::new()
        };
        world.gather(&block_c, &mut gathered, 0)?;
        Ok(world.wtime() - start)
    })?;

    println!(
        "{matrix_size}x{matrix_size} on {grid_dim}x{grid_dim} workers, elapsed time: {:.4}s",
        elapsed[0]
    );
    Ok(())
}
