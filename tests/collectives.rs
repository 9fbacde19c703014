//! Collective operations across a live worker pool.

use std::time::Duration;

use rand::Rng;
use threadmpi::{Config, Group, ReduceOp, Runtime};

fn jitter() {
    let micros = rand::thread_rng().gen_range(0..2_000);
    std::thread::sleep(Duration::from_micros(micros));
}

#[test]
fn reduce_sum_of_four() {
    let runtime = Runtime::new(Config::new(4)).unwrap();
    let results = runtime
        .run(|world| {
            jitter();
            let mut recv = [0i32];
            world.reduce(&[world.rank() + 1], &mut recv, ReduceOp::Sum, 0)?;
            Ok(recv[0])
        })
        .unwrap();
    assert_eq!(results[0], 10);
}

#[test]
fn all_reduce_three_participants() {
    let runtime = Runtime::new(Config::new(3)).unwrap();
    let group = Group::world(3);
    let results = runtime
        .run(|world| {
            jitter();
            world.allreduce_scalar(1.0f64, ReduceOp::Sum, &group)
        })
        .unwrap();
    assert_eq!(results, vec![3.0; 3]);
}

#[test]
fn all_reduce_over_random_subgroup() {
    let runtime = Runtime::new(Config::new(8)).unwrap();
    let group = Group::new();
    let results = runtime
        .run(|world| {
            // Rank 0 always participates, the rest flip a coin
            if world.rank() == 0 || rand::thread_rng().gen_bool(0.5) {
                group.insert(world.rank());
            }
            world.barrier();
            if !group.contains(world.rank()) {
                return Ok(None);
            }
            let mut recv = [0u64; 3];
            world.all_reduce(&[1, world.rank() as u64, 2], &mut recv, ReduceOp::Sum, &group)?;
            Ok(Some(recv))
        })
        .unwrap();

    let members = group.members();
    let n = members.len() as u64;
    let rank_sum: u64 = members.iter().map(|&r| r as u64).sum();
    for (rank, result) in results.into_iter().enumerate() {
        if group.contains(rank as i32) {
            assert_eq!(result, Some([n, rank_sum, 2 * n]), "rank {rank}");
        } else {
            assert_eq!(result, None);
        }
    }
}

#[test]
fn gather_ascending_regardless_of_completion_order() {
    let runtime = Runtime::new(Config::new(4)).unwrap();
    let results = runtime
        .run(|world| {
            jitter();
            let mut recv = vec![-1i32; 4];
            world.gather(&[world.rank()], &mut recv, 0)?;
            Ok(recv)
        })
        .unwrap();
    assert_eq!(results[0], vec![0, 1, 2, 3]);
}

#[test]
fn repeated_rounds_do_not_interleave() {
    let runtime = Runtime::new(Config::new(5)).unwrap();
    let group = Group::world(5);
    let results = runtime
        .run(|world| {
            let mut totals = Vec::new();
            for round in 0..20i64 {
                if world.rank() % 2 == 0 {
                    jitter();
                }
                let reduced = world.reduce_scalar(round, ReduceOp::Sum, round as i32 % 5)?;
                let contribution = round * world.rank() as i64;
                let all = world.allreduce_scalar(contribution, ReduceOp::Sum, &group)?;
                totals.push((reduced, all));
            }
            Ok(totals)
        })
        .unwrap();

    for (rank, totals) in results.into_iter().enumerate() {
        for (round, (reduced, all)) in totals.into_iter().enumerate() {
            let round = round as i64;
            let expected_root = (round % 5) as usize;
            if rank == expected_root {
                assert_eq!(reduced, Some(5 * round));
            } else {
                assert_eq!(reduced, None);
            }
            assert_eq!(all, round * 10);
        }
    }
}

#[test]
fn gather_large_blocks() {
    const BLOCK: usize = 1024;
    let runtime = Runtime::new(Config::new(3)).unwrap();
    let results = runtime
        .run(|world| {
            let base = world.rank() as usize * BLOCK;
            let block: Vec<f32> = (0..BLOCK).map(|i| (base + i) as f32).collect();
            let mut recv = if world.rank() == 2 { vec![0.0f32; 3 * BLOCK] } else { Vec::new() };
            world.gather(&block, &mut recv, 2)?;
            Ok(recv)
        })
        .unwrap();
    let expected: Vec<f32> = (0..3 * BLOCK).map(|i| i as f32).collect();
    assert_eq!(results[2], expected);
}
