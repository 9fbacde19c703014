//! Point-to-point transport across a live worker pool.

use std::collections::HashSet;
use std::time::Duration;

use rand::Rng;
use threadmpi::{Config, Runtime, ANY_SOURCE, ANY_TAG};

const SENDERS: i32 = 8;
const PER_SENDER: u64 = 125;

#[test]
fn concurrent_sends_delivered_exactly_once() {
    let runtime = Runtime::new(Config::new(SENDERS as usize + 1)).unwrap();
    let results = runtime
        .run(|world| {
            let rank = world.rank();
            if rank == 0 {
                let total = SENDERS as u64 * PER_SENDER;
                let mut seen = HashSet::new();
                let mut checksum = 0u64;
                let mut buf = [0u64];
                for _ in 0..total {
                    let status = world.recv(&mut buf, ANY_SOURCE, ANY_TAG)?;
                    assert_eq!(status.bytes, 8);
                    assert_eq!(buf[0] / PER_SENDER + 1, status.source as u64);
                    assert!(seen.insert(buf[0]), "payload {} delivered twice", buf[0]);
                    checksum += buf[0];
                }
                assert!(world.iprobe(ANY_SOURCE, ANY_TAG)?.is_none());
                Ok(Some((seen.len() as u64, checksum)))
            } else {
                let base = (rank as u64 - 1) * PER_SENDER;
                for i in 0..PER_SENDER {
                    world.send(&[base + i], 0, (i % 3) as i32)?;
                }
                Ok(None)
            }
        })
        .unwrap();

    let total = SENDERS as u64 * PER_SENDER;
    assert_eq!(results[0], Some((total, total * (total - 1) / 2)));
}

#[test]
fn per_sender_order_is_preserved_under_any_source() {
    let runtime = Runtime::new(Config::new(4)).unwrap();
    runtime
        .run(|world| {
            if world.rank() == 0 {
                let mut last = [None::<u32>; 4];
                let mut buf = [0u32];
                for _ in 0..3 * 50 {
                    let status = world.recv(&mut buf, ANY_SOURCE, 1)?;
                    let prev = &mut last[status.source as usize];
                    let in_order = prev.map_or(true, |p| p < buf[0]);
                    assert!(in_order, "out of order from {}", status.source);
                    *prev = Some(buf[0]);
                }
            } else {
                for i in 0..50u32 {
                    world.send(&[i], 0, 1)?;
                }
            }
            Ok(())
        })
        .unwrap();
}

#[test]
fn ring_exchange_with_random_payloads() {
    let runtime = Runtime::new(Config::new(6)).unwrap();
    let results = runtime
        .run(|world| {
            let rank = world.rank();
            let size = world.size();
            let next = (rank + 1) % size;
            let prev = (rank + size - 1) % size;

            let mut rng = rand::thread_rng();
            let payload: Vec<f64> = (0..16).map(|_| rng.gen()).collect();
            let mut incoming = vec![0.0; 16];
            world.sendrecv(&payload, next, 5, &mut incoming, prev, 5)?;

            // Send back what we got so the sender can verify it
            let mut echoed = vec![0.0; 16];
            world.sendrecv(&incoming, prev, 6, &mut echoed, next, 6)?;
            Ok(payload == echoed)
        })
        .unwrap();
    assert!(results.into_iter().all(|ok| ok));
}

#[test]
fn receiver_blocks_until_late_send() {
    let runtime = Runtime::new(Config::new(2)).unwrap();
    let results = runtime
        .run(|world| {
            if world.rank() == 0 {
                std::thread::sleep(Duration::from_millis(50));
                world.send(&[42i64], 1, 3)?;
                Ok(0)
            } else {
                let mut buf = [0i64];
                world.recv(&mut buf, 0, 3)?;
                Ok(buf[0])
            }
        })
        .unwrap();
    assert_eq!(results[1], 42);
}

#[test]
fn truncation_between_workers() {
    let runtime = Runtime::new(Config::new(2)).unwrap();
    let results = runtime
        .run(|world| {
            if world.rank() == 0 {
                world.send_bytes(&[7u8; 10], 10, 1, 1, 0)?;
                Ok(Vec::new())
            } else {
                let mut buf = vec![0u8; 4];
                let status = world.recv_bytes(&mut buf, 4, 1, 0, 0)?;
                assert_eq!(status.bytes, 4);
                assert!(world.iprobe(ANY_SOURCE, ANY_TAG)?.is_none());
                Ok(buf)
            }
        })
        .unwrap();
    assert_eq!(results[1], vec![7u8; 4]);
}

#[test]
fn manual_threads_with_communicators() {
    let runtime = Runtime::new(Config::new(2)).unwrap();
    let a = runtime.communicator(0).unwrap();
    let b = runtime.communicator(1).unwrap();
    let handle = std::thread::spawn(move || {
        let mut buf = [0i32; 3];
        b.recv(&mut buf, 0, 0).unwrap();
        buf
    });
    a.send(&[1, 2, 3], 1, 0).unwrap();
    assert_eq!(handle.join().unwrap(), [1, 2, 3]);
}
