//! Property 6: SPSC queue delivery is ordered, complete and loss-free.

use std::collections::HashSet;

use proptest::prelude::*;

use tradecore_rs::sync::spsc_channel;

#[test]
fn threaded_fifo_no_loss_no_duplication() {
    const N: u64 = 200_000;
    let (mut tx, mut rx) = spsc_channel::<u64>(256);

    let producer = std::thread::spawn(move || {
        let mut next = 0u64;
        while next < N {
            match tx.push(next) {
                Ok(()) => next += 1,
                Err(_) => std::hint::spin_loop(),
            }
        }
    });

    let mut seen = HashSet::with_capacity(N as usize);
    let mut expected = 0u64;
    while expected < N {
        if let Some(v) = rx.pop() {
            assert_eq!(v, expected, "out-of-order delivery");
            assert!(seen.insert(v), "duplicated item {v}");
            expected += 1;
        } else {
            std::hint::spin_loop();
        }
    }
    producer.join().unwrap();
    assert!(rx.pop().is_none());
    assert_eq!(seen.len(), N as usize);
}

#[test]
fn full_and_empty_are_never_simultaneous() {
    let (mut tx, mut rx) = spsc_channel::<u32>(4);
    assert!(rx.is_empty() && !tx.is_full());
    for i in 0..4 {
        tx.push(i).unwrap();
        assert!(!(tx.is_full() && rx.is_empty()));
    }
    assert!(tx.is_full() && !rx.is_empty());
    while rx.pop().is_some() {}
    assert!(rx.is_empty() && !tx.is_full());
}

proptest! {
    /// Any interleaving of pushes and pops preserves FIFO order.
    #[test]
    fn interleaved_ops_preserve_fifo(ops in prop::collection::vec(any::<bool>(), 1..400)) {
        let (mut tx, mut rx) = spsc_channel::<u64>(64);
        let mut next_in = 0u64;
        let mut next_out = 0u64;
        for push in ops {
            if push {
                if tx.push(next_in).is_ok() {
                    next_in += 1;
                }
            } else if let Some(v) = rx.pop() {
                prop_assert_eq!(v, next_out);
                next_out += 1;
            }
        }
        while let Some(v) = rx.pop() {
            prop_assert_eq!(v, next_out);
            next_out += 1;
        }
        prop_assert_eq!(next_in, next_out);
    }
}
