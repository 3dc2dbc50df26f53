//! Property-based tests for the blocking deque using proptest
//!
//! Single-threaded operation sequences are checked against `VecDeque`, and
//! concurrent pushes are checked for loss, duplication and per-thread order.

use super::BlockingDeque;
use crate::Error;
use proptest::prelude::*;
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone)]
enum Op {
    PushFront(i32),
    PushBack(i32),
    PopFront,
    PopBack,
    Traverse,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<i32>().prop_map(Op::PushFront),
        3 => any::<i32>().prop_map(Op::PushBack),
        2 => Just(Op::PopFront),
        2 => Just(Op::PopBack),
        1 => Just(Op::Traverse),
    ]
}

fn contents(deque: &BlockingDeque<i32>) -> Vec<i32> {
    let mut seen = Vec::new();
    if !deque.is_empty() {
        deque.traverse(|value| seen.push(*value)).unwrap();
    }
    seen
}

proptest! {
    #[test]
    fn test_matches_vecdeque_model(ops in prop::collection::vec(op_strategy(), 1..200)) {
        let deque = BlockingDeque::new();
        let mut model = VecDeque::new();

        for op in ops {
            match op {
                Op::PushFront(value) => {
                    prop_assert!(deque.push_front(value).is_ok());
                    model.push_front(value);
                }
                Op::PushBack(value) => {
                    prop_assert!(deque.push_back(value).is_ok());
                    model.push_back(value);
                }
                // The non-blocking variants keep an empty deque from parking the test.
                Op::PopFront => {
                    prop_assert_eq!(deque.try_pop_front(), Ok(model.pop_front()));
                }
                Op::PopBack => {
                    prop_assert_eq!(deque.try_pop_back(), Ok(model.pop_back()));
                }
                Op::Traverse => {
                    let expected: Vec<i32> = model.iter().copied().collect();
                    prop_assert_eq!(contents(&deque), expected);
                }
            }
            prop_assert_eq!(deque.len(), model.len());
            deque.assert_links();
        }

        let expected: Vec<i32> = model.into_iter().collect();
        prop_assert_eq!(deque.shutdown(), expected);
        let rejected = deque.push_back(7).unwrap_err();
        prop_assert_eq!(rejected.error(), Error::ShutDown);
        prop_assert_eq!(rejected.into_value(), 7);
    }

    #[test]
    fn test_blocking_pops_match_model(values in prop::collection::vec(any::<i32>(), 1..100)) {
        let deque = BlockingDeque::new();
        for &value in &values {
            prop_assert!(deque.push_back(value).is_ok());
        }

        let half = values.len() / 2;
        for &value in &values[..half] {
            prop_assert_eq!(deque.pop_front(), Some(value));
        }
        for &value in values[half..].iter().rev() {
            prop_assert_eq!(deque.pop_back(), Some(value));
        }
        prop_assert!(deque.is_empty());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_concurrent_pushes_keep_per_thread_order(
        threads in 2usize..6,
        per_thread in 1usize..200,
        front_mask in any::<u8>(),
    ) {
        let deque = Arc::new(BlockingDeque::new());

        let handles: Vec<_> = (0..threads)
            .map(|thread_id| {
                let deque = Arc::clone(&deque);
                let to_front = front_mask & (1 << thread_id) != 0;
                thread::spawn(move || {
                    for seq in 0..per_thread {
                        let item = (thread_id, seq);
                        if to_front {
                            deque.push_front(item).unwrap();
                        } else {
                            deque.push_back(item).unwrap();
                        }
                    }
                    to_front
                })
            })
            .collect();
        let fronts: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let mut drained = Vec::new();
        while let Ok(Some(item)) = deque.try_pop_front() {
            drained.push(item);
        }
        prop_assert_eq!(drained.len(), threads * per_thread);

        for (thread_id, &to_front) in fronts.iter().enumerate() {
            let seqs: Vec<usize> = drained
                .iter()
                .filter(|(owner, _)| *owner == thread_id)
                .map(|&(_, seq)| seq)
                .collect();
            let mut expected: Vec<usize> = (0..per_thread).collect();
            if to_front {
                expected.reverse();
            }
            prop_assert_eq!(seqs, expected);
        }
    }
}
