//! Loom-based verification of the admission protocol
//!
//! Built only with `--cfg loom`, where the gate runs on Loom's mutex and
//! condition variables. Every interleaving of the real gate and deque is
//! explored, checking that no wakeup is lost, that shutdown releases waiters,
//! and that readers never overlap a writer.

use super::gate::{Gate, Occupancy};
use super::{BlockingDeque, DequeConfig};
use crate::Error;
use core::sync::atomic::Ordering;
use loom::sync::atomic::AtomicBool;
use loom::sync::Arc;
use loom::thread;

fn quiet_deque() -> BlockingDeque<u32> {
    // Metrics would only add untracked atomics to every step.
    BlockingDeque::with_config(DequeConfig::new().metrics_enabled(false)).unwrap()
}

/// Gated state that flags when a writer is inside it
struct Flagged {
    items: usize,
    writing: AtomicBool,
}

impl Occupancy for Flagged {
    fn is_vacant(&self) -> bool {
        self.items == 0
    }
}

#[test]
fn loom_pop_waits_for_push() {
    loom::model(|| {
        let deque = Arc::new(quiet_deque());

        let popper = thread::spawn({
            let deque = Arc::clone(&deque);
            move || deque.pop_front()
        });

        deque.push_back(7).unwrap();
        assert_eq!(popper.join().unwrap(), Some(7));
        assert!(deque.is_empty());
    });
}

#[test]
fn loom_shutdown_releases_pop() {
    loom::model(|| {
        let deque = Arc::new(quiet_deque());

        let popper = thread::spawn({
            let deque = Arc::clone(&deque);
            move || deque.pop_back()
        });

        assert!(deque.shutdown().is_empty());
        assert_eq!(popper.join().unwrap(), None);
        assert!(deque.is_shut_down());
    });
}

#[test]
fn loom_reader_excludes_writer() {
    loom::model(|| {
        let gate = Arc::new(Gate::new(Flagged {
            items: 1,
            writing: AtomicBool::new(false),
        }));

        let reader = thread::spawn({
            let gate = Arc::clone(&gate);
            move || {
                let state = gate.read().unwrap();
                thread::yield_now();
                assert!(
                    !state.writing.load(Ordering::SeqCst),
                    "writer overlapped a reader"
                );
            }
        });

        let mut state = gate.write().unwrap();
        state.writing.store(true, Ordering::SeqCst);
        state.items += 1;
        thread::yield_now();
        state.writing.store(false, Ordering::SeqCst);
        drop(state);

        reader.join().unwrap();
        assert_eq!(gate.readers(), 0);
        assert_eq!(gate.with_state(|state| state.items), 2);
    });
}

#[test]
fn loom_shutdown_waits_for_reader() {
    loom::model(|| {
        let deque = Arc::new(quiet_deque());
        deque.push_back(1).unwrap();

        let reader = thread::spawn({
            let deque = Arc::clone(&deque);
            move || {
                let mut seen = Vec::new();
                deque.traverse(|value| seen.push(*value)).map(|()| seen)
            }
        });

        // The reader never removes anything, so shutdown always hands it back.
        assert_eq!(deque.shutdown(), vec![1]);
        match reader.join().unwrap() {
            Ok(seen) => assert_eq!(seen, vec![1]),
            Err(err) => assert_eq!(err, Error::ShutDown),
        }
        assert_eq!(deque.active_readers(), 0);
    });
}

#[test]
fn loom_push_rejected_by_shutdown_keeps_value() {
    loom::model(|| {
        let deque = Arc::new(quiet_deque());

        let pusher = thread::spawn({
            let deque = Arc::clone(&deque);
            move || deque.push_front(5).map_err(|rejected| rejected.into_value())
        });

        let remaining = deque.shutdown();
        match pusher.join().unwrap() {
            Ok(()) => assert_eq!(remaining, vec![5]),
            Err(value) => {
                assert_eq!(value, 5);
                assert!(remaining.is_empty());
            }
        }
    });
}
