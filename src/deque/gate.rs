//! Reader/writer admission gate
//!
//! The gate owns a piece of state and decides who may touch it. It is built
//! from one mutex, two condition variables, a reader counter and a shutdown
//! flag:
//!
//! | Protocol | Waits on | Waits while |
//! |----------|----------|-------------|
//! | read | `readable` | state is vacant and not shut down |
//! | write | `writable` | readers are active and not shut down |
//! | write (non-empty) | `writable` | (state is vacant or readers are active) and not shut down |
//!
//! Releasing a read guard wakes the writers once the last reader leaves.
//! Releasing a write guard wakes both readers and writers unconditionally;
//! every waiter re-checks its predicate, so the extra wakeups are harmless.
//!
//! ## Access rules
//!
//! - A [`WriteGuard`] holds the mutex for its whole lifetime and is only handed
//!   out when the gate is not shut down, which implies no reader is active.
//! - A [`ReadGuard`] does not hold the mutex. It is counted in `readers`, which
//!   keeps every writer out until it is dropped.
//! - Shutdown short-circuits every wait. A caller that observes it gets
//!   [`Error::ShutDown`] and never sees the state.

use super::sync::{AtomicBool, Condvar, Mutex, MutexGuard};
use crate::{Error, Result};
use core::cell::UnsafeCell;
use core::mem;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::Ordering;

/// State that can tell the gate whether it holds anything
pub(crate) trait Occupancy {
    /// `true` when readers and non-empty writers must keep waiting
    fn is_vacant(&self) -> bool;
}

#[derive(Debug, Default)]
struct Control {
    readers: usize,
    shut_down: bool,
}

pub(crate) struct Gate<S> {
    control: Mutex<Control>,
    readable: Condvar,
    writable: Condvar,
    // Mirror of `Control::shut_down` for lock-free early rejection. Only
    // written while the mutex is held.
    closed: AtomicBool,
    state: UnsafeCell<S>,
}

// SAFETY: the state is only reachable through the guards. Write guards move
// values in and out of it from any thread, so `S: Send` is required; read
// guards hand out `&S` to several threads at once, so sharing also needs
// `S: Sync`.
unsafe impl<S: Send> Send for Gate<S> {}
unsafe impl<S: Send + Sync> Sync for Gate<S> {}

impl<S> Gate<S> {
    pub(crate) fn new(state: S) -> Self {
        Self {
            control: Mutex::new(Control::default()),
            readable: Condvar::new(),
            writable: Condvar::new(),
            closed: AtomicBool::new(false),
            state: UnsafeCell::new(state),
        }
    }

    /// Unsynchronized shutdown check used to reject callers early
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of readers currently admitted
    pub(crate) fn readers(&self) -> usize {
        self.control.lock().readers
    }

    /// Run `f` against the state while holding the mutex
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let control = self.control.lock();
        f(self.state_under(&control))
    }

    /// Re-arm the gate and swap in fresh state, returning the old one.
    ///
    /// `&mut self` proves no guard is alive and no thread is waiting.
    pub(crate) fn reset(&mut self, state: S) -> S {
        let mut control = self.control.lock();
        control.readers = 0;
        control.shut_down = false;
        self.closed.store(false, Ordering::Release);
        drop(control);
        mem::replace(self.state.get_mut(), state)
    }

    // The guard argument is the proof that the mutex is held.
    fn state_under<'a>(&'a self, _control: &MutexGuard<'a, Control>) -> &'a S {
        // SAFETY: writers only mutate the state while holding the mutex, and
        // readers never mutate it.
        unsafe { &*self.state.get() }
    }
}

impl<S: Occupancy> Gate<S> {
    /// Read-acquire: wait for an element (or shutdown), then join the readers
    pub(crate) fn read(&self) -> Result<ReadGuard<'_, S>> {
        let mut control = self.control.lock();
        let mut waited = false;

        while self.state_under(&control).is_vacant() && !control.shut_down {
            if !waited {
                tracing::trace!(readers = control.readers, "reader waiting for an element");
                waited = true;
            }
            control = self.readable.wait(control);
        }

        control.readers += 1;
        let readers = control.readers;
        let shut_down = control.shut_down;
        drop(control);

        // Built before the check so that the shutdown path still releases.
        let guard = ReadGuard {
            gate: self,
            readers,
            waited,
        };
        if shut_down {
            return Err(Error::ShutDown);
        }
        Ok(guard)
    }

    /// Write-acquire for pushes: wait for the readers to drain
    pub(crate) fn write(&self) -> Result<WriteGuard<'_, S>> {
        self.write_when(false)
    }

    /// Write-acquire for pops: wait for an element and for the readers to drain
    pub(crate) fn write_nonempty(&self) -> Result<WriteGuard<'_, S>> {
        self.write_when(true)
    }

    fn write_when(&self, needs_element: bool) -> Result<WriteGuard<'_, S>> {
        let mut control = self.control.lock();
        let mut waited = false;

        while !control.shut_down
            && (control.readers > 0 || (needs_element && self.state_under(&control).is_vacant()))
        {
            if !waited {
                tracing::trace!(
                    readers = control.readers,
                    needs_element,
                    "writer waiting for admission"
                );
                waited = true;
            }
            control = self.writable.wait(control);
        }

        let shut_down = control.shut_down;
        let guard = WriteGuard {
            gate: self,
            control,
            waited,
        };
        if shut_down {
            return Err(Error::ShutDown);
        }
        Ok(guard)
    }
}

/// Shared access to the gated state
pub(crate) struct ReadGuard<'a, S> {
    gate: &'a Gate<S>,
    readers: usize,
    waited: bool,
}

impl<S> ReadGuard<'_, S> {
    /// Reader count right after this reader was admitted
    pub(crate) fn readers_at_admission(&self) -> usize {
        self.readers
    }

    /// Whether admission had to wait on the condition variable
    pub(crate) fn waited(&self) -> bool {
        self.waited
    }
}

impl<S> Deref for ReadGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        // SAFETY: this reader is counted in `readers`, and no write guard is
        // handed out while that count is non-zero.
        unsafe { &*self.gate.state.get() }
    }
}

impl<S> Drop for ReadGuard<'_, S> {
    fn drop(&mut self) {
        let mut control = self.gate.control.lock();
        control.readers -= 1;
        if control.readers == 0 {
            // Readers never wait on each other, so only writers need waking.
            self.gate.writable.notify_all();
        }
    }
}

/// Exclusive access to the gated state; holds the mutex until dropped
pub(crate) struct WriteGuard<'a, S> {
    gate: &'a Gate<S>,
    control: MutexGuard<'a, Control>,
    waited: bool,
}

impl<S> WriteGuard<'_, S> {
    /// Whether admission had to wait on the condition variable
    pub(crate) fn waited(&self) -> bool {
        self.waited
    }

    /// Flip the gate into its terminal state. Takes effect for waiters when
    /// this guard is dropped.
    pub(crate) fn close(&mut self) {
        self.control.shut_down = true;
        self.gate.closed.store(true, Ordering::Release);
    }
}

impl<S> Deref for WriteGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        // SAFETY: the mutex is held and no reader is admitted.
        unsafe { &*self.gate.state.get() }
    }
}

impl<S> DerefMut for WriteGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        // SAFETY: the mutex is held and no reader is admitted.
        unsafe { &mut *self.gate.state.get() }
    }
}

impl<S> Drop for WriteGuard<'_, S> {
    fn drop(&mut self) {
        // The mutex guard field is released after this body runs.
        self.gate.readable.notify_all();
        self.gate.writable.notify_all();
    }
}
