//! Blocking Double-Ended Queue
//!
//! An unbounded deque whose operations block until they can run instead of
//! failing. Pushes and pops are writers and run one at a time; traversals are
//! readers and run concurrently with each other but never alongside a writer.
//!
//! ## Blocking behaviour
//!
//! - `push_front`/`push_back` wait while a traversal is in progress
//! - `pop_front`/`pop_back` wait until the deque holds an element and no
//!   traversal is in progress
//! - `traverse` waits until the deque holds an element
//! - `shutdown` waits for running traversals to finish, then releases every
//!   waiting thread with a failure
//!
//! There are no timeouts; a blocked call returns only once its condition holds
//! or the deque is shut down.
//!
//! ## Example
//!
//! ```rust
//! use syncdeque::BlockingDeque;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let deque = Arc::new(BlockingDeque::new());
//!
//! let consumer = thread::spawn({
//!     let deque = Arc::clone(&deque);
//!     move || {
//!         let mut taken = Vec::new();
//!         // Blocks until a value arrives, returns None after shutdown
//!         while let Some(value) = deque.pop_front() {
//!             taken.push(value);
//!             if taken.len() == 3 {
//!                 break;
//!             }
//!         }
//!         taken
//!     }
//! });
//!
//! for i in 0..3 {
//!     deque.push_back(i).unwrap();
//! }
//!
//! assert_eq!(consumer.join().unwrap(), vec![0, 1, 2]);
//! deque.shutdown();
//! ```

use super::chain::Chain;
use super::config::DequeConfig;
use super::gate::{Gate, Occupancy};
use crate::metrics::{AtomicMetrics, MetricsCollector, PerformanceMetrics};
use crate::{Error, PushError, Result};
use core::fmt;
use core::mem;
use core::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

impl<T> Occupancy for Chain<T> {
    fn is_vacant(&self) -> bool {
        self.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
enum End {
    Front,
    Back,
}

/// A thread-safe, unbounded, blocking double-ended queue
///
/// # Type Parameters
///
/// * `T` - The type of elements stored in the deque
///
/// # Lifecycle
///
/// A new deque is armed and empty. [`shutdown`](Self::shutdown) moves it into a
/// terminal state in which every operation fails without blocking.
/// [`initialize`](Self::initialize) re-arms it; the locks and condition
/// variables are kept across re-initialization and released when the deque is
/// dropped.
///
/// # Examples
///
/// ```rust
/// use syncdeque::BlockingDeque;
///
/// let deque: BlockingDeque<&str> = BlockingDeque::new();
/// deque.push_back("b")?;
/// deque.push_front("a")?;
///
/// assert_eq!(deque.len(), 2);
/// assert_eq!(deque.pop_front(), Some("a"));
/// assert_eq!(deque.pop_back(), Some("b"));
/// # Ok::<(), syncdeque::Error>(())
/// ```
pub struct BlockingDeque<T> {
    gate: Gate<Chain<T>>,
    config: DequeConfig,
    metrics: AtomicMetrics,
    metrics_enabled: AtomicBool,
}

impl<T> BlockingDeque<T> {
    /// Create an empty deque with default settings
    pub fn new() -> Self {
        Self::assemble(Chain::new(), DequeConfig::new())
    }

    /// Create an empty deque with room for `capacity` elements
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidArgument`] if `capacity` cannot be addressed
    /// * [`Error::ResourceExhausted`] if the storage cannot be reserved
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_config(DequeConfig::new().initial_capacity(capacity))
    }

    /// Create an empty deque from explicit settings
    ///
    /// # Errors
    ///
    /// Same as [`with_capacity`](Self::with_capacity).
    pub fn with_config(config: DequeConfig) -> Result<Self> {
        let chain = Chain::with_capacity(config.initial_capacity)?;
        tracing::debug!(
            initial_capacity = config.initial_capacity,
            metrics_enabled = config.metrics_enabled,
            "deque created"
        );
        Ok(Self::assemble(chain, config))
    }

    fn assemble(chain: Chain<T>, config: DequeConfig) -> Self {
        let metrics = AtomicMetrics::default();
        metrics.update_memory_usage(chain.storage_bytes());

        Self {
            gate: Gate::new(chain),
            config,
            metrics,
            metrics_enabled: AtomicBool::new(config.metrics_enabled),
        }
    }

    /// Re-arm the deque, typically after [`shutdown`](Self::shutdown)
    ///
    /// Clears the shutdown flag and the reader count, releases any node
    /// storage and reserves the configured initial capacity again. Elements
    /// still stored are handed back front-to-back, as `shutdown` does.
    ///
    /// The exclusive borrow guarantees that no other thread is using or
    /// waiting on the deque.
    ///
    /// # Errors
    ///
    /// [`Error::ResourceExhausted`] if the initial capacity cannot be
    /// reserved. The deque is then left exactly as it was, elements included.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use syncdeque::{BlockingDeque, Error};
    ///
    /// let mut deque = BlockingDeque::new();
    /// deque.shutdown();
    /// assert_eq!(deque.push_back(1).unwrap_err().error(), Error::ShutDown);
    ///
    /// assert!(deque.initialize()?.is_empty());
    /// deque.push_back(1)?;
    /// assert_eq!(deque.pop_front(), Some(1));
    /// # Ok::<(), syncdeque::Error>(())
    /// ```
    pub fn initialize(&mut self) -> Result<Vec<T>> {
        let chain = Chain::with_capacity(self.config.initial_capacity).map_err(|err| {
            tracing::warn!(
                %err,
                initial_capacity = self.config.initial_capacity,
                "could not reserve initial capacity"
            );
            err
        })?;
        self.metrics.update_memory_usage(chain.storage_bytes());
        let stale = self.gate.reset(chain).into_values();

        tracing::debug!(handed_back = stale.len(), "deque initialized");
        Ok(stale)
    }

    /// Add an element at the front
    ///
    /// Waits while a traversal is in progress.
    ///
    /// # Errors
    ///
    /// A [`PushError`] carrying the element back, with its reason:
    ///
    /// * [`Error::ShutDown`] if the deque is, or becomes, shut down
    /// * [`Error::ResourceExhausted`] if no node could be allocated; the deque
    ///   is left unchanged and the push may be retried
    pub fn push_front(&self, value: T) -> core::result::Result<(), PushError<T>> {
        self.push(End::Front, value)
    }

    /// Add an element at the back
    ///
    /// Waits while a traversal is in progress. Errors as for
    /// [`push_front`](Self::push_front).
    pub fn push_back(&self, value: T) -> core::result::Result<(), PushError<T>> {
        self.push(End::Back, value)
    }

    /// Remove the front element, waiting for one if the deque is empty
    ///
    /// Returns `None` only when the deque is, or becomes, shut down.
    pub fn pop_front(&self) -> Option<T> {
        self.pop(End::Front, true).ok().flatten()
    }

    /// Remove the back element, waiting for one if the deque is empty
    ///
    /// Returns `None` only when the deque is, or becomes, shut down.
    pub fn pop_back(&self) -> Option<T> {
        self.pop(End::Back, true).ok().flatten()
    }

    /// Remove the front element without waiting for one to arrive
    ///
    /// Still waits for running traversals to finish. Returns `Ok(None)` when
    /// the deque is empty.
    ///
    /// # Errors
    ///
    /// [`Error::ShutDown`] if the deque is, or becomes, shut down.
    pub fn try_pop_front(&self) -> Result<Option<T>> {
        self.pop(End::Front, false)
    }

    /// Remove the back element without waiting for one to arrive
    ///
    /// Errors as for [`try_pop_front`](Self::try_pop_front).
    pub fn try_pop_back(&self) -> Result<Option<T>> {
        self.pop(End::Back, false)
    }

    /// Visit every element front-to-back
    ///
    /// Waits until the deque holds at least one element. Any number of
    /// traversals may run at the same time; writers wait until all of them
    /// have finished.
    ///
    /// `visit` must not push to or pop from this deque: the writer would wait
    /// for this traversal to end, which never happens.
    ///
    /// # Errors
    ///
    /// [`Error::ShutDown`] if the deque is, or becomes, shut down.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use syncdeque::BlockingDeque;
    ///
    /// let deque = BlockingDeque::new();
    /// for i in 1..=3 {
    ///     deque.push_back(i)?;
    /// }
    ///
    /// let mut sum = 0;
    /// deque.traverse(|value| sum += value)?;
    /// assert_eq!(sum, 6);
    /// # Ok::<(), syncdeque::Error>(())
    /// ```
    pub fn traverse<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(&T),
    {
        let start = self.started();
        if self.gate.is_closed() {
            return self.rejected(start, Error::ShutDown);
        }

        let guard = match self.gate.read() {
            Ok(guard) => guard,
            Err(err) => return self.rejected(start, err),
        };
        if start.is_some() {
            self.metrics.record_readers(guard.readers_at_admission());
        }
        let waited = guard.waited();

        for value in guard.iter() {
            visit(value);
        }
        drop(guard);

        self.record(start, waited, true);
        Ok(())
    }

    /// Shut the deque down and hand back the elements it still holds
    ///
    /// Waits for running traversals to finish, detaches every element, marks
    /// the deque as shut down and wakes every blocked thread so that its call
    /// fails. Later calls fail immediately. Calling `shutdown` again returns
    /// an empty `Vec`.
    ///
    /// Nothing is allocated while the lock is held. The returned `Vec` is
    /// built after every waiter has been released, so an allocation failure
    /// there cannot leave threads blocked.
    ///
    /// The elements are returned front-to-back.
    pub fn shutdown(&self) -> Vec<T> {
        if self.gate.is_closed() {
            return Vec::new();
        }

        let mut guard = match self.gate.write() {
            Ok(guard) => guard,
            // Another thread completed the shutdown while this one waited.
            Err(_) => return Vec::new(),
        };
        let detached = mem::take(&mut *guard);
        guard.close();
        drop(guard);

        let remaining = detached.into_values();
        self.metrics.update_memory_usage(0);
        tracing::debug!(remaining = remaining.len(), "deque shut down");
        remaining
    }

    /// Number of stored elements
    pub fn len(&self) -> usize {
        self.gate.with_state(Chain::len)
    }

    /// Whether the deque holds no elements
    pub fn is_empty(&self) -> bool {
        self.gate.with_state(Chain::is_empty)
    }

    /// Whether [`shutdown`](Self::shutdown) has completed
    pub fn is_shut_down(&self) -> bool {
        self.gate.is_closed()
    }

    /// Number of traversals currently in progress
    pub fn active_readers(&self) -> usize {
        self.gate.readers()
    }

    /// Settings the deque was built with
    pub fn config(&self) -> DequeConfig {
        self.config
    }

    fn push(&self, end: End, value: T) -> core::result::Result<(), PushError<T>> {
        let start = self.started();
        if self.gate.is_closed() {
            return self
                .rejected(start, Error::ShutDown)
                .map_err(|err| PushError::new(err, value));
        }

        let mut guard = match self.gate.write() {
            Ok(guard) => guard,
            Err(err) => {
                return self
                    .rejected(start, err)
                    .map_err(|err| PushError::new(err, value));
            }
        };
        let result = match end {
            End::Front => guard.push_front(value),
            End::Back => guard.push_back(value),
        };
        let storage = guard.storage_bytes();
        let waited = guard.waited();
        drop(guard);

        if let Err(rejected) = &result {
            tracing::warn!(err = %rejected, ?end, "push failed");
        }
        self.track_storage(start, storage);
        self.record(start, waited, result.is_ok());
        result
    }

    fn pop(&self, end: End, wait_for_element: bool) -> Result<Option<T>> {
        let start = self.started();
        if self.gate.is_closed() {
            return self.rejected(start, Error::ShutDown);
        }

        let admitted = if wait_for_element {
            self.gate.write_nonempty()
        } else {
            self.gate.write()
        };
        let mut guard = match admitted {
            Ok(guard) => guard,
            Err(err) => return self.rejected(start, err),
        };
        let value = match end {
            End::Front => guard.pop_front(),
            End::Back => guard.pop_back(),
        };
        let storage = guard.storage_bytes();
        let waited = guard.waited();
        drop(guard);

        self.track_storage(start, storage);
        self.record(start, waited, true);
        Ok(value)
    }

    fn started(&self) -> Option<Instant> {
        self.is_metrics_enabled().then(Instant::now)
    }

    fn rejected<R>(&self, start: Option<Instant>, err: Error) -> Result<R> {
        tracing::debug!(%err, "operation rejected");
        self.record(start, false, false);
        Err(err)
    }

    fn record(&self, start: Option<Instant>, waited: bool, succeeded: bool) {
        let Some(start) = start else {
            return;
        };
        if waited {
            self.metrics.record_contention();
        }
        if succeeded {
            self.metrics.record_success(start.elapsed());
        } else {
            self.metrics.record_failure();
        }
    }

    fn track_storage(&self, start: Option<Instant>, bytes: usize) {
        if start.is_some() {
            self.metrics.update_memory_usage(bytes);
        }
    }

    #[cfg(test)]
    pub(crate) fn assert_links(&self) {
        self.gate.with_state(Chain::assert_links);
    }

    #[cfg(test)]
    pub(crate) fn limit_slots(&self, limit: usize) {
        if let Ok(mut chain) = self.gate.write() {
            chain.limit_slots(limit);
        }
    }
}

impl<T> Default for BlockingDeque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BlockingDeque<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingDeque")
            .field("len", &self.len())
            .field("active_readers", &self.active_readers())
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

impl<T> MetricsCollector for BlockingDeque<T> {
    fn metrics(&self) -> PerformanceMetrics {
        self.metrics.snapshot()
    }

    fn reset_metrics(&self) {
        self.metrics.reset();
    }

    fn set_metrics_enabled(&self, enabled: bool) {
        self.metrics_enabled.store(enabled, Ordering::Relaxed);
    }

    fn is_metrics_enabled(&self) -> bool {
        self.metrics_enabled.load(Ordering::Relaxed)
    }
}
