//! # syncdeque
//!
//! A thread-safe, blocking double-ended queue for multi-threaded programs.
//!
//! ## Features
//!
//! - **Both ends**: push and pop at the front and at the back
//! - **Concurrent traversal**: any number of readers walk the deque together
//! - **Blocking pops**: a pop on an empty deque sleeps until an element arrives
//! - **Controlled shutdown**: one call releases every blocked thread with a failure
//!
//! ## Coordination
//!
//! Every operation is admitted by a small reader/writer protocol built from one
//! mutex, two condition variables, a reader counter and a shutdown flag:
//!
//! - Readers (traversals) wait until the deque holds an element, then run concurrently
//! - Pushes wait until no reader is active
//! - Pops wait until an element exists and no reader is active
//! - Shutdown short-circuits every wait
//!
//! ## Quick Start
//!
//! ```rust
//! use syncdeque::BlockingDeque;
//!
//! let deque = BlockingDeque::new();
//! deque.push_back(1)?;
//! deque.push_front(0)?;
//!
//! let mut seen = Vec::new();
//! deque.traverse(|value| seen.push(*value))?;
//! assert_eq!(seen, vec![0, 1]);
//!
//! assert_eq!(deque.pop_back(), Some(1));
//! assert_eq!(deque.shutdown(), vec![0]);
//! assert_eq!(deque.pop_front(), None);
//! # Ok::<(), syncdeque::Error>(())
//! ```
//!
//! ## Thread Safety
//!
//! `BlockingDeque<T>` is `Send` for `T: Send` and `Sync` for `T: Send + Sync`.
//! Share it with `Arc` and call any operation from any thread.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

pub mod deque;
pub mod metrics;

pub use crate::deque::{BlockingDeque, DequeConfig};

/// Error types for syncdeque operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// An argument cannot be honoured, such as an unrepresentable capacity
    #[error("Invalid argument")]
    InvalidArgument,
    /// The deque is shut down, or was shut down while the caller waited
    #[error("Deque is shut down")]
    ShutDown,
    /// Node storage could not be allocated
    #[error("Node storage exhausted")]
    ResourceExhausted,
}

/// Result type for syncdeque operations
pub type Result<T> = core::result::Result<T, Error>;

/// A rejected push, carrying the element back to the caller
///
/// The deque never drops an element it refused to store. Take it back with
/// [`into_value`](Self::into_value) to retry or dispose of it.
///
/// ```rust
/// use syncdeque::{BlockingDeque, Error};
///
/// let deque = BlockingDeque::new();
/// deque.shutdown();
///
/// let rejected = deque.push_back(String::from("job")).unwrap_err();
/// assert_eq!(rejected.error(), Error::ShutDown);
/// assert_eq!(rejected.into_value(), "job");
/// ```
#[derive(thiserror::Error)]
#[error("{error}")]
pub struct PushError<T> {
    error: Error,
    value: T,
}

impl<T> PushError<T> {
    pub(crate) const fn new(error: Error, value: T) -> Self {
        Self { error, value }
    }

    /// Why the push was rejected
    pub fn error(&self) -> Error {
        self.error.clone()
    }

    /// Shared reference to the rejected element
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Consume the error and hand back the rejected element
    pub fn into_value(self) -> T {
        self.value
    }
}

impl<T> core::fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PushError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<T> From<PushError<T>> for Error {
    fn from(rejected: PushError<T>) -> Self {
        rejected.error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(Error::InvalidArgument.to_string(), "Invalid argument");
        assert_eq!(Error::ShutDown.to_string(), "Deque is shut down");
        assert_eq!(
            Error::ResourceExhausted.to_string(),
            "Node storage exhausted"
        );
    }

    #[test]
    fn test_error_is_std_error() {
        fn assert_error<E: std::error::Error + Send + Sync + 'static>(_: &E) {}
        assert_error(&Error::ShutDown);
        assert_error(&PushError::new(Error::ShutDown, 1u8));
    }

    #[test]
    fn test_push_error_keeps_value() {
        let rejected = PushError::new(Error::ResourceExhausted, vec![1, 2]);
        assert_eq!(rejected.to_string(), "Node storage exhausted");
        assert_eq!(rejected.error(), Error::ResourceExhausted);
        assert_eq!(rejected.value(), &vec![1, 2]);
        assert_eq!(
            format!("{rejected:?}"),
            "PushError { error: ResourceExhausted, .. }"
        );
        assert_eq!(Error::from(rejected), Error::ResourceExhausted);
    }
}
