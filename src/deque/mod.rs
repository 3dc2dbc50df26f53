//! Deque (double-ended queue) implementations
//!
//! This module provides a blocking deque coordinated by a reader/writer gate.
//!
//! ## Available Deques
//!
//! - [`BlockingDeque`]: unbounded deque with blocking pops and concurrent traversal
//!
//! ## Internals
//!
//! - `chain`: index-linked node storage
//! - `gate`: mutex, condition variables and the four admission protocols
//! - `sync`: the lock primitives, swapped for Loom's under `--cfg loom`
//! - `blocking`: the public operations built on top of both
//!
//! ## Choosing a Deque
//!
//! - Use `BlockingDeque` when consumers should sleep until work arrives and a
//!   single call must be able to release every sleeping thread
//! - Traversals see a stable snapshot because writers wait for them to finish

mod chain;
mod gate;
mod sync;

pub mod blocking;
pub mod config;

pub use self::blocking::BlockingDeque;
pub use self::config::DequeConfig;


#[cfg(all(test, not(loom)))]
mod proptests;

#[cfg(all(test, loom))]
mod loom_tests;
