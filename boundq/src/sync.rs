//! Synchronization primitives used by the queue backends.
//!
//! The standard library has no counting semaphore, so the semaphore backend
//! builds its three primitives from this module.

pub mod semaphore;
