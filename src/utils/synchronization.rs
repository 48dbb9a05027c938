//! Synchronization utilities for re-entrant lazy evaluation.
//!
//! This module provides the primitive every lazy cell of the crate is built on: a per-cell
//! record of which threads are currently evaluating it.
//!
//! # Key Components
//!
//! - [`ReentrancyGuard`] - Detects a thread entering the same cell twice
//! - [`ReentrancyToken`] - RAII proof of entry, leaves the guard on drop
//!
//! # Design Principles
//!
//! - **No blocking**: a guard never makes a thread wait for another one; two threads may
//!   evaluate the same cell concurrently and the storage layer keeps the first result
//! - **Same-thread only**: re-entry is tracked per [`std::thread::ThreadId`], so concurrent
//!   evaluation by different threads is never mistaken for recursion
//! - **Panic safety**: the token leaves the guard while unwinding as well

use std::{
    sync::Mutex,
    thread::{self, ThreadId},
};

/// Records the threads currently evaluating a lazy cell.
///
/// # Examples
///
/// ```rust,ignore
/// let guard = ReentrancyGuard::new();
///
/// let outer = guard.enter().expect("first entry");
/// assert!(guard.enter().is_none()); // same thread, same cell
/// drop(outer);
/// assert!(guard.enter().is_some());
/// ```
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    active: Mutex<Vec<ThreadId>>,
}

impl ReentrancyGuard {
    /// Creates a guard with no active evaluation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the current thread as evaluating the guarded cell.
    ///
    /// # Returns
    ///
    /// A token to hold for the duration of the evaluation, or `None` if the current thread is
    /// already inside it (a re-entrant call).
    pub fn enter(&self) -> Option<ReentrancyToken<'_>> {
        let current = thread::current().id();
        let mut active = lock!(self.active);
        if active.contains(&current) {
            return None;
        }

        active.push(current);
        Some(ReentrancyToken {
            guard: self,
            thread: current,
        })
    }

    /// Returns `true` if any thread is currently evaluating the guarded cell.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !lock!(self.active).is_empty()
    }
}

/// Proof that the current thread entered a [`ReentrancyGuard`].
#[derive(Debug)]
pub struct ReentrancyToken<'a> {
    guard: &'a ReentrancyGuard,
    thread: ThreadId,
}

impl Drop for ReentrancyToken<'_> {
    fn drop(&mut self) {
        // A poisoned lock only means another evaluation panicked; the entry must still go.
        let mut active = match self.guard.active.lock() {
            Ok(active) => active,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(pos) = active.iter().position(|id| *id == self.thread) {
            active.swap_remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};

    #[test]
    fn test_reentry_is_detected() {
        let guard = ReentrancyGuard::new();

        let token = guard.enter();
        assert!(token.is_some());
        assert!(guard.is_active());
        assert!(guard.enter().is_none());

        drop(token);
        assert!(!guard.is_active());
        assert!(guard.enter().is_some());
    }

    #[test]
    fn test_other_threads_are_not_recursion() {
        let guard = Arc::new(ReentrancyGuard::new());
        let barrier = Arc::new(Barrier::new(2));

        let _token = guard.enter().unwrap();

        let guard_clone = Arc::clone(&guard);
        let barrier_clone = Arc::clone(&barrier);
        let handle = thread::spawn(move || {
            let entered = guard_clone.enter().is_some();
            barrier_clone.wait();
            entered
        });

        barrier.wait();
        assert!(handle.join().unwrap());
    }

    #[test]
    fn test_token_released_on_panic() {
        let guard = Arc::new(ReentrancyGuard::new());
        let guard_clone = Arc::clone(&guard);

        let result = thread::spawn(move || {
            let _token = guard_clone.enter().unwrap();
            panic!("evaluation failed");
        })
        .join();

        assert!(result.is_err());
        assert!(!guard.is_active());
    }
}
