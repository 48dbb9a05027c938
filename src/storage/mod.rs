//! Laziness and memoization substrate.
//!
//! Every descriptor in the graph computes its parts on first access and caches them forever.
//! This module provides the two cell kinds all of that caching goes through:
//!
//! - [`LazyValue`] - a single value computed at most once per winner
//! - [`MemoizedFn`] - a concurrent map from keys to values computed on demand
//!
//! # Contract
//!
//! Both cells share the same semantics:
//!
//! - **Result consistency**: concurrent callers may both run the computation, but the first
//!   completed result is stored and every caller (including the losing one) observes that
//!   stored value, so identity comparisons hold afterwards.
//! - **Errors are not cached**: a failing computation leaves the cell empty and the next caller
//!   retries.
//! - **Recursion tolerance**: a computation that re-enters its own cell on the same thread gets
//!   the cell's documented fallback value (e.g. an empty list) instead of recursing forever.
//!   Cells without a fallback report [`crate::Error::RecursionDetected`]. The outer computation
//!   still completes normally and its result is the one cached.
//!
//! No lock is held while a computation runs, so computations may freely query other cells.
//!
//! # Examples
//!
//! ```rust
//! use metascope::storage::LazyValue;
//!
//! let subpackages: LazyValue<Vec<String>> = LazyValue::recursion_tolerant("subpackages", Vec::new());
//! let value = subpackages.get(|| Ok(vec!["a.b".to_string()]))?;
//! assert_eq!(value.len(), 1);
//! # Ok::<(), metascope::Error>(())
//! ```

mod lazy;
mod memoized;

pub use lazy::LazyValue;
pub use memoized::MemoizedFn;
