//! Shared helpers that are not specific to any metadata concept.

pub(crate) mod synchronization;

pub(crate) use synchronization::{ReentrancyGuard, ReentrancyToken};
