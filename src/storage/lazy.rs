use std::{fmt, sync::OnceLock};

use crate::{utils::ReentrancyGuard, Error, Result};

/// A thread-safe, recursion-tolerant lazily computed value.
///
/// The computation is supplied at the call site of [`LazyValue::get`] rather than stored in the
/// cell, which keeps the cell free of closures that would otherwise have to capture (and keep
/// alive) the descriptor owning it.
///
/// # Thread Safety
///
/// Concurrent first accesses may each run their computation; the first one to finish wins and
/// all callers receive a reference to the winning value.
pub struct LazyValue<T> {
    cell: OnceLock<T>,
    guard: ReentrancyGuard,
    fallback: Option<T>,
    name: &'static str,
}

impl<T> LazyValue<T> {
    /// Creates an empty cell that reports [`Error::RecursionDetected`] on re-entry.
    ///
    /// # Arguments
    ///
    /// * `name` - Label used in the recursion error
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        LazyValue {
            cell: OnceLock::new(),
            guard: ReentrancyGuard::new(),
            fallback: None,
            name,
        }
    }

    /// Creates an empty cell that yields `fallback` to a re-entrant caller.
    ///
    /// # Arguments
    ///
    /// * `name` - Label for debugging output
    /// * `fallback` - Value returned to re-entrant evaluations; never cached
    #[must_use]
    pub fn recursion_tolerant(name: &'static str, fallback: T) -> Self {
        LazyValue {
            cell: OnceLock::new(),
            guard: ReentrancyGuard::new(),
            fallback: Some(fallback),
            name,
        }
    }

    /// Creates a cell that is already computed.
    #[must_use]
    pub fn with_value(name: &'static str, value: T) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(value);
        LazyValue {
            cell,
            guard: ReentrancyGuard::new(),
            fallback: None,
            name,
        }
    }

    /// Returns the cached value, computing it with `compute` on first access.
    ///
    /// # Arguments
    ///
    /// * `compute` - Produces the value; only invoked while the cell is empty
    ///
    /// # Errors
    ///
    /// Returns whatever `compute` fails with (the cell stays empty), or
    /// [`Error::RecursionDetected`] if the current thread is already computing this cell and no
    /// fallback was configured.
    pub fn get<F>(&self, compute: F) -> Result<&T>
    where
        F: FnOnce() -> Result<T>,
    {
        if let Some(value) = self.cell.get() {
            return Ok(value);
        }

        let Some(_token) = self.guard.enter() else {
            return match &self.fallback {
                Some(fallback) => Ok(fallback),
                None => Err(Error::RecursionDetected(self.name.to_string())),
            };
        };

        let value = compute()?;
        Ok(self.cell.get_or_init(|| value))
    }

    /// Returns the value if it has been computed already, without computing it.
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        self.cell.get()
    }

    /// Returns `true` once a computation has been stored.
    #[must_use]
    pub fn is_computed(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T: fmt::Debug> fmt::Debug for LazyValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(value) => write!(f, "LazyValue({}: {:?})", self.name, value),
            None => write!(f, "LazyValue({}: <not computed>)", self.name),
        }
    }
}
