//! Counting semaphore and a binary-semaphore lock built on it.
//!
//! # Overview
//!
//! - [`Semaphore`] - counting primitive; [`acquire`](Semaphore::acquire)
//!   blocks while the count is zero and honours a [`Wait`].
//! - [`Permit`] - one acquired unit. Dropping it gives the unit back;
//!   [`Permit::forget`] keeps it taken.
//! - [`SemLock`] - a value guarded by a semaphore initialised to one.
//!
//! # Example
//!
//! ```
//! use boundq::Wait;
//! use boundq::sync::semaphore::Semaphore;
//!
//! let slots = Semaphore::new("slots", 1);
//! let permit = slots.acquire(&Wait::forever()).unwrap();
//! assert!(slots.try_acquire().unwrap().is_none());
//! drop(permit);
//! assert_eq!(slots.available().unwrap(), 1);
//! ```

use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, MutexGuard};

use crate::error::QueueError;
use crate::trace::{error, trace};
use crate::wait::Wait;

/// Counting semaphore.
pub struct Semaphore {
    name: &'static str,
    count: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    /// Creates a semaphore holding `initial` units. `name` shows up in
    /// traces and error messages.
    #[must_use]
    pub const fn new(name: &'static str, initial: usize) -> Self {
        Self {
            name,
            count: Mutex::new(initial),
            available: Condvar::new(),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Takes one unit, blocking while none is available.
    ///
    /// # Errors
    ///
    /// - [`QueueError::Cancelled`] / [`QueueError::TimedOut`] per `wait`.
    /// - [`QueueError::Primitive`] if the internal mutex is poisoned.
    pub fn acquire(&self, wait: &Wait) -> Result<Permit<'_>, QueueError> {
        let deadline = wait.start();
        let mut count = self.lock_count()?;
        while *count == 0 {
            trace!(semaphore = self.name, "waiting for unit");
            count = match deadline.next_slice()? {
                None => self
                    .available
                    .wait(count)
                    .map_err(|_| self.poisoned("semaphore wait"))?,
                Some(slice) => {
                    self.available
                        .wait_timeout(count, slice)
                        .map_err(|_| self.poisoned("semaphore wait"))?
                        .0
                }
            };
        }
        *count -= 1;
        Ok(Permit {
            sem: self,
            armed: true,
        })
    }

    /// Takes one unit if available, without blocking.
    ///
    /// # Errors
    ///
    /// [`QueueError::Primitive`] if the internal mutex is poisoned.
    pub fn try_acquire(&self) -> Result<Option<Permit<'_>>, QueueError> {
        let mut count = self.lock_count()?;
        if *count == 0 {
            return Ok(None);
        }
        *count -= 1;
        Ok(Some(Permit {
            sem: self,
            armed: true,
        }))
    }

    /// Adds one unit and wakes a single waiter.
    ///
    /// # Errors
    ///
    /// [`QueueError::Primitive`] if the internal mutex is poisoned.
    pub fn release(&self) -> Result<(), QueueError> {
        let mut count = self.lock_count()?;
        *count += 1;
        drop(count);
        self.available.notify_one();
        Ok(())
    }

    /// Current number of free units.
    ///
    /// # Errors
    ///
    /// [`QueueError::Primitive`] if the internal mutex is poisoned.
    pub fn available(&self) -> Result<usize, QueueError> {
        Ok(*self.lock_count()?)
    }

    fn lock_count(&self) -> Result<MutexGuard<'_, usize>, QueueError> {
        self.count
            .lock()
            .map_err(|_| self.poisoned("semaphore lock"))
    }

    fn poisoned(&self, op: &'static str) -> QueueError {
        error!(semaphore = self.name, op, "semaphore mutex poisoned");
        QueueError::Primitive(op)
    }
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Semaphore")
            .field("name", &self.name)
            .field("available", &self.available().ok())
            .finish()
    }
}

/// One unit taken from a [`Semaphore`].
///
/// Dropping the permit releases the unit, so an operation that fails after
/// acquiring it hands the slot back without extra bookkeeping.
#[must_use = "dropping a permit releases it immediately"]
pub struct Permit<'a> {
    sem: &'a Semaphore,
    armed: bool,
}

impl Permit<'_> {
    /// Consumes the permit without releasing the unit.
    pub fn forget(mut self) {
        self.armed = false;
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.armed
            && let Err(e) = self.sem.release()
        {
            error!(semaphore = self.sem.name, error = %e, "failed to return permit");
        }
    }
}

/// A value guarded by a binary semaphore.
pub struct SemLock<T> {
    sem: Semaphore,
    value: UnsafeCell<T>,
}

// SAFETY: SemLock hands out access to `value` only through a SemGuard, and
// at most one SemGuard exists at a time because the semaphore starts at 1.
unsafe impl<T: Send> Send for SemLock<T> {}

// SAFETY: see above; `&SemLock` only gives shared access to the semaphore.
unsafe impl<T: Send> Sync for SemLock<T> {}

impl<T> SemLock<T> {
    #[must_use]
    pub const fn new(name: &'static str, value: T) -> Self {
        Self {
            sem: Semaphore::new(name, 1),
            value: UnsafeCell::new(value),
        }
    }

    /// Blocks until the lock is free.
    ///
    /// # Errors
    ///
    /// [`QueueError::Primitive`] if the semaphore's mutex is poisoned.
    pub fn lock(&self) -> Result<SemGuard<'_, T>, QueueError> {
        let permit = self.sem.acquire(&Wait::forever())?;
        Ok(SemGuard {
            lock: self,
            _permit: permit,
        })
    }

    /// Takes the lock if it is free.
    ///
    /// # Errors
    ///
    /// [`QueueError::Primitive`] if the semaphore's mutex is poisoned.
    pub fn try_lock(&self) -> Result<Option<SemGuard<'_, T>>, QueueError> {
        Ok(self.sem.try_acquire()?.map(|permit| SemGuard {
            lock: self,
            _permit: permit,
        }))
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T> fmt::Debug for SemLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemLock")
            .field("sem", &self.sem)
            .finish_non_exhaustive()
    }
}

/// Exclusive access to the value of a [`SemLock`]; unlocks on drop.
pub struct SemGuard<'a, T> {
    lock: &'a SemLock<T>,
    _permit: Permit<'a>,
}

impl<T> Deref for SemGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: holding the permit means no other guard exists.
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> DerefMut for SemGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: holding the permit means no other guard exists.
        unsafe { &mut *self.lock.value.get() }
    }
}
