//! The lock guarding class tables and the installed configuration.
//!
//! With the `std` feature this wraps [`std::sync::RwLock`], otherwise the
//! spinning lock of the `spin` crate.

#[cfg(feature = "std")]
use std::sync as impl_;

#[cfg(not(feature = "std"))]
use spin as impl_;

/// A reader-writer lock that ignores poisoning.
#[repr(transparent)]
pub(crate) struct RwLock<T>(impl_::RwLock<T>);

/// Shared access to the value of a [`RwLock`].
#[repr(transparent)]
pub(crate) struct RwLockReadGuard<'a, T>(impl_::RwLockReadGuard<'a, T>);

/// Exclusive access to the value of a [`RwLock`].
#[repr(transparent)]
pub(crate) struct RwLockWriteGuard<'a, T>(impl_::RwLockWriteGuard<'a, T>);

impl<T> RwLock<T> {
    /// Creates an unlocked lock holding `value`.
    #[must_use]
    pub(crate) const fn new(value: T) -> Self {
        Self(impl_::RwLock::new(value))
    }

    /// Locks for reading, blocking while a writer holds the lock.
    ///
    /// Writers never leave the value half-updated, so a poisoned lock is
    /// still usable.
    #[inline]
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, T> {
        #[cfg(not(feature = "std"))]
        let guard = self.0.read();

        #[cfg(feature = "std")]
        let guard = self
            .0
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        RwLockReadGuard(guard)
    }

    /// Locks for writing, blocking while any other guard is alive.
    #[inline]
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, T> {
        #[cfg(not(feature = "std"))]
        let guard = self.0.write();

        #[cfg(feature = "std")]
        let guard = self
            .0
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        RwLockWriteGuard(guard)
    }
}

impl<T> core::ops::Deref for RwLockReadGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> core::ops::Deref for RwLockWriteGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> core::ops::DerefMut for RwLockWriteGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}
