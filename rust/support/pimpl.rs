// Copyright (c) SandboxAQ. All rights reserved.
// SPDX-License-Identifier: AGPL-3.0-only

//! Defines [`Pimpl`] struct.
//!
//! [`Pimpl`] owns a raw pointer handed over by foreign code, together with
//! the deleter that foreign code expects to be called on it. The deleter runs
//! exactly once, when the [`Pimpl`] is dropped.

use std::ptr::NonNull;

/// A deleter.
pub(crate) type Deleter<T> = fn(*mut T);

/// Wrapper around an owned raw pointer.
pub(crate) struct Pimpl<T> {
    /// The pointer to own.
    p: NonNull<T>,

    /// The deleter to call on the pointer.
    del: Deleter<T>,
}

/// Implements [`std::fmt::Debug`] for [`Pimpl`].
impl<T> std::fmt::Debug for Pimpl<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "pimpl ptr={:?}", self.p)
    }
}

/// Implements [`Pimpl`].
impl<T> Pimpl<T> {
    /// Takes ownership of a raw pointer. Returns `None` if the pointer is null,
    /// in which case the deleter is never called.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let ptr = unsafe { libc::malloc(42usize) };
    ///
    /// // `libc::free` will be called with the pointer when `ptr` gets dropped.
    /// let ptr = Pimpl::new(ptr, |p| unsafe { libc::free(p) });
    /// ```
    pub(crate) fn new(ptr: *mut T, del: Deleter<T>) -> Option<Self> {
        let p = NonNull::new(ptr)?;
        Some(Self { p, del })
    }

    /// Returns the raw pointer. The pointer stays owned by the [`Pimpl`].
    pub(crate) fn as_ptr(&self) -> *const T {
        self.p.as_ptr()
    }
}

/// Implements the custom destructor for [`Pimpl`].
impl<T> Drop for Pimpl<T> {
    fn drop(&mut self) {
        (self.del)(self.p.as_ptr());
    }
}
