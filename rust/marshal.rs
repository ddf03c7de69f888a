// Copyright (c) SandboxAQ. All rights reserved.
// SPDX-License-Identifier: AGPL-3.0-only

//! String marshalling between the caller and the engine.
//!
//! Two directions are covered:
//!
//!   * caller to engine: a [`StringSource`] lends its bytes, a [`Borrowed`]
//!     guard turns them into a [`GoString`] for the duration of one call and
//!     gives them back when dropped, on every exit path.
//!   * engine to caller: [`NativeString::adopt`] takes ownership of a
//!     NUL-terminated engine allocation; [`NativeString::into_string`] copies
//!     it out and releases the allocation exactly once.

use std::ffi::{c_char, CStr};

use crate::engine::GoString;
use crate::error::MarshalError;
use crate::support::Pimpl;
use crate::Result;

/// Bytes lent by a [`StringSource`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lent {
    /// Pointer to the first byte.
    ptr: *const c_char,

    /// Number of bytes, terminator excluded.
    len: usize,
}

/// Implements [`Lent`].
impl Lent {
    /// Describes bytes lent from a Rust slice.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            ptr: bytes.as_ptr().cast(),
            len: bytes.len(),
        }
    }

    /// Describes bytes lent from foreign memory.
    ///
    /// # Safety
    ///
    /// `ptr` must point to `len` readable bytes that stay valid until the
    /// matching [`StringSource::give_back`].
    pub unsafe fn from_raw_parts(ptr: *const c_char, len: usize) -> Self {
        Self { ptr, len }
    }

    /// Returns the pointer.
    pub fn ptr(&self) -> *const c_char {
        self.ptr
    }

    /// Returns the number of bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no byte was lent.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Caller memory able to lend its UTF-8 bytes for the duration of one call.
///
/// Every successful [`StringSource::lend`] is followed by exactly one
/// [`StringSource::give_back`] of the same [`Lent`]. Use [`Borrowed`] rather
/// than calling these methods directly.
pub trait StringSource {
    /// Lends the bytes, with an explicit length.
    fn lend(&self) -> Result<Lent>;

    /// Gives back bytes obtained from [`StringSource::lend`].
    fn give_back(&self, lent: Lent);
}

/// Implements [`StringSource`] for [`str`]. Nothing to release.
impl StringSource for str {
    fn lend(&self) -> Result<Lent> {
        Ok(Lent::from_bytes(self.as_bytes()))
    }

    fn give_back(&self, _lent: Lent) {}
}

/// Implements [`StringSource`] for a slice of bytes. Nothing to release.
impl StringSource for [u8] {
    fn lend(&self) -> Result<Lent> {
        Ok(Lent::from_bytes(self))
    }

    fn give_back(&self, _lent: Lent) {}
}

/// A string argument received from the host, possibly unavailable.
///
/// The host may pass no string at all (a `null` reference), or one it could
/// not pin. Lending an [`HostString::Unavailable`] fails with
/// `MARSHALERROR_LEND_FAILED`, which abandons the call before the engine is
/// reached.
#[derive(Debug)]
pub enum HostString<S> {
    /// The string, pinned for the duration of the call.
    Available(S),

    /// Why the string could not be obtained.
    Unavailable(String),
}

/// Implements [`StringSource`] for [`HostString`].
impl<S: StringSource> StringSource for HostString<S> {
    fn lend(&self) -> Result<Lent> {
        match self {
            Self::Available(s) => s.lend(),
            Self::Unavailable(why) => {
                Err((MarshalError::MARSHALERROR_LEND_FAILED, why.clone()).into())
            }
        }
    }

    fn give_back(&self, lent: Lent) {
        if let Self::Available(s) = self {
            s.give_back(lent);
        }
    }
}

/// A string borrowed from a [`StringSource`] for one call.
///
/// The bytes are given back to the source when the guard is dropped.
pub struct Borrowed<'s, S: StringSource + ?Sized> {
    /// The source to give the bytes back to.
    source: &'s S,

    /// The lent bytes.
    lent: Lent,

    /// The length, as the engine ABI expects it.
    n: isize,
}

/// Implements [`std::fmt::Debug`] for [`Borrowed`].
impl<S: StringSource + ?Sized> std::fmt::Debug for Borrowed<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Borrowed(ptr={:?}, len={})", self.lent.ptr, self.lent.len)
    }
}

/// Implements [`Borrowed`].
impl<'s, S: StringSource + ?Sized> Borrowed<'s, S> {
    /// Borrows the bytes of a source.
    ///
    /// # Errors
    ///
    /// The source could not lend its bytes, or their length does not fit the
    /// engine ABI. In the latter case the bytes are given back before
    /// returning.
    pub fn borrow(source: &'s S) -> Result<Self> {
        let lent = source.lend()?;
        let Ok(n) = isize::try_from(lent.len) else {
            source.give_back(lent);
            return Err((
                MarshalError::MARSHALERROR_TOO_LONG,
                format!("{} bytes", lent.len),
            )
                .into());
        };
        Ok(Self { source, lent, n })
    }

    /// Returns the engine view of the borrowed bytes.
    pub fn view(&self) -> GoString<'_> {
        unsafe { GoString::from_raw_parts(self.lent.ptr, self.n) }
    }

    /// Returns the number of borrowed bytes.
    pub fn len(&self) -> usize {
        self.lent.len
    }

    /// Returns true if no byte was borrowed.
    pub fn is_empty(&self) -> bool {
        self.lent.len == 0
    }
}

/// Gives the bytes back to their source.
impl<S: StringSource + ?Sized> Drop for Borrowed<'_, S> {
    fn drop(&mut self) {
        self.source.give_back(self.lent);
    }
}

/// A NUL-terminated string allocated by the engine.
///
/// The allocation is released exactly once: when the value is consumed by
/// [`NativeString::into_string`] or [`NativeString::into_bytes`], or when it
/// is dropped.
#[derive(Debug)]
pub struct NativeString(Pimpl<c_char>);

/// Implements [`NativeString`].
impl NativeString {
    /// Takes ownership of an engine allocation.
    ///
    /// Returns `None` for a null pointer, which the engine uses to signal
    /// that it has no data. `release` is never called in that case.
    pub fn adopt(ptr: *mut c_char, release: fn(*mut c_char)) -> Option<Self> {
        Pimpl::new(ptr, release).map(Self)
    }

    /// Copies the bytes up to the terminator, then releases the allocation.
    pub fn into_bytes(self) -> Vec<u8> {
        unsafe { CStr::from_ptr(self.0.as_ptr()) }.to_bytes().to_vec()
    }

    /// Copies the text up to the terminator, then releases the allocation.
    ///
    /// Invalid UTF-8 sequences are replaced with `U+FFFD`.
    pub fn into_string(self) -> String {
        unsafe { CStr::from_ptr(self.0.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }
}

/// Hands engine text to the host through `make`.
///
/// Returns a null pointer if there is no text, or if `make` fails, in which
/// case the failure is logged.
pub fn text_or_null<P, E: std::fmt::Display>(
    text: Option<String>,
    make: impl FnOnce(String) -> std::result::Result<*mut P, E>,
) -> *mut P {
    let Some(text) = text else {
        return std::ptr::null_mut();
    };
    make(text).unwrap_or_else(|e| {
        log::error!("cannot hand text over to the host: {e}");
        std::ptr::null_mut()
    })
}
