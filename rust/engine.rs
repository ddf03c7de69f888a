// Copyright (c) SandboxAQ. All rights reserved.
// SPDX-License-Identifier: AGPL-3.0-only

//! Defines [`Engine`] trait and [`GoString`] struct.
//!
//! The engine is the native tunnel implementation. It is reached through a
//! handful of C functions taking length-prefixed strings and returning
//! either scalars or heap-allocated, NUL-terminated strings that the caller
//! must release.
//!
//! [`Engine`] abstracts those functions so the marshalling layer can be driven
//! by the linked engine ([`Libwg`], behind the `libwg` feature) or by any
//! other implementation.

use std::ffi::{c_char, c_int};
use std::marker::PhantomData;

/// A borrowed, length-prefixed string, laid out as the engine expects it.
///
/// The bytes are not NUL-terminated and may contain zero bytes. A
/// [`GoString`] never outlives the call it is passed to.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct GoString<'a> {
    /// Pointer to the first byte.
    p: *const c_char,

    /// Number of bytes.
    n: isize,

    /// The bytes are borrowed for `'a`.
    phantom: PhantomData<&'a [u8]>,
}

/// Implements [`std::fmt::Debug`] for [`GoString`].
impl std::fmt::Debug for GoString<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "GoString(p={:?}, n={})", self.p, self.n)
    }
}

/// Implements [`GoString`].
impl<'a> GoString<'a> {
    /// Builds a view from a pointer and a length checked by the caller.
    ///
    /// # Safety
    ///
    /// `p` must point to `n` readable bytes, valid for `'a`.
    pub(crate) unsafe fn from_raw_parts(p: *const c_char, n: isize) -> Self {
        Self {
            p,
            n,
            phantom: PhantomData,
        }
    }

    /// Returns the number of bytes.
    pub fn len(&self) -> usize {
        debug_assert!(self.n >= 0, "negative GoString length {}", self.n);
        self.n as usize
    }

    /// Returns true if the view holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Returns the viewed bytes.
    pub fn as_bytes(&self) -> &'a [u8] {
        if self.n <= 0 || self.p.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.p.cast(), self.len()) }
    }
}

/// The native tunnel engine.
///
/// Every method is a synchronous call that blocks until the engine answers.
/// Failures are reported through sentinels only:
///
///   * [`Engine::turn_on`] returns a negative handle.
///   * [`Engine::socket_v4`] and [`Engine::socket_v6`] return `-1`.
///   * [`Engine::config`] and [`Engine::version`] return a null pointer.
///   * [`Engine::last_handshake`] returns `0` (no handshake) or a negative value.
///
/// Non-null pointers returned by [`Engine::config`] and [`Engine::version`]
/// are owned by the caller and must be given to [`Engine::release`] exactly
/// once.
///
/// Calls on one handle are only as safe, when issued concurrently, as the
/// engine makes them: implementations are expected to serialize access to a
/// session internally.
pub trait Engine {
    /// Brings a tunnel up on an already opened TUN descriptor.
    fn turn_on(
        &self,
        ifname: GoString<'_>,
        tun_fd: c_int,
        settings: GoString<'_>,
        aux: GoString<'_>,
    ) -> c_int;

    /// Replaces the configuration of a live tunnel.
    fn set_config(&self, handle: c_int, settings: GoString<'_>, aux: GoString<'_>);

    /// Tears a tunnel down. The handle value may be reused afterwards.
    fn turn_off(&self, handle: c_int);

    /// Returns the IPv4 UDP socket of a tunnel, or `-1`.
    fn socket_v4(&self, handle: c_int) -> c_int;

    /// Returns the IPv6 UDP socket of a tunnel, or `-1`.
    fn socket_v6(&self, handle: c_int) -> c_int;

    /// Returns the UAPI dump of a tunnel configuration, or null.
    fn config(&self, handle: c_int) -> *mut c_char;

    /// Returns the engine version, or null.
    fn version(&self) -> *mut c_char;

    /// Returns the most recent handshake among the tunnel peers, in
    /// nanoseconds since the Unix epoch.
    fn last_handshake(&self, handle: c_int) -> i64;

    /// Releases a string returned by [`Engine::config`] or [`Engine::version`].
    fn release(ptr: *mut c_char);
}

#[cfg(feature = "libwg")]
pub use libwg::Libwg;

/// The engine linked into the final library.
#[cfg(feature = "libwg")]
mod libwg {
    use std::ffi::{c_char, c_int, c_void};

    use super::{Engine, GoString};

    #[allow(non_snake_case)]
    extern "C" {
        fn awgTurnOn(
            ifname: GoString<'_>,
            tun_fd: c_int,
            settings: GoString<'_>,
            xray_config: GoString<'_>,
        ) -> c_int;
        fn awgSetConfig(handle: c_int, settings: GoString<'_>, xray_config: GoString<'_>);
        fn awgTurnOff(handle: c_int);
        fn awgGetSocketV4(handle: c_int) -> c_int;
        fn awgGetSocketV6(handle: c_int) -> c_int;
        fn awgGetConfig(handle: c_int) -> *mut c_char;
        fn awgGetLastHandshake(handle: c_int) -> i64;
        fn awgVersion() -> *mut c_char;
    }

    /// The linked engine. Strings it returns are allocated with `malloc`.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Libwg;

    /// Implements [`Engine`] for [`Libwg`].
    impl Engine for Libwg {
        fn turn_on(
            &self,
            ifname: GoString<'_>,
            tun_fd: c_int,
            settings: GoString<'_>,
            aux: GoString<'_>,
        ) -> c_int {
            unsafe { awgTurnOn(ifname, tun_fd, settings, aux) }
        }

        fn set_config(&self, handle: c_int, settings: GoString<'_>, aux: GoString<'_>) {
            unsafe { awgSetConfig(handle, settings, aux) }
        }

        fn turn_off(&self, handle: c_int) {
            unsafe { awgTurnOff(handle) }
        }

        fn socket_v4(&self, handle: c_int) -> c_int {
            unsafe { awgGetSocketV4(handle) }
        }

        fn socket_v6(&self, handle: c_int) -> c_int {
            unsafe { awgGetSocketV6(handle) }
        }

        fn config(&self, handle: c_int) -> *mut c_char {
            unsafe { awgGetConfig(handle) }
        }

        fn version(&self) -> *mut c_char {
            unsafe { awgVersion() }
        }

        fn last_handshake(&self, handle: c_int) -> i64 {
            unsafe { awgGetLastHandshake(handle) }
        }

        fn release(ptr: *mut c_char) {
            unsafe { libc::free(ptr.cast::<c_void>()) }
        }
    }
}
