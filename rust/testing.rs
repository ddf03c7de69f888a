// Copyright (c) SandboxAQ. All rights reserved.
// SPDX-License-Identifier: AGPL-3.0-only

//! Test doubles for the marshalling layer.
//!
//! [`MockEngine`] is an in-memory [`Engine`] that records what crossed the
//! boundary, and [`CountingSource`] is a [`StringSource`] counting its lends
//! and give-backs. Allocations handed out by the mock engine are counted per
//! thread, so tests can check that every one of them is released once.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::ffi::{c_char, c_int, CString};

use crate::engine::{Engine, GoString};
use crate::error::MarshalError;
use crate::marshal::{Lent, StringSource};
use crate::Result;

thread_local! {
    static ALLOCATED: Cell<usize> = Cell::new(0);
    static RELEASED: Cell<usize> = Cell::new(0);
}

/// Resets the allocation counters of the current thread.
pub fn reset_counters() {
    ALLOCATED.with(|c| c.set(0));
    RELEASED.with(|c| c.set(0));
}

/// Returns the number of strings allocated on the current thread.
pub fn allocated() -> usize {
    ALLOCATED.with(Cell::get)
}

/// Returns the number of strings released on the current thread.
pub fn released() -> usize {
    RELEASED.with(Cell::get)
}

/// Allocates a NUL-terminated copy of `bytes`, or returns null if `bytes`
/// holds a zero byte.
pub fn alloc_cstring(bytes: &[u8]) -> *mut c_char {
    match CString::new(bytes) {
        Ok(s) => {
            ALLOCATED.with(|c| c.set(c.get() + 1));
            s.into_raw()
        }
        Err(_) => std::ptr::null_mut(),
    }
}

/// Releases a string allocated by [`alloc_cstring`].
pub fn release_cstring(ptr: *mut c_char) {
    let _ = unsafe { CString::from_raw(ptr) };
    RELEASED.with(|c| c.set(c.get() + 1));
}

/// A call received by [`MockEngine`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    TurnOn {
        ifname: Vec<u8>,
        tun_fd: c_int,
        settings: Vec<u8>,
        aux: Vec<u8>,
    },
    SetConfig {
        handle: c_int,
        settings: Vec<u8>,
        aux: Vec<u8>,
    },
    TurnOff(c_int),
    SocketV4(c_int),
    SocketV6(c_int),
    Config(c_int),
    Version,
    LastHandshake(c_int),
}

/// A session held by [`MockEngine`].
#[derive(Clone, Debug, Default)]
struct Session {
    settings: Vec<u8>,
    last_handshake: i64,
}

/// State of [`MockEngine`].
#[derive(Debug, Default)]
struct State {
    sessions: BTreeMap<c_int, Session>,
    calls: Vec<Call>,
}

/// An in-memory engine.
///
/// Handles are the lowest free non-negative integers, so a value is reused
/// once its session is turned off. A negative TUN descriptor makes
/// [`Engine::turn_on`] fail with `-1`. The configuration dump of a session is
/// its latest settings blob.
#[derive(Debug, Default)]
pub struct MockEngine {
    /// Sessions and recorded calls.
    state: RefCell<State>,

    /// Version string, if any.
    version: Option<String>,
}

/// Base value of the fake IPv4 socket descriptors.
pub const SOCKET_V4_BASE: c_int = 100;

/// Base value of the fake IPv6 socket descriptors.
pub const SOCKET_V6_BASE: c_int = 200;

/// Implements [`MockEngine`].
impl MockEngine {
    /// Instantiates an engine reporting the given version.
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            state: RefCell::default(),
            version: Some(version.into()),
        }
    }

    /// Returns the calls received so far.
    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    /// Returns the number of live sessions.
    pub fn live_sessions(&self) -> usize {
        self.state.borrow().sessions.len()
    }

    /// Records a handshake on a session.
    pub fn set_last_handshake(&self, handle: c_int, nanos: i64) {
        if let Some(session) = self.state.borrow_mut().sessions.get_mut(&handle) {
            session.last_handshake = nanos;
        }
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }
}

/// Implements [`Engine`] for [`MockEngine`].
impl Engine for MockEngine {
    fn turn_on(
        &self,
        ifname: GoString<'_>,
        tun_fd: c_int,
        settings: GoString<'_>,
        aux: GoString<'_>,
    ) -> c_int {
        self.record(Call::TurnOn {
            ifname: ifname.as_bytes().to_vec(),
            tun_fd,
            settings: settings.as_bytes().to_vec(),
            aux: aux.as_bytes().to_vec(),
        });
        if tun_fd < 0 {
            return -1;
        }
        let mut state = self.state.borrow_mut();
        let handle = (0..)
            .find(|h| !state.sessions.contains_key(h))
            .unwrap_or(-1);
        state.sessions.insert(
            handle,
            Session {
                settings: settings.as_bytes().to_vec(),
                last_handshake: 0,
            },
        );
        handle
    }

    fn set_config(&self, handle: c_int, settings: GoString<'_>, aux: GoString<'_>) {
        self.record(Call::SetConfig {
            handle,
            settings: settings.as_bytes().to_vec(),
            aux: aux.as_bytes().to_vec(),
        });
        if let Some(session) = self.state.borrow_mut().sessions.get_mut(&handle) {
            session.settings = settings.as_bytes().to_vec();
        }
    }

    fn turn_off(&self, handle: c_int) {
        self.record(Call::TurnOff(handle));
        self.state.borrow_mut().sessions.remove(&handle);
    }

    fn socket_v4(&self, handle: c_int) -> c_int {
        self.record(Call::SocketV4(handle));
        if self.state.borrow().sessions.contains_key(&handle) {
            SOCKET_V4_BASE + handle
        } else {
            -1
        }
    }

    fn socket_v6(&self, handle: c_int) -> c_int {
        self.record(Call::SocketV6(handle));
        if self.state.borrow().sessions.contains_key(&handle) {
            SOCKET_V6_BASE + handle
        } else {
            -1
        }
    }

    fn config(&self, handle: c_int) -> *mut c_char {
        self.record(Call::Config(handle));
        match self.state.borrow().sessions.get(&handle) {
            Some(session) => alloc_cstring(&session.settings),
            None => std::ptr::null_mut(),
        }
    }

    fn version(&self) -> *mut c_char {
        self.record(Call::Version);
        match &self.version {
            Some(v) => alloc_cstring(v.as_bytes()),
            None => std::ptr::null_mut(),
        }
    }

    fn last_handshake(&self, handle: c_int) -> i64 {
        self.record(Call::LastHandshake(handle));
        self.state
            .borrow()
            .sessions
            .get(&handle)
            .map_or(-1, |s| s.last_handshake)
    }

    fn release(ptr: *mut c_char) {
        release_cstring(ptr)
    }
}

/// A [`StringSource`] counting its lends and give-backs.
#[derive(Debug)]
pub struct CountingSource {
    /// The text to lend.
    text: String,

    /// Whether lending fails.
    fail: bool,

    /// Number of successful lends.
    lent: Cell<usize>,

    /// Number of give-backs.
    given_back: Cell<usize>,
}

/// Implements [`CountingSource`].
impl CountingSource {
    /// Instantiates a source lending `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fail: false,
            lent: Cell::new(0),
            given_back: Cell::new(0),
        }
    }

    /// Instantiates a source whose lends always fail.
    pub fn failing(text: impl Into<String>) -> Self {
        Self {
            fail: true,
            ..Self::new(text)
        }
    }

    /// Returns the number of successful lends.
    pub fn lent(&self) -> usize {
        self.lent.get()
    }

    /// Returns the number of give-backs.
    pub fn given_back(&self) -> usize {
        self.given_back.get()
    }

    /// Returns true if every lend was given back.
    pub fn balanced(&self) -> bool {
        self.lent() == self.given_back()
    }
}

/// Implements [`StringSource`] for [`CountingSource`].
impl StringSource for CountingSource {
    fn lend(&self) -> Result<Lent> {
        if self.fail {
            return Err((MarshalError::MARSHALERROR_LEND_FAILED, "source set to fail").into());
        }
        self.lent.set(self.lent.get() + 1);
        Ok(Lent::from_bytes(self.text.as_bytes()))
    }

    fn give_back(&self, lent: Lent) {
        assert_eq!(lent, Lent::from_bytes(self.text.as_bytes()));
        self.given_back.set(self.given_back.get() + 1);
    }
}
