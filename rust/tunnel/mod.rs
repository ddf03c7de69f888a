// Copyright (c) SandboxAQ. All rights reserved.
// SPDX-License-Identifier: AGPL-3.0-only

//! Defines [`Backend`] struct.
//!
//! [`Backend`] is the typed face of the boundary. Each engine operation is
//! wrapped in a [`crate::Result`], turning the engine sentinels into errors:
//!
//! | Operation                   | Sentinel              | Error                                  |
//! |-----------------------------|-----------------------|----------------------------------------|
//! | [`Backend::turn_on`]        | negative handle       | `TunnelError::TUNNELERROR_CREATION_FAILED` |
//! | [`Backend::socket_v4`]/`v6` | `-1`                  | `SocketError::SOCKETERROR_UNBOUND`     |
//! | [`Backend::config`]         | null string           | `TunnelError::TUNNELERROR_NOT_FOUND`   |
//! | [`Backend::version`]        | null string           | `TunnelError::TUNNELERROR_NOT_FOUND`   |
//! | [`Backend::last_handshake`] | `0` / negative        | `HandshakeError::HANDSHAKEERROR_NONE` / `HANDSHAKEERROR_INVALID` |
//!
//! The sentinel-level calls stay available through [`Backend::dispatcher`].
//!
//! # Preconditions
//!
//! The engine alone knows which handles are live. Passing a handle that was
//! turned off, or racing [`Backend::turn_off`] with any other call on the same
//! handle, has whatever effect the engine gives it. [`Backend`] caches
//! nothing about handles and adds no locking.

use std::os::fd::RawFd;
use std::time::{Duration, SystemTime};

use crate::dispatch::Dispatcher;
use crate::engine::Engine;
use crate::error::{HandshakeError, SocketError, TunnelError};
use crate::handle::Handle;
use crate::marshal::StringSource;
use crate::uapi::Statistics;
use crate::Result;

/// The time of the most recent handshake of a tunnel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct LastHandshake(i64);

/// Implements [`LastHandshake`].
impl LastHandshake {
    /// Returns the time in nanoseconds since the Unix epoch.
    pub fn as_nanos(&self) -> i64 {
        self.0
    }

    /// Returns the time as a [`SystemTime`].
    pub fn as_system_time(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_nanos(self.0.unsigned_abs())
    }
}

/// The typed boundary over an [`Engine`].
#[derive(Debug, Default)]
pub struct Backend<E: Engine> {
    /// The sentinel-level dispatcher.
    dispatcher: Dispatcher<E>,
}

/// Implements [`Backend`].
impl<E: Engine> Backend<E> {
    /// Instantiates a backend over an engine.
    pub const fn new(engine: E) -> Self {
        Self {
            dispatcher: Dispatcher::new(engine),
        }
    }

    /// Returns the sentinel-level dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher<E> {
        &self.dispatcher
    }

    /// Brings a tunnel up on `tun_fd`.
    ///
    /// The descriptor stays owned by the caller; the engine duplicates it or
    /// not, as it sees fit.
    ///
    /// # Errors
    ///
    /// `TUNNELERROR_CREATION_FAILED` if the engine returned a negative handle
    /// or if a string could not be borrowed. No session exists in that case.
    pub fn turn_on<S: StringSource + ?Sized>(
        &self,
        ifname: &S,
        tun_fd: RawFd,
        settings: &S,
        aux: &S,
    ) -> Result<Handle> {
        let raw = self
            .dispatcher
            .turn_on(ifname, tun_fd, settings, aux)
            .map_err(|e| e >> TunnelError::TUNNELERROR_CREATION_FAILED)?;
        if raw < 0 {
            log::warn!("engine refused to bring the tunnel up: {raw}");
            return Err(errors! {(
                TunnelError::TUNNELERROR_CREATION_FAILED,
                format!("engine returned {raw}")
            )});
        }
        let handle = Handle::from_raw(raw);
        log::debug!("tunnel up as {handle}");
        Ok(handle)
    }

    /// Replaces the configuration of a tunnel.
    ///
    /// Engine failures are not reported back; only marshalling ones are.
    ///
    /// # Errors
    ///
    /// A string could not be borrowed; the engine was not called.
    pub fn set_config<S: StringSource + ?Sized>(
        &self,
        handle: Handle,
        settings: &S,
        aux: &S,
    ) -> Result<()> {
        self.dispatcher
            .set_config(handle.as_c_int(), settings, aux)
    }

    /// Tears a tunnel down. `handle` must not be used afterwards.
    pub fn turn_off(&self, handle: Handle) {
        log::debug!("turning {handle} off");
        self.dispatcher.turn_off(handle.as_c_int());
    }

    /// Returns the IPv4 socket of a tunnel. The descriptor stays owned by the
    /// engine and must not be closed.
    ///
    /// # Errors
    ///
    /// `SOCKETERROR_UNBOUND` if the engine has no such socket.
    pub fn socket_v4(&self, handle: Handle) -> Result<RawFd> {
        socket(self.dispatcher.socket_v4(handle.as_c_int()), "IPv4")
    }

    /// Returns the IPv6 socket of a tunnel. The descriptor stays owned by the
    /// engine and must not be closed.
    ///
    /// # Errors
    ///
    /// `SOCKETERROR_UNBOUND` if the engine has no such socket.
    pub fn socket_v6(&self, handle: Handle) -> Result<RawFd> {
        socket(self.dispatcher.socket_v6(handle.as_c_int()), "IPv6")
    }

    /// Returns the UAPI dump of a tunnel configuration.
    ///
    /// # Errors
    ///
    /// `TUNNELERROR_NOT_FOUND` if the engine returned no data.
    pub fn config(&self, handle: Handle) -> Result<String> {
        self.dispatcher.config(handle.as_c_int()).ok_or_else(|| {
            (
                TunnelError::TUNNELERROR_NOT_FOUND,
                format!("no configuration for {handle}"),
            )
                .into()
        })
    }

    /// Returns the engine version.
    ///
    /// # Errors
    ///
    /// `TUNNELERROR_NOT_FOUND` if the engine returned no data.
    pub fn version(&self) -> Result<String> {
        self.dispatcher
            .version()
            .ok_or_else(|| (TunnelError::TUNNELERROR_NOT_FOUND, "no version").into())
    }

    /// Returns the time of the most recent handshake of a tunnel.
    ///
    /// # Errors
    ///
    /// `HANDSHAKEERROR_NONE` if no handshake happened yet,
    /// `HANDSHAKEERROR_INVALID` if the engine returned a negative value.
    pub fn last_handshake(&self, handle: Handle) -> Result<LastHandshake> {
        match self.dispatcher.last_handshake(handle.as_c_int()) {
            0 => Err(HandshakeError::HANDSHAKEERROR_NONE.into()),
            nanos if nanos < 0 => Err((
                HandshakeError::HANDSHAKEERROR_INVALID,
                format!("engine returned {nanos} for {handle}"),
            )
                .into()),
            nanos => Ok(LastHandshake(nanos)),
        }
    }

    /// Returns the per-peer statistics of a tunnel, parsed from its dump.
    ///
    /// # Errors
    ///
    /// See [`Backend::config`] and [`Statistics::parse`].
    pub fn statistics(&self, handle: Handle) -> Result<Statistics> {
        Statistics::parse(&self.config(handle)?)
    }
}

/// Maps a socket sentinel.
fn socket(fd: RawFd, family: &str) -> Result<RawFd> {
    if fd < 0 {
        log::debug!("{family} socket unbound: {fd}");
        return Err((SocketError::SOCKETERROR_UNBOUND, format!("{family} socket")).into());
    }
    Ok(fd)
}

#[cfg(test)]
mod test {
    use std::time::{Duration, SystemTime};

    use super::Backend;
    use crate::error::{HandshakeError, MarshalError, SocketError, TunnelError};
    use crate::handle::Handle;
    use crate::testing::{self, CountingSource, MockEngine};

    /// Tests bring-up and the socket queries of a live session.
    #[test]
    fn test_turn_on_and_sockets() {
        let b = Backend::new(MockEngine::default());
        let h = b.turn_on("wg0", 11, "listen_port=0", "").unwrap();
        assert_eq!(h, Handle::from_raw(0));
        assert_eq!(b.socket_v4(h).unwrap(), testing::SOCKET_V4_BASE);
        assert_eq!(b.socket_v6(h).unwrap(), testing::SOCKET_V6_BASE);
    }

    /// Tests that a negative handle becomes a creation failure.
    #[test]
    fn test_turn_on_failure() {
        let b = Backend::new(MockEngine::default());
        let err = b.turn_on("wg0", -1, "", "").unwrap_err();
        assert_eq!(err.code(), Some(TunnelError::TUNNELERROR_CREATION_FAILED.into()));
        assert_eq!(err.iter().next().unwrap().msg(), Some("engine returned -1"));
        assert_eq!(b.dispatcher().engine().live_sessions(), 0);
    }

    /// Tests that a marshalling failure is chained under a creation failure.
    #[test]
    fn test_turn_on_lend_failure() {
        let b = Backend::new(MockEngine::default());
        let ifname = CountingSource::failing("wg0");
        let other = CountingSource::new("");
        let err = b.turn_on(&ifname, 3, &other, &other).unwrap_err();
        assert_eq!(err.len(), 2);
        assert_eq!(err.code(), Some(MarshalError::MARSHALERROR_LEND_FAILED.into()));
        assert!(err.contains(TunnelError::TUNNELERROR_CREATION_FAILED));
        assert!(other.balanced());
    }

    /// Tests unbound sockets.
    #[test]
    fn test_socket_unbound() {
        let b = Backend::new(MockEngine::default());
        let err = b.socket_v4(Handle::from_raw(4)).unwrap_err();
        assert_eq!(err.code(), Some(SocketError::SOCKETERROR_UNBOUND.into()));
        assert!(b.socket_v6(Handle::from_raw(4)).is_err());
    }

    /// Tests the configuration dump and its absence.
    #[test]
    fn test_config() {
        testing::reset_counters();
        let b = Backend::new(MockEngine::default());
        let h = b.turn_on("wg0", 1, "fwmark=1\n", "").unwrap();
        b.set_config(h, "fwmark=2\n", "").unwrap();
        assert_eq!(b.config(h).unwrap(), "fwmark=2\n");

        let err = b.config(Handle::from_raw(99)).unwrap_err();
        assert_eq!(err.code(), Some(TunnelError::TUNNELERROR_NOT_FOUND.into()));
        assert_eq!(testing::allocated(), testing::released());
    }

    /// Tests the version query.
    #[test]
    fn test_version() {
        let b = Backend::new(MockEngine::with_version("1.0.20240101"));
        assert_eq!(b.version().unwrap(), "1.0.20240101");
        let b = Backend::new(MockEngine::default());
        assert!(b
            .version()
            .unwrap_err()
            .contains(TunnelError::TUNNELERROR_NOT_FOUND));
    }

    /// Tests the handshake sentinels.
    #[test]
    fn test_last_handshake() {
        let b = Backend::new(MockEngine::default());
        let h = b.turn_on("wg0", 1, "", "").unwrap();
        let err = b.last_handshake(h).unwrap_err();
        assert_eq!(err.code(), Some(HandshakeError::HANDSHAKEERROR_NONE.into()));

        b.dispatcher().engine().set_last_handshake(0, 1_500_000_000_250_000_000);
        let t = b.last_handshake(h).unwrap();
        assert_eq!(t.as_nanos(), 1_500_000_000_250_000_000);
        assert_eq!(
            t.as_system_time(),
            SystemTime::UNIX_EPOCH + Duration::new(1_500_000_000, 250_000_000)
        );

        b.turn_off(h);
        let err = b.last_handshake(h).unwrap_err();
        assert_eq!(err.code(), Some(HandshakeError::HANDSHAKEERROR_INVALID.into()));
    }

    /// Tests that reconfiguring with an unlendable string leaves the engine alone.
    #[test]
    fn test_set_config_lend_failure() {
        let b = Backend::new(MockEngine::default());
        let settings = CountingSource::failing("x");
        let aux = CountingSource::new("");
        assert!(b.set_config(Handle::from_raw(0), &settings, &aux).is_err());
        assert!(b.dispatcher().engine().calls().is_empty());
    }
}
