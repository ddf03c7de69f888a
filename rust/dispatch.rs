// Copyright (c) SandboxAQ. All rights reserved.
// SPDX-License-Identifier: AGPL-3.0-only

//! Defines [`Dispatcher`] struct.
//!
//! The dispatcher exposes the engine lifecycle as one synchronous method per
//! operation. It borrows the caller strings, forwards them, adopts the
//! returned buffers, and hands the engine sentinels back untouched.
//!
//! The only errors it produces are its own marshalling failures, in which
//! case the engine is not called at all.
//!
//! # Concurrency
//!
//! A [`Dispatcher`] holds no lock and no per-handle state. Calls on distinct
//! handles may run concurrently; calls on the same handle are only as safe as
//! the engine makes them.

use std::ffi::c_int;

use crate::engine::Engine;
use crate::marshal::{Borrowed, NativeString, StringSource};
use crate::Result;

/// Dispatches lifecycle calls to an [`Engine`].
#[derive(Debug, Default)]
pub struct Dispatcher<E: Engine> {
    /// The engine.
    engine: E,
}

/// Implements [`Dispatcher`].
impl<E: Engine> Dispatcher<E> {
    /// Instantiates a dispatcher over an engine.
    pub const fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Returns the engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Brings a tunnel up and returns the engine handle, negative on failure.
    ///
    /// # Errors
    ///
    /// One of the strings could not be borrowed. Strings already borrowed are
    /// given back and the engine is not called.
    pub fn turn_on<S: StringSource + ?Sized>(
        &self,
        ifname: &S,
        tun_fd: c_int,
        settings: &S,
        aux: &S,
    ) -> Result<c_int> {
        let ifname = Borrowed::borrow(ifname)?;
        let settings = Borrowed::borrow(settings)?;
        let aux = Borrowed::borrow(aux)?;
        log::trace!(
            "turn_on: ifname {} bytes, tun_fd {tun_fd}, settings {} bytes, aux {} bytes",
            ifname.len(),
            settings.len(),
            aux.len()
        );
        let handle = self
            .engine
            .turn_on(ifname.view(), tun_fd, settings.view(), aux.view());
        log::trace!("turn_on: engine returned {handle}");
        Ok(handle)
    }

    /// Replaces the configuration of a tunnel.
    ///
    /// # Errors
    ///
    /// One of the strings could not be borrowed; the engine is not called.
    pub fn set_config<S: StringSource + ?Sized>(
        &self,
        handle: c_int,
        settings: &S,
        aux: &S,
    ) -> Result<()> {
        let settings = Borrowed::borrow(settings)?;
        let aux = Borrowed::borrow(aux)?;
        log::trace!(
            "set_config: handle {handle}, settings {} bytes, aux {} bytes",
            settings.len(),
            aux.len()
        );
        self.engine.set_config(handle, settings.view(), aux.view());
        Ok(())
    }

    /// Brings a tunnel up on behalf of a host that only understands
    /// sentinels: a marshalling failure is logged and reported as `-1`.
    pub fn host_turn_on<S: StringSource + ?Sized>(
        &self,
        ifname: &S,
        tun_fd: c_int,
        settings: &S,
        aux: &S,
    ) -> c_int {
        self.turn_on(ifname, tun_fd, settings, aux)
            .unwrap_or_else(|e| {
                log::error!("turn_on: {e}");
                -1
            })
    }

    /// Replaces the configuration of a tunnel on behalf of a host that gets
    /// no result: a marshalling failure is logged.
    pub fn host_set_config<S: StringSource + ?Sized>(&self, handle: c_int, settings: &S, aux: &S) {
        if let Err(e) = self.set_config(handle, settings, aux) {
            log::error!("set_config: {e}");
        }
    }

    /// Tears a tunnel down.
    pub fn turn_off(&self, handle: c_int) {
        log::trace!("turn_off: handle {handle}");
        self.engine.turn_off(handle);
    }

    /// Returns the IPv4 socket of a tunnel, `-1` if unbound.
    pub fn socket_v4(&self, handle: c_int) -> c_int {
        self.engine.socket_v4(handle)
    }

    /// Returns the IPv6 socket of a tunnel, `-1` if unbound.
    pub fn socket_v6(&self, handle: c_int) -> c_int {
        self.engine.socket_v6(handle)
    }

    /// Returns the UAPI dump of a tunnel, `None` if the engine has none.
    pub fn config(&self, handle: c_int) -> Option<String> {
        let dump = NativeString::adopt(self.engine.config(handle), E::release)
            .map(NativeString::into_string);
        log::trace!(
            "config: handle {handle}, dump length {:?}",
            dump.as_ref().map(String::len)
        );
        dump
    }

    /// Returns the engine version, `None` if the engine has none.
    pub fn version(&self) -> Option<String> {
        NativeString::adopt(self.engine.version(), E::release).map(NativeString::into_string)
    }

    /// Returns the last handshake time of a tunnel, in nanoseconds since the
    /// Unix epoch; `0` or negative if none.
    pub fn last_handshake(&self, handle: c_int) -> i64 {
        self.engine.last_handshake(handle)
    }
}

#[cfg(test)]
mod test {
    use super::Dispatcher;
    use crate::error::MarshalError;
    use crate::marshal::HostString;
    use crate::testing::{self, Call, CountingSource, MockEngine};

    /// Tests that bring-up forwards the exact bytes and returns the handle.
    #[test]
    fn test_turn_on_forwards_bytes() {
        let d = Dispatcher::new(MockEngine::default());
        let handle = d.turn_on("wg0", 7, "private_key=00\0ff", "").unwrap();
        assert_eq!(handle, 0);
        assert_eq!(
            d.engine().calls(),
            vec![Call::TurnOn {
                ifname: b"wg0".to_vec(),
                tun_fd: 7,
                settings: b"private_key=00\0ff".to_vec(),
                aux: Vec::new(),
            }]
        );
    }

    /// Tests that a negative handle is returned unchanged.
    #[test]
    fn test_turn_on_negative_handle() {
        let d = Dispatcher::new(MockEngine::default());
        assert_eq!(d.turn_on("wg0", -5, "", "").unwrap(), -1);
        assert_eq!(d.engine().live_sessions(), 0);
    }

    /// Tests that every borrow is given back, whatever the outcome.
    #[test]
    fn test_turn_on_borrows_balanced() {
        let d = Dispatcher::new(MockEngine::default());
        let ifname = CountingSource::new("wg0");
        let settings = CountingSource::new("listen_port=1");
        let aux = CountingSource::new("");

        d.turn_on(&ifname, 3, &settings, &aux).unwrap();
        d.turn_on(&ifname, -1, &settings, &aux).unwrap();
        for s in [&ifname, &settings, &aux] {
            assert_eq!(s.lent(), 2);
            assert!(s.balanced());
        }
    }

    /// Tests that a lend failure skips the engine and gives back earlier borrows.
    #[test]
    fn test_turn_on_lend_failure() {
        let d = Dispatcher::new(MockEngine::default());
        let ifname = CountingSource::new("wg0");
        let settings = CountingSource::new("listen_port=1");
        let aux = CountingSource::failing("{}");

        let err = d.turn_on(&ifname, 3, &settings, &aux).unwrap_err();
        assert!(err.contains(MarshalError::MARSHALERROR_LEND_FAILED));
        assert!(d.engine().calls().is_empty());
        assert_eq!(ifname.lent(), 1);
        assert!(ifname.balanced());
        assert!(settings.balanced());
        assert_eq!(aux.lent(), 0);
    }

    /// Tests reconfiguration, including on a handle the engine does not know.
    #[test]
    fn test_set_config() {
        let d = Dispatcher::new(MockEngine::default());
        let settings = CountingSource::new("fwmark=51820");
        let aux = CountingSource::new("");
        d.set_config(9, &settings, &aux).unwrap();
        assert_eq!(
            d.engine().calls(),
            vec![Call::SetConfig {
                handle: 9,
                settings: b"fwmark=51820".to_vec(),
                aux: Vec::new(),
            }]
        );
        assert!(settings.balanced() && aux.balanced());
        assert_eq!(settings.lent(), 1);
    }

    /// Tests that a lend failure on reconfiguration skips the engine.
    #[test]
    fn test_set_config_lend_failure() {
        let d = Dispatcher::new(MockEngine::default());
        let settings = CountingSource::failing("fwmark=1");
        let aux = CountingSource::new("");
        assert!(d.set_config(0, &settings, &aux).is_err());
        assert!(d.engine().calls().is_empty());
        assert_eq!(aux.lent(), 0);
    }

    /// Tests that scalar queries pass sentinels through.
    #[test]
    fn test_scalar_sentinels() {
        let d = Dispatcher::new(MockEngine::default());
        assert_eq!(d.socket_v4(0), -1);
        assert_eq!(d.socket_v6(0), -1);
        assert_eq!(d.last_handshake(0), -1);

        let h = d.turn_on("wg0", 4, "", "").unwrap();
        assert_eq!(d.socket_v4(h), testing::SOCKET_V4_BASE + h);
        assert_eq!(d.socket_v6(h), testing::SOCKET_V6_BASE + h);
        assert_eq!(d.last_handshake(h), 0);
        d.engine().set_last_handshake(h, 1_700_000_000_000_000_000);
        assert_eq!(d.last_handshake(h), 1_700_000_000_000_000_000);

        d.turn_off(h);
        assert_eq!(d.socket_v4(h), -1);
    }

    /// Tests that the config dump is adopted and released once.
    #[test]
    fn test_config_adopted() {
        testing::reset_counters();
        let d = Dispatcher::new(MockEngine::default());
        let h = d.turn_on("wg0", 4, "listen_port=51820\n", "").unwrap();
        assert_eq!(d.config(h).as_deref(), Some("listen_port=51820\n"));
        assert_eq!(testing::allocated(), 1);
        assert_eq!(testing::released(), 1);
    }

    /// Tests that an unknown handle yields no dump, not an empty one.
    #[test]
    fn test_config_invalid_handle() {
        testing::reset_counters();
        let d = Dispatcher::new(MockEngine::default());
        assert_eq!(d.config(12), None);
        assert_eq!(testing::released(), 0);
    }

    /// Tests the version query without any session.
    #[test]
    fn test_version() {
        testing::reset_counters();
        let d = Dispatcher::new(MockEngine::with_version("0.2.12"));
        assert_eq!(d.version().as_deref(), Some("0.2.12"));
        assert_eq!(d.version().as_deref(), Some("0.2.12"));
        assert_eq!(testing::allocated(), 2);
        assert_eq!(testing::released(), 2);

        let d = Dispatcher::new(MockEngine::default());
        assert_eq!(d.version(), None);
        assert_eq!(testing::released(), 2);
    }

    /// Tests that a missing host string makes bring-up return `-1` without
    /// reaching the engine, and that strings lent before it are given back.
    #[test]
    fn test_host_turn_on_unavailable() {
        let d = Dispatcher::new(MockEngine::default());
        let ifname = HostString::Available(CountingSource::new("wg0"));
        let settings = HostString::Available(CountingSource::new("listen_port=1"));
        let aux = HostString::Unavailable("null string".into());

        assert_eq!(d.host_turn_on(&ifname, 3, &settings, &aux), -1);
        assert!(d.engine().calls().is_empty());
        for s in [&ifname, &settings] {
            let HostString::Available(source) = s else {
                unreachable!();
            };
            assert_eq!(source.lent(), 1);
            assert!(source.balanced());
        }
    }

    /// Tests that a missing interface name stops bring-up before anything is lent.
    #[test]
    fn test_host_turn_on_first_unavailable() {
        let d = Dispatcher::new(MockEngine::default());
        let ifname = HostString::Unavailable("null string".into());
        let settings = HostString::Available(CountingSource::new("listen_port=1"));
        let aux = HostString::Available(CountingSource::new(""));

        assert_eq!(d.host_turn_on(&ifname, 3, &settings, &aux), -1);
        assert!(d.engine().calls().is_empty());
        let HostString::Available(source) = &settings else {
            unreachable!();
        };
        assert_eq!(source.lent(), 0);
    }

    /// Tests that available host strings reach the engine.
    #[test]
    fn test_host_turn_on_available() {
        let d = Dispatcher::new(MockEngine::default());
        let ifname = HostString::Available(CountingSource::new("wg0"));
        let settings = HostString::Available(CountingSource::new("listen_port=1"));
        let aux = HostString::Available(CountingSource::new(""));
        assert_eq!(d.host_turn_on(&ifname, 3, &settings, &aux), 0);
        assert_eq!(d.engine().live_sessions(), 1);
    }

    /// Tests that a missing host string makes reconfiguration a no-op.
    #[test]
    fn test_host_set_config_unavailable() {
        let d = Dispatcher::new(MockEngine::default());
        let settings = HostString::Unavailable("null string".into());
        let aux = HostString::Available(CountingSource::new(""));
        d.host_set_config(0, &settings, &aux);
        assert!(d.engine().calls().is_empty());
    }
}
