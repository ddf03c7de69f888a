// Copyright (c) SandboxAQ. All rights reserved.
// SPDX-License-Identifier: AGPL-3.0-only

//! Test the full lifecycle of tunnel sessions through the public API, over
//! the in-memory engine.

use awg_bridge::error::{HandshakeError, SocketError, TunnelError};
use awg_bridge::testing::{self, Call, CountingSource, MockEngine};
use awg_bridge::{aux_config, AuxProtocol, Backend, Handle};

const SETTINGS: &str = "private_key=a8dac1d8a70a751f0f699fb14ba1cff7b79cf4fbd8f09f44c6e6a90d0369604f\n\
listen_port=51820\n\
public_key=e84b5a6d2717c1003a13b431570353dbaca9146cf150c5f8575680feba52027a\n\
endpoint=192.0.2.1:51820\n\
last_handshake_time_sec=1700000000\n\
last_handshake_time_nsec=0\n\
rx_bytes=1024\n\
tx_bytes=2048\n";

/// Test a session from bring-up to teardown.
///
/// Scenario:
///
///     BringUp("wg0", fd, settings, "") -> handle >= 0
///     GetSocketV4(handle)              -> socket >= 0
///     TurnOff(handle)
///     GetLastHandshake(handle)         -> sentinel, no crash
#[test]
fn test_bring_up_and_tear_down() {
    testing::reset_counters();
    let backend = Backend::new(MockEngine::default());

    let handle = backend.turn_on("wg0", 10, "settings-blob", "").unwrap();
    assert!(handle.as_raw() >= 0);
    assert!(backend.socket_v4(handle).unwrap() >= 0);
    assert!(backend.socket_v6(handle).unwrap() >= 0);

    backend.turn_off(handle);
    let err = backend.last_handshake(handle).unwrap_err();
    assert!(err.contains(HandshakeError::HANDSHAKEERROR_INVALID));
    let err = backend.socket_v4(handle).unwrap_err();
    assert!(err.contains(SocketError::SOCKETERROR_UNBOUND));

    assert_eq!(testing::allocated(), testing::released());
}

/// Test that an unknown handle has no configuration, and that nothing leaks.
#[test]
fn test_config_of_unknown_handle() {
    testing::reset_counters();
    let backend = Backend::new(MockEngine::default());
    assert_eq!(backend.dispatcher().config(1234), None);
    let err = backend.config(Handle::from_raw(1234)).unwrap_err();
    assert!(err.contains(TunnelError::TUNNELERROR_NOT_FOUND));
    assert_eq!(testing::allocated(), 0);
    assert_eq!(testing::released(), 0);
}

/// Test the version query before any session exists.
#[test]
fn test_version_without_session() {
    testing::reset_counters();
    let backend = Backend::new(MockEngine::with_version("1.0.20231018"));
    assert_eq!(backend.version().unwrap(), "1.0.20231018");
    assert_eq!(backend.dispatcher().engine().live_sessions(), 0);
    assert_eq!(testing::allocated(), 1);
    assert_eq!(testing::released(), 1);

    let backend = Backend::new(MockEngine::default());
    assert!(backend.version().is_err());
}

/// Test that every borrowed string is given back over a whole session.
#[test]
fn test_borrows_balanced() {
    let backend = Backend::new(MockEngine::default());
    let ifname = CountingSource::new("wg0");
    let settings = CountingSource::new(SETTINGS);
    let aux = CountingSource::new("");

    let handle = backend.turn_on(&ifname, 3, &settings, &aux).unwrap();
    for _ in 0..3 {
        backend.set_config(handle, &settings, &aux).unwrap();
    }
    backend.turn_off(handle);

    assert!(backend.turn_on(&ifname, -1, &settings, &aux).is_err());

    assert_eq!(ifname.lent(), 2);
    assert_eq!(settings.lent(), 5);
    for s in [&ifname, &settings, &aux] {
        assert!(s.balanced());
    }
}

/// Test that handle values are reused once their session is gone.
#[test]
fn test_handle_reuse() {
    let backend = Backend::new(MockEngine::default());
    let a = backend.turn_on("wg0", 3, "", "").unwrap();
    let b = backend.turn_on("wg1", 4, "", "").unwrap();
    assert_ne!(a, b);

    backend.turn_off(a);
    let c = backend.turn_on("wg2", 5, "", "").unwrap();
    assert_eq!(c, a);
    assert_eq!(backend.dispatcher().engine().live_sessions(), 2);
}

/// Test the statistics of a live session.
#[test]
fn test_statistics() {
    testing::reset_counters();
    let backend = Backend::new(MockEngine::default());
    let handle = backend.turn_on("wg0", 3, SETTINGS, "").unwrap();

    let stats = backend.statistics(handle).unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats.total_rx(), 1024);
    assert_eq!(stats.total_tx(), 2048);
    assert!(stats.latest_handshake().is_some());
    assert_eq!(testing::allocated(), testing::released());

    backend.turn_off(handle);
    assert!(backend.statistics(handle).is_err());
}

/// Test that the auxiliary configuration reaches the engine unchanged.
#[test]
fn test_aux_config_forwarded() {
    let backend = Backend::new(MockEngine::default());
    let aux = aux_config(AuxProtocol::Tcp, "192.0.2.1", 51820).unwrap();
    let handle = backend.turn_on("wg0", 3, SETTINGS, aux.as_str()).unwrap();
    backend
        .set_config(handle, SETTINGS, aux_config(AuxProtocol::Udp, "192.0.2.1", 51820).unwrap().as_str())
        .unwrap();

    let calls = backend.dispatcher().engine().calls();
    assert_eq!(calls.len(), 2);
    match &calls[0] {
        Call::TurnOn { aux: sent, .. } => assert_eq!(sent, aux.as_bytes()),
        other => panic!("unexpected call {other:?}"),
    }
    match &calls[1] {
        Call::SetConfig { aux: sent, .. } => assert!(sent.is_empty()),
        other => panic!("unexpected call {other:?}"),
    }
}
