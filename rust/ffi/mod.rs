// Copyright (c) SandboxAQ. All rights reserved.
// SPDX-License-Identifier: AGPL-3.0-only

//! Frontend module for the Java host.
//!
//! # JNI surface
//!
//! The following `org.amnezia.awg.backend.GoBackend` native methods are
//! exported, each forwarding to the linked engine through a
//! [`crate::dispatch::Dispatcher`]:
//!
//!   * `awgTurnOn(String ifName, int tunFd, String settings, String auxConfig): int`:
//!     brings a tunnel up, returns its handle or a negative value.
//!   * `awgSetConfig(int handle, String settings, String auxConfig)`:
//!     reconfigures a tunnel.
//!   * `awgTurnOff(int handle)`: tears a tunnel down.
//!   * `awgGetSocketV4(int handle): int` and `awgGetSocketV6(int handle): int`:
//!     return the tunnel UDP sockets, or `-1`.
//!   * `awgGetConfig(int handle): String`: returns the UAPI dump, or `null`.
//!   * `awgVersion(): String`: returns the engine version, or `null`.
//!   * `awgGetLastHandshake(int handle): long`: returns the last handshake
//!     time in nanoseconds, `0` if none.
//!
//! Engine sentinels reach Java unchanged. A string that cannot be borrowed
//! from the JVM makes `awgTurnOn` return `-1` and `awgSetConfig` return
//! without calling the engine.

mod java;
