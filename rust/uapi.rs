// Copyright (c) SandboxAQ. All rights reserved.
// SPDX-License-Identifier: AGPL-3.0-only

//! Parsing of the engine configuration dump.
//!
//! The dump returned by [`crate::tunnel::Backend::config`] is a list of
//! `key=value` lines. Device-level keys come first, then one block per peer,
//! each starting with a `public_key` line. Only the keys needed to report
//! traffic and handshake statistics are interpreted.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use crate::error::UapiError;
use crate::Result;

/// Length of a public key, in bytes.
pub const KEY_LEN: usize = 32;

/// Nanoseconds in one second.
const NANOS_PER_SEC: u32 = 1_000_000_000;

/// The public key of a peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerKey([u8; KEY_LEN]);

/// Implements [`PeerKey`].
impl PeerKey {
    /// Parses a key from its hexadecimal form.
    ///
    /// # Errors
    ///
    /// `UAPIERROR_INVALID_KEY` if `s` is not 64 hexadecimal digits.
    pub fn from_hex(s: &str) -> Result<Self> {
        let mut key = [0u8; KEY_LEN];
        hex::decode_to_slice(s, &mut key)
            .map_err(|e| (UapiError::UAPIERROR_INVALID_KEY, format!("{e}")))?;
        Ok(Self(key))
    }

    /// Returns the raw key.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

/// Implements [`std::fmt::Display`] for [`PeerKey`], in hexadecimal.
impl std::fmt::Display for PeerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Traffic and handshake statistics of one peer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PeerStats {
    /// Bytes received from the peer.
    pub rx_bytes: u64,

    /// Bytes sent to the peer.
    pub tx_bytes: u64,

    /// Seconds part of the last handshake time.
    handshake_sec: u64,

    /// Nanoseconds part of the last handshake time.
    handshake_nsec: u32,
}

/// Implements [`PeerStats`].
impl PeerStats {
    /// Returns the time of the last handshake, `None` if there was none or
    /// if it is not representable as a [`SystemTime`].
    pub fn last_handshake(&self) -> Option<SystemTime> {
        if self.handshake_sec == 0 && self.handshake_nsec == 0 {
            return None;
        }
        let since_epoch = Duration::from_secs(self.handshake_sec)
            .checked_add(Duration::from_nanos(u64::from(self.handshake_nsec)))?;
        SystemTime::UNIX_EPOCH.checked_add(since_epoch)
    }
}

/// Per-peer statistics of a tunnel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Statistics, by peer.
    peers: BTreeMap<PeerKey, PeerStats>,
}

/// Implements [`Statistics`].
impl Statistics {
    /// Parses a configuration dump.
    ///
    /// # Errors
    ///
    /// `UAPIERROR_MALFORMED` if a line has no `=` or if a counter is not a
    /// number, `UAPIERROR_INVALID_KEY` if a public key is malformed.
    pub fn parse(dump: &str) -> Result<Self> {
        let mut peers = BTreeMap::new();
        let mut current: Option<(PeerKey, PeerStats)> = None;

        for (i, line) in dump.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err((
                    UapiError::UAPIERROR_MALFORMED,
                    format!("line {}: missing '='", i + 1),
                )
                    .into());
            };
            if key == "public_key" {
                if let Some((k, s)) = current.take() {
                    peers.insert(k, s);
                }
                current = Some((PeerKey::from_hex(value)?, PeerStats::default()));
                continue;
            }
            let Some((_, stats)) = current.as_mut() else {
                continue;
            };
            match key {
                "rx_bytes" => stats.rx_bytes = number(i, key, value)?,
                "tx_bytes" => stats.tx_bytes = number(i, key, value)?,
                "last_handshake_time_sec" => stats.handshake_sec = number(i, key, value)?,
                "last_handshake_time_nsec" => {
                    let nsec = number(i, key, value)?;
                    if nsec >= NANOS_PER_SEC {
                        return Err((
                            UapiError::UAPIERROR_MALFORMED,
                            format!("line {}: {key}: {nsec} is not below one second", i + 1),
                        )
                            .into());
                    }
                    stats.handshake_nsec = nsec;
                }
                _ => {}
            }
        }
        if let Some((k, s)) = current {
            peers.insert(k, s);
        }
        Ok(Self { peers })
    }

    /// Returns the statistics of a peer.
    pub fn peer(&self, key: &PeerKey) -> Option<&PeerStats> {
        self.peers.get(key)
    }

    /// Returns an iterator over the peers, ordered by key.
    pub fn peers(&self) -> impl Iterator<Item = (&PeerKey, &PeerStats)> {
        self.peers.iter()
    }

    /// Returns the number of peers.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Returns true if the tunnel has no peer.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Returns the bytes received from all peers, saturating at `u64::MAX`.
    pub fn total_rx(&self) -> u64 {
        self.peers
            .values()
            .map(|s| s.rx_bytes)
            .fold(0, u64::saturating_add)
    }

    /// Returns the bytes sent to all peers, saturating at `u64::MAX`.
    pub fn total_tx(&self) -> u64 {
        self.peers
            .values()
            .map(|s| s.tx_bytes)
            .fold(0, u64::saturating_add)
    }

    /// Returns the most recent handshake among all peers.
    pub fn latest_handshake(&self) -> Option<SystemTime> {
        self.peers.values().filter_map(PeerStats::last_handshake).max()
    }
}

/// Parses a counter value.
fn number<T: std::str::FromStr>(i: usize, key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| {
        (
            UapiError::UAPIERROR_MALFORMED,
            format!("line {}: {key}: {e}", i + 1),
        )
            .into()
    })
}
