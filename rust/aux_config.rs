// Copyright (c) SandboxAQ. All rights reserved.
// SPDX-License-Identifier: AGPL-3.0-only

//! Auxiliary transport configuration.
//!
//! Bring-up and reconfiguration take a second blob next to the UAPI settings.
//! It configures an optional local proxy used to carry the tunnel over TCP:
//! when the tunnel runs over UDP, or lets the engine choose, the blob is
//! empty.

use serde_json::json;

use crate::error::AuxConfigError;
use crate::Result;

/// Address the local SOCKS inbound listens on.
const SOCKS_LISTEN: &str = "127.0.0.1";

/// Port the local SOCKS inbound listens on.
const SOCKS_PORT: u16 = 1080;

/// The transport a tunnel is carried over.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AuxProtocol {
    /// Plain UDP.
    Udp,

    /// TCP, through the local proxy.
    Tcp,

    /// Let the engine decide.
    #[default]
    Auto,
}

/// Implements [`AuxProtocol`].
impl AuxProtocol {
    /// Returns the lowercase name of the protocol.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Udp => "udp",
            Self::Tcp => "tcp",
            Self::Auto => "auto",
        }
    }
}

/// Parses a protocol from its lowercase name. Anything else is
/// [`AuxProtocol::Auto`].
impl std::str::FromStr for AuxProtocol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "udp" => Self::Udp,
            "tcp" => Self::Tcp,
            _ => Self::Auto,
        })
    }
}

/// Implements [`std::fmt::Display`] for [`AuxProtocol`].
impl std::fmt::Display for AuxProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the auxiliary configuration blob for a tunnel whose first peer
/// endpoint is `host:port`.
///
/// # Errors
///
/// `AUXCONFIGERROR_NO_ENDPOINT` if the protocol is TCP and `host` is empty.
pub fn aux_config(protocol: AuxProtocol, host: &str, port: u16) -> Result<String> {
    if protocol != AuxProtocol::Tcp {
        return Ok(String::new());
    }
    if host.is_empty() {
        return Err((AuxConfigError::AUXCONFIGERROR_NO_ENDPOINT, "empty host").into());
    }
    let doc = json!({
        "inbounds": [
            {
                "port": SOCKS_PORT,
                "listen": SOCKS_LISTEN,
                "protocol": "socks",
                "settings": {
                    "auth": "noauth",
                    "udp": true
                }
            }
        ],
        "outbounds": [
            {
                "protocol": "freedom",
                "settings": {
                    "vnext": [
                        {
                            "address": host,
                            "port": port,
                            "users": []
                        }
                    ]
                }
            }
        ]
    });
    serde_json::to_string_pretty(&doc)
        .map_err(|e| (AuxConfigError::AUXCONFIGERROR_SERIALIZATION, e.to_string()).into())
}
