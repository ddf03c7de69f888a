// Copyright (c) SandboxAQ. All rights reserved.
// SPDX-License-Identifier: AGPL-3.0-only

//! Logger installation.
//!
//! The crate only emits records through the `log` facade. Hosts that do not
//! install their own logger get an `env_logger` backend, filtered by the
//! [`LOG_ENV`] environment variable.

use std::sync::Once;

/// Environment variable holding the `env_logger` filter.
pub const LOG_ENV: &str = "AWG_BRIDGE_LOG";

/// Filter used when [`LOG_ENV`] is unset.
const DEFAULT_FILTER: &str = "warn";

/// Guards the logger installation.
static INIT: Once = Once::new();

/// Installs the `env_logger` backend. Subsequent calls are no-ops, and so is
/// the first one if the host already installed a logger.
pub fn init() {
    INIT.call_once(|| {
        let env = env_logger::Env::default().filter_or(LOG_ENV, DEFAULT_FILTER);
        if env_logger::Builder::from_env(env).try_init().is_ok() {
            log::debug!("logger installed, filter from ${LOG_ENV}");
        }
    });
}
