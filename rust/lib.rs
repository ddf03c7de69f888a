// Copyright (c) SandboxAQ. All rights reserved.
// SPDX-License-Identifier: AGPL-3.0-only

//! Root module.
//!
//! Native bridge between a managed host and the AmneziaWG tunnel engine.
//!
//! The bridge is layered as follows:
//!
//!   * [`engine`]: the engine ABI, as the [`Engine`] trait.
//!   * [`marshal`]: borrowing caller strings and adopting engine strings.
//!   * [`dispatch`]: one synchronous call per engine operation, sentinels
//!     passed through ([`Dispatcher`]).
//!   * [`tunnel`]: the same operations with sentinels mapped to [`Error`]
//!     ([`Backend`]).
//!
//! With the `jni` feature, the library also exports the native methods of
//! `org.amnezia.awg.backend.GoBackend`.

#[macro_use]
pub mod error;
pub use error::Error;

/// A specialized [`std::result::Result`] for this crate.
pub type Result<T> = std::result::Result<T, Error>;

mod support;
pub use support::logging::{init as init_logging, LOG_ENV};

pub mod handle;
pub use handle::Handle;

pub mod engine;
pub use engine::{Engine, GoString};
#[cfg(feature = "libwg")]
pub use engine::Libwg;

pub mod marshal;
pub use marshal::{Borrowed, HostString, NativeString, StringSource};

pub mod dispatch;
pub use dispatch::Dispatcher;

pub mod tunnel;
pub use tunnel::{Backend, LastHandshake};

pub mod uapi;
pub use uapi::Statistics;

pub mod aux_config;
pub use aux_config::{aux_config, AuxProtocol};

#[cfg(feature = "jni")]
mod ffi;

#[cfg(any(test, feature = "testing"))]
#[doc(hidden)]
pub mod testing;
