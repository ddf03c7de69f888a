// Copyright (c) SandboxAQ. All rights reserved.
// SPDX-License-Identifier: AGPL-3.0-only

//! Support module.

use std::ffi::c_int;

pub(crate) mod logging;
mod pimpl;

pub(crate) use pimpl::Pimpl;

/// Casts an engine `c_int` to a Java `int`.
///
/// No-op on every supported target, where both are 32 bits wide. Going
/// through `into` keeps the build failing if that ever changes.
#[cfg(feature = "jni")]
#[allow(clippy::useless_conversion)]
pub(crate) fn to_i32(value: c_int) -> i32 {
    value.into()
}

/// Casts an `i32` to an engine `c_int`. See `to_i32`.
#[allow(clippy::useless_conversion)]
pub(crate) fn to_c_int(value: i32) -> c_int {
    value.into()
}
