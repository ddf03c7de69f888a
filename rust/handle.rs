// Copyright (c) SandboxAQ. All rights reserved.
// SPDX-License-Identifier: AGPL-3.0-only

//! Defines [`Handle`] struct.
//!
//! The engine owns a registry mapping small integers to live tunnel
//! sessions. This crate never looks inside that registry: a [`Handle`] is an
//! opaque token passed by value, and no local state is ever attached to it.
//!
//! Whether a given value still designates a live session is only known by the
//! engine. Using a handle after [`crate::tunnel::Backend::turn_off`], or while
//! another thread tears it down, is outside this crate's contract.

use std::ffi::c_int;

use crate::support;

/// An opaque identity for one live tunnel session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(i32);

/// Implements [`Handle`].
impl Handle {
    /// Wraps a raw handle value, as stored by the host.
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    pub const fn as_raw(self) -> i32 {
        self.0
    }

    /// Returns the value in the engine ABI type.
    pub(crate) fn as_c_int(self) -> c_int {
        support::to_c_int(self.0)
    }
}

/// Implements [`std::fmt::Display`] for [`Handle`].
impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "handle #{}", self.0)
    }
}
