// Copyright (c) SandboxAQ. All rights reserved.
// SPDX-License-Identifier: AGPL-3.0-only

//! Defines [`Error`] struct.
//!
//! Nothing structured crosses the boundary with the engine: failures there are
//! sentinel values. The typed layer ([`crate::tunnel::Backend`]) turns those
//! sentinels into an [`Error`], usually through [`crate::Result`].
//!
//! An [`Error`] is a chain of [`ErrorCode`]. The first element of the chain
//! is the most precise error, and the last element is the most general one.
//! For instance, a lend failure while bringing a tunnel up results in:
//!
//! ```text
//! MarshalError::MARSHALERROR_LEND_FAILED          // The most precise error.
//!   -> TunnelError::TUNNELERROR_CREATION_FAILED   // The most general error.
//! ```
//!
//! Error codes are defined in the [`code`] module.

pub mod code;
pub use code::{
    AuxConfigError, ErrorCode, ErrorKind, HandshakeError, MarshalError, SocketError, TunnelError,
    UapiError,
};

/// One link of an error chain: an [`ErrorCode`] and an optional message.
#[derive(Clone, PartialEq, Eq)]
pub struct Link {
    /// The error code.
    code: ErrorCode,

    /// A human readable detail.
    msg: Option<String>,
}

/// Implements [`Link`].
impl Link {
    /// Returns the error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Returns the message, if any.
    pub fn msg(&self) -> Option<&str> {
        self.msg.as_deref()
    }
}

/// Implements [`std::fmt::Display`] for [`Link`].
impl std::fmt::Display for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.msg {
            Some(msg) => write!(f, "{} ({msg})", self.code),
            None => write!(f, "{}", self.code),
        }
    }
}

/// Instantiates a [`Link`] from an [`ErrorCode`].
impl std::convert::From<ErrorCode> for Link {
    fn from(code: ErrorCode) -> Self {
        Self { code, msg: None }
    }
}

/// An error.
/// An [`Error`] holds a chain of [`Link`].
#[derive(Clone, PartialEq, Eq)]
pub struct Error(std::vec::Vec<Link>);

/// Instantiates an [`Error`] from an enum value.
impl<ErrorEnum: code::AllowedErrorCodeEnum> std::convert::From<ErrorEnum> for Error
where
    ErrorCode: std::convert::From<ErrorEnum>,
{
    fn from(e: ErrorEnum) -> Self {
        Self(vec![Link::from(ErrorCode::from(e))])
    }
}

/// Instantiates an [`Error`] from an enum value and a string.
impl<ErrorEnum: code::AllowedErrorCodeEnum, S> std::convert::From<(ErrorEnum, S)> for Error
where
    ErrorCode: std::convert::From<ErrorEnum>,
    S: std::convert::Into<std::string::String>,
{
    fn from((e, s): (ErrorEnum, S)) -> Self {
        Self(vec![Link {
            code: ErrorCode::from(e),
            msg: Some(s.into()),
        }])
    }
}

/// Instantiates an [`Error`] from an [`ErrorCode`].
impl std::convert::From<ErrorCode> for Error {
    fn from(e: ErrorCode) -> Self {
        Self(vec![Link::from(e)])
    }
}

/// Appends an [`Error`] into the chain, using the `>>` operator.
///
/// The `>>` operator is used to easily build a chain of error:
/// `child_error -> parent_error`, where `child_error` is more precise than
/// `parent_error`.
///
/// # Example
///
/// ```
/// use awg_bridge::error::{Error, MarshalError, TunnelError};
///
/// // Creates a new Error.
/// let e = Error::from(MarshalError::MARSHALERROR_LEND_FAILED);
/// // Creates a new Error, "creation failed", and appends the previous one.
/// let e = e >> TunnelError::TUNNELERROR_CREATION_FAILED;
/// assert_eq!(e.len(), 2);
/// ```
impl<ErrorEnum: code::AllowedErrorCodeEnum> std::ops::Shr<ErrorEnum> for Error
where
    ErrorCode: std::convert::From<ErrorEnum>,
{
    type Output = Self;

    fn shr(self, e: ErrorEnum) -> Self::Output {
        let mut n = Self(self.0);
        n.0.push(Link::from(ErrorCode::from(e)));
        n
    }
}

/// Appends an [`Error`] into the chain, using the `>>` operator and a string.
impl<ErrorEnum: code::AllowedErrorCodeEnum, S> std::ops::Shr<(ErrorEnum, S)> for Error
where
    ErrorCode: std::convert::From<ErrorEnum>,
    S: std::convert::Into<std::string::String>,
{
    type Output = Self;

    fn shr(self, (e, s): (ErrorEnum, S)) -> Self::Output {
        let mut n = Self(self.0);
        n.0.push(Link {
            code: ErrorCode::from(e),
            msg: Some(s.into()),
        });
        n
    }
}

/// Appends an [`Error`] into the chain, using the `>>` operator.
impl std::ops::Shr<ErrorCode> for Error {
    type Output = Self;

    fn shr(self, e: ErrorCode) -> Self::Output {
        let mut n = Self(self.0);
        n.0.push(Link::from(e));
        n
    }
}

/// Implements [`std::fmt::Display`] for [`Error`].
impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (i, e) in self.0.iter().rev().enumerate() {
            if i > 0 {
                write!(f, ": ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

/// Implements [`std::fmt::Debug`] for [`Error`].
impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            for _ in 0..i {
                write!(f, "\t")?;
            }
            writeln!(f, "~>#{i}: {e}")?;
        }
        Ok(())
    }
}

/// Implements [`std::error::Error`] for [`Error`].
impl std::error::Error for Error {}

/// Wrap error enums to produce an [`Error`], most precise first.
///
/// # Example
///
/// ```ignore
/// let e = errors!{MarshalError::MARSHALERROR_LEND_FAILED => TunnelError::TUNNELERROR_CREATION_FAILED};
/// ```
macro_rules! errors{
    { $( $e:expr ) => * } => {
        $crate::Error::new()
        $(
            >> $e
        )*
    };
}

/// Implements [`Error`].
impl Error {
    /// Instantiates an empty [`Error`].
    pub(crate) fn new() -> Error {
        Error(std::vec::Vec::<Link>::new())
    }

    /// Returns an iterator over the [`Link`] from the chain.
    pub fn iter(&self) -> std::slice::Iter<Link> {
        self.0.iter()
    }

    /// Returns the length of the chain.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the emptiness of the chain.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the most precise error code.
    pub fn code(&self) -> Option<ErrorCode> {
        self.0.first().map(Link::code)
    }

    /// Returns true if the chain holds the given code.
    pub fn contains(&self, code: impl std::convert::Into<ErrorCode>) -> bool {
        let code = code.into();
        self.0.iter().any(|l| l.code == code)
    }

    /// Verifies that two [`Error`] share the same error codes.
    pub fn is(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| a.code == b.code)
    }
}
