// Copyright (c) SandboxAQ. All rights reserved.
// SPDX-License-Identifier: AGPL-3.0-only

//! Defines [`ErrorCode`] enum and [`AllowedErrorCodeEnum`] trait.
//!
//! Errors are classified by kind. The [`ErrorKind`] enum lists all error
//! kinds, and each kind owns an enum of codes. Every code maps to a stable
//! `(kind, code)` pair of integers so it can be logged or handed to a caller
//! that only understands primitives.

/// An enum allowed in [`ErrorCode`].
pub trait AllowedErrorCodeEnum: Copy + Clone + Sized {}

/// Generates the error kinds, the error enums and the definition of
/// [`ErrorCode`], together with the implementations of the following traits:
///
///   * `std::convert::From<ErrorEnum>` for each error enum.
///   * `std::fmt::Display` for [`ErrorCode`].
///   * `std::convert::From<ErrorCode>` for `(i32, i32)`.
///
/// This macro accepts a variadic list of dictionaries ({}) as input.
/// Dictionaries MUST respect the following format:
///
/// ```text
///   {
///     kind: KIND = KIND_VALUE,
///     sym: SYM,
///     desc: ESTR,
///     values: [
///        VALUE_SYM = VALUE => VALUE_STR,
///        …
///     ],
///   },
///   …
/// ```
///
/// `KIND` is the kind of error, and `KIND_VALUE` its integer value.
/// `SYM` is the name of the enum to generate.
/// `ESTR` is the string description of the error kind.
/// `VALUE_SYM` is the enum value symbol, `VALUE` its integer value.
/// `VALUE_STR` is the string description of the enum value.
macro_rules! GenErrorCode {
    ( $( {kind: $kind:ident = $kval:expr, sym: $sym:ident, desc: $desc:expr, values: [$( $vsym:ident = $vval:expr => $vstr:expr,)*], },) *) => {
        /// The kind of an error.
        #[allow(non_camel_case_types)]
        #[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
        #[repr(i32)]
        pub enum ErrorKind {
            $(
                #[doc=$desc]
                $kind = $kval,
            )*
        }

        /// Implements [`ErrorKind`].
        impl ErrorKind {
            /// Returns the integer value of the kind.
            pub fn value(self) -> i32 {
                self as i32
            }
        }

        $(
            #[doc=$desc]
            #[allow(non_camel_case_types)]
            #[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
            #[repr(i32)]
            pub enum $sym {
                $(
                    #[doc=$vstr]
                    $vsym = $vval,
                )*
            }

            /// Implements the error enum.
            impl $sym {
                /// Returns the integer value of the code.
                pub fn value(self) -> i32 {
                    self as i32
                }

                /// Returns the kind this enum belongs to.
                pub fn kind() -> ErrorKind {
                    ErrorKind::$kind
                }
            }

            /// Implements `[std::convert::From<ErrorEnum>]` for [`ErrorCode`].
            impl std::convert::From<$sym> for ErrorCode {
                fn from(v: $sym) -> Self {
                    Self::$sym(v)
                }
            }

            /// Adds `ErrorEnum` to the list of [`AllowedErrorCodeEnum`] trait.
            impl AllowedErrorCodeEnum for $sym {}

            /// Implements comparison operator between [`ErrorCode`] and the current error enum.
            impl PartialEq<ErrorCode> for $sym {
                fn eq(&self, other: &ErrorCode) -> bool {
                    match other {
                        ErrorCode::$sym(ec) => ec == self,
                        #[allow(unreachable_patterns)]
                        _ => false,
                    }
                }
            }
        )*

        /// An error code.
        /// An error code holds one of the error enums listed in [`ErrorKind`].
        #[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
        pub enum ErrorCode {
            $(
                #[doc=$desc]
                $sym($sym),
            )*
        }

        /// Implements [`ErrorCode`].
        impl ErrorCode {
            /// Returns the kind of the error code.
            pub fn kind(&self) -> ErrorKind {
                match self {
                    $(
                        ErrorCode::$sym(_) => ErrorKind::$kind,
                    )*
                }
            }
        }

        /// Implements [`std::fmt::Display`] for [`ErrorCode`].
        impl std::fmt::Display for ErrorCode {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                match *self {
                    $(
                        ErrorCode::$sym(e) => write!(f, "{}: {}", $desc, match e {
                            $(
                                $sym::$vsym => $vstr,
                            )*
                        }),
                    )*
                }
            }
        }

        /// Implements [`std::convert::From<ErrorCode>`] for `(i32, i32)`.
        /// The first `i32` is the error kind, the second one is the error code.
        impl std::convert::From<ErrorCode> for (i32, i32) {
            fn from(ec: ErrorCode) -> Self {
                match ec {
                    $(
                        ErrorCode::$sym(e) => (ErrorKind::$kind.value(), e.value()),
                    )*
                }
            }
        }

    };
}

GenErrorCode!(
    {
        kind: ERRORKIND_MARSHAL = 1,
        sym: MarshalError,
        desc: "marshalling error",
        values: [
            MARSHALERROR_LEND_FAILED = 0 => "caller string could not be lent",
            MARSHALERROR_TOO_LONG = 1 => "string length does not fit the engine ABI",
        ],
    },
    {
        kind: ERRORKIND_TUNNEL = 2,
        sym: TunnelError,
        desc: "tunnel error",
        values: [
            TUNNELERROR_CREATION_FAILED = 0 => "engine refused to bring the tunnel up",
            TUNNELERROR_NOT_FOUND = 1 => "engine returned no data",
        ],
    },
    {
        kind: ERRORKIND_SOCKET = 3,
        sym: SocketError,
        desc: "socket error",
        values: [
            SOCKETERROR_UNBOUND = 0 => "socket is not bound",
        ],
    },
    {
        kind: ERRORKIND_HANDSHAKE = 4,
        sym: HandshakeError,
        desc: "handshake error",
        values: [
            HANDSHAKEERROR_NONE = 0 => "no handshake yet",
            HANDSHAKEERROR_INVALID = 1 => "engine reported an invalid handshake time",
        ],
    },
    {
        kind: ERRORKIND_UAPI = 5,
        sym: UapiError,
        desc: "UAPI error",
        values: [
            UAPIERROR_MALFORMED = 0 => "malformed line",
            UAPIERROR_INVALID_KEY = 1 => "invalid public key",
        ],
    },
    {
        kind: ERRORKIND_AUX_CONFIG = 6,
        sym: AuxConfigError,
        desc: "auxiliary configuration error",
        values: [
            AUXCONFIGERROR_NO_ENDPOINT = 0 => "no endpoint host",
            AUXCONFIGERROR_SERIALIZATION = 1 => "serialization failed",
        ],
    },
);

impl<T: AllowedErrorCodeEnum> PartialEq<T> for ErrorCode
where
    ErrorCode: From<T>,
{
    fn eq(&self, other: &T) -> bool {
        *self == ErrorCode::from(*other)
    }
}

impl PartialEq<&ErrorCode> for ErrorCode {
    fn eq(&self, other: &&Self) -> bool {
        *self == **other
    }
}

impl PartialEq<ErrorCode> for &ErrorCode {
    fn eq(&self, other: &ErrorCode) -> bool {
        **self == *other
    }
}
