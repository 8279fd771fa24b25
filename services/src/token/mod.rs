//! Attendance token lifecycle.
//!
//! A token is a compact HS512 JWT carrying [`AttendanceClaims`]. The
//! [`TokenCodec`] owns the process signing key, the [`TokenIssuer`] mints
//! session-scoped tokens and the [`TokenValidator`] checks signature, purpose
//! and expiry, in that order.

pub mod claims;
pub mod codec;
pub mod issuer;
pub mod validator;

pub use claims::{ATTENDANCE_PURPOSE, AttendanceClaims};
pub use codec::{CodecError, SignatureError, TokenCodec};
pub use issuer::{IssuedToken, TokenIssuer};
pub use validator::{TokenRejection, TokenValidator};
