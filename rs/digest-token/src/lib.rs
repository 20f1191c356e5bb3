//! Digest token generation and validation.
//!
//! A digest token authorizes access to streams and channels without a round-trip to the platform.
//! It is the HMAC of a small JSON payload keyed with the application's secret, followed by the payload:
//! `base64url(signature) "." base64url(payload)`.
//!
//! Use [TokenBuilder] to issue a token, and [verify] (or [SignedToken::verify]) to check one.
//! See [Claims] for the payload and [Key] for the signing key.

mod algorithm;
mod builder;
mod claims;
mod error;
mod key;
mod token;

pub use algorithm::*;
pub use builder::*;
pub use claims::*;
pub use error::*;
pub use key::*;
pub use token::*;
