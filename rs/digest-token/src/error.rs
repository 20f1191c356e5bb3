use std::sync::Arc;

/// Everything that can go wrong while assembling, signing or verifying a token.
///
/// Verification failures are kept apart on purpose: a caller needs to tell a forged or
/// mis-keyed token ([Error::SignatureMismatch]) from a genuine one that has run out of
/// time ([Error::Expired]) and from input that was never a token ([Error::MalformedToken]).
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
	#[error("invalid argument: {0}")]
	InvalidArgument(&'static str),

	#[error("illegal state: {0} was never set")]
	IllegalState(&'static str),

	#[error("malformed token: {0}")]
	MalformedToken(String),

	#[error("signature mismatch")]
	SignatureMismatch,

	#[error("token expired at {expires}")]
	Expired { expires: i64 },

	#[error("unknown algorithm: {0}")]
	UnknownAlgorithm(String),

	#[error("json error: {0}")]
	Json(Arc<serde_json::Error>),
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Error::Json(Arc::new(err))
	}
}

impl From<base64::DecodeError> for Error {
	fn from(err: base64::DecodeError) -> Self {
		Error::MalformedToken(err.to_string())
	}
}

pub type Result<T> = std::result::Result<T, Error>;
