use std::fmt;

use aws_lc_rs::hmac;

use crate::{Algorithm, Error, Result};

/// The shared secret of an application, used to sign and verify its tokens.
///
/// The application id isn't mixed into the signature; it travels with the key so a verifier
/// knows which application's secret it is holding.
#[derive(Clone)]
pub struct Key {
	application_id: String,
	algorithm: Algorithm,
	inner: hmac::Key,
}

impl Key {
	/// Create a key using the default algorithm ([Algorithm::HS256]).
	pub fn new(application_id: impl Into<String>, secret: impl AsRef<str>) -> Result<Self> {
		Self::with_algorithm(application_id, secret, Algorithm::default())
	}

	pub fn with_algorithm(application_id: impl Into<String>, secret: impl AsRef<str>, algorithm: Algorithm) -> Result<Self> {
		let application_id = application_id.into();
		if application_id.is_empty() {
			return Err(Error::InvalidArgument("application id must not be empty"));
		}

		let secret = secret.as_ref();
		if secret.is_empty() {
			return Err(Error::InvalidArgument("secret must not be empty"));
		}

		Ok(Self {
			application_id,
			algorithm,
			inner: hmac::Key::new(algorithm.hmac(), secret.as_bytes()),
		})
	}

	pub fn application_id(&self) -> &str {
		&self.application_id
	}

	pub fn algorithm(&self) -> Algorithm {
		self.algorithm
	}

	pub(crate) fn sign(&self, payload: &[u8]) -> Vec<u8> {
		hmac::sign(&self.inner, payload).as_ref().to_vec()
	}

	/// Constant-time comparison of the expected signature against the provided one.
	pub(crate) fn verify(&self, payload: &[u8], signature: &[u8]) -> Result<()> {
		hmac::verify(&self.inner, payload, signature).map_err(|_| Error::SignatureMismatch)
	}
}

impl fmt::Debug for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Key")
			.field("application_id", &self.application_id)
			.field("algorithm", &self.algorithm)
			.field("secret", &"[REDACTED]")
			.finish()
	}
}
