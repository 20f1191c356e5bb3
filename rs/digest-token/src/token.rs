use std::{fmt, str::FromStr};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;

use crate::{Claims, Error, Key, Result};

/// Separates the signature from the payload. Not part of the base64url alphabet.
pub const SEPARATOR: char = '.';

/// A signature over the canonical payload bytes.
///
/// The string form is `base64url(signature) "." base64url(payload)`, both unpadded.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SignedToken {
	signature: Vec<u8>,
	payload: Vec<u8>,
}

impl SignedToken {
	/// Encode the claims and sign them with the key.
	pub fn sign(key: &Key, claims: &Claims) -> Result<Self> {
		let payload = claims.to_vec()?;
		let signature = key.sign(&payload);

		tracing::debug!(application_id = key.application_id(), algorithm = %key.algorithm(), "signed token");

		Ok(Self { signature, payload })
	}

	pub fn signature(&self) -> &[u8] {
		&self.signature
	}

	pub fn payload(&self) -> &[u8] {
		&self.payload
	}

	/// Decode the claims WITHOUT checking the signature.
	pub fn claims(&self) -> Result<Claims> {
		Claims::from_slice(&self.payload).map_err(|err| Error::MalformedToken(err.to_string()))
	}

	/// Check the signature and expiration against the current time.
	pub fn verify(&self, key: &Key) -> Result<Claims> {
		self.verify_at(key, Utc::now().timestamp_millis())
	}

	/// Check the signature, then the expiration against `now` in epoch milliseconds.
	pub fn verify_at(&self, key: &Key, now: i64) -> Result<Claims> {
		if let Err(err) = key.verify(&self.payload, &self.signature) {
			tracing::debug!(application_id = key.application_id(), "token signature mismatch");
			return Err(err);
		}

		let claims = self.claims()?;

		match claims.expires() {
			Some(expires) if now > expires => {
				tracing::debug!(application_id = key.application_id(), expires, now, "token expired");
				Err(Error::Expired { expires })
			}
			_ => Ok(claims),
		}
	}
}

impl fmt::Display for SignedToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}{}{}",
			URL_SAFE_NO_PAD.encode(&self.signature),
			SEPARATOR,
			URL_SAFE_NO_PAD.encode(&self.payload)
		)
	}
}

impl FromStr for SignedToken {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		let (signature, payload) = s
			.split_once(SEPARATOR)
			.ok_or_else(|| Error::MalformedToken("missing separator".to_string()))?;

		if payload.contains(SEPARATOR) {
			return Err(Error::MalformedToken("too many segments".to_string()));
		}

		if signature.is_empty() || payload.is_empty() {
			return Err(Error::MalformedToken("empty segment".to_string()));
		}

		Ok(Self {
			signature: URL_SAFE_NO_PAD.decode(signature)?,
			payload: URL_SAFE_NO_PAD.decode(payload)?,
		})
	}
}

/// Sign the claims, returning the token string.
pub fn sign(key: &Key, claims: &Claims) -> Result<String> {
	Ok(SignedToken::sign(key, claims)?.to_string())
}

/// Parse and verify a token string, returning its claims.
pub fn verify(token: &str, key: &Key) -> Result<Claims> {
	token.parse::<SignedToken>()?.verify(key)
}

/// Like [verify] but with an explicit clock reading in epoch milliseconds.
pub fn verify_at(token: &str, key: &Key, now: i64) -> Result<Claims> {
	token.parse::<SignedToken>()?.verify_at(key, now)
}

/// Parse a token string and return its claims WITHOUT checking the signature.
pub fn decode(token: &str) -> Result<Claims> {
	token.parse::<SignedToken>()?.claims()
}
