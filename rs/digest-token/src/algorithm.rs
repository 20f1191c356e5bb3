use std::{fmt, str::FromStr};

use aws_lc_rs::hmac;
use serde::{Deserialize, Serialize};

use crate::Error;

/// The keyed hash used to sign the payload.
///
/// The token itself doesn't carry the algorithm, so the issuer and verifier must agree on it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
	#[default]
	HS256,
	HS384,
	HS512,
}

impl Algorithm {
	pub(crate) fn hmac(self) -> hmac::Algorithm {
		match self {
			Algorithm::HS256 => hmac::HMAC_SHA256,
			Algorithm::HS384 => hmac::HMAC_SHA384,
			Algorithm::HS512 => hmac::HMAC_SHA512,
		}
	}

	/// The length of a signature in bytes.
	pub fn signature_len(self) -> usize {
		match self {
			Algorithm::HS256 => 32,
			Algorithm::HS384 => 48,
			Algorithm::HS512 => 64,
		}
	}
}

impl FromStr for Algorithm {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_uppercase().as_str() {
			"HS256" => Ok(Algorithm::HS256),
			"HS384" => Ok(Algorithm::HS384),
			"HS512" => Ok(Algorithm::HS512),
			_ => Err(Error::UnknownAlgorithm(s.to_string())),
		}
	}
}

impl fmt::Display for Algorithm {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Algorithm::HS256 => write!(f, "HS256"),
			Algorithm::HS384 => write!(f, "HS384"),
			Algorithm::HS512 => write!(f, "HS512"),
		}
	}
}
