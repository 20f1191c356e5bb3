use std::path::Path;

use anyhow::Context;
use digest_token::{Algorithm, Key};
use serde::{Deserialize, Serialize};

/// The contents of the `--config` file.
///
/// ```toml
/// [credentials]
/// application_id = "my-application-id"
/// secret = "my-secret"
/// algorithm = "HS256"
/// ```
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
	pub credentials: CredentialsConfig,
}

impl Config {
	pub fn load(path: &Path) -> anyhow::Result<Self> {
		let contents =
			std::fs::read_to_string(path).with_context(|| format!("failed to read config: {}", path.display()))?;
		let config = Self::parse(&contents).with_context(|| format!("failed to parse config: {}", path.display()))?;

		tracing::debug!(path = %path.display(), "loaded config");

		Ok(config)
	}

	pub fn parse(contents: &str) -> anyhow::Result<Self> {
		Ok(toml::from_str(contents)?)
	}
}

#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct CredentialsConfig {
	pub application_id: Option<String>,
	pub secret: Option<String>,
	pub algorithm: Option<Algorithm>,
}

impl CredentialsConfig {
	/// Fill in anything missing from `fallback`.
	pub fn or(self, fallback: CredentialsConfig) -> CredentialsConfig {
		CredentialsConfig {
			application_id: self.application_id.or(fallback.application_id),
			secret: self.secret.or(fallback.secret),
			algorithm: self.algorithm.or(fallback.algorithm),
		}
	}

	pub fn key(&self) -> anyhow::Result<Key> {
		let application_id = self.application_id.as_deref().context("missing --applicationId")?;
		let secret = self.secret.as_deref().context("missing --secret")?;
		let algorithm = self.algorithm.unwrap_or_default();

		Ok(Key::with_algorithm(application_id, secret, algorithm)?)
	}
}
