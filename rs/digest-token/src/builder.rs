use std::fmt;

use chrono::{DateTime, Utc};

use crate::{Algorithm, Claims, Error, Key, Result, SignedToken, TokenType};

/// Assembles the claims of a single token and signs them.
///
/// Every setter validates its argument immediately and leaves the builder untouched on error.
/// Cross-field validation (application id and secret present) happens in [TokenBuilder::build],
/// which consumes the builder.
///
/// ```
/// use digest_token::TokenBuilder;
///
/// let mut builder = TokenBuilder::new();
/// builder
/// 	.with_application_id("my-application-id")?
/// 	.with_secret("my-secret")?
/// 	.expires_in_seconds(3600)?
/// 	.restrict_to_channel("us-northeast#my-application-id#my-channel.1345")?;
///
/// let token = builder.build()?;
/// assert_eq!(token.split('.').count(), 2);
/// # Ok::<(), digest_token::Error>(())
/// ```
#[derive(Clone, Default)]
pub struct TokenBuilder {
	application_id: Option<String>,
	secret: Option<String>,
	algorithm: Algorithm,
	claims: Claims,
}

impl TokenBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// The application the token is issued for. Required.
	pub fn with_application_id(&mut self, application_id: impl Into<String>) -> Result<&mut Self> {
		self.application_id = Some(non_empty(application_id, "application id must not be empty")?);
		Ok(self)
	}

	/// The shared secret used to sign the token. Required.
	pub fn with_secret(&mut self, secret: impl Into<String>) -> Result<&mut Self> {
		self.secret = Some(non_empty(secret, "secret must not be empty")?);
		Ok(self)
	}

	pub fn with_algorithm(&mut self, algorithm: Algorithm) -> &mut Self {
		self.algorithm = algorithm;
		self
	}

	/// Grant a capability, e.g. to publish a stream.
	pub fn with_capability(&mut self, capability: impl Into<String>) -> Result<&mut Self> {
		let capability = non_empty(capability, "capability must not be empty")?;
		self.claims.add_capability(capability);
		Ok(self)
	}

	/// Expire the token the given number of seconds from now.
	///
	/// The local clock is used as-is, so it should be synchronized.
	pub fn expires_in_seconds(&mut self, seconds: i64) -> Result<&mut Self> {
		self.expires_in_seconds_from(Utc::now().timestamp_millis(), seconds)
	}

	fn expires_in_seconds_from(&mut self, now: i64, seconds: i64) -> Result<&mut Self> {
		let expires = seconds
			.checked_mul(1000)
			.and_then(|millis| now.checked_add(millis))
			.ok_or(Error::InvalidArgument("expiration is out of range"))?;

		Ok(self.expires_at_millis(expires))
	}

	/// Expire the token at the given time.
	pub fn expires_at(&mut self, expires: DateTime<Utc>) -> &mut Self {
		self.expires_at_millis(expires.timestamp_millis())
	}

	/// Expire the token at the given time in milliseconds since the Unix epoch.
	pub fn expires_at_millis(&mut self, expires: i64) -> &mut Self {
		self.claims.set_expires(expires);
		self
	}

	pub fn restrict_to_authentication_only(&mut self) -> &mut Self {
		self.claims.set_token_type(TokenType::Authentication);
		self
	}

	pub fn restrict_to_streaming_only(&mut self) -> &mut Self {
		self.claims.set_token_type(TokenType::Streaming);
		self
	}

	pub fn restrict_to_publishing_only(&mut self) -> &mut Self {
		self.claims.set_token_type(TokenType::Publishing);
		self
	}

	pub fn restrict_to_origin_stream(&mut self, origin_stream_id: impl Into<String>) -> Result<&mut Self> {
		let id = non_empty(origin_stream_id, "origin stream id must not be empty")?;
		self.claims.set_origin_stream_id(id);
		Ok(self)
	}

	/// Shorthand for requiring the `channelId:<channel_id>` tag.
	pub fn restrict_to_channel(&mut self, channel_id: impl Into<String>) -> Result<&mut Self> {
		let channel_id = non_empty(channel_id, "channel id must not be empty")?;
		self.restrict_to_tag(format!("channelId:{channel_id}"))
	}

	/// Shorthand for requiring the `channelAlias:<alias>` tag.
	pub fn restrict_to_channel_alias(&mut self, alias: impl Into<String>) -> Result<&mut Self> {
		let alias = non_empty(alias, "channel alias must not be empty")?;
		self.restrict_to_tag(format!("channelAlias:{alias}"))
	}

	/// Require the origin stream to carry this tag. Replaces any previously required tag.
	pub fn restrict_to_tag(&mut self, tag: impl Into<String>) -> Result<&mut Self> {
		let tag = non_empty(tag, "tag must not be empty")?;
		self.claims.set_required_tag(tag);
		Ok(self)
	}

	/// Add a tag to the stream when it gets set up.
	pub fn apply_tag(&mut self, tag: impl Into<String>) -> Result<&mut Self> {
		let tag = non_empty(tag, "tag must not be empty")?;
		self.claims.add_apply_tag(tag);
		Ok(self)
	}

	pub fn claims(&self) -> &Claims {
		&self.claims
	}

	/// Sign the claims, returning the token.
	pub fn sign(self) -> Result<SignedToken> {
		let application_id = self.application_id.ok_or(Error::IllegalState("application id"))?;
		let secret = self.secret.ok_or(Error::IllegalState("secret"))?;

		let key = Key::with_algorithm(application_id, secret, self.algorithm)?;
		SignedToken::sign(&key, &self.claims)
	}

	/// Sign the claims, returning the token string.
	pub fn build(self) -> Result<String> {
		Ok(self.sign()?.to_string())
	}
}

impl fmt::Debug for TokenBuilder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TokenBuilder")
			.field("application_id", &self.application_id)
			.field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
			.field("algorithm", &self.algorithm)
			.field("claims", &self.claims)
			.finish()
	}
}

fn non_empty(value: impl Into<String>, message: &'static str) -> Result<String> {
	let value = value.into();
	if value.is_empty() {
		return Err(Error::InvalidArgument(message));
	}
	Ok(value)
}
