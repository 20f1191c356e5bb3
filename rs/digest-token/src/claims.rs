use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Result;

/// Restricts what a token may be used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenType {
	#[serde(rename = "auth")]
	Authentication,
	#[serde(rename = "stream")]
	Streaming,
	#[serde(rename = "publish")]
	Publishing,
}

impl TokenType {
	pub fn as_str(&self) -> &'static str {
		match self {
			TokenType::Authentication => "auth",
			TokenType::Streaming => "stream",
			TokenType::Publishing => "publish",
		}
	}
}

impl fmt::Display for TokenType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(field_identifier, rename_all = "camelCase")]
enum Field {
	Expires,
	Type,
	OriginStreamId,
	RequiredTag,
	Capabilities,
	ApplyTags,
}

impl Field {
	const fn name(self) -> &'static str {
		match self {
			Field::Expires => "expires",
			Field::Type => "type",
			Field::OriginStreamId => "originStreamId",
			Field::RequiredTag => "requiredTag",
			Field::Capabilities => "capabilities",
			Field::ApplyTags => "applyTags",
		}
	}
}

/// The payload of a digest token.
///
/// Single-valued fields (`expires`, `type`, `originStreamId`, `requiredTag`) are overwritten
/// when set again, while `capabilities` and `applyTags` only ever grow.
///
/// The encoded form is order sensitive, since the signature covers the exact bytes.
/// Single-valued fields are encoded in the order they were first set, followed by
/// `capabilities` and then `applyTags` when they are non-empty.
/// Claims decoded from a token remember the order they were read in, so they encode back
/// to the same bytes.
#[derive(Clone, Debug, Default)]
pub struct Claims {
	expires: Option<i64>,
	token_type: Option<TokenType>,
	origin_stream_id: Option<String>,
	required_tag: Option<String>,
	capabilities: Vec<String>,
	apply_tags: Vec<String>,

	order: Vec<Field>,
}

impl Claims {
	/// The expiration as milliseconds since the Unix epoch.
	pub fn expires(&self) -> Option<i64> {
		self.expires
	}

	pub fn expires_at(&self) -> Option<DateTime<Utc>> {
		self.expires.and_then(DateTime::from_timestamp_millis)
	}

	pub fn token_type(&self) -> Option<TokenType> {
		self.token_type
	}

	pub fn origin_stream_id(&self) -> Option<&str> {
		self.origin_stream_id.as_deref()
	}

	pub fn required_tag(&self) -> Option<&str> {
		self.required_tag.as_deref()
	}

	pub fn capabilities(&self) -> &[String] {
		&self.capabilities
	}

	pub fn apply_tags(&self) -> &[String] {
		&self.apply_tags
	}

	/// Returns true if the token has an expiration and `now` (epoch millis) is past it.
	pub fn is_expired_at(&self, now: i64) -> bool {
		self.expires.is_some_and(|expires| now > expires)
	}

	pub(crate) fn set_expires(&mut self, millis: i64) {
		self.expires = Some(millis);
		self.touch(Field::Expires);
	}

	pub(crate) fn set_token_type(&mut self, token_type: TokenType) {
		self.token_type = Some(token_type);
		self.touch(Field::Type);
	}

	pub(crate) fn set_origin_stream_id(&mut self, id: String) {
		self.origin_stream_id = Some(id);
		self.touch(Field::OriginStreamId);
	}

	pub(crate) fn set_required_tag(&mut self, tag: String) {
		self.required_tag = Some(tag);
		self.touch(Field::RequiredTag);
	}

	pub(crate) fn add_capability(&mut self, capability: String) {
		self.capabilities.push(capability);
	}

	pub(crate) fn add_apply_tag(&mut self, tag: String) {
		self.apply_tags.push(tag);
	}

	/// Parse claims from the canonical JSON bytes.
	pub fn from_slice(v: &[u8]) -> Result<Self> {
		Ok(serde_json::from_slice(v)?)
	}

	/// Serialize the claims to the canonical JSON bytes.
	pub fn to_vec(&self) -> Result<Vec<u8>> {
		Ok(serde_json::to_vec(self)?)
	}

	fn touch(&mut self, field: Field) {
		if !self.order.contains(&field) {
			self.order.push(field);
		}
	}

	// The order fields are encoded in.
	fn fields(&self) -> impl Iterator<Item = Field> + '_ {
		let trailing = [Field::Capabilities, Field::ApplyTags]
			.into_iter()
			.filter(move |field| !self.order.contains(field))
			.filter(move |field| match field {
				Field::Capabilities => !self.capabilities.is_empty(),
				Field::ApplyTags => !self.apply_tags.is_empty(),
				_ => false,
			});

		self.order.iter().copied().chain(trailing)
	}
}

impl PartialEq for Claims {
	fn eq(&self, other: &Self) -> bool {
		self.expires == other.expires
			&& self.token_type == other.token_type
			&& self.origin_stream_id == other.origin_stream_id
			&& self.required_tag == other.required_tag
			&& self.capabilities == other.capabilities
			&& self.apply_tags == other.apply_tags
			&& self.fields().eq(other.fields())
	}
}

impl Eq for Claims {}

impl Serialize for Claims {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		let fields: Vec<Field> = self.fields().collect();
		let mut map = serializer.serialize_map(Some(fields.len()))?;

		for field in fields {
			let name = field.name();
			match field {
				Field::Expires => map.serialize_entry(name, &self.expires)?,
				Field::Type => map.serialize_entry(name, &self.token_type)?,
				Field::OriginStreamId => map.serialize_entry(name, &self.origin_stream_id)?,
				Field::RequiredTag => map.serialize_entry(name, &self.required_tag)?,
				Field::Capabilities => map.serialize_entry(name, &self.capabilities)?,
				Field::ApplyTags => map.serialize_entry(name, &self.apply_tags)?,
			}
		}

		map.end()
	}
}

impl<'de> Deserialize<'de> for Claims {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		deserializer.deserialize_map(ClaimsVisitor)
	}
}

struct ClaimsVisitor;

impl<'de> Visitor<'de> for ClaimsVisitor {
	type Value = Claims;

	fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str("a claims object")
	}

	fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Claims, A::Error> {
		let mut claims = Claims::default();

		while let Some(field) = map.next_key::<Field>()? {
			if claims.order.contains(&field) {
				return Err(de::Error::duplicate_field(field.name()));
			}
			claims.order.push(field);

			match field {
				Field::Expires => claims.expires = Some(map.next_value()?),
				Field::Type => claims.token_type = Some(map.next_value()?),
				Field::OriginStreamId => claims.origin_stream_id = Some(map.next_value()?),
				Field::RequiredTag => claims.required_tag = Some(map.next_value()?),
				Field::Capabilities => claims.capabilities = map.next_value()?,
				Field::ApplyTags => claims.apply_tags = map.next_value()?,
			}
		}

		Ok(claims)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn encode(claims: &Claims) -> String {
		String::from_utf8(claims.to_vec().unwrap()).unwrap()
	}

	#[test]
	fn test_empty() {
		assert_eq!(encode(&Claims::default()), "{}");
	}

	#[test]
	fn test_insertion_order() {
		let mut claims = Claims::default();
		claims.set_required_tag("channelId:abc".to_string());
		claims.set_expires(1_000);
		claims.set_token_type(TokenType::Streaming);

		assert_eq!(
			encode(&claims),
			r#"{"requiredTag":"channelId:abc","expires":1000,"type":"stream"}"#
		);
	}

	#[test]
	fn test_overwrite_keeps_position() {
		let mut claims = Claims::default();
		claims.set_expires(1_000);
		claims.set_required_tag("a".to_string());
		claims.set_expires(2_000);
		claims.set_required_tag("b".to_string());

		assert_eq!(encode(&claims), r#"{"expires":2000,"requiredTag":"b"}"#);
		assert_eq!(claims.expires(), Some(2_000));
		assert_eq!(claims.required_tag(), Some("b"));
	}

	#[test]
	fn test_lists_trail() {
		let mut claims = Claims::default();
		claims.add_apply_tag("customer:1234".to_string());
		claims.add_capability("streaming".to_string());
		claims.set_origin_stream_id("origin".to_string());
		claims.add_capability("hd".to_string());

		assert_eq!(
			encode(&claims),
			r#"{"originStreamId":"origin","capabilities":["streaming","hd"],"applyTags":["customer:1234"]}"#
		);
	}

	#[test]
	fn test_decode_preserves_order() {
		let json = r#"{"applyTags":["x"],"type":"publish","expires":42,"capabilities":[]}"#;
		let claims = Claims::from_slice(json.as_bytes()).unwrap();

		assert_eq!(claims.token_type(), Some(TokenType::Publishing));
		assert_eq!(claims.expires(), Some(42));
		assert_eq!(claims.apply_tags(), ["x".to_string()]);
		assert!(claims.capabilities().is_empty());
		assert_eq!(encode(&claims), json);
	}

	#[test]
	fn test_decode_equals_built() {
		let mut claims = Claims::default();
		claims.set_expires(7);
		claims.add_capability("a".to_string());

		let decoded = Claims::from_slice(&claims.to_vec().unwrap()).unwrap();
		assert_eq!(decoded, claims);
	}

	#[test]
	fn test_order_matters_for_equality() {
		let a = Claims::from_slice(br#"{"expires":1,"type":"auth"}"#).unwrap();
		let b = Claims::from_slice(br#"{"type":"auth","expires":1}"#).unwrap();
		assert_ne!(a, b);
	}

	#[test]
	fn test_decode_rejects_duplicate() {
		assert!(Claims::from_slice(br#"{"expires":1,"expires":2}"#).is_err());
	}

	#[test]
	fn test_decode_rejects_unknown() {
		assert!(Claims::from_slice(br#"{"applicationId":"app"}"#).is_err());
		assert!(Claims::from_slice(br#"{"type":"admin"}"#).is_err());
		assert!(Claims::from_slice(br#"{"expires":"soon"}"#).is_err());
		assert!(Claims::from_slice(br#"[]"#).is_err());
	}

	#[test]
	fn test_token_type_literals() {
		assert_eq!(TokenType::Authentication.as_str(), "auth");
		assert_eq!(TokenType::Streaming.as_str(), "stream");
		assert_eq!(TokenType::Publishing.as_str(), "publish");
		assert_eq!(serde_json::to_string(&TokenType::Publishing).unwrap(), r#""publish""#);
	}

	#[test]
	fn test_is_expired_at() {
		let mut claims = Claims::default();
		assert!(!claims.is_expired_at(i64::MAX));

		claims.set_expires(1_000);
		assert!(!claims.is_expired_at(999));
		assert!(!claims.is_expired_at(1_000));
		assert!(claims.is_expired_at(1_001));
	}

	#[test]
	fn test_expires_at() {
		let mut claims = Claims::default();
		claims.set_expires(1_700_000_000_123);
		assert_eq!(claims.expires_at().unwrap().timestamp_millis(), 1_700_000_000_123);
	}
}
