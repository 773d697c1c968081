//! Verified claim payloads and typed accessors for the claims Rownd issues.

// std
use std::fmt::{Display, Formatter, Result as FmtResult};
// crates.io
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
// self
use crate::_prelude::*;

/// Namespace prefix of the Rownd-specific claims.
pub const CLAIM_NAMESPACE: &str = "https://auth.rownd.io/";
/// Claim carrying the Rownd user id.
pub const CLAIM_APP_USER_ID: &str = "https://auth.rownd.io/app_user_id";
/// Claim telling whether the user verified an identifier.
pub const CLAIM_IS_VERIFIED_USER: &str = "https://auth.rownd.io/is_verified_user";
/// Claim telling whether the user is anonymous.
pub const CLAIM_IS_ANONYMOUS: &str = "https://auth.rownd.io/is_anonymous";
/// Claim carrying the authentication level.
pub const CLAIM_AUTH_LEVEL: &str = "https://auth.rownd.io/auth_level";

const AUDIENCE_APP_PREFIX: &str = "app:";

/// How strongly the user behind a token has been authenticated.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AuthLevel {
	/// Signed in without an identifier, e.g. a passkey-less instant user.
	Instant,
	/// Identifier supplied but not yet verified.
	Unverified,
	/// Guest session.
	Guest,
	/// Identifier verified.
	Verified,
	/// A level this SDK does not know yet.
	Other(String),
}
impl AuthLevel {
	/// Wire representation.
	pub fn as_str(&self) -> &str {
		match self {
			Self::Instant => "instant",
			Self::Unverified => "unverified",
			Self::Guest => "guest",
			Self::Verified => "verified",
			Self::Other(level) => level,
		}
	}
}
impl From<&str> for AuthLevel {
	fn from(value: &str) -> Self {
		match value {
			"instant" => Self::Instant,
			"unverified" => Self::Unverified,
			"guest" => Self::Guest,
			"verified" => Self::Verified,
			other => Self::Other(other.to_owned()),
		}
	}
}
impl Display for AuthLevel {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// A token's claim payload.
///
/// The issuer may add claims at any time, so the payload is kept as an open mapping. Accessors
/// return `None` when a claim is absent or has an unexpected type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet(Map<String, Value>);
impl ClaimSet {
	/// Raw value of any claim.
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.0.get(name)
	}

	/// Whole payload.
	pub fn as_map(&self) -> &Map<String, Value> {
		&self.0
	}

	/// Consume into the underlying mapping.
	pub fn into_map(self) -> Map<String, Value> {
		self.0
	}

	/// Rownd user id.
	pub fn app_user_id(&self) -> Option<&str> {
		self.str_claim(CLAIM_APP_USER_ID)
	}

	/// Whether the user verified an email address or phone number.
	pub fn is_verified_user(&self) -> Option<bool> {
		self.get(CLAIM_IS_VERIFIED_USER).and_then(Value::as_bool)
	}

	/// Whether the session belongs to an anonymous user.
	pub fn is_anonymous(&self) -> Option<bool> {
		self.get(CLAIM_IS_ANONYMOUS).and_then(Value::as_bool)
	}

	/// Authentication level.
	pub fn auth_level(&self) -> Option<AuthLevel> {
		self.str_claim(CLAIM_AUTH_LEVEL).map(AuthLevel::from)
	}

	/// `sub` claim.
	pub fn subject(&self) -> Option<&str> {
		self.str_claim("sub")
	}

	/// `iss` claim.
	pub fn issuer(&self) -> Option<&str> {
		self.str_claim("iss")
	}

	/// `jti` claim.
	pub fn jwt_id(&self) -> Option<&str> {
		self.str_claim("jti")
	}

	/// `aud` claim, which may be a single string or a list.
	pub fn audiences(&self) -> Vec<&str> {
		match self.get("aud") {
			Some(Value::String(aud)) => vec![aud.as_str()],
			Some(Value::Array(auds)) => auds.iter().filter_map(Value::as_str).collect(),
			_ => Vec::new(),
		}
	}

	/// Application id taken from the first `app:<id>` audience.
	pub fn app_id(&self) -> Option<&str> {
		self.audiences()
			.into_iter()
			.find_map(|aud| aud.strip_prefix(AUDIENCE_APP_PREFIX))
			.filter(|app_id| !app_id.is_empty())
	}

	/// `exp` as a UTC timestamp.
	pub fn expires_at(&self) -> Option<DateTime<Utc>> {
		self.timestamp_claim("exp")
	}

	/// `iat` as a UTC timestamp.
	pub fn issued_at(&self) -> Option<DateTime<Utc>> {
		self.timestamp_claim("iat")
	}

	fn str_claim(&self, name: &str) -> Option<&str> {
		self.get(name).and_then(Value::as_str)
	}

	fn timestamp_claim(&self, name: &str) -> Option<DateTime<Utc>> {
		let value = self.get(name)?;
		let seconds = value.as_i64().or_else(|| value.as_f64().map(|secs| secs.trunc() as i64))?;

		DateTime::from_timestamp(seconds, 0)
	}
}
impl From<Map<String, Value>> for ClaimSet {
	fn from(map: Map<String, Value>) -> Self {
		Self(map)
	}
}

/// A token that passed every verification step, together with its claims.
///
/// Only the verifier constructs this type.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedToken {
	claims: ClaimSet,
	access_token: String,
}
impl ValidatedToken {
	pub(crate) fn new(claims: ClaimSet, access_token: impl Into<String>) -> Self {
		Self { claims, access_token: access_token.into() }
	}

	/// Verified claims.
	pub fn claims(&self) -> &ClaimSet {
		&self.claims
	}

	/// The token exactly as presented.
	pub fn access_token(&self) -> &str {
		&self.access_token
	}

	/// Split into claims and token.
	pub fn into_parts(self) -> (ClaimSet, String) {
		(self.claims, self.access_token)
	}
}
