//! Published signing keys: records, the key set, Ed25519 decoding and the cached resolver.

// std
use std::fmt::{Debug, Formatter, Result as FmtResult};
// crates.io
use base64::prelude::*;
use jsonwebtoken::DecodingKey;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;
// self
use crate::{
	_prelude::*,
	cache::manager::{Lookup, TtlCache},
	config::ClientConfig,
	http::client::fetch_json,
	metrics::{Resource, VerifierMetrics},
};

/// Length of an Ed25519 public key.
pub const ED25519_PUBLIC_KEY_LEN: usize = 32;
/// Curve name published for Ed25519 keys.
pub const ED25519_CURVE: &str = "Ed25519";

/// One entry of the issuer's published key set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SigningKeyRecord {
	/// Key identifier matched against the token header.
	#[serde(default)]
	pub kid: Option<String>,
	/// Key type, `OKP` for Edwards-curve keys.
	#[serde(default)]
	pub kty: Option<String>,
	/// Curve name.
	#[serde(default)]
	pub crv: Option<String>,
	/// Signature algorithm, `EdDSA` for Ed25519.
	#[serde(default)]
	pub alg: Option<String>,
	/// Intended use, normally `sig`.
	#[serde(default, rename = "use")]
	pub key_use: Option<String>,
	/// Base64url public coordinate.
	#[serde(default)]
	pub x: Option<String>,
	/// Fields not modelled above.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// The issuer's current signing keys, in published order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KeySet {
	/// Published key records.
	pub keys: Vec<SigningKeyRecord>,
	/// Fields not modelled above.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}
impl KeySet {
	/// First record whose `kid` equals `kid`.
	///
	/// Key identifiers are expected to be unique; if the issuer publishes duplicates the earliest
	/// one wins.
	pub fn find(&self, kid: &str) -> Option<&SigningKeyRecord> {
		self.keys.iter().find(|record| record.kid.as_deref() == Some(kid))
	}

	/// Identifiers of every published key.
	pub fn kids(&self) -> impl Iterator<Item = &str> {
		self.keys.iter().filter_map(|record| record.kid.as_deref())
	}
}

/// A decoded Ed25519 public key.
#[derive(Clone, PartialEq, Eq)]
pub struct Ed25519PublicKey {
	bytes: [u8; ED25519_PUBLIC_KEY_LEN],
}
impl Ed25519PublicKey {
	/// Wrap raw key bytes.
	pub fn from_bytes(bytes: [u8; ED25519_PUBLIC_KEY_LEN]) -> Self {
		Self { bytes }
	}

	/// Raw key bytes.
	pub fn as_bytes(&self) -> &[u8; ED25519_PUBLIC_KEY_LEN] {
		&self.bytes
	}

	/// Verification key usable with `jsonwebtoken`.
	pub fn decoding_key(&self) -> DecodingKey {
		DecodingKey::from_ed_der(&self.bytes)
	}
}
impl Debug for Ed25519PublicKey {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.write_str("Ed25519PublicKey(..)")
	}
}

/// Turn a published key record into an Ed25519 public key.
///
/// The `x` coordinate is base64url, usually without padding; padding is restored before
/// decoding. The result must be exactly 32 bytes.
pub fn decode_public_key(record: &SigningKeyRecord) -> Result<Ed25519PublicKey> {
	let kid = record.kid.clone().unwrap_or_default();
	let invalid = |reason: &str| Error::InvalidKeyMaterial { kid: kid.clone(), reason: reason.into() };

	if record.crv.as_deref().is_some_and(|crv| crv != ED25519_CURVE) {
		return Err(invalid("unsupported curve"));
	}

	let x = record.x.as_deref().ok_or_else(|| invalid("missing public coordinate"))?;
	let padded = restore_padding(x.trim());
	let decoded =
		BASE64_URL_SAFE.decode(padded.as_bytes()).map_err(|_| invalid("malformed base64url"))?;
	let bytes: [u8; ED25519_PUBLIC_KEY_LEN] =
		decoded.try_into().map_err(|_| invalid("public key must be 32 bytes"))?;

	Ok(Ed25519PublicKey::from_bytes(bytes))
}

fn restore_padding(value: &str) -> String {
	let missing = (4 - value.len() % 4) % 4;
	let mut padded = String::with_capacity(value.len() + missing);

	padded.push_str(value);
	padded.extend(std::iter::repeat_n('=', missing));

	padded
}

/// Fetches the key set and keeps it for the configured TTL.
#[derive(Clone, Debug)]
pub struct KeySetResolver {
	config: Arc<ClientConfig>,
	client: Client,
	cache: TtlCache<KeySet>,
	metrics: Arc<VerifierMetrics>,
}
impl KeySetResolver {
	/// Build an empty resolver.
	pub fn new(config: Arc<ClientConfig>, client: Client, metrics: Arc<VerifierMetrics>) -> Self {
		let cache = TtlCache::new(Resource::KeySet.as_str(), config.cache_ttl);

		Self { config, client, cache, metrics }
	}

	/// Cache slot backing this resolver.
	pub fn cache(&self) -> &TtlCache<KeySet> {
		&self.cache
	}

	/// Return the key set, fetching it when the cached copy is missing or expired.
	///
	/// A fetched set replaces the previous one wholesale; keys removed upstream stop verifying
	/// once the cache turns over.
	#[tracing::instrument(skip(self), fields(jwks_uri = %jwks_uri))]
	pub async fn key_set(&self, jwks_uri: &Url) -> Result<Arc<KeySet>> {
		let (key_set, lookup) = self.cache.get_or_fetch(|| self.fetch(jwks_uri)).await?;

		if lookup == Lookup::Hit {
			self.metrics.record_cache_hit(Resource::KeySet);
		}

		Ok(key_set)
	}

	/// Refetch the key set regardless of its age.
	#[tracing::instrument(skip(self), fields(jwks_uri = %jwks_uri))]
	pub async fn refresh(&self, jwks_uri: &Url) -> Result<Arc<KeySet>> {
		self.cache.refresh(|| self.fetch(jwks_uri)).await
	}

	async fn fetch(&self, jwks_uri: &Url) -> Result<KeySet> {
		match fetch_json::<KeySet>(
			&self.client,
			jwks_uri,
			self.config.request_timeout,
			self.config.max_response_bytes,
		)
		.await
		{
			Ok(fetch) => {
				self.metrics.record_fetch(Resource::KeySet, fetch.elapsed);

				tracing::debug!(keys = fetch.body.keys.len(), "key set fetched");

				Ok(fetch.body)
			},
			Err(err) => {
				self.metrics.record_fetch_error(Resource::KeySet);

				tracing::warn!(error = %err, "key set fetch failed");

				Err(err)
			},
		}
	}
}
