//! Bearer token verification.
//!
//! A token is checked in two passes over the same signature. The first pass looks at the
//! audience alone, the second at expiry, issue time and issuer. Keeping them apart lets callers
//! tell a misrouted token ([`AuthenticationError::InvalidAudience`]) from one that simply aged out
//! ([`AuthenticationError::TokenExpired`]).

// crates.io
use jsonwebtoken::{
	Algorithm, DecodingKey, Validation,
	errors::{Error as JwtError, ErrorKind},
};
use reqwest::Client;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::{
		claims::{ClaimSet, ValidatedToken},
		keys::{KeySet, KeySetResolver, decode_public_key},
		metadata::{IssuerMetadata, MetadataResolver},
	},
	config::ClientConfig,
	error::AuthenticationError,
	metrics::VerifierMetrics,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
	Audience,
	Temporal,
}

/// Validates bearer tokens for one application against the Rownd issuer.
///
/// Cheap to clone; clones share the metadata and key set caches.
#[derive(Clone, Debug)]
pub struct TokenVerifier {
	metadata: MetadataResolver,
	keys: KeySetResolver,
	audience: String,
	audience_validation: Validation,
	leeway: Duration,
	metrics: Arc<VerifierMetrics>,
}
impl TokenVerifier {
	/// Build a verifier for the configured application.
	///
	/// Fails with [`Error::Validation`] when the configuration is invalid or carries no
	/// application id.
	pub fn new(config: Arc<ClientConfig>, client: Client) -> Result<Self> {
		config.validate()?;

		let audience = config.audience().ok_or_else(|| Error::Validation {
			field: "app_id",
			reason: "An application id is required to validate tokens.".into(),
		})?;
		let metrics = VerifierMetrics::new();
		let metadata = MetadataResolver::new(config.clone(), client.clone(), metrics.clone())?;
		let keys = KeySetResolver::new(config.clone(), client, metrics.clone());
		let audience_validation = audience_validation(&audience);

		Ok(Self { metadata, keys, audience, audience_validation, leeway: config.leeway, metrics })
	}

	/// Audience every accepted token carries.
	pub fn audience(&self) -> &str {
		&self.audience
	}

	/// Counters for this verifier and its clones.
	pub fn metrics(&self) -> &Arc<VerifierMetrics> {
		&self.metrics
	}

	/// Current issuer metadata, from cache when fresh.
	pub async fn issuer_metadata(&self) -> Result<Arc<IssuerMetadata>> {
		self.metadata.issuer_metadata().await
	}

	/// Current key set, from cache when fresh.
	pub async fn key_set(&self) -> Result<Arc<KeySet>> {
		let metadata = self.metadata.issuer_metadata().await?;

		self.keys.key_set(&metadata.jwks_uri).await
	}

	/// Refetch the key set now, e.g. after a [`AuthenticationError::KeyNotFound`] caused by key
	/// rotation.
	pub async fn refresh_key_set(&self) -> Result<Arc<KeySet>> {
		let metadata = self.metadata.issuer_metadata().await?;

		self.keys.refresh(&metadata.jwks_uri).await
	}

	/// Verify `token` and return its claims.
	///
	/// Authentication failures come back as [`Error::Authentication`]. Problems reaching the
	/// issuer or decoding what it publishes come back as dependency errors and say nothing about
	/// the token.
	#[tracing::instrument(skip_all, fields(audience = %self.audience))]
	pub async fn validate_token(&self, token: &str) -> Result<ValidatedToken> {
		let outcome = self.verify(token).await;

		self.metrics.record_validation(outcome.is_ok());

		match &outcome {
			Ok(_) => tracing::debug!("token accepted"),
			Err(err) if err.is_authentication() => tracing::debug!(error = %err, "token rejected"),
			Err(err) => tracing::warn!(error = %err, "token could not be verified"),
		}

		outcome
	}

	async fn verify(&self, token: &str) -> Result<ValidatedToken> {
		let metadata = self.metadata.issuer_metadata().await?;
		let key_set = self.keys.key_set(&metadata.jwks_uri).await?;
		let header = jsonwebtoken::decode_header(token)
			.map_err(|_| AuthenticationError::InvalidTokenFormat)?;
		let kid = header.kid.ok_or(AuthenticationError::MissingKeyId)?;
		let record = key_set
			.find(&kid)
			.ok_or_else(|| AuthenticationError::KeyNotFound { kid: kid.clone() })?;
		let key = decode_public_key(record)?.decoding_key();

		tracing::trace!(%kid, alg = ?header.alg, "signing key selected");

		self.verify_audience(token, &key, &kid)?;

		let claims = self.verify_temporal(token, &key, &kid, &metadata.issuer)?;

		Ok(ValidatedToken::new(claims, token))
	}

	fn verify_audience(&self, token: &str, key: &DecodingKey, kid: &str) -> Result<()> {
		let data = jsonwebtoken::decode::<ClaimSet>(token, key, &self.audience_validation)
			.map_err(|err| reject(&err, Phase::Audience, kid))?;

		if !data.claims.audiences().contains(&self.audience.as_str()) {
			return Err(AuthenticationError::InvalidAudience.into());
		}

		Ok(())
	}

	fn verify_temporal(
		&self,
		token: &str,
		key: &DecodingKey,
		kid: &str,
		issuer: &str,
	) -> Result<ClaimSet> {
		let validation = temporal_validation(issuer, self.leeway);
		let data = jsonwebtoken::decode::<ClaimSet>(token, key, &validation)
			.map_err(|err| reject(&err, Phase::Temporal, kid))?;

		check_issued_at(&data.claims, Utc::now(), self.leeway)?;

		Ok(data.claims)
	}
}

fn audience_validation(audience: &str) -> Validation {
	let mut validation = Validation::new(Algorithm::EdDSA);

	validation.set_required_spec_claims(&["aud"]);
	validation.validate_exp = false;
	validation.validate_nbf = false;
	validation.set_audience(&[audience]);

	validation
}

fn temporal_validation(issuer: &str, leeway: Duration) -> Validation {
	let mut validation = Validation::new(Algorithm::EdDSA);

	validation.set_required_spec_claims(&["exp", "iss"]);
	validation.validate_exp = true;
	validation.validate_nbf = true;
	validation.validate_aud = false;
	validation.leeway = leeway.as_secs();
	validation.set_issuer(&[issuer]);

	validation
}

// `jsonwebtoken` cannot require `iat`, so presence and plausibility are checked here.
fn check_issued_at(
	claims: &ClaimSet,
	now: DateTime<Utc>,
	leeway: Duration,
) -> std::result::Result<(), AuthenticationError> {
	let issued_at = claims
		.get("iat")
		.and_then(Value::as_f64)
		.ok_or_else(|| AuthenticationError::InvalidClaims("Missing required claim 'iat'".into()))?;
	let leeway = i64::try_from(leeway.as_secs()).unwrap_or(i64::MAX);
	let latest = now.timestamp().saturating_add(leeway) as f64;

	if issued_at > latest {
		return Err(AuthenticationError::InvalidClaims("Token issued in the future".into()));
	}

	Ok(())
}

fn reject(err: &JwtError, phase: Phase, kid: &str) -> Error {
	let auth = match err.kind() {
		ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm =>
			AuthenticationError::InvalidSignature,
		ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) =>
			AuthenticationError::InvalidTokenFormat,
		ErrorKind::InvalidKeyFormat =>
			return Error::InvalidKeyMaterial {
				kid: kid.to_owned(),
				reason: "rejected by the signature verifier".into(),
			},
		ErrorKind::InvalidAudience => AuthenticationError::InvalidAudience,
		ErrorKind::MissingRequiredClaim(_) if phase == Phase::Audience =>
			AuthenticationError::InvalidAudience,
		ErrorKind::ExpiredSignature => AuthenticationError::TokenExpired,
		ErrorKind::MissingRequiredClaim(claim) =>
			AuthenticationError::InvalidClaims(format!("Missing required claim '{claim}'")),
		ErrorKind::InvalidIssuer => AuthenticationError::InvalidClaims("Invalid issuer".into()),
		ErrorKind::ImmatureSignature =>
			AuthenticationError::InvalidClaims("Token is not yet valid".into()),
		_ => AuthenticationError::InvalidClaims(err.to_string()),
	};

	auth.into()
}
