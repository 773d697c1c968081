//! Issuer discovery document and its cached resolver.

// crates.io
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
	security,
};

/// The issuer's OAuth authorization server metadata.
///
/// Only `issuer` and `jwks_uri` are required; everything else the issuer publishes is kept,
/// either in a named field or in [`IssuerMetadata::extra`].
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IssuerMetadata {
	/// Value every token's `iss` claim must equal.
	pub issuer: String,
	/// Location of the published signing keys.
	pub jwks_uri: Url,
	// RFC 8414 fields the issuer may publish.
	pub token_endpoint: Option<String>,
	pub userinfo_endpoint: Option<String>,
	pub response_types_supported: Option<Vec<String>>,
	pub id_token_signing_alg_values_supported: Option<Vec<String>>,
	pub grant_types_supported: Option<Vec<String>>,
	pub subject_types_supported: Option<Vec<String>>,
	pub scopes_supported: Option<Vec<String>>,
	pub token_endpoint_auth_methods_supported: Option<Vec<String>>,
	pub claims_supported: Option<Vec<String>>,
	pub code_challenge_methods_supported: Option<Vec<String>>,
	/// Fields not modelled above.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// Fetches the discovery document and keeps it for the configured TTL.
#[derive(Clone, Debug)]
pub struct MetadataResolver {
	config: Arc<ClientConfig>,
	client: Client,
	url: Url,
	cache: TtlCache<IssuerMetadata>,
	metrics: Arc<VerifierMetrics>,
}
impl MetadataResolver {
	/// Build a resolver for the configured base URL.
	pub fn new(
		config: Arc<ClientConfig>,
		client: Client,
		metrics: Arc<VerifierMetrics>,
	) -> Result<Self> {
		let url = config.well_known_url()?;
		let cache = TtlCache::new(Resource::IssuerMetadata.as_str(), config.cache_ttl);

		Ok(Self { config, client, url, cache, metrics })
	}

	/// Location of the discovery document.
	pub fn url(&self) -> &Url {
		&self.url
	}

	/// Cache slot backing this resolver.
	pub fn cache(&self) -> &TtlCache<IssuerMetadata> {
		&self.cache
	}

	/// Return the discovery document, fetching it when the cached copy is missing or expired.
	#[tracing::instrument(skip(self), fields(url = %self.url))]
	pub async fn issuer_metadata(&self) -> Result<Arc<IssuerMetadata>> {
		let (metadata, lookup) = self.cache.get_or_fetch(|| self.fetch()).await?;

		if lookup == Lookup::Hit {
			self.metrics.record_cache_hit(Resource::IssuerMetadata);
		}

		Ok(metadata)
	}

	async fn fetch(&self) -> Result<IssuerMetadata> {
		let fetched = fetch_json::<IssuerMetadata>(
			&self.client,
			&self.url,
			self.config.request_timeout,
			self.config.max_response_bytes,
		)
		.await
		.and_then(|fetch| {
			security::check_jwks_uri(&self.config, &fetch.body.jwks_uri)
				.map_err(|err| Error::malformed(&self.url, err.to_string()))?;

			Ok(fetch)
		});

		match fetched {
			Ok(fetch) => {
				self.metrics.record_fetch(Resource::IssuerMetadata, fetch.elapsed);

				tracing::debug!(
					issuer = %fetch.body.issuer,
					jwks_uri = %fetch.body.jwks_uri,
					"issuer metadata fetched"
				);

				Ok(fetch.body)
			},
			Err(err) => {
				self.metrics.record_fetch_error(Resource::IssuerMetadata);

				tracing::warn!(error = %err, "issuer metadata fetch failed");

				Err(err)
			},
		}
	}
}
