//! Transport policy for issuer endpoints: HTTPS enforcement and host allowlists.
//!
//! # Threat Model
//! The discovery document is fetched from the configured base URL, but the key set location is
//! whatever that document advertises. These helpers stop a tampered or misconfigured discovery
//! document from steering key retrieval to plain HTTP or to a host outside the allowlist.

// std
use std::collections::HashSet;
// crates.io
use serde::{Deserialize, de::Deserializer};
use url::Url;
// self
use crate::{_prelude::*, config::ClientConfig};

/// Lowercase a host name and strip surrounding whitespace and trailing dots.
///
/// Returns `None` when nothing is left.
pub fn canonicalize_dns_name(value: &str) -> Option<String> {
	let host = value.trim().trim_end_matches('.');

	(!host.is_empty()).then(|| host.to_ascii_lowercase())
}

/// Canonicalize every allowlist entry, dropping empty entries and duplicates while keeping order.
pub fn normalize_allowlist(domains: Vec<String>) -> Vec<String> {
	let mut seen = HashSet::with_capacity(domains.len());

	domains
		.iter()
		.filter_map(|domain| canonicalize_dns_name(domain))
		.filter(|domain| seen.insert(domain.clone()))
		.collect()
}

/// Deserialize `allowed_domains`, normalizing entries on the way in.
pub fn deserialize_allowed_domains<'de, D>(
	deserializer: D,
) -> std::result::Result<Vec<String>, D::Error>
where
	D: Deserializer<'de>,
{
	Vec::<String>::deserialize(deserializer).map(normalize_allowlist)
}

/// Ensure the provided URL uses HTTPS.
pub fn enforce_https(url: &Url) -> Result<()> {
	if url.scheme() == "https" {
		Ok(())
	} else {
		Err(Error::Security(format!("Upstream URL {url} must use HTTPS.")))
	}
}

// `host` is `domain` itself or one of its subdomains.
fn within_domain(host: &str, domain: &str) -> bool {
	host == domain || host.strip_suffix(domain).is_some_and(|prefix| prefix.ends_with('.'))
}

/// Whether `host` is covered by the allowlist. An empty allowlist admits every host.
pub fn host_is_allowed(host: &str, allowed_domains: &[String]) -> bool {
	if allowed_domains.is_empty() {
		return true;
	}

	canonicalize_dns_name(host).is_some_and(|host| {
		allowed_domains
			.iter()
			.filter_map(|domain| canonicalize_dns_name(domain))
			.any(|domain| within_domain(&host, &domain))
	})
}

/// Apply the configured transport policy to a key set location advertised by the issuer.
pub fn check_jwks_uri(config: &ClientConfig, jwks_uri: &Url) -> Result<()> {
	if config.require_https {
		enforce_https(jwks_uri)?;
	}

	let Some(host) = jwks_uri.host_str() else {
		return Err(Error::Security(format!("JWKS URL {jwks_uri} has no host.")));
	};

	if !host_is_allowed(host, &config.allowed_domains) {
		tracing::warn!(%host, "advertised jwks_uri host is outside the allowlist");

		return Err(Error::Security(format!("Host '{host}' is not in the JWKS allowlist.")));
	}

	Ok(())
}
