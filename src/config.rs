//! Client configuration and validation.

// std
use std::{
	env,
	fmt::{Debug, Formatter, Result as FmtResult},
	mem,
};
// crates.io
use serde::Deserialize;
use url::Url;
// self
use crate::{_prelude::*, security};

/// Production API origin.
pub const DEFAULT_BASE_URL: &str = "https://api.rownd.io";
/// Lifetime of cached issuer metadata and key sets.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);
/// Timeout applied to every request sent to the issuer.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
/// Default size guard (1 MiB) for issuer documents.
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 1_048_576;
/// Largest clock skew accepted for `exp`, `nbf` and `iat` checks.
pub const MAX_LEEWAY: Duration = Duration::from_secs(300);
/// Path of the discovery document relative to the base URL.
pub const WELL_KNOWN_PATH: &str = "/hub/auth/.well-known/oauth-authorization-server";

/// Environment variable holding the application key.
pub const ENV_APP_KEY: &str = "ROWND_APP_KEY";
/// Environment variable holding the application secret.
pub const ENV_APP_SECRET: &str = "ROWND_APP_SECRET";
/// Environment variable holding the application id.
pub const ENV_APP_ID: &str = "ROWND_APP_ID";
/// Environment variable overriding the base URL.
pub const ENV_BASE_URL: &str = "ROWND_BASE_URL";

/// Settings shared by the token verifier and the management API clients.
#[derive(Clone, Deserialize)]
pub struct ClientConfig {
	/// Application key sent as `x-rownd-app-key`.
	pub app_key: String,
	/// Application secret sent as `x-rownd-app-secret`.
	pub app_secret: String,
	/// Application id; tokens must carry the audience `app:<app_id>`.
	#[serde(default)]
	pub app_id: Option<String>,
	/// Origin of the Rownd API and token issuer.
	#[serde(default = "default_base_url")]
	pub base_url: Url,
	/// Whether the base URL and the advertised JWKS URL must use HTTPS.
	#[serde(default = "default_true")]
	pub require_https: bool,
	/// Optional allowlist of hosts the advertised JWKS URL may point to.
	#[serde(default, deserialize_with = "crate::security::deserialize_allowed_domains")]
	pub allowed_domains: Vec<String>,
	/// Lifetime of the cached discovery document and key set.
	#[serde(default = "default_cache_ttl")]
	pub cache_ttl: Duration,
	/// Timeout applied to each request.
	#[serde(default = "default_request_timeout")]
	pub request_timeout: Duration,
	/// Maximum size accepted for issuer documents, in bytes.
	#[serde(default = "default_max_response_bytes")]
	pub max_response_bytes: u64,
	/// Clock skew tolerated on `exp`, `nbf` and `iat`, at most [`MAX_LEEWAY`].
	#[serde(default)]
	pub leeway: Duration,
}
impl ClientConfig {
	/// Construct a configuration for the production API with default cache settings.
	pub fn new(app_key: impl Into<String>, app_secret: impl Into<String>) -> Result<Self> {
		Ok(Self {
			app_key: app_key.into(),
			app_secret: app_secret.into(),
			app_id: None,
			base_url: Url::parse(DEFAULT_BASE_URL)?,
			require_https: true,
			allowed_domains: Vec::new(),
			cache_ttl: DEFAULT_CACHE_TTL,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
			leeway: Duration::ZERO,
		})
	}

	/// Load credentials from `ROWND_APP_KEY`, `ROWND_APP_SECRET`, `ROWND_APP_ID` and
	/// `ROWND_BASE_URL`.
	pub fn from_env() -> Result<Self> {
		let app_key = required_env(ENV_APP_KEY, "app_key")?;
		let app_secret = required_env(ENV_APP_SECRET, "app_secret")?;
		let mut config = Self::new(app_key, app_secret)?;

		if let Some(app_id) = optional_env(ENV_APP_ID) {
			config.app_id = Some(app_id);
		}
		if let Some(base_url) = optional_env(ENV_BASE_URL) {
			config.base_url = Url::parse(&base_url)?;
		}

		Ok(config)
	}

	/// Set the application id used to build the expected audience.
	pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
		self.app_id = Some(app_id.into());

		self
	}

	/// Point the client at a different API origin.
	pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Result<Self> {
		self.base_url = Url::parse(base_url.as_ref())?;

		Ok(self)
	}

	/// Set HTTPS requirement to the desired value.
	pub fn with_require_https(mut self, require_https: bool) -> Self {
		self.require_https = require_https;

		self
	}

	/// Override the lifetime of both caches.
	pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
		self.cache_ttl = ttl;

		self
	}

	/// Override the per-request timeout.
	pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Override the size guard applied to issuer documents.
	pub fn with_max_response_bytes(mut self, max_response_bytes: u64) -> Self {
		self.max_response_bytes = max_response_bytes;

		self
	}

	/// Override the tolerated clock skew.
	pub fn with_leeway(mut self, leeway: Duration) -> Self {
		self.leeway = leeway;

		self
	}

	/// Add an entry to the JWKS host allowlist.
	pub fn add_allowed_domain(mut self, domain: impl Into<String>) -> Self {
		let raw = domain.into();

		if let Some(domain) = security::canonicalize_dns_name(&raw)
			&& !self.allowed_domains.contains(&domain)
		{
			self.allowed_domains.push(domain);
		}

		self
	}

	/// Canonicalise the domain allowlist in-place.
	pub fn normalize_allowed_domains(&mut self) {
		let domains = mem::take(&mut self.allowed_domains);

		self.allowed_domains = security::normalize_allowlist(domains);
	}

	/// Audience every accepted token must carry, when an application id is configured.
	pub fn audience(&self) -> Option<String> {
		self.app_id.as_deref().map(|app_id| format!("app:{app_id}"))
	}

	/// Resolve a path against the base URL, keeping any path prefix the base URL carries.
	pub fn endpoint(&self, path: &str) -> Result<Url> {
		let base = self.base_url.as_str().trim_end_matches('/');

		Ok(Url::parse(&format!("{base}{path}"))?)
	}

	/// Location of the issuer's discovery document.
	pub fn well_known_url(&self) -> Result<Url> {
		self.endpoint(WELL_KNOWN_PATH)
	}

	/// Validate the configuration against the documented constraints.
	pub fn validate(&self) -> Result<()> {
		if self.app_key.trim().is_empty() {
			return Err(Error::Validation { field: "app_key", reason: "Must not be empty.".into() });
		}
		if self.app_secret.trim().is_empty() {
			return Err(Error::Validation {
				field: "app_secret",
				reason: "Must not be empty.".into(),
			});
		}
		if self.app_id.as_deref().is_some_and(|app_id| app_id.trim().is_empty()) {
			return Err(Error::Validation {
				field: "app_id",
				reason: "Must not be empty when set.".into(),
			});
		}

		if self.require_https {
			security::enforce_https(&self.base_url)?;
		}
		if self.base_url.host_str().is_none() {
			return Err(Error::Validation {
				field: "base_url",
				reason: "Must include a host component.".into(),
			});
		}

		if self.cache_ttl < Duration::from_secs(1) {
			return Err(Error::Validation {
				field: "cache_ttl",
				reason: "Must be at least 1 second.".into(),
			});
		}
		if self.request_timeout < Duration::from_millis(100) {
			return Err(Error::Validation {
				field: "request_timeout",
				reason: "Must be at least 100 ms.".into(),
			});
		}
		if self.leeway > MAX_LEEWAY {
			return Err(Error::Validation {
				field: "leeway",
				reason: format!("Must not exceed {} seconds.", MAX_LEEWAY.as_secs()),
			});
		}
		if self.max_response_bytes == 0 {
			return Err(Error::Validation {
				field: "max_response_bytes",
				reason: "Must be greater than zero.".into(),
			});
		}

		for domain in &self.allowed_domains {
			match security::canonicalize_dns_name(domain) {
				Some(canonical) if canonical == *domain => {},
				Some(_) =>
					return Err(Error::Validation {
						field: "allowed_domains",
						reason: "Entries must be canonical hostnames (lowercase, no trailing dot)."
							.into(),
					}),
				None =>
					return Err(Error::Validation {
						field: "allowed_domains",
						reason: "Entries must be non-empty hostnames.".into(),
					}),
			}
		}

		Ok(())
	}
}
impl Debug for ClientConfig {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("ClientConfig")
			.field("app_key", &self.app_key)
			.field("app_secret", &"****")
			.field("app_id", &self.app_id)
			.field("base_url", &self.base_url.as_str())
			.field("require_https", &self.require_https)
			.field("allowed_domains", &self.allowed_domains)
			.field("cache_ttl", &self.cache_ttl)
			.field("request_timeout", &self.request_timeout)
			.field("max_response_bytes", &self.max_response_bytes)
			.field("leeway", &self.leeway)
			.finish()
	}
}

fn required_env(name: &str, field: &'static str) -> Result<String> {
	optional_env(name).ok_or_else(|| Error::Validation {
		field,
		reason: format!("Environment variable {name} is not set."),
	})
}

fn optional_env(name: &str) -> Option<String> {
	env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn default_base_url() -> Url {
	Url::parse(DEFAULT_BASE_URL).expect("default base URL must parse")
}

fn default_true() -> bool {
	true
}

fn default_cache_ttl() -> Duration {
	DEFAULT_CACHE_TTL
}

fn default_request_timeout() -> Duration {
	DEFAULT_REQUEST_TIMEOUT
}

fn default_max_response_bytes() -> u64 {
	DEFAULT_MAX_RESPONSE_BYTES
}
