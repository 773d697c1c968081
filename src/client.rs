//! Entry point bundling the token verifier and the management API clients.

// self
use crate::{
	_prelude::*,
	api::{ApiClient, groups::Groups, magic_links::MagicLinks, users::Users},
	auth::{self, claims::ValidatedToken, verifier::TokenVerifier},
	config::ClientConfig,
	http::client::build_client,
};

/// A configured Rownd client.
///
/// One instance per application; clones share the HTTP connection pool and the verifier caches.
#[derive(Clone, Debug)]
pub struct RowndClient {
	config: Arc<ClientConfig>,
	verifier: Option<TokenVerifier>,
	users: Users,
	groups: Groups,
	magic_links: MagicLinks,
}
impl RowndClient {
	/// Validate `config` and build the client.
	///
	/// Token validation is only available when the configuration carries an application id.
	pub fn new(mut config: ClientConfig) -> Result<Self> {
		config.normalize_allowed_domains();
		config.validate()?;

		let config = Arc::new(config);
		let http = build_client(&config)?;
		let verifier = match config.app_id {
			Some(_) => Some(TokenVerifier::new(config.clone(), http.clone())?),
			None => None,
		};
		let api = ApiClient::new(config.clone(), http);

		tracing::debug!(
			base_url = %config.base_url,
			verifier = verifier.is_some(),
			"rownd client ready"
		);

		Ok(Self {
			config,
			verifier,
			users: Users::new(api.clone()),
			groups: Groups::new(api.clone()),
			magic_links: MagicLinks::new(api),
		})
	}

	/// Build a client from `ROWND_*` environment variables.
	pub fn from_env() -> Result<Self> {
		Self::new(ClientConfig::from_env()?)
	}

	/// Configuration in use.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Token verifier, if an application id is configured.
	pub fn verifier(&self) -> Result<&TokenVerifier> {
		self.verifier.as_ref().ok_or_else(|| Error::Validation {
			field: "app_id",
			reason: "An application id is required to validate tokens.".into(),
		})
	}

	/// Verify a bare token.
	pub async fn validate_token(&self, token: &str) -> Result<ValidatedToken> {
		self.verifier()?.validate_token(token).await
	}

	/// Verify the token carried by an `Authorization` header value.
	pub async fn authenticate(&self, authorization: &str) -> Result<ValidatedToken> {
		let token = auth::bearer_token(authorization)?;

		self.validate_token(token).await
	}

	/// User records.
	pub fn users(&self) -> &Users {
		&self.users
	}

	/// Groups, members and invitations.
	pub fn groups(&self) -> &Groups {
		&self.groups
	}

	/// Magic links.
	pub fn magic_links(&self) -> &MagicLinks {
		&self.magic_links
	}
}
