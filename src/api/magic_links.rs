//! Magic sign-in links.

// crates.io
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	api::{ApiClient, require},
};

/// Purpose used when none is given.
pub const DEFAULT_PURPOSE: &str = "auth";

/// Parameters of a magic link.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MagicLinkRequest {
	/// What the link does, `auth` by default.
	pub purpose: String,
	/// Channel being verified, e.g. `email` or `phone`.
	pub verification_type: String,
	/// User data attached to the link, typically the identifier being verified.
	pub data: Map<String, Value>,
	/// Where the user lands after following the link.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub redirect_url: Option<String>,
	/// Existing user the link signs in.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,
	/// Link lifetime, e.g. `30d`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub expiration: Option<String>,
	/// Group the user joins on sign-in.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub group_to_join: Option<String>,
}
impl MagicLinkRequest {
	/// An `auth` link verifying `verification_type` with `data`.
	pub fn new(verification_type: impl Into<String>, data: Map<String, Value>) -> Self {
		Self {
			purpose: DEFAULT_PURPOSE.into(),
			verification_type: verification_type.into(),
			data,
			redirect_url: None,
			user_id: None,
			expiration: None,
			group_to_join: None,
		}
	}

	/// Override the purpose.
	pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
		self.purpose = purpose.into();

		self
	}

	/// Set the redirect target.
	pub fn with_redirect_url(mut self, redirect_url: impl Into<String>) -> Self {
		self.redirect_url = Some(redirect_url.into());

		self
	}

	/// Sign in an existing user.
	pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
		self.user_id = Some(user_id.into());

		self
	}

	/// Set the link lifetime.
	pub fn with_expiration(mut self, expiration: impl Into<String>) -> Self {
		self.expiration = Some(expiration.into());

		self
	}

	/// Join a group on sign-in.
	pub fn with_group_to_join(mut self, group_id: impl Into<String>) -> Self {
		self.group_to_join = Some(group_id.into());

		self
	}
}

/// A created magic link.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MagicLink {
	/// The link to send to the user.
	pub link: String,
	/// User the link belongs to.
	#[serde(default)]
	pub app_user_id: Option<String>,
	/// Fields not modelled above.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// Client for `/hub/auth/magic`.
#[derive(Clone, Debug)]
pub struct MagicLinks {
	api: ApiClient,
}
impl MagicLinks {
	/// Wrap a shared API client.
	pub fn new(api: ApiClient) -> Self {
		Self { api }
	}

	/// Create a magic link.
	#[tracing::instrument(skip_all, fields(purpose = %request.purpose))]
	pub async fn create_magic_link(&self, request: &MagicLinkRequest) -> Result<MagicLink> {
		require("verification_type", &request.verification_type)?;
		require("purpose", &request.purpose)?;

		let url = self.api.url(&["hub", "auth", "magic"])?;
		let reply = self.api.send::<_, MagicLink>(Method::POST, url, Some(request)).await?;

		if reply.status != StatusCode::OK {
			return Err(Error::Api {
				status: reply.status,
				message: "Failed to create magic link.".into(),
			});
		}

		reply.into_body()
	}
}
