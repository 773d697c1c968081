//! User records.

// crates.io
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
// self
use crate::{
	_prelude::*,
	api::{ApiClient, require},
	auth::claims::ValidatedToken,
};

/// Placeholder id asking the API to allocate a new user.
pub const NEW_USER_ID: &str = "__UUID__";

/// A Rownd user record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
	/// User id. Filled in from the request when the response omits it.
	#[serde(default)]
	pub id: String,
	/// Profile fields.
	#[serde(default)]
	pub data: Map<String, Value>,
	/// Authentication level of the user's latest session.
	#[serde(default)]
	pub auth_level: Option<String>,
	/// Account state, e.g. `enabled`.
	#[serde(default)]
	pub state: Option<String>,
	/// Identifiers the user has verified.
	#[serde(default)]
	pub verified_data: Option<Map<String, Value>>,
	/// Group memberships.
	#[serde(default)]
	pub groups: Vec<Value>,
	/// Server-side metadata.
	#[serde(default)]
	pub meta: Map<String, Value>,
	/// Linked third-party identities.
	#[serde(default)]
	pub connection_map: Map<String, Value>,
	/// Rownd-internal user id.
	#[serde(default)]
	pub rownd_user: Option<String>,
	/// Fields not modelled above.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}
impl User {
	fn with_id(mut self, id: &str) -> Self {
		if self.id.is_empty() {
			self.id = id.to_owned();
		}

		self
	}
}

/// Client for `/applications/{app_id}/users`.
#[derive(Clone, Debug)]
pub struct Users {
	api: ApiClient,
}
impl Users {
	/// Wrap a shared API client.
	pub fn new(api: ApiClient) -> Self {
		Self { api }
	}

	/// Fetch a user.
	///
	/// The application id comes from the token's `app:` audience when a token is given, and
	/// from the configuration otherwise.
	pub async fn get_user(&self, user_id: &str, token: Option<&ValidatedToken>) -> Result<User> {
		require("user_id", user_id)?;

		let app_id = token
			.and_then(|token| token.claims().app_id())
			.or(self.api.config().app_id.as_deref())
			.map(str::to_owned)
			.ok_or_else(|| Error::Validation {
				field: "app_id",
				reason: "Not found in the token or the configuration.".into(),
			})?;
		let user: User = self.api.get(self.data_url(&app_id, user_id)?).await?;

		Ok(user.with_id(user_id))
	}

	/// Create or replace a user's data.
	///
	/// An empty `user_id` creates a new user; the allocated id is read from the response.
	#[tracing::instrument(skip(self, data))]
	pub async fn update_user(
		&self,
		app_id: &str,
		user_id: &str,
		data: Map<String, Value>,
	) -> Result<User> {
		require("app_id", app_id)?;

		let is_new = user_id.is_empty();
		let path_id = if is_new { NEW_USER_ID } else { user_id };
		let url = self.data_url(app_id, path_id)?;
		let user: User = self
			.api
			.send(Method::PUT, url.clone(), Some(&json!({ "data": data })))
			.await?
			.into_body()?;

		if !is_new {
			return Ok(user.with_id(user_id));
		}

		let created_id = user
			.data
			.get("user_id")
			.and_then(Value::as_str)
			.map(str::to_owned)
			.ok_or_else(|| Error::malformed(&url, "No user id returned for the new user."))?;

		tracing::debug!(user_id = %created_id, "user created");

		Ok(user.with_id(&created_id))
	}

	/// Merge `data` into a user's existing data.
	pub async fn patch_user(
		&self,
		app_id: &str,
		user_id: &str,
		data: Map<String, Value>,
	) -> Result<User> {
		require("app_id", app_id)?;
		require("user_id", user_id)?;

		let user: User = self
			.api
			.send(Method::PATCH, self.data_url(app_id, user_id)?, Some(&json!({ "data": data })))
			.await?
			.into_body()?;

		Ok(user.with_id(user_id))
	}

	/// One field of a user's data, `None` when unset.
	pub async fn get_user_field(
		&self,
		app_id: &str,
		user_id: &str,
		field: &str,
	) -> Result<Option<Value>> {
		require("app_id", app_id)?;
		require("user_id", user_id)?;
		require("field", field)?;

		let mut user: User = self.api.get(self.data_url(app_id, user_id)?).await?;

		Ok(user.data.remove(field))
	}

	/// Set one field of a user's data.
	pub async fn update_user_field(
		&self,
		app_id: &str,
		user_id: &str,
		field: &str,
		value: Value,
	) -> Result<()> {
		require("app_id", app_id)?;
		require("user_id", user_id)?;
		require("field", field)?;

		let url = self.api.url(&["applications", app_id, "users", user_id, "data", "fields", field])?;

		self.api.send::<_, Value>(Method::PUT, url, Some(&json!({ "value": value }))).await?;

		Ok(())
	}

	/// Delete a user.
	#[tracing::instrument(skip(self))]
	pub async fn delete_user(&self, app_id: &str, user_id: &str) -> Result<()> {
		require("app_id", app_id)?;
		require("user_id", user_id)?;

		self.api.delete(self.data_url(app_id, user_id)?).await
	}

	fn data_url(&self, app_id: &str, user_id: &str) -> Result<url::Url> {
		self.api.url(&["applications", app_id, "users", user_id, "data"])
	}
}
