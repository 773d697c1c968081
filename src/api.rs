//! Thin clients for the Rownd management API.
//!
//! Every request carries the application credentials. Non-success answers become
//! [`Error::Api`] with the message the API returned.

pub mod groups;
pub mod magic_links;
pub mod users;

// crates.io
use http::{Method, StatusCode, header::CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use url::Url;
// self
use crate::{_prelude::*, config::ClientConfig, http::client::describe_transport_error};

/// Header carrying the application key.
pub const APP_KEY_HEADER: &str = "x-rownd-app-key";
/// Header carrying the application secret.
pub const APP_SECRET_HEADER: &str = "x-rownd-app-secret";

/// A page of results as returned by the list endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListResponse<T> {
	/// Items on this page.
	#[serde(default = "Vec::new")]
	pub results: Vec<T>,
	/// Total number of items, when reported.
	#[serde(default)]
	pub total_results: Option<u64>,
	/// Fields not modelled above.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// Status and optional body of a successful exchange.
#[derive(Debug)]
pub(crate) struct ApiReply<T> {
	pub(crate) status: StatusCode,
	pub(crate) body: Option<T>,
	url: Url,
}
impl<T> ApiReply<T> {
	/// The decoded body; an empty body is a malformed answer here.
	pub(crate) fn into_body(self) -> Result<T> {
		self.body.ok_or_else(|| Error::malformed(&self.url, "Expected a JSON body."))
	}
}

/// Authenticated transport shared by the resource clients.
#[derive(Clone, Debug)]
pub struct ApiClient {
	config: Arc<ClientConfig>,
	client: Client,
}
impl ApiClient {
	/// Wrap a configuration and an HTTP client.
	pub fn new(config: Arc<ClientConfig>, client: Client) -> Self {
		Self { config, client }
	}

	/// Configuration the client was built with.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Base URL extended with percent-encoded path segments.
	pub(crate) fn url(&self, segments: &[&str]) -> Result<Url> {
		let mut url = self.config.base_url.clone();

		url.path_segments_mut()
			.map_err(|_| Error::Validation {
				field: "base_url",
				reason: "Must be a hierarchical URL.".into(),
			})?
			.pop_if_empty()
			.extend(segments);

		Ok(url)
	}

	#[tracing::instrument(skip_all, fields(%method, %url))]
	pub(crate) async fn send<B, T>(
		&self,
		method: Method,
		url: Url,
		body: Option<&B>,
	) -> Result<ApiReply<T>>
	where
		B: Serialize + ?Sized,
		T: DeserializeOwned,
	{
		let mut request = self
			.client
			.request(method, url.clone())
			.header(APP_KEY_HEADER, &self.config.app_key)
			.header(APP_SECRET_HEADER, &self.config.app_secret)
			.header(CONTENT_TYPE, "application/json")
			.timeout(self.config.request_timeout);

		if let Some(body) = body {
			request = request.json(body);
		}

		let response =
			request.send().await.map_err(|err| Error::upstream(&url, describe_transport_error(&err)))?;
		let status = response.status();
		let text =
			response.text().await.map_err(|err| Error::upstream(&url, describe_transport_error(&err)))?;

		tracing::debug!(%status, size = text.len(), "management API answered");

		if !status.is_success() {
			let message = error_message(status, &text);

			tracing::warn!(%status, %message, "management API rejected request");

			return Err(Error::Api { status, message });
		}
		if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
			return Ok(ApiReply { status, body: None, url });
		}

		let body =
			serde_json::from_str(&text).map_err(|err| Error::malformed(&url, err.to_string()))?;

		Ok(ApiReply { status, body: Some(body), url })
	}

	pub(crate) async fn get<T>(&self, url: Url) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.send::<(), T>(Method::GET, url, None).await?.into_body()
	}

	pub(crate) async fn delete(&self, url: Url) -> Result<()> {
		self.send::<(), Value>(Method::DELETE, url, None).await?;

		Ok(())
	}
}

/// Message of an error answer: the JSON `message` field when present, else the raw body.
fn error_message(status: StatusCode, body: &str) -> String {
	let message = serde_json::from_str::<Value>(body)
		.ok()
		.and_then(|value| value.get("message").and_then(Value::as_str).map(str::to_owned))
		.unwrap_or_else(|| body.trim().to_owned());

	if message.is_empty() {
		status.canonical_reason().unwrap_or("Unknown error").to_owned()
	} else {
		message
	}
}

/// Reject empty identifiers before any request is made.
pub(crate) fn require(field: &'static str, value: &str) -> Result<()> {
	if value.trim().is_empty() {
		return Err(Error::Validation { field, reason: "Must not be empty.".into() });
	}

	Ok(())
}
