//! HTTP client integration for issuer document retrieval.

// crates.io
use http::{StatusCode, header::ACCEPT};
use reqwest::{Client, redirect::Policy};
use serde::de::DeserializeOwned;
use url::Url;
// self
use crate::{_prelude::*, config::ClientConfig};

/// Maximum redirect depth followed for issuer requests.
pub const MAX_REDIRECTS: usize = 3;

/// A decoded document together with exchange diagnostics.
#[derive(Clone, Debug)]
pub struct HttpFetch<T> {
	/// Parsed response body.
	pub body: T,
	/// Status returned by the origin.
	pub status: StatusCode,
	/// Round-trip duration of the exchange.
	pub elapsed: Duration,
}

/// Build the shared reqwest client used for every outbound call.
pub fn build_client(config: &ClientConfig) -> Result<Client> {
	Client::builder()
		.redirect(Policy::limited(MAX_REDIRECTS))
		.user_agent(format!("rownd/{}", env!("CARGO_PKG_VERSION")))
		.connect_timeout(config.request_timeout)
		.build()
		.map_err(|err| Error::Validation {
			field: "http_client",
			reason: format!("Failed to build HTTP client: {err}."),
		})
}

/// GET a JSON document, translating every failure into a dependency error.
///
/// Transport errors, timeouts and non-success statuses become
/// [`Error::UpstreamUnavailable`]; oversized or undecodable bodies become
/// [`Error::MalformedResponse`].
pub async fn fetch_json<T>(
	client: &Client,
	url: &Url,
	timeout: Duration,
	max_response_bytes: u64,
) -> Result<HttpFetch<T>>
where
	T: DeserializeOwned,
{
	let start = Instant::now();
	let response = client
		.get(url.clone())
		.header(ACCEPT, "application/json")
		.timeout(timeout)
		.send()
		.await
		.map_err(|err| Error::upstream(url, describe_transport_error(&err)))?;
	let status = response.status();

	if !status.is_success() {
		tracing::warn!(%url, %status, "issuer returned non-success status");

		return Err(Error::upstream(url, format!("HTTP {status}")));
	}

	let bytes = read_bounded(response, url, max_response_bytes).await?;
	let elapsed = start.elapsed();

	let body = serde_json::from_slice(&bytes).map_err(|err| Error::malformed(url, err.to_string()))?;

	tracing::debug!(%url, %status, elapsed = ?elapsed, size = bytes.len(), "issuer fetch complete");

	Ok(HttpFetch { body, status, elapsed })
}

/// Read the body chunk by chunk, giving up as soon as it grows past `max_response_bytes`.
async fn read_bounded(
	mut response: reqwest::Response,
	url: &Url,
	max_response_bytes: u64,
) -> Result<Vec<u8>> {
	let oversized = |size: u64| {
		Error::malformed(
			url,
			format!(
				"Response size {size} bytes exceeds the configured guard of {max_response_bytes} bytes."
			),
		)
	};

	if let Some(declared) = response.content_length()
		&& declared > max_response_bytes
	{
		return Err(oversized(declared));
	}

	let mut body = Vec::new();

	while let Some(chunk) =
		response.chunk().await.map_err(|err| Error::upstream(url, describe_transport_error(&err)))?
	{
		let size = (body.len() + chunk.len()) as u64;

		if size > max_response_bytes {
			return Err(oversized(size));
		}

		body.extend_from_slice(&chunk);
	}

	Ok(body)
}

/// Short, secret-free description of a reqwest failure.
pub fn describe_transport_error(err: &reqwest::Error) -> String {
	if err.is_timeout() {
		"request timed out".into()
	} else if err.is_connect() {
		"connection failed".into()
	} else if err.is_redirect() {
		"too many redirects".into()
	} else if err.is_body() || err.is_decode() {
		"failed to read response body".into()
	} else {
		"request failed".into()
	}
}
