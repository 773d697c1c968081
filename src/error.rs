//! Crate-wide error types and `Result` alias.

// crates.io
use http::StatusCode;

/// Library-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the Rownd SDK.
///
/// Variants fall into two families: authentication failures (the presented token is not
/// trustworthy, see [`AuthenticationError`]) and dependency failures (the issuer or the management
/// API is unreachable or returned something unusable). Configuration problems are reported through
/// [`Error::Validation`] and [`Error::Security`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// The presented token was rejected.
	#[error(transparent)]
	Authentication(#[from] AuthenticationError),

	/// The issuer could not be reached or answered with a non-success status.
	#[error("Upstream unavailable at {url}: {reason}")]
	UpstreamUnavailable {
		/// Endpoint that was requested.
		url: String,
		/// Short description of the failure.
		reason: String,
	},
	/// The issuer answered, but the body did not have the expected shape.
	#[error("Malformed response from {url}: {reason}")]
	MalformedResponse {
		/// Endpoint that was requested.
		url: String,
		/// Short description of the decoding failure.
		reason: String,
	},
	/// A published signing key could not be turned into a usable public key.
	#[error("Invalid key material for kid '{kid}': {reason}")]
	InvalidKeyMaterial {
		/// Key identifier of the offending record.
		kid: String,
		/// Short description of the decoding failure.
		reason: String,
	},
	/// The management API rejected a request.
	#[error("Rownd API error ({status}): {message}")]
	Api {
		/// HTTP status returned by the API.
		status: StatusCode,
		/// Error message extracted from the response body.
		message: String,
	},

	/// A URL in the configuration could not be parsed.
	#[error(transparent)]
	Url(#[from] url::ParseError),
	/// A security policy rejected the configuration or an advertised endpoint.
	#[error("Security violation: {0}")]
	Security(String),
	/// A configuration value or call argument violated its constraints.
	#[error("Validation failed for {field}: {reason}")]
	Validation {
		/// Name of the offending field or argument.
		field: &'static str,
		/// Human readable reason.
		reason: String,
	},

	#[cfg(feature = "prometheus")]
	/// The metrics recorder could not be installed.
	#[error("Metrics error: {0}")]
	Metrics(String),
}
impl Error {
	/// Whether the error means the token itself was rejected.
	pub fn is_authentication(&self) -> bool {
		matches!(self, Self::Authentication(_))
	}

	/// Whether the error reflects an unhealthy dependency rather than a bad token.
	pub fn is_dependency(&self) -> bool {
		matches!(
			self,
			Self::UpstreamUnavailable { .. }
				| Self::MalformedResponse { .. }
				| Self::InvalidKeyMaterial { .. }
		)
	}

	/// Authentication failure carried by this error, if any.
	pub fn as_authentication(&self) -> Option<&AuthenticationError> {
		match self {
			Self::Authentication(err) => Some(err),
			_ => None,
		}
	}

	/// HTTP status an outer transport layer should answer with.
	///
	/// Authentication failures are 401. Issuer failures are 5xx since they say nothing about
	/// the token.
	pub fn status_code(&self) -> StatusCode {
		match self {
			Self::Authentication(_) => StatusCode::UNAUTHORIZED,
			Self::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
			Self::MalformedResponse { .. } | Self::InvalidKeyMaterial { .. } =>
				StatusCode::BAD_GATEWAY,
			Self::Api { status, .. } => *status,
			_ => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	pub(crate) fn upstream(url: impl ToString, reason: impl Into<String>) -> Self {
		Self::UpstreamUnavailable { url: url.to_string(), reason: reason.into() }
	}

	pub(crate) fn malformed(url: impl ToString, reason: impl Into<String>) -> Self {
		Self::MalformedResponse { url: url.to_string(), reason: reason.into() }
	}
}

/// Reasons a bearer token is rejected.
///
/// Messages are short and safe to return to clients; they never contain key material.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthenticationError {
	/// The token is not a well-formed compact JWS or its header cannot be decoded.
	#[error("Invalid token format")]
	InvalidTokenFormat,
	/// The token header carries no `kid`.
	#[error("No 'kid' in token headers")]
	MissingKeyId,
	/// No published key matches the token's `kid`.
	#[error("No matching key found for kid: {kid}")]
	KeyNotFound {
		/// Key identifier taken from the token header.
		kid: String,
	},
	/// The signature does not verify under the selected key.
	#[error("Invalid signature")]
	InvalidSignature,
	/// The audience claim is missing or does not name this application.
	#[error("Invalid audience")]
	InvalidAudience,
	/// The expiration claim is in the past.
	#[error("Token has expired")]
	TokenExpired,
	/// A required claim is missing or invalid.
	#[error("Token validation failed: {0}")]
	InvalidClaims(String),
}
