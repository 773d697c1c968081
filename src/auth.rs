//! Token validation: issuer discovery, key resolution and claim verification.

pub mod claims;
pub mod keys;
pub mod metadata;
pub mod verifier;

// self
use crate::{_prelude::*, error::AuthenticationError};

const BEARER_SCHEME: &str = "Bearer";

/// Extract the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively. Anything other than a non-empty bearer credential is
/// reported as [`AuthenticationError::InvalidTokenFormat`].
pub fn bearer_token(header_value: &str) -> Result<&str> {
	let (scheme, token) = header_value
		.trim()
		.split_once(' ')
		.ok_or(AuthenticationError::InvalidTokenFormat)?;
	let token = token.trim();

	if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) || token.is_empty() {
		return Err(AuthenticationError::InvalidTokenFormat.into());
	}

	Ok(token)
}
