//! Rownd SDK for Rust: validates Rownd-issued EdDSA bearer tokens against the issuer's cached
//! signing keys, and wraps the user, group and magic-link management API.
//!
//! ```no_run
//! # async fn run() -> rownd::Result<()> {
//! let config = rownd::ClientConfig::new("app-key", "app-secret")?.with_app_id("app-id");
//! let client = rownd::RowndClient::new(config)?;
//! let token = client.authenticate("Bearer eyJhbGciOiJFZERTQSJ9...").await?;
//!
//! println!("user {:?}", token.claims().app_user_id());
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod http;
pub mod metrics;
pub mod security;

mod client;
mod error;
mod _prelude {
	pub use std::{sync::Arc, time::Duration};

	pub use chrono::{DateTime, TimeDelta, Utc};
	pub use tokio::time::Instant;

	pub use crate::{Error, Result};
}

#[cfg(feature = "prometheus")] pub use crate::metrics::install_default_exporter;
pub use crate::{
	auth::{
		bearer_token,
		claims::{AuthLevel, ClaimSet, ValidatedToken},
		verifier::TokenVerifier,
	},
	client::RowndClient,
	config::ClientConfig,
	error::{AuthenticationError, Error, Result},
	metrics::{VerifierMetrics, VerifierMetricsSnapshot},
};
