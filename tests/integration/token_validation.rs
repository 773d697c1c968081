//! End-to-end token validation against a mock issuer.

mod common;

// std
use std::time::Duration;
// crates.io
use http::StatusCode;
use rownd::{AuthLevel, AuthenticationError, Error, Result, RowndClient, config::WELL_KNOWN_PATH};
use serde_json::{Value, json};
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{method, path},
};
// self
use common::*;

async fn healthy_issuer() -> MockServer {
	let server = MockServer::start().await;

	mount_metadata(&server, 1).await;
	mount_keys(&server, key_set_body(&[KID]), 1).await;

	server
}

fn client(server: &MockServer) -> RowndClient {
	RowndClient::new(config(server)).expect("client")
}

async fn rejection(client: &RowndClient, token: &str) -> AuthenticationError {
	let err = client.validate_token(token).await.unwrap_err();

	assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED, "unexpected error {err:?}");

	err.as_authentication().cloned().expect("authentication error")
}

#[tokio::test]
async fn valid_token_round_trips_its_claims() -> Result<()> {
	init_tracing();

	let server = healthy_issuer().await;
	let client = client(&server);
	let claims = valid_claims(&server);
	let token = sign(&claims, Some(KID));
	let validated = client.validate_token(&token).await?;

	assert_eq!(validated.access_token(), token);
	assert_eq!(&Value::Object(validated.claims().as_map().clone()), &claims);
	assert_eq!(validated.claims().app_user_id(), Some("user_123"));
	assert_eq!(validated.claims().is_verified_user(), Some(true));
	assert_eq!(validated.claims().auth_level(), Some(AuthLevel::Verified));
	assert_eq!(validated.claims().app_id(), Some(APP_ID));

	Ok(())
}

#[tokio::test]
async fn authorization_header_is_accepted() -> Result<()> {
	init_tracing();

	let server = healthy_issuer().await;
	let client = client(&server);
	let token = sign(&valid_claims(&server), Some(KID));
	let validated = client.authenticate(&format!("Bearer {token}")).await?;

	assert_eq!(validated.access_token(), token);

	let err = client.authenticate(&format!("Basic {token}")).await.unwrap_err();

	assert_eq!(err.as_authentication(), Some(&AuthenticationError::InvalidTokenFormat));

	Ok(())
}

#[tokio::test]
async fn expiry_boundary_is_exact() -> Result<()> {
	init_tracing();

	let server = healthy_issuer().await;
	let client = client(&server);

	// Warm the caches so the clock does not move between signing and checking.
	client.verifier()?.key_set().await?;

	// One clock reading for both tokens; `exp = now + 1` survives a single second ticking over.
	let now = now();
	let claims = valid_claims(&server);
	let expired = sign(&with_claim(claims.clone(), "exp", json!(now - 1)), Some(KID));
	let fresh = sign(&with_claim(claims, "exp", json!(now + 1)), Some(KID));

	assert_eq!(rejection(&client, &expired).await, AuthenticationError::TokenExpired);
	assert!(client.validate_token(&fresh).await.is_ok());

	Ok(())
}

#[tokio::test]
async fn wrong_audience_is_reported_before_expiry() {
	init_tracing();

	let server = healthy_issuer().await;
	let client = client(&server);
	let claims = with_claim(valid_claims(&server), "aud", json!("app:other-app-id"));
	let expired_and_misrouted = sign(&with_claim(claims, "exp", json!(now() - 600)), Some(KID));

	assert_eq!(
		rejection(&client, &expired_and_misrouted).await,
		AuthenticationError::InvalidAudience
	);

	let no_audience = sign(&with_claim(valid_claims(&server), "aud", Value::Null), Some(KID));
	let mut null_audience = valid_claims(&server);

	null_audience["aud"] = Value::Null;

	let unusable_audiences = [
		no_audience,
		sign(&null_audience, Some(KID)),
		sign(&with_claim(valid_claims(&server), "aud", json!({ "app": APP_ID })), Some(KID)),
		sign(&with_claim(valid_claims(&server), "aud", json!([])), Some(KID)),
		sign(&with_claim(valid_claims(&server), "aud", json!(42)), Some(KID)),
	];

	for token in unusable_audiences {
		assert_eq!(rejection(&client, &token).await, AuthenticationError::InvalidAudience);
	}
}

#[tokio::test]
async fn malformed_tokens_are_rejected() {
	init_tracing();

	let server = healthy_issuer().await;
	let client = client(&server);

	for token in ["not-a-token", "a.b.c", ""] {
		assert_eq!(rejection(&client, token).await, AuthenticationError::InvalidTokenFormat);
	}

	let no_kid = sign(&valid_claims(&server), None);

	assert_eq!(rejection(&client, &no_kid).await, AuthenticationError::MissingKeyId);

	let unknown_kid = sign(&valid_claims(&server), Some("sig-unknown"));

	assert_eq!(
		rejection(&client, &unknown_kid).await,
		AuthenticationError::KeyNotFound { kid: "sig-unknown".into() }
	);
}

#[tokio::test]
async fn foreign_signature_is_rejected() {
	init_tracing();

	let server = healthy_issuer().await;
	let client = client(&server);
	let genuine = sign(&valid_claims(&server), Some(KID));
	let other = sign(&with_claim(valid_claims(&server), "sub", json!("attacker")), Some(KID));
	let (genuine_head, _) = genuine.rsplit_once('.').expect("signature");
	let (_, other_signature) = other.rsplit_once('.').expect("signature");
	let spliced = format!("{genuine_head}.{other_signature}");

	assert_eq!(rejection(&client, &spliced).await, AuthenticationError::InvalidSignature);
}

#[tokio::test]
async fn issuer_and_issue_time_are_required() {
	init_tracing();

	let server = healthy_issuer().await;
	let client = client(&server);
	let cases = [
		with_claim(valid_claims(&server), "iss", json!("https://evil.example.com")),
		with_claim(valid_claims(&server), "iss", Value::Null),
		with_claim(valid_claims(&server), "iat", Value::Null),
		with_claim(valid_claims(&server), "iat", json!(now() + 600)),
		with_claim(valid_claims(&server), "exp", Value::Null),
		with_claim(valid_claims(&server), "nbf", json!(now() + 600)),
	];

	for claims in cases {
		let token = sign(&claims, Some(KID));

		assert!(
			matches!(rejection(&client, &token).await, AuthenticationError::InvalidClaims(_)),
			"claims {claims} should fail"
		);
	}
}

#[tokio::test]
async fn elapsed_not_before_is_accepted() -> Result<()> {
	init_tracing();

	let server = healthy_issuer().await;
	let client = client(&server);
	let token = sign(&with_claim(valid_claims(&server), "nbf", json!(now() - 60)), Some(KID));

	client.validate_token(&token).await?;

	Ok(())
}

#[tokio::test]
async fn oversized_leeway_is_refused_up_front() {
	init_tracing();

	let server = MockServer::start().await;

	for leeway in [Duration::from_secs(301), Duration::from_secs(u64::MAX)] {
		let err = RowndClient::new(config(&server).with_leeway(leeway)).unwrap_err();

		assert!(matches!(err, Error::Validation { field: "leeway", .. }), "unexpected error {err:?}");
	}

	let client = RowndClient::new(config(&server).with_leeway(Duration::from_secs(300)));

	assert!(client.is_ok());
	assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn repeated_validation_is_idempotent() -> Result<()> {
	init_tracing();

	let server = healthy_issuer().await;
	let client = client(&server);
	let token = sign(&valid_claims(&server), Some(KID));
	let first = client.validate_token(&token).await?;
	let second = client.validate_token(&token).await?;

	assert_eq!(first, second);

	Ok(())
}

#[tokio::test]
async fn issuer_documents_are_cached_for_the_ttl() -> Result<()> {
	init_tracing();

	let server = MockServer::start().await;

	mount_metadata(&server, 2).await;
	mount_keys(&server, key_set_body(&[KID]), 2).await;

	let client =
		RowndClient::new(config(&server).with_cache_ttl(Duration::from_secs(1))).expect("client");
	let verifier = client.verifier()?;
	let token = sign(&valid_claims(&server), Some(KID));

	verifier.validate_token(&token).await?;
	verifier.validate_token(&token).await?;

	let snapshot = verifier.metrics().snapshot();

	assert_eq!(snapshot.metadata_fetches, 1);
	assert_eq!(snapshot.key_set_fetches, 1);
	assert_eq!(snapshot.cache_hits, 2);

	tokio::time::sleep(Duration::from_millis(1_100)).await;
	verifier.validate_token(&token).await?;

	let snapshot = verifier.metrics().snapshot();

	assert_eq!(snapshot.metadata_fetches, 2);
	assert_eq!(snapshot.key_set_fetches, 2);
	assert_eq!(snapshot.validations, 3);
	assert_eq!(snapshot.accepted, 3);

	server.verify().await;

	Ok(())
}

#[tokio::test]
async fn issuer_outage_is_a_dependency_error() {
	init_tracing();

	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path(WELL_KNOWN_PATH))
		.respond_with(ResponseTemplate::new(503))
		.mount(&server)
		.await;

	let client = client(&server);
	let err = client.validate_token("not-a-token").await.unwrap_err();

	assert!(matches!(err, Error::UpstreamUnavailable { .. }), "unexpected error {err:?}");
	assert!(!err.is_authentication());
	assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
	assert_eq!(client.verifier().expect("verifier").metrics().snapshot().fetch_errors, 1);
}

#[tokio::test]
async fn unusable_issuer_documents_are_malformed_responses() {
	init_tracing();

	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path(WELL_KNOWN_PATH))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({ "issuer": "x" })))
		.mount(&server)
		.await;

	let err = client(&server).validate_token("not-a-token").await.unwrap_err();

	assert!(matches!(err, Error::MalformedResponse { .. }), "unexpected error {err:?}");
	assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn oversized_key_sets_are_refused() {
	init_tracing();

	let server = MockServer::start().await;
	let kids = (0..32).map(|i| format!("sig-{i}")).collect::<Vec<_>>();
	let kids = kids.iter().map(String::as_str).collect::<Vec<_>>();

	mount_metadata(&server, 1).await;
	mount_keys(&server, key_set_body(&kids), 1).await;

	let client =
		RowndClient::new(config(&server).with_max_response_bytes(1_024)).expect("client");
	let err = client.validate_token("not-a-token").await.unwrap_err();

	assert!(matches!(err, Error::MalformedResponse { .. }), "unexpected error {err:?}");
	assert!(err.to_string().contains("exceeds"), "unexpected message {err}");
}

#[tokio::test]
async fn advertised_key_location_must_be_allowlisted() {
	init_tracing();

	let server = MockServer::start().await;

	mount_metadata(&server, 1).await;

	let client =
		RowndClient::new(config(&server).add_allowed_domain("rownd.io")).expect("client");
	let err = client.validate_token("not-a-token").await.unwrap_err();

	assert!(matches!(err, Error::MalformedResponse { .. }), "unexpected error {err:?}");
}
