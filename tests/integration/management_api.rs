//! User, group and magic-link API clients against a mock Rownd API.

mod common;

// crates.io
use http::StatusCode;
use rownd::{
	ClientConfig, Error, Result, RowndClient,
	api::{
		groups::{GroupInviteRequest, GroupMemberRequest, GroupRequest, InviteRecipient},
		magic_links::MagicLinkRequest,
	},
};
use serde_json::{Map, Value, json};
use wiremock::{
	Mock, MockBuilder, MockServer, ResponseTemplate,
	matchers::{body_json, header, method, path},
};
// self
use common::*;

fn object(value: Value) -> Map<String, Value> {
	value.as_object().cloned().expect("object")
}

/// A request matcher that also checks the credentials headers.
fn api_call(verb: &str, route: String) -> MockBuilder {
	Mock::given(method(verb))
		.and(path(route))
		.and(header("x-rownd-app-key", "app-key"))
		.and(header("x-rownd-app-secret", "app-secret"))
		.and(header("content-type", "application/json"))
}

fn user_route(user_id: &str) -> String {
	format!("/applications/{APP_ID}/users/{user_id}/data")
}

#[tokio::test]
async fn user_lifecycle() -> Result<()> {
	init_tracing();

	let server = MockServer::start().await;

	mount_metadata(&server, 1).await;
	mount_keys(&server, key_set_body(&[KID]), 1).await;
	api_call("GET", user_route("user_123"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"data": { "email": "ada@example.com", "first_name": "Ada" },
			"state": "enabled",
			"auth_level": "verified",
			"groups": [],
			"attributes": { "plan": "pro" }
		})))
		.expect(2)
		.mount(&server)
		.await;
	api_call("PUT", user_route("__UUID__"))
		.and(body_json(json!({ "data": { "email": "new@example.com" } })))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"data": { "email": "new@example.com", "user_id": "user_new" }
		})))
		.expect(1)
		.mount(&server)
		.await;
	api_call("PATCH", user_route("user_123"))
		.and(body_json(json!({ "data": { "first_name": "Grace" } })))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"data": { "email": "ada@example.com", "first_name": "Grace" }
		})))
		.expect(1)
		.mount(&server)
		.await;
	api_call("PUT", format!("/applications/{APP_ID}/users/user_123/data/fields/first_name"))
		.and(body_json(json!({ "value": "Ada" })))
		.respond_with(ResponseTemplate::new(204))
		.expect(1)
		.mount(&server)
		.await;
	api_call("DELETE", user_route("user_123"))
		.respond_with(ResponseTemplate::new(204))
		.expect(1)
		.mount(&server)
		.await;

	let client = RowndClient::new(config(&server))?;
	let token = client.validate_token(&sign(&valid_claims(&server), Some(KID))).await?;
	let users = client.users();
	let user = users.get_user("user_123", Some(&token)).await?;

	assert_eq!(user.id, "user_123");
	assert_eq!(user.state.as_deref(), Some("enabled"));
	assert_eq!(user.extra.get("attributes"), Some(&json!({ "plan": "pro" })));
	assert_eq!(
		users.get_user_field(APP_ID, "user_123", "email").await?,
		Some(json!("ada@example.com"))
	);

	let created =
		users.update_user(APP_ID, "", object(json!({ "email": "new@example.com" }))).await?;

	assert_eq!(created.id, "user_new");

	let patched =
		users.patch_user(APP_ID, "user_123", object(json!({ "first_name": "Grace" }))).await?;

	assert_eq!(patched.data.get("first_name"), Some(&json!("Grace")));

	users.update_user_field(APP_ID, "user_123", "first_name", json!("Ada")).await?;
	users.delete_user(APP_ID, "user_123").await?;

	Ok(())
}

#[tokio::test]
async fn api_errors_carry_status_and_message() {
	init_tracing();

	let server = MockServer::start().await;

	api_call("GET", user_route("missing"))
		.respond_with(
			ResponseTemplate::new(404).set_body_json(json!({ "message": "User not found" })),
		)
		.mount(&server)
		.await;

	let client = RowndClient::new(config(&server)).expect("client");
	let err = client.users().get_user("missing", None).await.unwrap_err();

	match &err {
		Error::Api { status, message } => {
			assert_eq!(*status, StatusCode::NOT_FOUND);
			assert_eq!(message, "User not found");
		},
		other => panic!("expected API error, got {other:?}"),
	}

	assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
	assert!(!err.is_authentication());
}

#[tokio::test]
async fn user_lookup_needs_an_application_id() {
	init_tracing();

	let server = MockServer::start().await;
	let config = ClientConfig::new("app-key", "app-secret")
		.expect("config")
		.with_base_url(server.uri())
		.expect("base url")
		.with_require_https(false);
	let client = RowndClient::new(config).expect("client");
	let err = client.users().get_user("user_123", None).await.unwrap_err();

	assert!(matches!(err, Error::Validation { field: "app_id", .. }));

	let err = client.users().delete_user(APP_ID, "").await.unwrap_err();

	assert!(matches!(err, Error::Validation { field: "user_id", .. }));
	assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn group_membership_and_invites() -> Result<()> {
	init_tracing();

	let server = MockServer::start().await;
	let groups_route = format!("/applications/{APP_ID}/groups");

	api_call("POST", groups_route.clone())
		.and(body_json(json!({ "name": "Team", "admission_policy": "open", "meta": {} })))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"id": "group_1",
			"name": "Team",
			"admission_policy": "open",
			"member_count": 0
		})))
		.expect(1)
		.mount(&server)
		.await;
	api_call("POST", format!("{groups_route}/group_1/members"))
		.and(body_json(json!({ "user_id": "user_123", "roles": ["owner"], "state": "active" })))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"id": "member_1",
			"user_id": "user_123",
			"roles": ["owner"],
			"state": "active"
		})))
		.expect(1)
		.mount(&server)
		.await;
	api_call("GET", format!("{groups_route}/group_1/members"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"total_results": 1,
			"results": [{ "id": "member_1", "user_id": "user_123", "roles": ["owner"] }]
		})))
		.expect(1)
		.mount(&server)
		.await;
	api_call("POST", format!("{groups_route}/group_1/invites"))
		.and(body_json(json!({
			"email": "grace@example.com",
			"roles": ["member"],
			"redirect_url": "https://app.example.com/welcome"
		})))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"id": "invite_1",
			"group_id": "group_1",
			"email": "grace@example.com",
			"status": "pending"
		})))
		.expect(1)
		.mount(&server)
		.await;
	api_call("DELETE", format!("{groups_route}/group_1"))
		.respond_with(ResponseTemplate::new(204))
		.expect(1)
		.mount(&server)
		.await;

	let client = RowndClient::new(config(&server))?;
	let groups = client.groups();
	let group = groups.create_group(APP_ID, &GroupRequest::new("Team", "open")).await?;

	assert_eq!(group.id, "group_1");
	assert_eq!(group.extra.get("member_count"), Some(&json!(0)));

	let member = groups
		.add_group_member(APP_ID, &group.id, &GroupMemberRequest {
			user_id: "user_123".into(),
			roles: vec!["owner".into()],
			state: "active".into(),
		})
		.await?;

	assert_eq!(member.roles, vec!["owner".to_string()]);

	let members = groups.list_group_members(APP_ID, &group.id).await?;

	assert_eq!(members.total_results, Some(1));
	assert_eq!(members.results[0].user_id, "user_123");

	let invite = groups
		.create_group_invite(
			APP_ID,
			&group.id,
			&GroupInviteRequest::new(
				InviteRecipient::Email("grace@example.com".into()),
				vec!["member".into()],
			)
			.with_redirect_url("https://app.example.com/welcome"),
		)
		.await?;

	assert_eq!(invite.status.as_deref(), Some("pending"));

	let err = groups
		.create_group_invite(
			APP_ID,
			&group.id,
			&GroupInviteRequest::new(InviteRecipient::UserId("user_9".into()), Vec::new()),
		)
		.await
		.unwrap_err();

	assert!(matches!(err, Error::Validation { field: "roles", .. }));

	groups.delete_group(APP_ID, &group.id).await?;

	Ok(())
}

#[tokio::test]
async fn magic_links_require_ok_status() -> Result<()> {
	init_tracing();

	let server = MockServer::start().await;

	api_call("POST", "/hub/auth/magic".into())
		.and(body_json(json!({
			"purpose": "auth",
			"verification_type": "email",
			"data": { "email": "ada@example.com" },
			"redirect_url": "https://app.example.com",
			"group_to_join": "group_1"
		})))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"link": "https://rownd.link/abc123",
			"app_user_id": "user_123"
		})))
		.expect(1)
		.mount(&server)
		.await;
	api_call("POST", "/hub/auth/magic".into())
		.and(body_json(json!({
			"purpose": "verify",
			"verification_type": "phone",
			"data": {}
		})))
		.respond_with(ResponseTemplate::new(201).set_body_json(json!({ "link": "ignored" })))
		.expect(1)
		.mount(&server)
		.await;

	let client = RowndClient::new(config(&server))?;
	let link = client
		.magic_links()
		.create_magic_link(
			&MagicLinkRequest::new("email", object(json!({ "email": "ada@example.com" })))
				.with_redirect_url("https://app.example.com")
				.with_group_to_join("group_1"),
		)
		.await?;

	assert_eq!(link.link, "https://rownd.link/abc123");
	assert_eq!(link.app_user_id.as_deref(), Some("user_123"));

	let err = client
		.magic_links()
		.create_magic_link(&MagicLinkRequest::new("phone", Map::new()).with_purpose("verify"))
		.await
		.unwrap_err();

	assert!(matches!(err, Error::Api { status, .. } if status == StatusCode::CREATED));

	Ok(())
}
