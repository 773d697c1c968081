//! Groups, their members and invitations.

// crates.io
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;
// self
use crate::{
	_prelude::*,
	api::{ApiClient, ListResponse, require},
};

/// A group of users within an application.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
	/// Group id.
	#[serde(default)]
	pub id: String,
	/// Display name.
	#[serde(default)]
	pub name: String,
	/// How users may join, e.g. `open` or `invite_only`.
	#[serde(default)]
	pub admission_policy: Option<String>,
	/// Free-form metadata.
	#[serde(default)]
	pub meta: Map<String, Value>,
	/// Fields not modelled above.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// Fields sent when creating or updating a group. Unset fields are left out of the request.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GroupRequest {
	/// Display name.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Admission policy.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub admission_policy: Option<String>,
	/// Free-form metadata.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub meta: Option<Map<String, Value>>,
}
impl GroupRequest {
	/// Request for a new group.
	pub fn new(name: impl Into<String>, admission_policy: impl Into<String>) -> Self {
		Self {
			name: Some(name.into()),
			admission_policy: Some(admission_policy.into()),
			meta: Some(Map::new()),
		}
	}

	/// Attach metadata.
	pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
		self.meta = Some(meta);

		self
	}
}

/// A user's membership in a group.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
	/// Membership id.
	#[serde(default)]
	pub id: String,
	/// Member's user id.
	#[serde(default)]
	pub user_id: String,
	/// Roles held within the group.
	#[serde(default)]
	pub roles: Vec<String>,
	/// Membership state, e.g. `active`.
	#[serde(default)]
	pub state: Option<String>,
	/// Subset of the member's profile.
	#[serde(default)]
	pub profile: Option<Map<String, Value>>,
	/// Fields not modelled above.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// Membership fields sent when adding or updating a member.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupMemberRequest {
	/// Member's user id.
	pub user_id: String,
	/// Roles to grant.
	pub roles: Vec<String>,
	/// Membership state.
	pub state: String,
}

/// Who an invitation is addressed to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteRecipient {
	/// Invite by email address.
	Email(String),
	/// Invite an existing user.
	UserId(String),
	/// Invite by phone number.
	Phone(String),
}
impl InviteRecipient {
	fn value(&self) -> &str {
		match self {
			Self::Email(value) | Self::UserId(value) | Self::Phone(value) => value,
		}
	}
}

/// Body of an invitation request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupInviteRequest {
	/// Invitee.
	#[serde(flatten)]
	pub recipient: InviteRecipient,
	/// Roles granted on acceptance; at least one is required.
	pub roles: Vec<String>,
	/// Where the invitee lands after accepting.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub redirect_url: Option<String>,
}
impl GroupInviteRequest {
	/// Invitation for `recipient` with `roles`.
	pub fn new(recipient: InviteRecipient, roles: Vec<String>) -> Self {
		Self { recipient, roles, redirect_url: None }
	}

	/// Set the post-acceptance redirect.
	pub fn with_redirect_url(mut self, redirect_url: impl Into<String>) -> Self {
		self.redirect_url = Some(redirect_url.into());

		self
	}

	fn validate(&self) -> Result<()> {
		require("recipient", self.recipient.value())?;

		if self.roles.is_empty() || self.roles.iter().any(|role| role.trim().is_empty()) {
			return Err(Error::Validation {
				field: "roles",
				reason: "At least one non-empty role is required.".into(),
			});
		}

		Ok(())
	}
}

/// An invitation as returned by the API.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupInvite {
	/// Invitation id.
	#[serde(default)]
	pub id: String,
	/// Group the invitation is for.
	#[serde(default)]
	pub group_id: Option<String>,
	/// Invitee email, when invited by email.
	#[serde(default)]
	pub email: Option<String>,
	/// Invitation state.
	#[serde(default)]
	pub status: Option<String>,
	/// Expiry, as reported by the API.
	#[serde(default)]
	pub expires_at: Option<String>,
	/// Fields not modelled above.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// Client for `/applications/{app_id}/groups`.
#[derive(Clone, Debug)]
pub struct Groups {
	api: ApiClient,
}
impl Groups {
	/// Wrap a shared API client.
	pub fn new(api: ApiClient) -> Self {
		Self { api }
	}

	/// Create a group.
	#[tracing::instrument(skip(self, request))]
	pub async fn create_group(&self, app_id: &str, request: &GroupRequest) -> Result<Group> {
		require("app_id", app_id)?;
		require("name", request.name.as_deref().unwrap_or_default())?;

		self.api.send(Method::POST, self.groups_url(app_id, &[])?, Some(request)).await?.into_body()
	}

	/// Fetch a group.
	pub async fn get_group(&self, app_id: &str, group_id: &str) -> Result<Group> {
		require("app_id", app_id)?;
		require("group_id", group_id)?;

		self.api.get(self.groups_url(app_id, &[group_id])?).await
	}

	/// List the application's groups.
	pub async fn list_groups(&self, app_id: &str) -> Result<ListResponse<Group>> {
		require("app_id", app_id)?;

		self.api.get(self.groups_url(app_id, &[])?).await
	}

	/// Update a group.
	pub async fn update_group(
		&self,
		app_id: &str,
		group_id: &str,
		request: &GroupRequest,
	) -> Result<Group> {
		require("app_id", app_id)?;
		require("group_id", group_id)?;

		self.api
			.send(Method::PUT, self.groups_url(app_id, &[group_id])?, Some(request))
			.await?
			.into_body()
	}

	/// Delete a group.
	#[tracing::instrument(skip(self))]
	pub async fn delete_group(&self, app_id: &str, group_id: &str) -> Result<()> {
		require("app_id", app_id)?;
		require("group_id", group_id)?;

		self.api.delete(self.groups_url(app_id, &[group_id])?).await
	}

	/// Add a member to a group.
	pub async fn add_group_member(
		&self,
		app_id: &str,
		group_id: &str,
		member: &GroupMemberRequest,
	) -> Result<GroupMember> {
		require("app_id", app_id)?;
		require("group_id", group_id)?;
		require("user_id", &member.user_id)?;

		self.api
			.send(Method::POST, self.groups_url(app_id, &[group_id, "members"])?, Some(member))
			.await?
			.into_body()
	}

	/// List a group's members.
	pub async fn list_group_members(
		&self,
		app_id: &str,
		group_id: &str,
	) -> Result<ListResponse<GroupMember>> {
		require("app_id", app_id)?;
		require("group_id", group_id)?;

		self.api.get(self.groups_url(app_id, &[group_id, "members"])?).await
	}

	/// Replace a member's roles or state.
	pub async fn update_group_member(
		&self,
		app_id: &str,
		group_id: &str,
		member_id: &str,
		member: &GroupMemberRequest,
	) -> Result<GroupMember> {
		require("app_id", app_id)?;
		require("group_id", group_id)?;
		require("member_id", member_id)?;

		self.api
			.send(
				Method::PUT,
				self.groups_url(app_id, &[group_id, "members", member_id])?,
				Some(member),
			)
			.await?
			.into_body()
	}

	/// Remove a member from a group.
	pub async fn delete_group_member(
		&self,
		app_id: &str,
		group_id: &str,
		member_id: &str,
	) -> Result<()> {
		require("app_id", app_id)?;
		require("group_id", group_id)?;
		require("member_id", member_id)?;

		self.api.delete(self.groups_url(app_id, &[group_id, "members", member_id])?).await
	}

	/// Invite someone to a group.
	#[tracing::instrument(skip(self, invite))]
	pub async fn create_group_invite(
		&self,
		app_id: &str,
		group_id: &str,
		invite: &GroupInviteRequest,
	) -> Result<GroupInvite> {
		require("app_id", app_id)?;
		require("group_id", group_id)?;
		invite.validate()?;

		self.api
			.send(Method::POST, self.groups_url(app_id, &[group_id, "invites"])?, Some(invite))
			.await?
			.into_body()
	}

	fn groups_url(&self, app_id: &str, rest: &[&str]) -> Result<Url> {
		let mut segments = vec!["applications", app_id, "groups"];

		segments.extend_from_slice(rest);

		self.api.url(&segments)
	}
}
