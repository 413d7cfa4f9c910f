//! The `/users` resource.

use super::{ApiClient, ApiResponse};
use crate::result::AccesoResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Collection path
pub const USERS_PATH: &str = "/users";

/// Creation payload; every field is mandatory server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// Login name
    pub username: String,
}

impl NewUser {
    /// A user whose email and username will not collide with earlier runs.
    #[must_use]
    pub fn unique(name: impl Into<String>, prefix: &str) -> Self {
        let tag = format!("{prefix}{}", Uuid::new_v4().simple());
        Self {
            name: name.into(),
            email: format!("{tag}@example.com"),
            username: tag,
        }
    }
}

/// Update payload for PUT and PATCH; absent fields are left out of the body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Login name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Server-assigned user id. Numeric on the reference service; some
/// deployments hand out strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    /// Integer id
    Number(u64),
    /// Opaque string id
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self::Number(id)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

impl PartialEq<u64> for UserId {
    fn eq(&self, other: &u64) -> bool {
        matches!(self, Self::Number(n) if n == other)
    }
}

/// A user as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Server-assigned id
    pub id: UserId,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// Login name
    #[serde(default)]
    pub username: Option<String>,
    /// Role
    #[serde(default)]
    pub role: Option<String>,
}

/// `GET /users` body: either a bare array or a pagination envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserListing {
    /// Plain array
    Bare(Vec<User>),
    /// `{ data, page, limit }`
    Paged {
        /// Users on this page
        data: Vec<User>,
        /// Page number
        page: u32,
        /// Page size
        limit: u32,
    },
}

impl UserListing {
    /// Users in the listing, whatever its shape
    #[must_use]
    pub fn users(&self) -> &[User] {
        match self {
            Self::Bare(users) | Self::Paged { data: users, .. } => users,
        }
    }

    /// Page size, when the server reported one
    #[must_use]
    pub const fn limit(&self) -> Option<u32> {
        match self {
            Self::Bare(_) => None,
            Self::Paged { limit, .. } => Some(*limit),
        }
    }

    /// Page number, when the server reported one
    #[must_use]
    pub const fn page(&self) -> Option<u32> {
        match self {
            Self::Bare(_) => None,
            Self::Paged { page, .. } => Some(*page),
        }
    }
}

/// Body of a 4xx response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// What was wrong with the request
    pub error: String,
}

/// Typed requests against `/users`. Responses are returned unmodified.
#[derive(Debug, Clone, Copy)]
pub struct UsersApi<'a> {
    client: &'a ApiClient,
}

impl<'a> UsersApi<'a> {
    /// Wrap `client`
    #[must_use]
    pub const fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// `GET /users`, with an optional raw query string (`page=1&limit=10`)
    pub async fn list(&self, query: Option<&str>) -> AccesoResult<ApiResponse> {
        let path = match query {
            Some(q) if !q.is_empty() => format!("{USERS_PATH}?{q}"),
            _ => USERS_PATH.to_string(),
        };
        self.client.get(&path, &[]).await
    }

    /// `GET /users/{id}`
    pub async fn get(&self, id: impl Into<UserId>) -> AccesoResult<ApiResponse> {
        self.client.get(&item_path(&id.into()), &[]).await
    }

    /// `POST /users`
    pub async fn create(&self, user: &NewUser) -> AccesoResult<ApiResponse> {
        let body = serde_json::to_value(user)?;
        self.client.post(USERS_PATH, Some(&body), &[]).await
    }

    /// `PUT /users/{id}`
    pub async fn update(
        &self,
        id: impl Into<UserId>,
        update: &UserUpdate,
    ) -> AccesoResult<ApiResponse> {
        let body = serde_json::to_value(update)?;
        self.client.put(&item_path(&id.into()), Some(&body), &[]).await
    }

    /// `PATCH /users/{id}`
    pub async fn patch(
        &self,
        id: impl Into<UserId>,
        update: &UserUpdate,
    ) -> AccesoResult<ApiResponse> {
        let body = serde_json::to_value(update)?;
        self.client.patch(&item_path(&id.into()), Some(&body), &[]).await
    }

    /// `DELETE /users/{id}`
    pub async fn delete(&self, id: impl Into<UserId>) -> AccesoResult<ApiResponse> {
        self.client.delete(&item_path(&id.into()), &[]).await
    }
}

fn item_path(id: &UserId) -> String {
    format!("{USERS_PATH}/{id}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_accepts_bare_array() {
        let listing: UserListing =
            serde_json::from_str(r#"[{"id": 1, "name": "A", "role": "admin"}]"#).unwrap();
        assert_eq!(listing.users().len(), 1);
        assert_eq!(listing.limit(), None);
    }

    #[test]
    fn test_listing_accepts_envelope() {
        let listing: UserListing =
            serde_json::from_str(r#"{"data": [{"id": 2}], "page": 1, "limit": 10}"#).unwrap();
        assert_eq!(listing.users()[0].id, 2_u64);
        assert_eq!(listing.page(), Some(1));
        assert_eq!(listing.limit(), Some(10));
    }

    #[test]
    fn test_user_accepts_string_id() {
        let user: User =
            serde_json::from_str(r#"{"id": "6523c1e0a9", "name": "B"}"#).unwrap();
        assert_eq!(user.id, UserId::Text("6523c1e0a9".into()));
        assert_eq!(user.id.to_string(), "6523c1e0a9");
        assert_ne!(user.id, 6523_u64);

        let numeric: User = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        assert_eq!(numeric.id, 42_u64);
        assert_eq!(serde_json::to_string(&numeric.id).unwrap(), "42");
    }

    #[test]
    fn test_listing_rejects_other_shapes() {
        assert!(serde_json::from_str::<UserListing>(r#"{"users": []}"#).is_err());
    }

    #[test]
    fn test_update_omits_absent_fields() {
        let update = UserUpdate {
            name: Some("Partially Updated Name".into()),
            ..UserUpdate::default()
        };
        assert_eq!(
            serde_json::to_string(&update).unwrap(),
            r#"{"name":"Partially Updated Name"}"#
        );
    }

    #[test]
    fn test_unique_users_differ() {
        let a = NewUser::unique("Test User", "testuser");
        let b = NewUser::unique("Test User", "testuser");
        assert_ne!(a.email, b.email);
        assert!(a.email.starts_with("testuser"));
        assert!(a.email.ends_with("@example.com"));
        assert!(!a.username.contains('@'));
        assert_eq!(a.username.len(), "testuser".len() + 32);
    }

    #[test]
    fn test_item_path() {
        assert_eq!(item_path(&UserId::from(99_999_u64)), "/users/99999");
        assert_eq!(item_path(&UserId::from("u-7f3a")), "/users/u-7f3a");
    }
}
