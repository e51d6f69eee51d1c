//! Request/response bodies for the `/auth` endpoints.

use common::types::Base64;
use serde::{Deserialize, Serialize};
use service::auth::{AuthDto, UserDto};

/// Paging window. Accepted on the wire; no auth action reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub page: u64,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub total: u64,
}

/// Fields shared by every view object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseVo {
    #[serde(default)]
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    /// Role filter. Carried but unused by the auth actions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

/// Body of every `/auth` request and response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthVo {
    #[serde(flatten)]
    pub base: BaseVo,
    #[serde(default)]
    pub auth: AuthDto,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserDto>,
    /// New password for sign-up, set-password and reset-password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_password: Option<Base64>,
    #[serde(default)]
    pub success: bool,
}
