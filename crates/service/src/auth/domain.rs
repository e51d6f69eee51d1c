use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use common::types::Base64;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity operation requested by a call. Chosen by the route, never by the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    SignUp,
    Login,
    SendCode,
    ChangePassword,
    ResetPassword,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::SignUp,
        ActionKind::Login,
        ActionKind::SendCode,
        ActionKind::ChangePassword,
        ActionKind::ResetPassword,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::SignUp => "sign-up",
            ActionKind::Login => "login",
            ActionKind::SendCode => "send-code",
            ActionKind::ChangePassword => "change-password",
            ActionKind::ResetPassword => "reset-password",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials / identity payload.
///
/// `action` is ignored when reading a request body and is only ever set by
/// the dispatcher; it is written back out when the DTO is echoed. On input the
/// account may also arrive as `username` or `email`; see [`AuthDtoBody`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "AuthDtoBody")]
pub struct AuthDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mechanism: Option<String>,
    pub account: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Verification code, for sign-up / reset flows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
    pub success: bool,
}

/// Inbound form of [`AuthDto`]. `account`, `username` and `email` are separate
/// keys; the first non-blank one, in that order, becomes the account.
#[derive(Debug, Default, Deserialize)]
pub struct AuthDtoBody {
    #[serde(default)]
    mechanism: Option<String>,
    #[serde(default)]
    account: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    parameters: BTreeMap<String, String>,
    #[serde(default)]
    success: bool,
}

impl From<AuthDtoBody> for AuthDto {
    fn from(body: AuthDtoBody) -> Self {
        let account = [body.account, body.username, body.email]
            .into_iter()
            .flatten()
            .find(|a| !a.trim().is_empty())
            .unwrap_or_default();
        AuthDto {
            action: None,
            mechanism: body.mechanism,
            account,
            password: body.password,
            code: body.code,
            token: body.token,
            parameters: body.parameters,
            success: body.success,
        }
    }
}

/// User profile attached to a request (sign-up) or a response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

/// What a gateway receives: the stamped action plus everything bound from the body.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthRequest {
    pub action: ActionKind,
    pub auth: AuthDto,
    pub user: Option<UserDto>,
    pub new_password: Option<Base64>,
}

/// Stored account (business view)
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub account: String,
    pub name: String,
    pub email: Option<String>,
}

/// Stored credentials (hashed)
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user_id: Uuid,
    pub password_hash: String,
    pub password_algorithm: String,
}

/// Issued verification code for an account
#[derive(Debug, Clone)]
pub struct VerificationCode {
    pub account: String,
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Wrong guesses made against this code so far.
    pub attempts: u32,
}
