use std::sync::Arc;

use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Header as JwtHeader, EncodingKey};
use rand::{rngs::OsRng, Rng};
use tracing::{info, debug, instrument, warn};

use super::domain::{ActionKind, AuthDto, AuthRequest, AuthUser, Credentials, VerificationCode};
use super::errors::AuthError;
use super::gateway::{AuthGateway, CallMeta};
use super::repository::AuthRepository;

/// Auth service configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub password_algorithm: String,
    pub token_ttl: Duration,
    pub code_ttl: Duration,
    pub code_resend_interval: Duration,
    /// Wrong guesses allowed before a verification code is discarded.
    pub code_max_attempts: u32,
    pub min_password_len: usize,
    pub sign_up_requires_code: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            password_algorithm: "argon2".into(),
            token_ttl: Duration::hours(12),
            code_ttl: Duration::minutes(5),
            code_resend_interval: Duration::minutes(1),
            code_max_attempts: 5,
            min_password_len: 8,
            sign_up_requires_code: false,
        }
    }
}

/// Auth business service independent of web framework
pub struct AuthService<R: AuthRepository> {
    repo: Arc<R>,
    cfg: AuthConfig,
}

impl<R: AuthRepository> AuthService<R> {
    pub fn new(repo: Arc<R>, cfg: AuthConfig) -> Self { Self { repo, cfg } }

    /// Register an account with a hashed password.
    ///
    /// The password comes from `new_password` when present, else from `auth.password`.
    #[instrument(skip(self, req), fields(account = %req.auth.account))]
    pub async fn sign_up(&self, req: &AuthRequest) -> Result<AuthDto, AuthError> {
        let account = require_account(&req.auth)?;
        let password = match new_password(req)? {
            Some(p) => p,
            None => req.auth.password.clone().unwrap_or_default(),
        };
        self.check_password_policy(&password)?;

        if let Some(existing) = self.repo.find_user_by_account(account).await? {
            debug!("account exists: {}", existing.account);
            return Err(AuthError::Conflict);
        }
        if self.cfg.sign_up_requires_code {
            self.consume_code(account, req.auth.code.as_deref()).await?;
        }

        let name = req.user.as_ref().map(|u| u.name.as_str()).filter(|n| !n.trim().is_empty()).unwrap_or(account);
        let email = req.user.as_ref().and_then(|u| u.email.as_deref());
        let user = self.repo.create_user(account, name, email).await?;
        let hash = hash_password(&password)?;
        let _cred = self.repo.upsert_password(user.id, hash, self.cfg.password_algorithm.clone()).await?;

        info!(user_id = %user.id, account = %user.account, "account_registered");
        Ok(outcome(req, &user))
    }

    /// Authenticate an account and optionally issue a token.
    #[instrument(skip(self, req), fields(account = %req.auth.account))]
    pub async fn login(&self, req: &AuthRequest) -> Result<AuthDto, AuthError> {
        let account = require_account(&req.auth)?;
        let user = self.repo
            .find_user_by_account(account)
            .await?
            .ok_or(AuthError::Unauthorized)?;
        let cred = self.repo
            .get_credentials(user.id)
            .await?
            .ok_or(AuthError::Unauthorized)?;
        verify_password(req.auth.password.as_deref().unwrap_or_default(), &cred)?;

        let mut out = outcome(req, &user);
        out.token = self.issue_token(&user)?;
        info!(user_id = %user.id, "account_logged_in");
        Ok(out)
    }

    /// Issue a verification code. Delivery is the log line below.
    #[instrument(skip(self, req), fields(account = %req.auth.account))]
    pub async fn send_code(&self, req: &AuthRequest) -> Result<AuthDto, AuthError> {
        let account = require_account(&req.auth)?;
        let now = Utc::now();
        if let Some(prev) = self.repo.latest_code(account).await? {
            let next_allowed = prev.issued_at + self.cfg.code_resend_interval;
            if now < next_allowed {
                let retry_after_secs = (next_allowed - now).num_seconds().max(1) as u64;
                return Err(AuthError::TooManyRequests { retry_after_secs });
            }
        }

        let code = generate_code();
        self.repo
            .save_code(VerificationCode {
                account: account.to_string(),
                code: code.clone(),
                issued_at: now,
                expires_at: now + self.cfg.code_ttl,
                attempts: 0,
            })
            .await?;
        info!(%account, %code, ttl_secs = self.cfg.code_ttl.num_seconds(), "verification_code_issued");

        Ok(AuthDto {
            action: Some(req.action),
            mechanism: req.auth.mechanism.clone(),
            account: account.to_string(),
            success: true,
            ..Default::default()
        })
    }

    /// Change the password of a logged-in account; requires the current one.
    #[instrument(skip(self, req), fields(account = %req.auth.account))]
    pub async fn change_password(&self, req: &AuthRequest) -> Result<AuthDto, AuthError> {
        let account = require_account(&req.auth)?;
        let fresh = new_password(req)?
            .ok_or_else(|| AuthError::Validation("new_password is required".into()))?;
        self.check_password_policy(&fresh)?;

        let user = self.repo
            .find_user_by_account(account)
            .await?
            .ok_or(AuthError::Unauthorized)?;
        let cred = self.repo
            .get_credentials(user.id)
            .await?
            .ok_or(AuthError::Unauthorized)?;
        verify_password(req.auth.password.as_deref().unwrap_or_default(), &cred)?;

        self.repo.upsert_password(user.id, hash_password(&fresh)?, self.cfg.password_algorithm.clone()).await?;
        info!(user_id = %user.id, "password_changed");
        Ok(outcome(req, &user))
    }

    /// Reset a forgotten password with a verification code.
    #[instrument(skip(self, req), fields(account = %req.auth.account))]
    pub async fn reset_password(&self, req: &AuthRequest) -> Result<AuthDto, AuthError> {
        let account = require_account(&req.auth)?;
        let fresh = new_password(req)?
            .ok_or_else(|| AuthError::Validation("new_password is required".into()))?;
        self.check_password_policy(&fresh)?;

        let user = self.repo
            .find_user_by_account(account)
            .await?
            .ok_or(AuthError::NotFound)?;
        self.consume_code(account, req.auth.code.as_deref()).await?;

        self.repo.upsert_password(user.id, hash_password(&fresh)?, self.cfg.password_algorithm.clone()).await?;
        info!(user_id = %user.id, "password_reset");
        Ok(outcome(req, &user))
    }

    fn check_password_policy(&self, password: &str) -> Result<(), AuthError> {
        if password.chars().count() < self.cfg.min_password_len {
            return Err(AuthError::Validation(format!("password too short (>={})", self.cfg.min_password_len)));
        }
        Ok(())
    }

    /// Match `given` against the stored code; a matching code is consumed, and
    /// so is one that has seen `code_max_attempts` wrong guesses.
    async fn consume_code(&self, account: &str, given: Option<&str>) -> Result<(), AuthError> {
        let given = given.map(str::trim).filter(|c| !c.is_empty()).ok_or(AuthError::InvalidCode)?;
        let stored = self.repo.latest_code(account).await?.ok_or(AuthError::InvalidCode)?;
        if stored.expires_at <= Utc::now() {
            self.repo.remove_code(account).await?;
            return Err(AuthError::InvalidCode);
        }
        if stored.code != given {
            let attempts = self.repo.record_failed_attempt(account).await?.unwrap_or(u32::MAX);
            if attempts >= self.cfg.code_max_attempts {
                self.repo.remove_code(account).await?;
                warn!(%account, attempts, "verification_code_discarded");
            }
            return Err(AuthError::InvalidCode);
        }
        self.repo.remove_code(account).await?;
        Ok(())
    }

    fn issue_token(&self, user: &AuthUser) -> Result<Option<String>, AuthError> {
        let Some(secret) = &self.cfg.jwt_secret else { return Ok(None) };
        #[derive(serde::Serialize)]
        struct Claims { sub: String, uid: String, iat: usize, exp: usize }
        let now = Utc::now();
        let claims = Claims {
            sub: user.account.clone(),
            uid: user.id.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + self.cfg.token_ttl).timestamp() as usize,
        };
        encode(&JwtHeader::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
            .map(Some)
            .map_err(|e| AuthError::TokenError(e.to_string()))
    }
}

#[async_trait]
impl<R: AuthRepository> AuthGateway for AuthService<R> {
    /// Route one stamped request to the matching operation.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{ActionKind, AuthDto, AuthGateway, AuthRequest, AuthService, AuthConfig, CallMeta};
    /// use service::auth::repository::memory::MemoryAuthRepository;
    /// use std::sync::Arc;
    /// let svc = AuthService::new(Arc::new(MemoryAuthRepository::new()), AuthConfig::default());
    /// let req = AuthRequest {
    ///     action: ActionKind::SignUp,
    ///     auth: AuthDto { account: "u@e.com".into(), password: Some("Passw0rd".into()), ..Default::default() },
    ///     user: None,
    ///     new_password: None,
    /// };
    /// let meta = CallMeta::new("/auth/sign-up", ActionKind::SignUp);
    /// let out = tokio_test::block_on(svc.handle(&meta, req)).unwrap().unwrap();
    /// assert!(out.success);
    /// assert_eq!(out.account, "u@e.com");
    /// ```
    #[instrument(skip_all, fields(request_id = %ctx.request_id, action = %req.action))]
    async fn handle(&self, ctx: &CallMeta, req: AuthRequest) -> Result<Option<AuthDto>, AuthError> {
        let out = match req.action {
            ActionKind::SignUp => self.sign_up(&req).await?,
            ActionKind::Login => self.login(&req).await?,
            ActionKind::SendCode => self.send_code(&req).await?,
            ActionKind::ChangePassword => self.change_password(&req).await?,
            ActionKind::ResetPassword => self.reset_password(&req).await?,
        };
        Ok(Some(out))
    }
}

fn require_account(auth: &AuthDto) -> Result<&str, AuthError> {
    let account = auth.account.trim();
    if account.is_empty() {
        return Err(AuthError::Validation("account is required".into()));
    }
    Ok(account)
}

fn new_password(req: &AuthRequest) -> Result<Option<String>, AuthError> {
    match &req.new_password {
        Some(b) if !b.is_empty() => String::from_utf8(b.as_bytes().to_vec())
            .map(Some)
            .map_err(|_| AuthError::Validation("new_password must be UTF-8 text".into())),
        _ => Ok(None),
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::HashError(e.to_string()))
}

fn verify_password(password: &str, cred: &Credentials) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(&cred.password_hash).map_err(|e| AuthError::HashError(e.to_string()))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::Unauthorized)
}

fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32))
}

/// Sanitised echo: never carries the password or code back.
fn outcome(req: &AuthRequest, user: &AuthUser) -> AuthDto {
    let mut parameters = std::collections::BTreeMap::new();
    parameters.insert("user_id".to_string(), user.id.to_string());
    AuthDto {
        action: Some(req.action),
        mechanism: req.auth.mechanism.clone(),
        account: user.account.clone(),
        parameters,
        success: true,
        ..Default::default()
    }
}
