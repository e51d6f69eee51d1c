use async_trait::async_trait;
use uuid::Uuid;

use super::domain::{AuthUser, Credentials, VerificationCode};
use super::errors::AuthError;

/// Repository abstraction for auth-related persistence.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn find_user_by_account(&self, account: &str) -> Result<Option<AuthUser>, AuthError>;
    async fn create_user(&self, account: &str, name: &str, email: Option<&str>) -> Result<AuthUser, AuthError>;

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError>;
    async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError>;

    async fn latest_code(&self, account: &str) -> Result<Option<VerificationCode>, AuthError>;
    async fn save_code(&self, code: VerificationCode) -> Result<(), AuthError>;
    async fn remove_code(&self, account: &str) -> Result<Option<VerificationCode>, AuthError>;
    /// Count one wrong guess; returns the new total, or `None` if no code is stored.
    async fn record_failed_attempt(&self, account: &str) -> Result<Option<u32>, AuthError>;
}

/// In-memory repository, used by the default server wiring and by tests.
pub mod memory {
    use super::*;
    use dashmap::mapref::entry::Entry;
    use dashmap::DashMap;

    #[derive(Default)]
    pub struct MemoryAuthRepository {
        users: DashMap<String, AuthUser>,         // key: account
        creds: DashMap<Uuid, Credentials>,        // key: user_id
        codes: DashMap<String, VerificationCode>, // key: account
    }

    impl MemoryAuthRepository {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl AuthRepository for MemoryAuthRepository {
        async fn find_user_by_account(&self, account: &str) -> Result<Option<AuthUser>, AuthError> {
            Ok(self.users.get(account).map(|u| u.clone()))
        }

        async fn create_user(&self, account: &str, name: &str, email: Option<&str>) -> Result<AuthUser, AuthError> {
            match self.users.entry(account.to_string()) {
                Entry::Occupied(_) => Err(AuthError::Conflict),
                Entry::Vacant(slot) => {
                    let user = AuthUser {
                        id: Uuid::new_v4(),
                        account: account.to_string(),
                        name: name.to_string(),
                        email: email.map(str::to_string),
                    };
                    slot.insert(user.clone());
                    Ok(user)
                }
            }
        }

        async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
            Ok(self.creds.get(&user_id).map(|c| c.clone()))
        }

        async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError> {
            let c = Credentials { user_id, password_hash, password_algorithm };
            self.creds.insert(user_id, c.clone());
            Ok(c)
        }

        async fn latest_code(&self, account: &str) -> Result<Option<VerificationCode>, AuthError> {
            Ok(self.codes.get(account).map(|c| c.clone()))
        }

        async fn save_code(&self, code: VerificationCode) -> Result<(), AuthError> {
            self.codes.insert(code.account.clone(), code);
            Ok(())
        }

        async fn remove_code(&self, account: &str) -> Result<Option<VerificationCode>, AuthError> {
            Ok(self.codes.remove(account).map(|(_, c)| c))
        }

        async fn record_failed_attempt(&self, account: &str) -> Result<Option<u32>, AuthError> {
            Ok(self.codes.get_mut(account).map(|mut c| {
                c.attempts += 1;
                c.attempts
            }))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn create_user_rejects_duplicate_account() {
            let repo = MemoryAuthRepository::new();
            let u = repo.create_user("alice", "Alice", None).await.unwrap();
            assert_eq!(repo.find_user_by_account("alice").await.unwrap(), Some(u));
            assert!(matches!(repo.create_user("alice", "Other", None).await, Err(AuthError::Conflict)));
        }

        #[tokio::test]
        async fn remove_code_consumes_it() {
            let repo = MemoryAuthRepository::new();
            let now = chrono::Utc::now();
            repo.save_code(VerificationCode {
                account: "alice".into(),
                code: "123456".into(),
                issued_at: now,
                expires_at: now + chrono::Duration::seconds(60),
                attempts: 0,
            })
            .await
            .unwrap();
            assert!(repo.latest_code("alice").await.unwrap().is_some());
            assert_eq!(repo.remove_code("alice").await.unwrap().map(|c| c.code).as_deref(), Some("123456"));
            assert!(repo.remove_code("alice").await.unwrap().is_none());
        }

        #[tokio::test]
        async fn failed_attempts_accumulate_per_code() {
            let repo = MemoryAuthRepository::new();
            assert_eq!(repo.record_failed_attempt("alice").await.unwrap(), None);
            let now = chrono::Utc::now();
            repo.save_code(VerificationCode {
                account: "alice".into(),
                code: "123456".into(),
                issued_at: now,
                expires_at: now + chrono::Duration::seconds(60),
                attempts: 0,
            })
            .await
            .unwrap();
            assert_eq!(repo.record_failed_attempt("alice").await.unwrap(), Some(1));
            assert_eq!(repo.record_failed_attempt("alice").await.unwrap(), Some(2));
            assert_eq!(repo.latest_code("alice").await.unwrap().unwrap().attempts, 2);
        }
    }
}
