use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::store::{JsonStore, Query, Table};
use crate::dto::auth_dto::{LoginPayload, RegisterPayload};
use crate::error::{Error, Result};
use crate::models::session::{NewSession, Session};
use crate::models::user::{NewUser, Role, User};
use crate::utils::{crypto, time, token, validation};

/// A freshly created session together with the plaintext bearer token.
/// The token is only ever returned here; the store keeps its hash.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

#[derive(Clone)]
pub struct AuthService {
    store: JsonStore,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(store: JsonStore, session_ttl: Duration) -> Self {
        Self { store, session_ttl }
    }

    pub async fn register(&self, payload: RegisterPayload) -> Result<IssuedSession> {
        validation::require_non_blank("name", &payload.name)?;
        let email = validation::normalize_email(&payload.email);
        let password_hash = crypto::hash_password(&payload.password)
            .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))?;

        let new_user = NewUser {
            name: payload.name.trim().to_string(),
            email,
            password_hash,
            role: Role::User,
            department: payload.department.map(|d| d.trim().to_string()),
            is_active: true,
        };

        let user: User = self
            .store
            .insert_unique(Table::Users, "email", &new_user)
            .await
            .map_err(|e| match e {
                Error::Conflict(_) => Error::Conflict("Email already registered".into()),
                other => other,
            })?;

        info!(user_id = %user.id, "user registered");
        self.issue_session(user).await
    }

    pub async fn login(&self, payload: LoginPayload) -> Result<IssuedSession> {
        let email = validation::normalize_email(&payload.email);
        let user: Option<User> = self
            .store
            .find_one(Table::Users, &Query::new().eq("email", &email))
            .await?;

        let Some(user) = user else {
            warn!("login attempt for unknown email");
            return Err(Error::Unauthorized("Invalid credentials".into()));
        };

        let valid = crypto::verify_password(&payload.password, &user.password_hash)
            .map_err(|e| Error::Internal(format!("Stored password hash is unreadable: {}", e)))?;
        if !valid {
            warn!(user_id = %user.id, "login attempt with wrong password");
            return Err(Error::Unauthorized("Invalid credentials".into()));
        }
        if !user.is_active {
            return Err(Error::Forbidden("Account is disabled".into()));
        }

        let now = time::now();
        let user: User = self
            .store
            .update(Table::Users, user.id, |u: &mut User| {
                u.last_login = Some(now);
                Ok(())
            })
            .await?;

        info!(user_id = %user.id, "user logged in");
        self.issue_session(user).await
    }

    async fn issue_session(&self, user: User) -> Result<IssuedSession> {
        let plain = token::generate_access_token(token::SESSION_TOKEN_LENGTH);
        let expires_at = time::now() + self.session_ttl;

        let session: Session = self
            .store
            .insert(
                Table::Sessions,
                &NewSession {
                    user_id: user.id,
                    token_hash: token::hash_token(&plain),
                    expires_at,
                },
            )
            .await?;

        Ok(IssuedSession {
            token: plain,
            expires_at: session.expires_at,
            user,
        })
    }

    /// Resolves a bearer token to its session and user. Expired sessions are
    /// deleted when they are found.
    pub async fn authenticate(&self, bearer: &str) -> Result<(Session, User)> {
        let hash = token::hash_token(bearer);
        let sessions: Vec<Session> = self.store.all(Table::Sessions).await?;
        let session = sessions
            .into_iter()
            .find(|s| token::hashes_match(&s.token_hash, &hash))
            .ok_or_else(|| Error::Unauthorized("Invalid session".into()))?;

        if session.is_expired(time::now()) {
            self.store.delete(Table::Sessions, session.id).await?;
            info!(session_id = %session.id, "evicted expired session");
            return Err(Error::Unauthorized("Session expired".into()));
        }

        let user: User = self
            .store
            .get(Table::Users, session.user_id)
            .await?
            .ok_or_else(|| Error::Unauthorized("Invalid session".into()))?;
        if !user.is_active {
            return Err(Error::Unauthorized("Account is disabled".into()));
        }

        Ok((session, user))
    }

    pub async fn logout(&self, session_id: Uuid) -> Result<()> {
        self.store.delete(Table::Sessions, session_id).await?;
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<usize> {
        let now = time::now();
        self.store
            .delete_matching(Table::Sessions, |s: &Session| s.is_expired(now))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_payload(email: &str) -> RegisterPayload {
        RegisterPayload {
            name: "Dana".into(),
            email: email.into(),
            password: "correct horse".into(),
            department: Some("Finance".into()),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let svc = AuthService::new(JsonStore::in_memory(), Duration::days(7));
        let issued = svc.register(register_payload("Dana@Corp.io")).await.unwrap();
        assert_eq!(issued.user.email, "dana@corp.io");
        assert_eq!(issued.user.role, Role::User);

        let login = svc
            .login(LoginPayload {
                email: "dana@corp.io".into(),
                password: "correct horse".into(),
            })
            .await
            .unwrap();
        assert!(login.user.last_login.is_some());
        assert_ne!(login.token, issued.token);

        let (_, user) = svc.authenticate(&login.token).await.unwrap();
        assert_eq!(user.id, issued.user.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let svc = AuthService::new(JsonStore::in_memory(), Duration::days(7));
        svc.register(register_payload("dana@corp.io")).await.unwrap();
        let dup = svc.register(register_payload(" DANA@corp.io")).await;
        assert!(matches!(dup, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_are_unauthorized() {
        let svc = AuthService::new(JsonStore::in_memory(), Duration::days(7));
        svc.register(register_payload("dana@corp.io")).await.unwrap();

        let unknown = svc
            .login(LoginPayload {
                email: "nobody@corp.io".into(),
                password: "correct horse".into(),
            })
            .await;
        assert!(matches!(unknown, Err(Error::Unauthorized(_))));

        let wrong = svc
            .login(LoginPayload {
                email: "dana@corp.io".into(),
                password: "incorrect".into(),
            })
            .await;
        assert!(matches!(wrong, Err(Error::Unauthorized(_))));
    }

    #[tokio::test]
    async fn expired_session_is_evicted_on_read() {
        let store = JsonStore::in_memory();
        let svc = AuthService::new(store.clone(), Duration::seconds(-1));
        let issued = svc.register(register_payload("dana@corp.io")).await.unwrap();

        let res = svc.authenticate(&issued.token).await;
        assert!(matches!(res, Err(Error::Unauthorized(_))));
        assert_eq!(store.count(Table::Sessions, &Query::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn purge_only_removes_expired() {
        let store = JsonStore::in_memory();
        let live = AuthService::new(store.clone(), Duration::days(1));
        let dead = AuthService::new(store.clone(), Duration::seconds(-1));
        live.register(register_payload("a@corp.io")).await.unwrap();
        dead.register(register_payload("b@corp.io")).await.unwrap();

        assert_eq!(live.purge_expired().await.unwrap(), 1);
        assert_eq!(store.count(Table::Sessions, &Query::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn logout_invalidates_token() {
        let svc = AuthService::new(JsonStore::in_memory(), Duration::days(7));
        let issued = svc.register(register_payload("dana@corp.io")).await.unwrap();
        let (session, _) = svc.authenticate(&issued.token).await.unwrap();
        svc.logout(session.id).await.unwrap();
        tokio_test::assert_err!(svc.authenticate(&issued.token).await);
    }
}
