//! # Session Store
//!
//! Credentials in, signed token out; signed token in, live user out.
//!
//! Token claims are a login-time snapshot. [`SessionStore::materialize`]
//! re-reads the user row on every call and rebuilds the session from it,
//! so profile edits show up without a fresh login. The serving layer calls
//! it once per request that needs an identity.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{FederatedIdentity, IssuedSession, NewUser, SessionUser, User};
use crate::traits::{AuthProvider, UserRepo};

pub struct SessionStore {
    users: Arc<dyn UserRepo>,
    auth: Arc<dyn AuthProvider>,
}

impl SessionStore {
    pub fn new(users: Arc<dyn UserRepo>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { users, auth }
    }

    /// Password path. Email is matched case-insensitively.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<SessionUser> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || password.is_empty() {
            return Err(AppError::validation("email and password are required"));
        }

        let user = self
            .users
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| AppError::not_found("User", &email))?;

        if !user.enabled {
            return Err(AppError::AccountDisabled);
        }

        let hash = user.password_hash.as_deref().ok_or(AppError::InvalidCredentials)?;
        if !self.auth.verify_password(password, hash).await {
            return Err(AppError::InvalidCredentials);
        }

        Ok(SessionUser::from(&user))
    }

    /// Authenticates and issues a bearer token.
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedSession> {
        let session = self.authenticate(email, password).await?;
        // Re-read so the token carries exactly what the row holds.
        let user = self.load_user(session.id).await?;
        self.issue(&user)
    }

    /// Federated path: the external provider already vouched for the email,
    /// so no password is compared. Unknown emails get a password-less account.
    pub async fn sign_in_federated(&self, identity: FederatedIdentity) -> Result<IssuedSession> {
        let email = identity.email.trim().to_lowercase();
        if email.is_empty() {
            return Err(AppError::validation("federated identity has no email"));
        }

        let user = match self.users.find_user_by_email(&email).await? {
            Some(user) => user,
            None => {
                log::info!("creating account for federated identity {}", email);
                self.users
                    .create_user(NewUser {
                        name: identity.name,
                        email,
                        password_hash: None,
                        image: identity.image,
                    })
                    .await?
            }
        };

        if !user.enabled {
            return Err(AppError::AccountDisabled);
        }
        self.issue(&user)
    }

    /// Resolves a bearer token to the current state of its user row.
    pub async fn materialize(&self, token: &str) -> Result<SessionUser> {
        let claims = self.auth.decode_token(token)?;
        let user = self
            .users
            .find_user_by_id(claims.id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("session user no longer exists".into()))?;

        if !user.enabled {
            return Err(AppError::Unauthorized("account disabled".into()));
        }

        Ok(SessionUser::from(&user))
    }

    async fn load_user(&self, id: i64) -> Result<User> {
        self.users
            .find_user_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("User", id))
    }

    fn issue(&self, user: &User) -> Result<IssuedSession> {
        let token = self.auth.issue_token(user)?;
        Ok(IssuedSession { token, user: SessionUser::from(user) })
    }
}
