//! # Account Service
//!
//! Registration of password accounts.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{NewUser, RegisterForm, User};
use crate::traits::{AuthProvider, MediaStore, UserRepo};

pub struct AccountService {
    users: Arc<dyn UserRepo>,
    auth: Arc<dyn AuthProvider>,
    media: Arc<dyn MediaStore>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepo>,
        auth: Arc<dyn AuthProvider>,
        media: Arc<dyn MediaStore>,
    ) -> Self {
        Self { users, auth, media }
    }

    /// Creates an enabled account. The email is stored lower-cased so the
    /// login lookup and the uniqueness check agree.
    pub async fn register(&self, form: RegisterForm) -> Result<User> {
        let name = form.name.map(|v| v.trim().to_string()).unwrap_or_default();
        let email = form.email.map(|v| v.trim().to_lowercase()).unwrap_or_default();
        let password = form.password.unwrap_or_default();

        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AppError::validation("name, email and password are required"));
        }
        if !email.contains('@') {
            return Err(AppError::validation("email is not valid"));
        }

        if self.users.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("email is already registered".into()));
        }

        let password_hash = self.auth.hash_password(&password)?;

        let image = match form.avatar.filter(|a| !a.data.is_empty()) {
            Some(avatar) => match self.media.save_upload(avatar.data, &avatar.content_type).await {
                Ok(media_id) => Some(self.media.get_url(&media_id).await),
                Err(e) => {
                    log::warn!("avatar upload for {} failed, continuing without: {:#}", email, e);
                    None
                }
            },
            None => None,
        };

        let user = self
            .users
            .create_user(NewUser { name, email, password_hash: Some(password_hash), image })
            .await?;

        log::info!("registered user {} <{}>", user.id, user.email);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Upload;
    use crate::traits::{MockAuthProvider, MockMediaStore, MockUserRepo};
    use chrono::Utc;

    fn created(new: NewUser) -> User {
        User {
            id: 1,
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            image: new.image,
            enabled: true,
            created_at: Utc::now(),
        }
    }

    fn hashing_auth() -> MockAuthProvider {
        let mut auth = MockAuthProvider::new();
        auth.expect_hash_password().returning(|pw| Ok(format!("hashed:{pw}")));
        auth
    }

    fn form() -> RegisterForm {
        RegisterForm {
            name: Some("Alice".into()),
            email: Some("Alice@Example.com".into()),
            password: Some("hunter22".into()),
            avatar: None,
        }
    }

    #[tokio::test]
    async fn test_all_fields_absent_is_validation_error() {
        let mut users = MockUserRepo::new();
        users.expect_create_user().never();
        let svc = AccountService::new(
            Arc::new(users),
            Arc::new(MockAuthProvider::new()),
            Arc::new(MockMediaStore::new()),
        );

        let err = svc.register(RegisterForm::default()).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let mut users = MockUserRepo::new();
        users
            .expect_find_user_by_email()
            .withf(|email| email == "alice@example.com")
            .returning(|email| {
                Ok(Some(created(NewUser {
                    name: "Existing".into(),
                    email: email.to_string(),
                    password_hash: None,
                    image: None,
                })))
            });
        users.expect_create_user().never();
        let svc = AccountService::new(
            Arc::new(users),
            Arc::new(MockAuthProvider::new()),
            Arc::new(MockMediaStore::new()),
        );

        let err = svc.register(form()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_register_hashes_and_normalises() {
        let mut users = MockUserRepo::new();
        users.expect_find_user_by_email().returning(|_| Ok(None));
        users.expect_create_user().returning(|new| Ok(created(new)));
        let svc = AccountService::new(
            Arc::new(users),
            Arc::new(hashing_auth()),
            Arc::new(MockMediaStore::new()),
        );

        let user = svc.register(form()).await.unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.password_hash.as_deref(), Some("hashed:hunter22"));
        assert!(user.enabled);

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn test_avatar_failure_does_not_block_registration() {
        let mut users = MockUserRepo::new();
        users.expect_find_user_by_email().returning(|_| Ok(None));
        users.expect_create_user().returning(|new| Ok(created(new)));
        let mut media = MockMediaStore::new();
        media
            .expect_save_upload()
            .returning(|_, _| Err(anyhow::anyhow!("store offline")));

        let svc = AccountService::new(Arc::new(users), Arc::new(hashing_auth()), Arc::new(media));
        let mut with_avatar = form();
        with_avatar.avatar = Some(Upload {
            file_name: "me.png".into(),
            content_type: "image/png".into(),
            data: vec![1, 2, 3],
        });

        let user = svc.register(with_avatar).await.unwrap();
        assert!(user.image.is_none());
    }
}
