//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.
//! Services in this crate never reach storage except through them.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    CommentView, Image, NewComment, NewPost, NewUser, Post, PostDetail, PostFilter, PostId,
    PostOrder, PostSummary, SessionClaims, User, UserId,
};

/// Data persistence contract for posts and their likes, comments and images.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostRepo: Send + Sync {
    // Post Operations
    async fn create_post(&self, post: NewPost) -> Result<Post>;
    async fn add_images(&self, post_id: PostId, urls: Vec<String>) -> Result<Vec<Image>>;
    /// Full association expansion: images, likes and comments with their users.
    async fn find_post_by_id(&self, id: PostId) -> Result<Option<PostDetail>>;
    /// List projection: author, first image and counts only.
    async fn find_posts_page(
        &self,
        filter: PostFilter,
        skip: i64,
        take: i64,
        order: PostOrder,
    ) -> Result<Vec<PostSummary>>;
    async fn count_posts(&self, filter: PostFilter) -> Result<i64>;
    async fn find_post_by_restaurant_name(&self, name: &str) -> Result<Option<Post>>;
    async fn post_exists(&self, id: PostId) -> Result<bool>;

    // Interaction Operations
    /// Atomically removes the (user, post) like if present, inserts it otherwise.
    /// Returns `true` when the pair is liked afterwards.
    async fn toggle_like(&self, user_id: UserId, post_id: PostId) -> Result<bool>;
    async fn count_likes(&self, post_id: PostId) -> Result<i64>;
    async fn insert_comment(&self, comment: NewComment) -> Result<CommentView>;
}

/// Data persistence contract for accounts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>>;
    /// Expects an already lower-cased email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
}

/// Media storage contract for uploaded images.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Saves raw bytes and returns a media_id.
    async fn save_upload(&self, data: Vec<u8>, content_type: &str) -> anyhow::Result<String>;
    /// Returns the public URL of a stored media_id.
    async fn get_url(&self, media_id: &str) -> String;
}

/// Password hashing and token signing contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Produces a self-describing password hash for storage
    fn hash_password(&self, password: &str) -> Result<String>;

    /// Verifies a password against a stored hash
    async fn verify_password(&self, password: &str, hash: &str) -> bool;

    /// Signs a bearer token for the given user, valid for the configured TTL
    fn issue_token(&self, user: &User) -> Result<String>;

    /// Verifies signature and expiry, returning the embedded claims
    fn decode_token(&self, token: &str) -> Result<SessionClaims>;
}
