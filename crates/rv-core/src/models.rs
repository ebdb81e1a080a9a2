//! # Domain Models
//!
//! These structs represent the core entities of Rusty-Reviews.
//! Identifiers are numeric row ids assigned by the repository.
//!
//! Two read projections exist for posts: [`PostSummary`] for list views
//! (first image only, counts only) and [`PostDetail`] for the single-post
//! view (every association expanded).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

pub type UserId = i64;
pub type PostId = i64;

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Stored lower-cased; unique across users
    pub email: String,
    /// `None` for accounts created through federated sign-in
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    /// Public URL of the avatar, if any
    pub image: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// Star rating of a review, always within `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 5;

    pub fn new(value: i64) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Rating(value as u8))
        } else {
            Err(AppError::validation(format!(
                "rating must be between {} and {}",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    /// Parses raw form input. Only whole numbers are accepted.
    pub fn parse(raw: &str) -> Result<Self> {
        let value: i64 = raw
            .trim()
            .parse()
            .map_err(|_| AppError::validation("rating must be a whole number"))?;
        Self::new(value)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Five-character star bar, e.g. "★★★★☆".
    pub fn stars(self) -> String {
        (1..=Self::MAX as u8).map(|i| if i <= self.0 { '★' } else { '☆' }).collect()
    }
}

impl TryFrom<i64> for Rating {
    type Error = AppError;

    fn try_from(value: i64) -> Result<Self> {
        Rating::new(value)
    }
}

impl From<Rating> for i64 {
    fn from(rating: Rating) -> i64 {
        rating.0 as i64
    }
}

/// A restaurant/food review.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    /// Globally unique across posts
    pub restaurant_name: String,
    #[serde(rename = "foodname")]
    pub food_name: String,
    pub location: String,
    pub rating: Rating,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: i64,
    pub url: String,
    pub post_id: PostId,
    pub created_at: DateTime<Utc>,
}

/// Presence of a row means the user likes the post; at most one per pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub id: i64,
    pub user_id: UserId,
    pub post_id: PostId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub user_id: UserId,
    pub post_id: PostId,
    pub created_at: DateTime<Utc>,
}

/// Author display fields attached to posts, likes and comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorView {
    pub id: UserId,
    pub name: String,
    pub image: Option<String>,
}

/// List-view projection of a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    #[serde(flatten)]
    pub post: Post,
    pub author: AuthorView,
    /// URL of the earliest image only
    pub first_image: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeView {
    #[serde(flatten)]
    pub like: Like,
    pub user: AuthorView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub user: AuthorView,
}

/// Detail-view projection of a post with every association expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub author: AuthorView,
    pub author_email: String,
    pub images: Vec<Image>,
    pub likes: Vec<LikeView>,
    pub comments: Vec<CommentView>,
}

impl PostDetail {
    pub fn is_liked_by(&self, user_id: UserId) -> bool {
        self.likes.iter().any(|l| l.like.user_id == user_id)
    }
}

/// Public profile returned by `GET /users/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub profile_picture: Option<String>,
    pub posts: Vec<PostSummary>,
}

/// One page of a feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage<T> {
    pub data: Vec<T>,
    pub has_more: bool,
}

/// Outward-facing session, always rebuilt from the live user row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub image: Option<String>,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        SessionUser {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            image: user.image.clone(),
        }
    }
}

/// Claims carried inside a bearer token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub image: Option<String>,
    /// Issued at (unix timestamp)
    pub iat: i64,
    /// Expiration (unix timestamp)
    pub exp: i64,
}

/// A token together with the user it was issued for.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    pub token: String,
    pub user: SessionUser,
}

/// An identity asserted by an external OAuth provider.
#[derive(Debug, Clone)]
pub struct FederatedIdentity {
    pub email: String,
    pub name: String,
    pub image: Option<String>,
}

/// Result of a toggle-like call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    pub liked: bool,
    pub like_count: i64,
}

/// A raw file received from a multipart form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

// ── Write models ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub restaurant_name: String,
    pub food_name: String,
    pub location: String,
    pub rating: Rating,
    pub description: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub text: String,
    pub user_id: UserId,
    pub post_id: PostId,
    pub created_at: DateTime<Utc>,
}

/// Unvalidated post fields as submitted by a client.
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub restaurant_name: Option<String>,
    pub food_name: Option<String>,
    pub location: Option<String>,
    pub rating: Option<String>,
    pub description: Option<String>,
}

/// Unvalidated registration fields as submitted by a client.
#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub avatar: Option<Upload>,
}

// ── Query shapes ────────────────────────────────────────────────────────────

/// Row filter for post listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    ByAuthor(UserId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOrder {
    /// Creation time descending; ties broken by id descending
    NewestFirst,
    /// Creation time ascending; ties broken by id ascending
    OldestFirst,
}
