//! # rv-ui
//!
//! Server-rendered pages and the client-side feed model.

pub mod feed_view;

use askama::Template;
use rv_core::models::{PostDetail, PostSummary, SessionUser};

pub use feed_view::{filter_posts, FeedSource, FeedView, HttpFeedSource};

/// The feed index (`/`).
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    pub title: &'a str,
    pub viewer: Option<&'a SessionUser>,
    pub posts: &'a [&'a PostSummary],
    /// Current text filter, echoed back into the search box
    pub query: &'a str,
    pub page: i64,
    pub has_more: bool,
}

/// Single-post detail page with like and comment forms.
#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate<'a> {
    pub title: &'a str,
    pub viewer: Option<&'a SessionUser>,
    pub post: &'a PostDetail,
    pub liked: bool,
}

/// Login entry point; unauthenticated form actions redirect here.
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate<'a> {
    pub title: &'a str,
    pub viewer: Option<&'a SessionUser>,
    pub error: Option<&'a str>,
}
