//! # Feed Paginator
//!
//! Page/limit listing of posts, newest first, shared by the "all posts",
//! "my posts" and "user's posts" feeds.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{FeedPage, PostFilter, PostOrder, PostSummary, SessionUser, UserId};
use crate::traits::PostRepo;

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// A 1-indexed page request. Construction never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    limit: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest { page: 1, limit: DEFAULT_LIMIT }
    }
}

impl PageRequest {
    pub fn new(page: i64, limit: i64) -> Self {
        let page = if page <= 0 { 1 } else { page };
        let limit = if limit <= 0 { DEFAULT_LIMIT } else { limit.min(MAX_LIMIT) };
        PageRequest { page, limit }
    }

    /// Builds a request from raw query-string values. Anything missing or
    /// non-numeric falls back to page 1 / the default limit.
    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Self {
        let parse = |raw: Option<&str>| raw.and_then(|v| v.trim().parse::<i64>().ok());
        Self::new(parse(page).unwrap_or(1), parse(limit).unwrap_or(DEFAULT_LIMIT))
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn skip(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn has_more(&self, total: i64) -> bool {
        self.page.saturating_mul(self.limit) < total
    }
}

/// Filter dimension of a feed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope {
    All,
    ByUser(UserId),
    /// The authenticated caller's own posts
    Mine,
}

pub struct FeedPaginator {
    posts: Arc<dyn PostRepo>,
}

impl FeedPaginator {
    pub fn new(posts: Arc<dyn PostRepo>) -> Self {
        Self { posts }
    }

    pub async fn list_posts(
        &self,
        scope: FeedScope,
        viewer: Option<&SessionUser>,
        request: PageRequest,
    ) -> Result<FeedPage<PostSummary>> {
        let filter = match scope {
            FeedScope::All => PostFilter::All,
            FeedScope::ByUser(id) => PostFilter::ByAuthor(id),
            FeedScope::Mine => match viewer {
                Some(user) => PostFilter::ByAuthor(user.id),
                None => return Err(AppError::Unauthorized("sign in to view your posts".into())),
            },
        };

        let data = self
            .posts
            .find_posts_page(filter, request.skip(), request.limit(), PostOrder::NewestFirst)
            .await?;
        let total = self.posts.count_posts(filter).await?;

        log::debug!(
            "feed {:?} page {} limit {}: {} items of {}",
            scope,
            request.page(),
            request.limit(),
            data.len(),
            total
        );

        Ok(FeedPage { data, has_more: request.has_more(total) })
    }
}
