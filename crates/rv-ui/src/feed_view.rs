//! # Client Feed View
//!
//! Incremental ("load more") consumption of the paginated feed, plus the
//! substring filter applied to whatever has been loaded so far.

use async_trait::async_trait;
use rv_core::error::{AppError, Result};
use rv_core::models::{FeedPage, PostSummary};

/// Anything that can hand out feed pages (the HTTP API, or a stub in tests).
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_page(&self, page: i64, limit: i64) -> Result<FeedPage<PostSummary>>;
}

/// Fetches `GET {base}/posts/feed?page&limit`.
pub struct HttpFeedSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFeedSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client: reqwest::Client::new(), base_url }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_page(&self, page: i64, limit: i64) -> Result<FeedPage<PostSummary>> {
        let url = format!("{}/posts/feed", self.base_url);
        self.client
            .get(&url)
            .query(&[("page", page), ("limit", limit)])
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(AppError::upstream)?
            .json::<FeedPage<PostSummary>>()
            .await
            .map_err(AppError::upstream)
    }
}

pub struct FeedView<S: FeedSource> {
    source: S,
    limit: i64,
    items: Vec<PostSummary>,
    next_page: i64,
    has_more: bool,
}

impl<S: FeedSource> FeedView<S> {
    pub fn new(source: S, limit: i64) -> Self {
        Self { source, limit, items: Vec::new(), next_page: 1, has_more: true }
    }

    /// Reloads page 1, replacing everything loaded so far.
    pub async fn refresh(&mut self) -> Result<()> {
        let page = self.source.fetch_page(1, self.limit).await?;
        self.items = page.data;
        self.has_more = page.has_more;
        self.next_page = 2;
        Ok(())
    }

    /// Appends the next page. Returns how many items were added.
    pub async fn load_more(&mut self) -> Result<usize> {
        if !self.has_more {
            return Ok(0);
        }
        let page = self.source.fetch_page(self.next_page, self.limit).await?;
        let added = page.data.len();
        self.items.extend(page.data);
        self.has_more = page.has_more;
        self.next_page += 1;
        log::debug!("feed view loaded {} more, has_more={}", added, self.has_more);
        Ok(added)
    }

    pub fn items(&self) -> &[PostSummary] {
        &self.items
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn filtered(&self, query: &str) -> Vec<&PostSummary> {
        filter_posts(&self.items, query)
    }
}

/// Case-insensitive match on restaurant or food name. A blank query keeps everything.
pub fn filter_posts<'a>(items: &'a [PostSummary], query: &str) -> Vec<&'a PostSummary> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return items.iter().collect();
    }
    items
        .iter()
        .filter(|s| {
            s.post.restaurant_name.to_lowercase().contains(&needle)
                || s.post.food_name.to_lowercase().contains(&needle)
        })
        .collect()
}
