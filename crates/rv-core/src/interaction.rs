//! # Interaction Service
//!
//! Toggle-like and append-comment against a single post.
//!
//! Toggles for the same (user, post) pair are serialized through a keyed
//! mutex so a burst of clicks is applied in arrival order. The repository's
//! `toggle_like` is itself atomic under the (user, post) unique constraint;
//! the keyed lock additionally makes the returned count consistent with the
//! caller's own toggle. Distinct pairs never contend.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{CommentView, LikeState, NewComment, PostId, SessionUser, UserId};
use crate::traits::PostRepo;

pub const MAX_COMMENT_LEN: usize = 2000;

type PairKey = (UserId, PostId);

pub struct InteractionService {
    posts: Arc<dyn PostRepo>,
    locks: DashMap<PairKey, Arc<Mutex<()>>>,
}

impl InteractionService {
    pub fn new(posts: Arc<dyn PostRepo>) -> Self {
        Self { posts, locks: DashMap::new() }
    }

    pub async fn toggle_like(&self, user: &SessionUser, post_id: PostId) -> Result<LikeState> {
        let key = (user.id, post_id);
        let lock = self.locks.entry(key).or_default().clone();

        let result = {
            let _guard = lock.lock().await;
            self.toggle_locked(user.id, post_id).await
        };

        drop(lock);
        // Only the map holds the mutex now unless another toggle picked it up.
        self.locks.remove_if(&key, |_, m| Arc::strong_count(m) == 1);

        result
    }

    async fn toggle_locked(&self, user_id: UserId, post_id: PostId) -> Result<LikeState> {
        if !self.posts.post_exists(post_id).await? {
            return Err(AppError::not_found("Post", post_id));
        }

        let liked = self.posts.toggle_like(user_id, post_id).await?;
        let like_count = self.posts.count_likes(post_id).await?;

        log::info!(
            "user {} {} post {} (now {} likes)",
            user_id,
            if liked { "liked" } else { "unliked" },
            post_id,
            like_count
        );

        Ok(LikeState { liked, like_count })
    }

    pub async fn add_comment(
        &self,
        user: &SessionUser,
        post_id: PostId,
        text: &str,
    ) -> Result<CommentView> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::validation("comment text is required"));
        }
        if text.chars().count() > MAX_COMMENT_LEN {
            return Err(AppError::validation(format!(
                "comment must be at most {MAX_COMMENT_LEN} characters"
            )));
        }
        if !self.posts.post_exists(post_id).await? {
            return Err(AppError::not_found("Post", post_id));
        }

        let comment = self
            .posts
            .insert_comment(NewComment {
                text: text.to_string(),
                user_id: user.id,
                post_id,
                created_at: Utc::now(),
            })
            .await?;

        log::info!("user {} commented on post {}", user.id, post_id);
        Ok(comment)
    }

    #[cfg(test)]
    fn tracked_pairs(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuthorView, Comment};
    use crate::traits::MockPostRepo;
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

    fn viewer(id: i64) -> SessionUser {
        SessionUser { id, email: format!("u{id}@x.io"), name: format!("User {id}"), image: None }
    }

    /// A mock whose like state flips on every toggle, like a real row would.
    fn flipping_repo() -> MockPostRepo {
        let liked = Arc::new(AtomicBool::new(false));
        let count = Arc::new(AtomicI64::new(0));
        let mut repo = MockPostRepo::new();
        repo.expect_post_exists().returning(|_| Ok(true));
        {
            let liked = liked.clone();
            let count = count.clone();
            repo.expect_toggle_like().returning(move |_, _| {
                let now = !liked.fetch_xor(true, Ordering::SeqCst);
                count.fetch_add(if now { 1 } else { -1 }, Ordering::SeqCst);
                Ok(now)
            });
        }
        repo.expect_count_likes()
            .returning(move |_| Ok(count.load(Ordering::SeqCst)));
        repo
    }

    #[tokio::test]
    async fn test_toggle_twice_returns_to_original_state() {
        let service = InteractionService::new(Arc::new(flipping_repo()));
        let user = viewer(2);

        let first = service.toggle_like(&user, 1).await.unwrap();
        assert_eq!(first, LikeState { liked: true, like_count: 1 });

        let second = service.toggle_like(&user, 1).await.unwrap();
        assert_eq!(second, LikeState { liked: false, like_count: 0 });

        assert_eq!(service.tracked_pairs(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_toggles_alternate() {
        let service = Arc::new(InteractionService::new(Arc::new(flipping_repo())));
        let user = viewer(2);

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let service = service.clone();
                let user = user.clone();
                tokio::spawn(async move { service.toggle_like(&user, 1).await.unwrap() })
            })
            .collect();

        let mut liked = 0;
        for handle in handles {
            let state = handle.await.unwrap();
            assert!(state.like_count == 0 || state.like_count == 1);
            if state.liked {
                liked += 1;
            }
        }
        // An even number of toggles leaves the pair unliked.
        assert_eq!(liked, 5);
        assert_eq!(service.tracked_pairs(), 0);
    }

    #[tokio::test]
    async fn test_toggle_missing_post_is_not_found() {
        let mut repo = MockPostRepo::new();
        repo.expect_post_exists().returning(|_| Ok(false));
        repo.expect_toggle_like().never();

        let service = InteractionService::new(Arc::new(repo));
        let err = service.toggle_like(&viewer(1), 99).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)));
    }

    #[tokio::test]
    async fn test_empty_comment_is_rejected() {
        let mut repo = MockPostRepo::new();
        repo.expect_insert_comment().never();
        let service = InteractionService::new(Arc::new(repo));

        for text in ["", "   \n"] {
            let err = service.add_comment(&viewer(1), 1, text).await.unwrap_err();
            assert!(matches!(err, AppError::ValidationError(_)));
        }
    }

    #[tokio::test]
    async fn test_comment_is_stamped_and_attributed() {
        let mut repo = MockPostRepo::new();
        repo.expect_post_exists().returning(|_| Ok(true));
        repo.expect_insert_comment()
            .withf(|c| c.text == "Great!" && c.user_id == 2 && c.post_id == 1)
            .returning(|c| {
                Ok(CommentView {
                    comment: Comment {
                        id: 1,
                        text: c.text,
                        user_id: c.user_id,
                        post_id: c.post_id,
                        created_at: c.created_at,
                    },
                    user: AuthorView { id: 2, name: "User 2".into(), image: None },
                })
            });

        let service = InteractionService::new(Arc::new(repo));
        let view = service.add_comment(&viewer(2), 1, "  Great!  ").await.unwrap();
        assert_eq!(view.comment.text, "Great!");
        assert_eq!(view.user.name, "User 2");
    }
}
