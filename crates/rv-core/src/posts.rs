//! # Post Service
//!
//! Review creation with partial-success image handling, plus the single-post
//! and profile reads.

use std::sync::Arc;

use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::{
    Image, NewPost, Post, PostDetail, PostFilter, PostForm, PostId, PostOrder, Rating,
    SessionUser, Upload, UserId, UserProfile,
};
use crate::traits::{MediaStore, PostRepo, UserRepo};

/// A freshly created post and the images that made it to storage.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPost {
    pub post: Post,
    pub images: Vec<Image>,
    /// Uploads that failed and were dropped
    pub skipped_images: usize,
}

pub struct PostService {
    posts: Arc<dyn PostRepo>,
    users: Arc<dyn UserRepo>,
    media: Arc<dyn MediaStore>,
}

fn required(field: Option<String>, name: &str) -> Result<String> {
    match field.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::validation(format!("{name} is required"))),
    }
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepo>,
        users: Arc<dyn UserRepo>,
        media: Arc<dyn MediaStore>,
    ) -> Self {
        Self { posts, users, media }
    }

    /// Validates, enforces restaurant-name uniqueness, inserts the post and
    /// then stores images one by one. A failed upload is logged and skipped,
    /// and so is a failed write of the image rows.
    pub async fn create_post(
        &self,
        author: &SessionUser,
        form: PostForm,
        uploads: Vec<Upload>,
    ) -> Result<CreatedPost> {
        let restaurant_name = required(form.restaurant_name, "restaurantName")?;
        let location = required(form.location, "location")?;
        let description = required(form.description, "description")?;
        let rating = Rating::parse(&required(form.rating, "rating")?)?;
        let food_name = form.food_name.map(|v| v.trim().to_string()).unwrap_or_default();

        if self
            .posts
            .find_post_by_restaurant_name(&restaurant_name)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "a review for '{restaurant_name}' already exists"
            )));
        }

        let post = self
            .posts
            .create_post(NewPost {
                restaurant_name,
                food_name,
                location,
                rating,
                description,
                user_id: author.id,
                created_at: Utc::now(),
            })
            .await?;

        let submitted = uploads.iter().filter(|u| !u.data.is_empty()).count();
        let mut urls = Vec::with_capacity(submitted);
        for upload in uploads.into_iter().filter(|u| !u.data.is_empty()) {
            match self.media.save_upload(upload.data, &upload.content_type).await {
                Ok(media_id) => urls.push(self.media.get_url(&media_id).await),
                Err(e) => log::warn!(
                    "skipping image '{}' for post {}: {:#}",
                    upload.file_name,
                    post.id,
                    e
                ),
            }
        }

        // The post row is already committed; image rows are best effort.
        let images = if urls.is_empty() {
            Vec::new()
        } else {
            match self.posts.add_images(post.id, urls).await {
                Ok(images) => images,
                Err(e) => {
                    log::warn!("dropping images for post {}: {}", post.id, e);
                    Vec::new()
                }
            }
        };

        log::info!(
            "user {} created post {} ('{}') with {}/{} images",
            author.id,
            post.id,
            post.restaurant_name,
            images.len(),
            submitted
        );

        Ok(CreatedPost { skipped_images: submitted.saturating_sub(images.len()), post, images })
    }

    pub async fn get_post(&self, id: PostId) -> Result<PostDetail> {
        self.posts
            .find_post_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Post", id))
    }

    /// Public profile; posts are listed in the order they were written.
    pub async fn user_profile(&self, id: UserId) -> Result<UserProfile> {
        let user = self
            .users
            .find_user_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("User", id))?;

        let filter = PostFilter::ByAuthor(id);
        let total = self.posts.count_posts(filter).await?;
        let posts = if total == 0 {
            Vec::new()
        } else {
            self.posts
                .find_posts_page(filter, 0, total, PostOrder::OldestFirst)
                .await?
        };

        Ok(UserProfile {
            id: user.id,
            name: user.name,
            email: user.email,
            profile_picture: user.image,
            posts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use crate::traits::{MockMediaStore, MockPostRepo, MockUserRepo};

    fn author() -> SessionUser {
        SessionUser { id: 1, email: "a@x.io".into(), name: "A".into(), image: None }
    }

    fn form(rating: &str) -> PostForm {
        PostForm {
            restaurant_name: Some("Bangkok Noodle".into()),
            food_name: Some("Boat noodles".into()),
            location: Some("Sukhumvit 11".into()),
            rating: Some(rating.into()),
            description: Some("Rich broth".into()),
        }
    }

    fn stored(new: NewPost) -> Post {
        Post {
            id: 10,
            restaurant_name: new.restaurant_name,
            food_name: new.food_name,
            location: new.location,
            rating: new.rating,
            description: new.description,
            created_at: new.created_at,
            user_id: new.user_id,
        }
    }

    fn upload(name: &str, data: &[u8]) -> Upload {
        Upload { file_name: name.into(), content_type: "image/png".into(), data: data.to_vec() }
    }

    fn service(posts: MockPostRepo, media: MockMediaStore) -> PostService {
        PostService::new(Arc::new(posts), Arc::new(MockUserRepo::new()), Arc::new(media))
    }

    #[tokio::test]
    async fn test_rating_bounds() {
        for bad in ["0", "6", "4.5", "five"] {
            let svc = service(MockPostRepo::new(), MockMediaStore::new());
            let err = svc.create_post(&author(), form(bad), vec![]).await.unwrap_err();
            assert!(matches!(err, AppError::ValidationError(_)), "rating {bad}");
        }

        for good in ["1", "5"] {
            let mut posts = MockPostRepo::new();
            posts.expect_find_post_by_restaurant_name().returning(|_| Ok(None));
            posts.expect_create_post().returning(|new| Ok(stored(new)));
            let svc = service(posts, MockMediaStore::new());
            let created = svc.create_post(&author(), form(good), vec![]).await.unwrap();
            assert_eq!(i64::from(created.post.rating), good.parse::<i64>().unwrap());
        }
    }

    #[tokio::test]
    async fn test_missing_fields_are_rejected_before_any_write() {
        let mut posts = MockPostRepo::new();
        posts.expect_create_post().never();
        let svc = service(posts, MockMediaStore::new());

        let mut missing = form("4");
        missing.location = Some("   ".into());
        let err = svc.create_post(&author(), missing, vec![]).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_duplicate_restaurant_name_conflicts() {
        let mut posts = MockPostRepo::new();
        posts.expect_find_post_by_restaurant_name().returning(|name| {
            Ok(Some(Post {
                id: 1,
                restaurant_name: name.to_string(),
                food_name: String::new(),
                location: "x".into(),
                rating: Rating::new(3).unwrap(),
                description: "x".into(),
                created_at: Utc::now(),
                user_id: 2,
            }))
        });
        posts.expect_create_post().never();

        let err = service(posts, MockMediaStore::new())
            .create_post(&author(), form("4"), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_failed_uploads_are_skipped() {
        let mut posts = MockPostRepo::new();
        posts.expect_find_post_by_restaurant_name().returning(|_| Ok(None));
        posts.expect_create_post().returning(|new| Ok(stored(new)));
        posts
            .expect_add_images()
            .withf(|post_id, urls| *post_id == 10 && urls.len() == 1)
            .returning(|post_id, urls| {
                Ok(urls
                    .into_iter()
                    .enumerate()
                    .map(|(i, url)| Image { id: i as i64 + 1, url, post_id, created_at: Utc::now() })
                    .collect())
            });

        let mut media = MockMediaStore::new();
        media.expect_save_upload().returning(|data, _| {
            if data == b"broken" {
                Err(anyhow::anyhow!("bucket unavailable"))
            } else {
                Ok("abcd1234".into())
            }
        });
        media
            .expect_get_url()
            .returning(|id| format!("/static/uploads/{id}"));

        let created = service(posts, media)
            .create_post(
                &author(),
                form("4"),
                vec![upload("ok.png", b"png"), upload("bad.png", b"broken"), upload("empty.png", b"")],
            )
            .await
            .unwrap();

        assert_eq!(created.images.len(), 1);
        assert_eq!(created.skipped_images, 1);
        assert_eq!(created.images[0].url, "/static/uploads/abcd1234");
    }

    #[tokio::test]
    async fn test_image_rows_failing_still_returns_the_post() {
        let mut posts = MockPostRepo::new();
        posts.expect_find_post_by_restaurant_name().returning(|_| Ok(None));
        posts.expect_create_post().returning(|new| Ok(stored(new)));
        posts
            .expect_add_images()
            .times(1)
            .returning(|_, _| Err(AppError::upstream(anyhow::anyhow!("database is locked"))));

        let mut media = MockMediaStore::new();
        media.expect_save_upload().returning(|_, _| Ok("abcd1234".into()));
        media.expect_get_url().returning(|id| format!("/static/uploads/{id}"));

        let created = service(posts, media)
            .create_post(&author(), form("4"), vec![upload("a.png", b"a"), upload("b.png", b"b")])
            .await
            .unwrap();

        assert_eq!(created.post.id, 10);
        assert!(created.images.is_empty());
        assert_eq!(created.skipped_images, 2);
    }

    #[tokio::test]
    async fn test_get_post_not_found() {
        let mut posts = MockPostRepo::new();
        posts.expect_find_post_by_id().returning(|_| Ok(None));
        let err = service(posts, MockMediaStore::new()).get_post(5).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)));
    }

    #[tokio::test]
    async fn test_profile_lists_posts_oldest_first() {
        let mut users = MockUserRepo::new();
        users.expect_find_user_by_id().returning(|id| {
            Ok(Some(User {
                id,
                name: "A".into(),
                email: "a@x.io".into(),
                password_hash: None,
                image: Some("/static/uploads/me.png".into()),
                enabled: true,
                created_at: Utc::now(),
            }))
        });
        let mut posts = MockPostRepo::new();
        posts.expect_count_posts().returning(|_| Ok(3));
        posts
            .expect_find_posts_page()
            .withf(|f, skip, take, order| {
                *f == PostFilter::ByAuthor(1)
                    && *skip == 0
                    && *take == 3
                    && *order == PostOrder::OldestFirst
            })
            .returning(|_, _, _, _| Ok(vec![]));

        let svc = PostService::new(Arc::new(posts), Arc::new(users), Arc::new(MockMediaStore::new()));
        let profile = svc.user_profile(1).await.unwrap();
        assert_eq!(profile.profile_picture.as_deref(), Some("/static/uploads/me.png"));
    }
}
