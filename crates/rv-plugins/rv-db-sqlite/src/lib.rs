//! # rv-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `rv-core` domain models. One store backs both `PostRepo` and
//! `UserRepo`.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rv_core::error::{AppError, Result};
use rv_core::models::{
    AuthorView, Comment, CommentView, Image, Like, LikeView, NewComment, NewPost, NewUser, Post,
    PostDetail, PostFilter, PostId, PostOrder, PostSummary, Rating, User, UserId,
};
use rv_core::traits::{PostRepo, UserRepo};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

pub struct SqliteStore {
    pool: SqlitePool,
}

// Helpers for timestamp conversion
fn to_micros(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

fn from_micros(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or_default()
}

/// Caller-facing text for a unique violation, keyed on the constraint
/// SQLite names ("UNIQUE constraint failed: posts.restaurant_name").
fn conflict_message(raw: &str) -> &'static str {
    if raw.contains("posts.restaurant_name") {
        "a review for this restaurant already exists"
    } else if raw.contains("users.email") {
        "email is already registered"
    } else {
        "resource already exists"
    }
}

/// Unique-constraint violations become `Conflict`; everything else is upstream.
fn db_err(err: sqlx::Error) -> AppError {
    if let Some(db) = err.as_database_error() {
        if db.is_unique_violation() {
            log::debug!("unique violation: {}", db.message());
            return AppError::Conflict(conflict_message(db.message()).to_string());
        }
    }
    log::error!("database error: {}", err);
    AppError::upstream(err)
}

const USER_COLUMNS: &str = "id, name, email, password_hash, image, enabled, created_at";

const POST_COLUMNS: &str =
    "p.id, p.restaurant_name, p.food_name, p.location, p.rating, p.description, p.created_at, p.user_id";

fn post_from_row(row: &SqliteRow) -> sqlx::Result<Post> {
    let rating = Rating::new(row.try_get("rating")?).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    Ok(Post {
        id: row.try_get("id")?,
        restaurant_name: row.try_get("restaurant_name")?,
        food_name: row.try_get("food_name")?,
        location: row.try_get("location")?,
        rating,
        description: row.try_get("description")?,
        created_at: from_micros(row.try_get("created_at")?),
        user_id: row.try_get("user_id")?,
    })
}

fn user_from_row(row: &SqliteRow) -> sqlx::Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        image: row.try_get("image")?,
        enabled: row.try_get("enabled")?,
        created_at: from_micros(row.try_get("created_at")?),
    })
}

/// Reads the `{prefix}_id`, `{prefix}_name`, `{prefix}_image` columns of a join.
fn author_from_row(row: &SqliteRow, prefix: &str) -> sqlx::Result<AuthorView> {
    Ok(AuthorView {
        id: row.try_get(format!("{prefix}_id").as_str())?,
        name: row.try_get(format!("{prefix}_name").as_str())?,
        image: row.try_get(format!("{prefix}_image").as_str())?,
    })
}

impl SqliteStore {
    /// Connects and applies the embedded migrations.
    ///
    /// An in-memory database lives only as long as its connection, so the
    /// pool is pinned to a single connection that never expires.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let in_memory = url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool = if in_memory {
            SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        sqlx::migrate!("./migrations").run(&pool).await?;
        log::info!("sqlite store ready at {}", url);
        Ok(Self { pool })
    }

    async fn insert_post(&self, post: NewPost) -> sqlx::Result<Post> {
        let result = sqlx::query(
            "INSERT INTO posts (restaurant_name, food_name, location, rating, description, created_at, user_id) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&post.restaurant_name)
        .bind(&post.food_name)
        .bind(&post.location)
        .bind(i64::from(post.rating))
        .bind(&post.description)
        .bind(to_micros(post.created_at))
        .bind(post.user_id)
        .execute(&self.pool)
        .await?;

        Ok(Post {
            id: result.last_insert_rowid(),
            restaurant_name: post.restaurant_name,
            food_name: post.food_name,
            location: post.location,
            rating: post.rating,
            description: post.description,
            created_at: post.created_at,
            user_id: post.user_id,
        })
    }

    /// Inserts every image row in one transaction.
    async fn insert_images(&self, post_id: PostId, urls: Vec<String>) -> sqlx::Result<Vec<Image>> {
        let mut tx = self.pool.begin().await?;
        let mut images = Vec::with_capacity(urls.len());
        for url in urls {
            let created_at = Utc::now();
            let result = sqlx::query("INSERT INTO images (url, post_id, created_at) VALUES (?, ?, ?)")
                .bind(&url)
                .bind(post_id)
                .bind(to_micros(created_at))
                .execute(&mut *tx)
                .await?;
            images.push(Image { id: result.last_insert_rowid(), url, post_id, created_at });
        }
        tx.commit().await?;
        Ok(images)
    }

    /// Retrieves a post and all of its associations.
    async fn select_post_detail(&self, id: PostId) -> sqlx::Result<Option<PostDetail>> {
        let sql = format!(
            "SELECT {POST_COLUMNS}, u.id AS author_id, u.name AS author_name, u.image AS author_image, u.email AS author_email \
             FROM posts p JOIN users u ON u.id = p.user_id WHERE p.id = ?"
        );
        let row = match sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await? {
            Some(row) => row,
            None => return Ok(None),
        };
        let post = post_from_row(&row)?;
        let author = author_from_row(&row, "author")?;
        let author_email: String = row.try_get("author_email")?;

        let images = sqlx::query("SELECT id, url, post_id, created_at FROM images WHERE post_id = ? ORDER BY created_at ASC, id ASC")
            .bind(id)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|row| -> sqlx::Result<Image> {
                Ok(Image {
                    id: row.try_get("id")?,
                    url: row.try_get("url")?,
                    post_id: row.try_get("post_id")?,
                    created_at: from_micros(row.try_get("created_at")?),
                })
            })
            .collect::<sqlx::Result<Vec<_>>>()?;

        let likes = sqlx::query(
            "SELECT l.id, l.user_id, l.post_id, l.created_at, u.id AS liker_id, u.name AS liker_name, u.image AS liker_image \
             FROM likes l JOIN users u ON u.id = l.user_id WHERE l.post_id = ? ORDER BY l.created_at ASC, l.id ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|row| -> sqlx::Result<LikeView> {
            Ok(LikeView {
                like: Like {
                    id: row.try_get("id")?,
                    user_id: row.try_get("user_id")?,
                    post_id: row.try_get("post_id")?,
                    created_at: from_micros(row.try_get("created_at")?),
                },
                user: author_from_row(row, "liker")?,
            })
        })
        .collect::<sqlx::Result<Vec<_>>>()?;

        let comments = sqlx::query(
            "SELECT c.id, c.text, c.user_id, c.post_id, c.created_at, u.id AS commenter_id, u.name AS commenter_name, u.image AS commenter_image \
             FROM comments c JOIN users u ON u.id = c.user_id WHERE c.post_id = ? ORDER BY c.created_at ASC, c.id ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|row| -> sqlx::Result<CommentView> {
            Ok(CommentView {
                comment: Comment {
                    id: row.try_get("id")?,
                    text: row.try_get("text")?,
                    user_id: row.try_get("user_id")?,
                    post_id: row.try_get("post_id")?,
                    created_at: from_micros(row.try_get("created_at")?),
                },
                user: author_from_row(row, "commenter")?,
            })
        })
        .collect::<sqlx::Result<Vec<_>>>()?;

        Ok(Some(PostDetail { post, author, author_email, images, likes, comments }))
    }

    /// List projection: the earliest image and counts are computed in SQL so
    /// no association rows leave the database.
    async fn select_summaries(
        &self,
        filter: PostFilter,
        skip: i64,
        take: i64,
        order: PostOrder,
    ) -> sqlx::Result<Vec<PostSummary>> {
        let where_clause = match filter {
            PostFilter::All => "",
            PostFilter::ByAuthor(_) => "WHERE p.user_id = ?",
        };
        let order_clause = match order {
            PostOrder::NewestFirst => "ORDER BY p.created_at DESC, p.id DESC",
            PostOrder::OldestFirst => "ORDER BY p.created_at ASC, p.id ASC",
        };
        let sql = format!(
            "SELECT {POST_COLUMNS}, u.id AS author_id, u.name AS author_name, u.image AS author_image, \
             (SELECT i.url FROM images i WHERE i.post_id = p.id ORDER BY i.created_at ASC, i.id ASC LIMIT 1) AS first_image, \
             (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS like_count, \
             (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count \
             FROM posts p JOIN users u ON u.id = p.user_id {where_clause} {order_clause} LIMIT ? OFFSET ?"
        );

        let mut query = sqlx::query(&sql);
        if let PostFilter::ByAuthor(user_id) = filter {
            query = query.bind(user_id);
        }
        let rows = query.bind(take).bind(skip).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| -> sqlx::Result<PostSummary> {
                Ok(PostSummary {
                    post: post_from_row(row)?,
                    author: author_from_row(row, "author")?,
                    first_image: row.try_get("first_image")?,
                    like_count: row.try_get("like_count")?,
                    comment_count: row.try_get("comment_count")?,
                })
            })
            .collect()
    }

    async fn select_count(&self, filter: PostFilter) -> sqlx::Result<i64> {
        match filter {
            PostFilter::All => {
                sqlx::query_scalar("SELECT COUNT(*) FROM posts")
                    .fetch_one(&self.pool)
                    .await
            }
            PostFilter::ByAuthor(user_id) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE user_id = ?")
                    .bind(user_id)
                    .fetch_one(&self.pool)
                    .await
            }
        }
    }

    /// Conditional delete-or-insert keyed by the (user_id, post_id) unique
    /// constraint. Each statement is atomic on its own, so no interleaving
    /// can produce a second row.
    async fn flip_like(&self, user_id: UserId, post_id: PostId) -> sqlx::Result<bool> {
        let removed = sqlx::query("DELETE FROM likes WHERE user_id = ? AND post_id = ?")
            .bind(user_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if removed > 0 {
            return Ok(false);
        }

        // A concurrent insert for the same pair turns this into a no-op;
        // either way the pair ends up liked exactly once.
        sqlx::query(
            "INSERT INTO likes (user_id, post_id, created_at) VALUES (?, ?, ?) ON CONFLICT(user_id, post_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(post_id)
        .bind(to_micros(Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(true)
    }

    async fn insert_comment_row(&self, comment: NewComment) -> sqlx::Result<CommentView> {
        let result = sqlx::query("INSERT INTO comments (text, user_id, post_id, created_at) VALUES (?, ?, ?, ?)")
            .bind(&comment.text)
            .bind(comment.user_id)
            .bind(comment.post_id)
            .bind(to_micros(comment.created_at))
            .execute(&self.pool)
            .await?;

        let row = sqlx::query("SELECT id AS commenter_id, name AS commenter_name, image AS commenter_image FROM users WHERE id = ?")
            .bind(comment.user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(CommentView {
            user: author_from_row(&row, "commenter")?,
            comment: Comment {
                id: result.last_insert_rowid(),
                text: comment.text,
                user_id: comment.user_id,
                post_id: comment.post_id,
                created_at: comment.created_at,
            },
        })
    }

    async fn insert_user(&self, user: NewUser) -> sqlx::Result<User> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO users (name, email, password_hash, image, enabled, created_at) VALUES (?, ?, ?, ?, 1, ?)",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.image)
        .bind(to_micros(created_at))
        .execute(&self.pool)
        .await?;

        Ok(User {
            id: result.last_insert_rowid(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            image: user.image,
            enabled: true,
            created_at,
        })
    }

    async fn select_user_by_id(&self, id: UserId) -> sqlx::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    async fn select_user_by_email(&self, email: &str) -> sqlx::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
        sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    /// Toggles the enabled flag on an account.
    pub async fn set_user_enabled(&self, id: UserId, enabled: bool) -> Result<()> {
        sqlx::query("UPDATE users SET enabled = ? WHERE id = ?")
            .bind(enabled)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Updates the display fields of an account.
    pub async fn update_profile(&self, id: UserId, name: &str, image: Option<&str>) -> Result<()> {
        sqlx::query("UPDATE users SET name = ?, image = ? WHERE id = ?")
            .bind(name)
            .bind(image)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl PostRepo for SqliteStore {
    async fn create_post(&self, post: NewPost) -> Result<Post> {
        self.insert_post(post).await.map_err(db_err)
    }

    async fn add_images(&self, post_id: PostId, urls: Vec<String>) -> Result<Vec<Image>> {
        self.insert_images(post_id, urls).await.map_err(db_err)
    }

    async fn find_post_by_id(&self, id: PostId) -> Result<Option<PostDetail>> {
        self.select_post_detail(id).await.map_err(db_err)
    }

    async fn find_posts_page(
        &self,
        filter: PostFilter,
        skip: i64,
        take: i64,
        order: PostOrder,
    ) -> Result<Vec<PostSummary>> {
        self.select_summaries(filter, skip, take, order).await.map_err(db_err)
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<i64> {
        self.select_count(filter).await.map_err(db_err)
    }

    async fn find_post_by_restaurant_name(&self, name: &str) -> Result<Option<Post>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.restaurant_name = ?");
        sqlx::query(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .and_then(|row| row.as_ref().map(post_from_row).transpose())
            .map_err(db_err)
    }

    async fn post_exists(&self, id: PostId) -> Result<bool> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map(|n| n > 0)
            .map_err(db_err)
    }

    async fn toggle_like(&self, user_id: UserId, post_id: PostId) -> Result<bool> {
        self.flip_like(user_id, post_id).await.map_err(db_err)
    }

    async fn count_likes(&self, post_id: PostId) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE post_id = ?")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<CommentView> {
        self.insert_comment_row(comment).await.map_err(db_err)
    }
}

#[async_trait]
impl UserRepo for SqliteStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        self.insert_user(user).await.map_err(db_err)
    }

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>> {
        self.select_user_by_id(id).await.map_err(db_err)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.select_user_by_email(email).await.map_err(db_err)
    }
}
