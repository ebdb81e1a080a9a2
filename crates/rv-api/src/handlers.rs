//! # rv-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the core services.
//! JSON endpoints live under `/auth`, `/posts` and `/users`; the browser pages
//! are `/`, `/post/{id}` and their form actions.

use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use askama::Template;
use rv_core::error::AppError;
use rv_core::models::{PostForm, PostId, RegisterForm, UserId};
use rv_core::pagination::{FeedPaginator, FeedScope, PageRequest};
use rv_core::traits::{AuthProvider, MediaStore, PostRepo, UserRepo};
use rv_core::{AccountService, InteractionService, PostService, SessionStore};
use rv_ui::{filter_posts, LoginTemplate, PostTemplate};
use serde::Deserialize;

use crate::error::ApiError;
use crate::middleware::{optional_session, require_session, SESSION_COOKIE};
use crate::multipart::parse_multipart;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub sessions: SessionStore,
    pub feed: FeedPaginator,
    pub interactions: InteractionService,
    pub posts: PostService,
    pub accounts: AccountService,
    /// Lifetime of the session cookie, matching the token TTL
    pub session_ttl_secs: i64,
}

impl AppState {
    pub fn new(
        posts: Arc<dyn PostRepo>,
        users: Arc<dyn UserRepo>,
        media: Arc<dyn MediaStore>,
        auth: Arc<dyn AuthProvider>,
        session_ttl_secs: i64,
    ) -> Self {
        Self {
            sessions: SessionStore::new(users.clone(), auth.clone()),
            feed: FeedPaginator::new(posts.clone()),
            interactions: InteractionService::new(posts.clone()),
            posts: PostService::new(posts, users.clone(), media.clone()),
            accounts: AccountService::new(users, auth, media),
            session_ttl_secs,
        }
    }
}

type ApiResult = Result<HttpResponse, ApiError>;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageQuery {
    fn request(&self) -> PageRequest {
        PageRequest::from_raw(self.page.as_deref(), self.limit.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    pub page: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub text: Option<String>,
}

fn render(tpl: impl Template) -> ApiResult {
    let html = tpl
        .render()
        .map_err(|e| AppError::Internal(format!("template rendering failed: {e}")))?;
    Ok(HttpResponse::Ok().content_type("text/html; charset=utf-8").body(html))
}

fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther().insert_header((header::LOCATION, location)).finish()
}

fn wants_html(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/html"))
}

fn session_cookie(token: String, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(max_age_secs))
        .finish()
}

// ── Auth ────────────────────────────────────────────────────────────────────

/// `POST /auth/register` (multipart: name, email, password, image?)
pub async fn register(data: web::Data<AppState>, payload: Multipart) -> ApiResult {
    let mut form = parse_multipart(payload).await?;
    let user = data
        .accounts
        .register(RegisterForm {
            name: form.take("name"),
            email: form.take("email"),
            password: form.take("password"),
            avatar: form.take_file("image"),
        })
        .await?;
    Ok(HttpResponse::Ok().json(user))
}

/// `POST /auth/login`. Browsers get a redirect (or the login page again),
/// API clients get `{token, user}`. Both get the session cookie.
pub async fn login(
    data: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<LoginForm>,
) -> ApiResult {
    let form = form.into_inner();
    let email = form.email.unwrap_or_default();
    let password = form.password.unwrap_or_default();

    let issued = match data.sessions.login(&email, &password).await {
        Ok(issued) => issued,
        // Unknown email and wrong password look the same from outside.
        Err(AppError::NotFound(..)) => return login_failed(&req, AppError::InvalidCredentials),
        Err(e) => return login_failed(&req, e),
    };

    log::info!("user {} signed in", issued.user.id);
    let cookie = session_cookie(issued.token.clone(), data.session_ttl_secs);
    if wants_html(&req) {
        return Ok(HttpResponse::SeeOther()
            .insert_header((header::LOCATION, "/"))
            .cookie(cookie)
            .finish());
    }
    Ok(HttpResponse::Ok().cookie(cookie).json(issued))
}

fn login_failed(req: &HttpRequest, err: AppError) -> ApiResult {
    let err = ApiError(err);
    if !wants_html(req) {
        return Err(err);
    }
    let message = err.public_message();
    let html = LoginTemplate { title: "Sign in", viewer: None, error: Some(&message) }
        .render()
        .map_err(|e| AppError::Internal(format!("template rendering failed: {e}")))?;
    Ok(HttpResponse::Unauthorized().content_type("text/html; charset=utf-8").body(html))
}

/// `POST /auth/logout`
pub async fn logout() -> HttpResponse {
    let cookie = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .max_age(Duration::ZERO)
        .finish();
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/"))
        .cookie(cookie)
        .finish()
}

/// `GET /auth/login`
pub async fn login_page(data: web::Data<AppState>, req: HttpRequest) -> ApiResult {
    let viewer = optional_session(&req, &data).await;
    render(LoginTemplate { title: "Sign in", viewer: viewer.as_ref(), error: None })
}

// ── Posts (JSON) ────────────────────────────────────────────────────────────

/// `GET /posts/feed?page&limit`
pub async fn feed(data: web::Data<AppState>, query: web::Query<PageQuery>) -> ApiResult {
    let page = data.feed.list_posts(FeedScope::All, None, query.request()).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// `GET /posts/mine?page&limit`
pub async fn my_posts(
    data: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<PageQuery>,
) -> ApiResult {
    let viewer = require_session(&req, &data).await?;
    let page = data
        .feed
        .list_posts(FeedScope::Mine, Some(&viewer), query.request())
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// `GET /users/{id}/posts?page&limit`
pub async fn user_posts(
    data: web::Data<AppState>,
    path: web::Path<UserId>,
    query: web::Query<PageQuery>,
) -> ApiResult {
    let page = data
        .feed
        .list_posts(FeedScope::ByUser(path.into_inner()), None, query.request())
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// `GET /posts/{id}`. A missing post answers `{"post": null}` with 404.
pub async fn get_post(data: web::Data<AppState>, path: web::Path<PostId>) -> ApiResult {
    match data.posts.get_post(path.into_inner()).await {
        Ok(post) => Ok(HttpResponse::Ok().json(post)),
        Err(AppError::NotFound(..)) => {
            Ok(HttpResponse::NotFound().json(serde_json::json!({ "post": null })))
        }
        Err(e) => Err(e.into()),
    }
}

/// `POST /posts` (multipart: restaurantName, foodname, location, rating, description, images[])
pub async fn create_post(
    data: web::Data<AppState>,
    req: HttpRequest,
    payload: Multipart,
) -> ApiResult {
    let author = require_session(&req, &data).await?;
    let mut form = parse_multipart(payload).await?;

    let post_form = PostForm {
        restaurant_name: form.take("restaurantName"),
        food_name: form.take("foodname"),
        location: form.take("location"),
        rating: form.take("rating"),
        description: form.take("description"),
    };
    let created = data
        .posts
        .create_post(&author, post_form, form.into_files())
        .await?;
    Ok(HttpResponse::Created().json(created))
}

/// `POST /posts/{id}/like`
pub async fn like_json(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<PostId>,
) -> ApiResult {
    let user = require_session(&req, &data).await?;
    let state = data.interactions.toggle_like(&user, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(state))
}

/// `POST /posts/{id}/comments` with `{"text": ...}`
pub async fn comment_json(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<PostId>,
    body: web::Json<CommentForm>,
) -> ApiResult {
    let user = require_session(&req, &data).await?;
    let text = body.into_inner().text.unwrap_or_default();
    let comment = data
        .interactions
        .add_comment(&user, path.into_inner(), &text)
        .await?;
    Ok(HttpResponse::Created().json(comment))
}

/// `GET /users/{id}`
pub async fn user_profile(data: web::Data<AppState>, path: web::Path<UserId>) -> ApiResult {
    let profile = data.posts.user_profile(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

// ── Pages ───────────────────────────────────────────────────────────────────

/// Renders the feed index (`/?page&q`).
pub async fn index(
    data: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<IndexQuery>,
) -> ApiResult {
    let viewer = optional_session(&req, &data).await;
    let request = PageRequest::from_raw(query.page.as_deref(), None);
    let page = data
        .feed
        .list_posts(FeedScope::All, viewer.as_ref(), request)
        .await?;

    let q = query.q.as_deref().unwrap_or_default();
    let posts = filter_posts(&page.data, q);
    render(rv_ui::IndexTemplate {
        title: "Latest reviews",
        viewer: viewer.as_ref(),
        posts: &posts,
        query: q,
        page: request.page(),
        has_more: page.has_more,
    })
}

/// Renders a single post (`/post/{id}`).
pub async fn post_page(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<PostId>,
) -> ApiResult {
    let viewer = optional_session(&req, &data).await;
    let post = match data.posts.get_post(path.into_inner()).await {
        Ok(post) => post,
        Err(AppError::NotFound(..)) => {
            return Ok(HttpResponse::NotFound()
                .content_type("text/html; charset=utf-8")
                .body("<h1>Review not found</h1>"))
        }
        Err(e) => return Err(e.into()),
    };

    let liked = viewer.as_ref().is_some_and(|v| post.is_liked_by(v.id));
    render(PostTemplate {
        title: &post.post.restaurant_name,
        viewer: viewer.as_ref(),
        post: &post,
        liked,
    })
}

/// `POST /post/{id}/like` form action; re-renders the post on success.
pub async fn like_form(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<PostId>,
) -> ApiResult {
    let post_id = path.into_inner();
    let Some(user) = optional_session(&req, &data).await else {
        return Ok(see_other("/auth/login"));
    };
    data.interactions.toggle_like(&user, post_id).await?;
    Ok(see_other(&format!("/post/{post_id}")))
}

/// `POST /post/{id}/comment` form action.
pub async fn comment_form(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<PostId>,
    form: web::Form<CommentForm>,
) -> ApiResult {
    let post_id = path.into_inner();
    let Some(user) = optional_session(&req, &data).await else {
        return Ok(see_other("/auth/login"));
    };
    let text = form.into_inner().text.unwrap_or_default();
    data.interactions.add_comment(&user, post_id, &text).await?;
    Ok(see_other(&format!("/post/{post_id}")))
}
