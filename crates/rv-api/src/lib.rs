//! # rv-api
//!
//! The web routing and orchestration layer for Rusty-Reviews.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod multipart;

use actix_web::web;

pub use error::ApiError;
pub use handlers::AppState;

/// Configures every route of the application.
///
/// Static paths (`/posts/feed`, `/posts/mine`) are registered ahead of
/// `/posts/{id}` so they are matched first.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(handlers::register))
            .route("/login", web::get().to(handlers::login_page))
            .route("/login", web::post().to(handlers::login))
            .route("/logout", web::post().to(handlers::logout)),
    )
    .service(
        web::scope("/posts")
            .route("", web::post().to(handlers::create_post))
            .route("/feed", web::get().to(handlers::feed))
            .route("/mine", web::get().to(handlers::my_posts))
            .route("/{id}", web::get().to(handlers::get_post))
            .route("/{id}/like", web::post().to(handlers::like_json))
            .route("/{id}/comments", web::post().to(handlers::comment_json)),
    )
    .service(
        web::scope("/users")
            .route("/{id}", web::get().to(handlers::user_profile))
            .route("/{id}/posts", web::get().to(handlers::user_posts)),
    )
    // Browser pages
    .route("/", web::get().to(handlers::index))
    .route("/post/{id}", web::get().to(handlers::post_page))
    .route("/post/{id}/like", web::post().to(handlers::like_form))
    .route("/post/{id}/comment", web::post().to(handlers::comment_form));
}
