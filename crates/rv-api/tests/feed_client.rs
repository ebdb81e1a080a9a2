//! The client feed view driven over real HTTP against a live server.

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use rv_api::{configure_routes, AppState};
use rv_auth_jwt::JwtAuthProvider;
use rv_core::models::{NewUser, PostForm, SessionUser};
use rv_core::traits::UserRepo;
use rv_db_sqlite::SqliteStore;
use rv_storage_local::LocalMediaStore;
use rv_ui::feed_view::{FeedView, HttpFeedSource};

fn review(restaurant: &str, food: &str) -> PostForm {
    PostForm {
        restaurant_name: Some(restaurant.into()),
        food_name: Some(food.into()),
        location: Some("Bangkok".into()),
        rating: Some("4".into()),
        description: Some("Worth the queue".into()),
    }
}

#[actix_web::test]
async fn test_feed_view_pages_through_live_server() {
    let db = Arc::new(SqliteStore::new("sqlite::memory:").await.unwrap());
    let dir = tempfile::tempdir().unwrap();
    let media = Arc::new(LocalMediaStore::new(dir.path().to_path_buf(), "/static/uploads".into()));
    let auth = Arc::new(JwtAuthProvider::new("test-secret", 3600));
    let state = web::Data::new(AppState::new(db.clone(), db.clone(), media, auth, 3600));

    let user = db
        .create_user(NewUser {
            name: "Alice".into(),
            email: "alice@example.com".into(),
            password_hash: None,
            image: None,
        })
        .await
        .unwrap();
    let author = SessionUser::from(&user);
    for (restaurant, food) in [
        ("Jay Fai", "Crab omelette"),
        ("Thipsamai", "Pad thai"),
        ("Nai Mong", "Oyster omelette"),
    ] {
        state.posts.create_post(&author, review(restaurant, food), vec![]).await.unwrap();
    }

    let app_state = state.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(configure_routes)
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);

    let mut view = FeedView::new(HttpFeedSource::new(format!("http://{addr}")), 2);

    view.refresh().await.unwrap();
    assert_eq!(view.items().len(), 2);
    assert!(view.has_more());

    assert_eq!(view.load_more().await.unwrap(), 1);
    assert!(!view.has_more());
    assert_eq!(view.items().len(), 3);
    assert_eq!(view.load_more().await.unwrap(), 0);

    let pad_thai = view.filtered("pad THAI");
    assert_eq!(pad_thai.len(), 1);
    assert_eq!(pad_thai[0].post.restaurant_name, "Thipsamai");
    assert_eq!(view.filtered("omelette").len(), 2);

    handle.stop(true).await;
}
