//! # Rusty-Reviews Binary
//!
//! The entry point that assembles the application based on compile-time
//! features, loads settings and serves HTTP.

mod settings;

use std::sync::Arc;

use actix_files::Files;
use actix_web::{web, App, HttpServer};
use rv_api::{configure_routes, middleware, AppState};

// Feature-gated imports: each port is filled by whichever plugin was compiled in
#[cfg(feature = "db-sqlite")]
use rv_db_sqlite::SqliteStore;

#[cfg(feature = "storage-local")]
use rv_storage_local::LocalMediaStore;

#[cfg(feature = "auth-jwt")]
use rv_auth_jwt::JwtAuthProvider;
#[cfg(feature = "auth-jwt")]
use secrecy::ExposeSecret;

use crate::settings::Settings;

#[cfg(not(feature = "db-sqlite"))]
compile_error!("no database plugin enabled; build with the `db-sqlite` feature");

#[cfg(not(feature = "storage-local"))]
compile_error!("no media storage plugin enabled; build with the `storage-local` feature");

#[cfg(not(feature = "auth-jwt"))]
compile_error!("no auth plugin enabled; build with the `auth-jwt` feature");

/// Plugins compiled into this binary, for the startup log line.
fn enabled_plugins() -> Vec<&'static str> {
    let mut plugins = Vec::new();
    if cfg!(feature = "db-sqlite") {
        plugins.push("db-sqlite");
    }
    if cfg!(feature = "storage-local") {
        plugins.push("storage-local");
    }
    if cfg!(feature = "auth-jwt") {
        plugins.push("auth-jwt");
    }
    plugins
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Settings::load()?;
    log::info!("plugins: {}", enabled_plugins().join(", "));

    // 1. Initialize Database Implementation
    #[cfg(feature = "db-sqlite")]
    let db = Arc::new(SqliteStore::new(&settings.database.url).await?);

    // 2. Initialize Storage Implementation
    #[cfg(feature = "storage-local")]
    let media = {
        std::fs::create_dir_all(&settings.media.root)?;
        Arc::new(LocalMediaStore::new(
            settings.media.root.clone(),
            settings.media.url_prefix.clone(),
        ))
    };

    // 3. Initialize Auth Implementation
    #[cfg(feature = "auth-jwt")]
    let auth = {
        if settings.auth.using_dev_secret {
            log::warn!("REVIEWS__AUTH__JWT_SECRET is not set; using the development secret");
        }
        Arc::new(JwtAuthProvider::new(
            settings.auth.jwt_secret.expose_secret(),
            settings.auth.session_ttl_secs,
        ))
    };

    // 4. Wrap in AppState (dynamic dispatch over the ports)
    let state = web::Data::new(AppState::new(
        db.clone(),
        db,
        media,
        auth,
        settings.auth.session_ttl_secs,
    ));

    let media_root = settings.media.root.clone();
    let media_prefix = settings.media.url_prefix.clone();
    let bind = (settings.server.host.clone(), settings.server.port);

    log::info!("Rusty-Reviews starting on http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::security_headers())
            .wrap(middleware::cors_policy())
            .wrap(middleware::standard_middleware())
            .app_data(state.clone())
            .service(Files::new(&media_prefix, media_root.clone()))
            .configure(configure_routes)
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_build_wires_every_port() {
        assert_eq!(enabled_plugins(), vec!["db-sqlite", "storage-local", "auth-jwt"]);
    }
}
