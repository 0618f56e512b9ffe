//! Election information portal: public directory of election centers and their
//! candidates, plus an admin area to manage centers, candidates, symbols and users.
//!
//!
//!
//! # General Infrastructure
//! - Single process, data kept as JSON arrays in `DATA_DIR` (see the `registry` crate)
//! - Uploaded photos, documents and symbols written under `PUBLIC_DIR` and served from `/`
//! - Rendering lives elsewhere, every handler answers with JSON
//!
//!
//!
//! # Sessions
//!
//! - `POST /login` checks the password and sets an HMAC signed `session` cookie lasting 7 days
//! - Cookie is HTTP-only, path `/`, `Secure` when `APP_ENV=production`
//! - The token carries only the user id and role, so nothing is stored server side
//! - `POST /logout` overwrites the cookie with an expired one
//!
//!
//!
//! # Route Guarding
//!
//! Every request passes [`middleware::access_control`] first.
//! - `/admin/**` without a valid session goes to `/login`
//! - `/admin/users/**` for anything but a superadmin goes back to `/admin`
//! - `/login` with a valid session goes to `/admin`
//!
//!
//!
//! # Environment
//!
//! | Variable | Default |
//! |---|---|
//! | `RUST_PORT` | `3000` |
//! | `DATA_DIR` | `data` |
//! | `PUBLIC_DIR` | `public` |
//! | `APP_ENV` | `development` |
//! | `AUTH_SECRET` | `/run/secrets/AUTH_SECRET`, development only: insecure default |
//! | `PASSWORD_ITERATIONS` | `210000` |
//! | `RESET_PASSWORD` | `Dhaka@2025` |
//!
//! Production refuses to start without `AUTH_SECRET`.
//!
//!
//!
//! # Setup
//!
//! Seed the first account, then start the server.
//! ```sh
//! cargo run -p process -- create-user --username root --role superadmin
//! RUST_LOG=info cargo run -p election
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{Method, header::CONTENT_TYPE},
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod admin;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod state;
pub mod utils;

use admin::{
    change_password_handler, create_candidate_handler, create_center_handler, create_sign_handler,
    create_user_handler, dashboard_handler, delete_candidate_handler, delete_center_handler,
    delete_sign_handler, delete_user_handler, get_candidate_handler, get_center_handler,
    list_candidates_handler, list_centers_handler, list_signs_handler, list_users_handler,
    reset_password_handler, update_candidate_handler, update_center_handler,
};
use config::Config;
use middleware::access_control;
use routes::{
    center_detail_handler, centers_handler, login_handler, login_page_handler, logout_handler,
};
use state::AppState;

/// Documents and photos go through multipart bodies.
pub const UPLOAD_LIMIT: usize = 20 * 1024 * 1024;

pub async fn start_server() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading configuration...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = AppState::new(config);

    info!("Starting server...");

    let app = build_router(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");

    Ok(())
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/", get(centers_handler))
        .route("/centers/{id}", get(center_detail_handler))
        .route("/login", get(login_page_handler).post(login_handler))
        .route("/logout", post(logout_handler))
        .route("/admin", get(dashboard_handler))
        .route(
            "/admin/centers",
            get(list_centers_handler).post(create_center_handler),
        )
        .route(
            "/admin/centers/{id}",
            get(get_center_handler)
                .put(update_center_handler)
                .delete(delete_center_handler),
        )
        .route(
            "/admin/candidates",
            get(list_candidates_handler).post(create_candidate_handler),
        )
        .route(
            "/admin/candidates/{id}",
            get(get_candidate_handler)
                .put(update_candidate_handler)
                .delete(delete_candidate_handler),
        )
        .route(
            "/admin/signs",
            get(list_signs_handler).post(create_sign_handler),
        )
        .route("/admin/signs/{id}", delete(delete_sign_handler))
        .route(
            "/admin/users",
            get(list_users_handler).post(create_user_handler),
        )
        .route("/admin/users/{id}", delete(delete_user_handler))
        .route(
            "/admin/users/{id}/reset-password",
            post(reset_password_handler),
        )
        .route("/admin/profile/password", post(change_password_handler))
        .fallback_service(ServeDir::new(&state.config.public_dir))
        .layer(from_fn_with_state(state.clone(), access_control))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT))
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
