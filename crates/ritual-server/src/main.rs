use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use ritual_api::middleware::{require_auth, require_bot_secret};
use ritual_api::{AppState, AppStateInner, bindings, habits};
use ritual_notify::{Dispatcher, TelegramGateway, run_scheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ritual=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("RITUAL_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let bot_secret =
        std::env::var("RITUAL_BOT_SECRET").unwrap_or_else(|_| "dev-bot-secret-change-me".into());
    let db_path = std::env::var("RITUAL_DB_PATH").unwrap_or_else(|_| "ritual.db".into());
    let host = std::env::var("RITUAL_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("RITUAL_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let tick_secs: u64 = std::env::var("RITUAL_TICK_SECS")
        .unwrap_or_else(|_| "60".into())
        .parse()?;

    // Init database
    let db = Arc::new(ritual_db::Database::open(&PathBuf::from(&db_path))?);

    let state: AppState = Arc::new(AppStateInner {
        db: db.clone(),
        jwt_secret,
        bot_secret,
    });

    // Reminder scheduler — disabled when no bot token is configured
    match std::env::var("RITUAL_TELEGRAM_TOKEN") {
        Ok(token) if !token.is_empty() => {
            let gateway = Arc::new(TelegramGateway::new(token)?);
            let dispatcher = Dispatcher::new(db, gateway);
            tokio::spawn(run_scheduler(dispatcher, Duration::from_secs(tick_secs)));
        }
        _ => warn!("RITUAL_TELEGRAM_TOKEN not set, reminder dispatch disabled"),
    }

    // Routes
    let public_routes = Router::new()
        .route("/habits/public", get(habits::public_habits))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/habits", post(habits::create_habit))
        .route("/habits", get(habits::list_habits))
        .route("/habits/{id}", get(habits::get_habit))
        .route("/habits/{id}", put(habits::update_habit))
        .route("/habits/{id}", axum::routing::delete(habits::delete_habit))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let bot_routes = Router::new()
        .route("/bindings", post(bindings::upsert_binding))
        .route("/bindings/{user_id}", get(bindings::get_binding))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_bot_secret,
        ))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(bot_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Ritual server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
