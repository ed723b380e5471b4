use std::time::Duration;

mod analysis;
mod app;
mod auth;
mod clock;
mod config;
mod error;
mod pipeline;
mod rate_limit;
mod state;
#[cfg(test)]
mod testing;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "trade_opportunities=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = AppState::init(AppConfig::from_env()?)?;
    let cleanup_every = Duration::from_secs(app_state.config.rate_limit.window_seconds.max(1));
    app_state.limiter.start_cleanup_task(cleanup_every);

    app::serve(app::build_app(app_state)).await
}
