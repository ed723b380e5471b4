use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod generator;
pub mod handlers;
pub mod news;
pub mod orchestrator;
pub mod synthesizer;
pub mod validation;

pub fn router() -> Router<AppState> {
    handlers::analysis_routes()
}
