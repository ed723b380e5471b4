use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    analysis::dto::ReportResponse,
    auth::extractors::{BearerToken, ClientIdentity},
    error::ApiError,
    pipeline,
    state::AppState,
};

pub fn analysis_routes() -> Router<AppState> {
    Router::new().route("/analyze/:sector", get(analyze_sector))
}

#[instrument(skip(state, token))]
pub async fn analyze_sector(
    State(state): State<AppState>,
    ClientIdentity(identity): ClientIdentity,
    BearerToken(token): BearerToken,
    Path(sector): Path<String>,
) -> Result<Json<ReportResponse>, ApiError> {
    let report = pipeline::analyze(&state, &identity, token.as_deref(), &sector).await?;
    Ok(Json(report.into()))
}
