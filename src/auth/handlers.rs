use axum::{extract::State, routing::post, Form, Json, Router};
use tracing::instrument;

use crate::{
    auth::dto::{LoginForm, TokenResponse},
    error::ApiError,
    pipeline,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/token", post(login))
}

#[instrument(skip(state, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = pipeline::login(&state, &form.username, &form.password).await?;
    Ok(Json(TokenResponse::bearer(token)))
}
