//! Gateway routes

use axum::{
    extract::{Path, Query, State},
    Json,
};
use portico_core::types::{AuthOutcome, HealthSnapshot, LookupResult};
use serde::Deserialize;
use tracing::debug;

use crate::error::ApiError;
use crate::server::AppState;

/// Credentials for `POST /auth`
///
/// Missing fields deserialize as empty strings and are rejected by the
/// service as invalid input.
#[derive(Deserialize)]
pub struct AuthRequest {
    #[serde(default)]
    pub login: String,
    #[serde(default, alias = "senha")]
    pub password: String,
}

impl std::fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthRequest")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LookupQuery {
    /// Comma-separated department list
    #[serde(alias = "secretarias")]
    pub departments: Option<String>,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthSnapshot> {
    debug!("GET /health");
    Json(state.service.health().await)
}

/// POST /auth
pub async fn authenticate(
    State(state): State<AppState>,
    Json(request): Json<AuthRequest>,
) -> Result<Json<AuthOutcome>, ApiError> {
    debug!(login = %request.login, "POST /auth");

    let outcome = state
        .service
        .authenticate(&request.login, &request.password)
        .await?;
    Ok(Json(outcome))
}

/// GET /lookup/{login}
pub async fn lookup(
    State(state): State<AppState>,
    Path(login): Path<String>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<LookupResult>, ApiError> {
    debug!(login = %login, departments = ?query.departments, "GET /lookup");

    let user = state
        .service
        .find_by_login(&login, query.departments.as_deref())
        .await?;
    Ok(Json(user))
}
