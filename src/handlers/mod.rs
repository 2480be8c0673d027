pub mod bookings;
pub mod classes;
pub mod employees;
pub mod members;
pub mod memberships;
pub mod products;

use axum::{
    Json,
    extract::{FromRequest, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use serde::Deserialize;
use tracing::warn;

use crate::store::{Entity, EntityStore};
use crate::{AppState, auth::verify_token, error::ApiError};

pub type BearerAuth = Option<TypedHeader<Authorization<Bearer>>>;

/// JSON request body whose rejections answer with the usual `{"error": ..}` body.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct Payload<T>(pub T);

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

pub(crate) fn authorize(
    state: &AppState,
    auth: BearerAuth,
    query: &TokenQuery,
) -> Result<(), ApiError> {
    let auth_header = auth.map(|TypedHeader(a)| a);
    verify_token(&state.settings, auth_header, query.token.as_deref())
}

pub(crate) async fn list<E, S>(store: &S) -> Result<Json<Vec<E>>, ApiError>
where
    E: Entity,
    S: EntityStore<E>,
{
    Ok(Json(EntityStore::<E>::get_all(store).await?))
}

pub(crate) async fn fetch<E, S>(store: &S, id: &str) -> Result<Json<E>, ApiError>
where
    E: Entity,
    S: EntityStore<E>,
{
    Ok(Json(EntityStore::<E>::get_by_id(store, id).await?))
}

pub(crate) async fn create<E, S>(
    store: &S,
    input: E::Input,
) -> Result<(StatusCode, Json<E::Created>), ApiError>
where
    E: Entity,
    S: EntityStore<E>,
{
    let created = EntityStore::<E>::add(store, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub(crate) async fn replace<E, S>(
    store: &S,
    id: &str,
    input: E::Input,
) -> Result<Json<E>, ApiError>
where
    E: Entity,
    S: EntityStore<E>,
{
    Ok(Json(EntityStore::<E>::update(store, id, input).await?))
}

pub(crate) async fn remove<E, S>(store: &S, id: &str) -> Result<StatusCode, ApiError>
where
    E: Entity,
    S: EntityStore<E>,
{
    EntityStore::<E>::delete(store, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(get, path = "/", tag = "health")]
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Fitness Center API",
        "endpoints": {
            "/members": "Members and their persons",
            "/employees": "Employees and their persons",
            "/memberships": "Membership plans",
            "/products": "Shop products",
            "/classes": "Scheduled classes",
            "/bookings": "Class bookings with admission control"
        }
    }))
}

#[utoipa::path(get, path = "/healthz/live", tag = "health")]
pub async fn healthz_live() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(
    get,
    path = "/healthz/ready",
    responses(
        (status = 200, description = "All stores reachable"),
        (status = 503, description = "A store is unreachable")
    ),
    tag = "health"
)]
pub async fn healthz_ready(State(state): State<AppState>) -> impl IntoResponse {
    let sql = state.sql.ping().await;
    let backend = state.backend.ping().await;
    match (sql, backend) {
        (Ok(()), Ok(())) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ok",
                "backend": state.backend.kind().to_string()
            })),
        ),
        (sql, backend) => {
            warn!(
                "Readiness check failed (sql ok: {}, {} ok: {})",
                sql.is_ok(),
                state.backend.kind(),
                backend.is_ok()
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({"status": "unavailable"})),
            )
        }
    }
}
