use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};

use super::{BearerAuth, Payload, TokenQuery, authorize, create, fetch, list, remove, replace};
use crate::models::{Class, ClassInput};
use crate::{AppState, error::ApiError};

#[utoipa::path(
    get,
    path = "/classes",
    responses(
        (status = 200, description = "All classes", body = [Class]),
        (status = 500, description = "Failed to retrieve classes")
    ),
    tag = "classes"
)]
pub async fn list_classes(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    list::<Class, _>(&state.sql).await
}

#[utoipa::path(
    get,
    path = "/classes/{id}",
    params(("id" = String, Path, description = "Class id")),
    responses(
        (status = 200, description = "The class", body = Class),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Class not found")
    ),
    tag = "classes"
)]
pub async fn get_class(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    fetch::<Class, _>(&state.sql, &id).await
}

#[utoipa::path(
    post,
    path = "/classes",
    request_body = ClassInput,
    params(("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")),
    responses(
        (status = 201, description = "Class scheduled", body = Class),
        (status = 400, description = "Invalid class data"),
        (status = 401, description = "Invalid authentication token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "classes"
)]
pub async fn create_class(
    State(state): State<AppState>,
    auth: BearerAuth,
    Query(query): Query<TokenQuery>,
    Payload(input): Payload<ClassInput>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, &query)?;
    create::<Class, _>(&state.sql, input).await
}

#[utoipa::path(
    put,
    path = "/classes/{id}",
    request_body = ClassInput,
    params(
        ("id" = String, Path, description = "Class id"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Updated class", body = Class),
        (status = 400, description = "Invalid class data or malformed id"),
        (status = 401, description = "Invalid authentication token"),
        (status = 404, description = "Class not found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "classes"
)]
pub async fn update_class(
    State(state): State<AppState>,
    auth: BearerAuth,
    Path(id): Path<String>,
    Query(query): Query<TokenQuery>,
    Payload(input): Payload<ClassInput>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, &query)?;
    replace::<Class, _>(&state.sql, &id, input).await
}

#[utoipa::path(
    delete,
    path = "/classes/{id}",
    params(
        ("id" = String, Path, description = "Class id"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 204, description = "Class deleted"),
        (status = 400, description = "Malformed id"),
        (status = 401, description = "Invalid authentication token"),
        (status = 404, description = "Class not found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "classes"
)]
pub async fn delete_class(
    State(state): State<AppState>,
    auth: BearerAuth,
    Path(id): Path<String>,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, &query)?;
    remove::<Class, _>(&state.sql, &id).await
}
