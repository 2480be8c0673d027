use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};

use super::{BearerAuth, Payload, TokenQuery, authorize, create, fetch, list, remove, replace};
use crate::models::{Membership, MembershipInput};
use crate::{AppState, error::ApiError};

#[utoipa::path(
    get,
    path = "/memberships",
    responses(
        (status = 200, description = "All memberships", body = [Membership]),
        (status = 500, description = "Failed to retrieve memberships")
    ),
    tag = "memberships"
)]
pub async fn list_memberships(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    list::<Membership, _>(&state.backend).await
}

#[utoipa::path(
    get,
    path = "/memberships/{id}",
    params(("id" = String, Path, description = "Membership id")),
    responses(
        (status = 200, description = "The membership", body = Membership),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Membership not found")
    ),
    tag = "memberships"
)]
pub async fn get_membership(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    fetch::<Membership, _>(&state.backend, &id).await
}

#[utoipa::path(
    post,
    path = "/memberships",
    request_body = MembershipInput,
    params(("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")),
    responses(
        (status = 201, description = "Membership created", body = Membership),
        (status = 400, description = "Invalid membership data"),
        (status = 401, description = "Invalid authentication token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "memberships"
)]
pub async fn create_membership(
    State(state): State<AppState>,
    auth: BearerAuth,
    Query(query): Query<TokenQuery>,
    Payload(input): Payload<MembershipInput>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, &query)?;
    create::<Membership, _>(&state.backend, input).await
}

#[utoipa::path(
    put,
    path = "/memberships/{id}",
    request_body = MembershipInput,
    params(
        ("id" = String, Path, description = "Membership id"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Updated membership", body = Membership),
        (status = 400, description = "Invalid membership data or malformed id"),
        (status = 401, description = "Invalid authentication token"),
        (status = 404, description = "Membership not found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "memberships"
)]
pub async fn update_membership(
    State(state): State<AppState>,
    auth: BearerAuth,
    Path(id): Path<String>,
    Query(query): Query<TokenQuery>,
    Payload(input): Payload<MembershipInput>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, &query)?;
    replace::<Membership, _>(&state.backend, &id, input).await
}

#[utoipa::path(
    delete,
    path = "/memberships/{id}",
    params(
        ("id" = String, Path, description = "Membership id"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 204, description = "Membership deleted"),
        (status = 400, description = "Malformed id"),
        (status = 401, description = "Invalid authentication token"),
        (status = 404, description = "Membership not found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "memberships"
)]
pub async fn delete_membership(
    State(state): State<AppState>,
    auth: BearerAuth,
    Path(id): Path<String>,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, &query)?;
    remove::<Membership, _>(&state.backend, &id).await
}
