use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};

use super::{BearerAuth, Payload, TokenQuery, authorize, create, fetch, list, remove, replace};
use crate::models::{Member, MemberInput};
use crate::{AppState, error::ApiError};

#[utoipa::path(
    get,
    path = "/members",
    responses(
        (status = 200, description = "All members", body = [Member]),
        (status = 500, description = "Failed to retrieve members")
    ),
    tag = "members"
)]
pub async fn list_members(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    list::<Member, _>(&state.backend).await
}

#[utoipa::path(
    get,
    path = "/members/{id}",
    params(("id" = String, Path, description = "Member id")),
    responses(
        (status = 200, description = "The member", body = Member),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Member not found")
    ),
    tag = "members"
)]
pub async fn get_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    fetch::<Member, _>(&state.backend, &id).await
}

/// Enrolls a member, reusing the person registered under the same email.
#[utoipa::path(
    post,
    path = "/members",
    request_body = MemberInput,
    params(("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")),
    responses(
        (status = 201, description = "Member enrolled; `person_origin` tells whether the person already existed", body = Member),
        (status = 400, description = "Invalid member data"),
        (status = 401, description = "Invalid authentication token"),
        (status = 409, description = "Member already exists for this email")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "members"
)]
pub async fn create_member(
    State(state): State<AppState>,
    auth: BearerAuth,
    Query(query): Query<TokenQuery>,
    Payload(input): Payload<MemberInput>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, &query)?;
    create::<Member, _>(&state.backend, input).await
}

/// Changes the membership and join date of a member. Person details are left untouched.
#[utoipa::path(
    put,
    path = "/members/{id}",
    request_body = MemberInput,
    params(
        ("id" = String, Path, description = "Member id"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Updated member", body = Member),
        (status = 400, description = "Invalid member data or malformed id"),
        (status = 401, description = "Invalid authentication token"),
        (status = 404, description = "Member not found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "members"
)]
pub async fn update_member(
    State(state): State<AppState>,
    auth: BearerAuth,
    Path(id): Path<String>,
    Query(query): Query<TokenQuery>,
    Payload(input): Payload<MemberInput>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, &query)?;
    replace::<Member, _>(&state.backend, &id, input).await
}

#[utoipa::path(
    delete,
    path = "/members/{id}",
    params(
        ("id" = String, Path, description = "Member id"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 204, description = "Member deleted"),
        (status = 400, description = "Malformed id"),
        (status = 401, description = "Invalid authentication token"),
        (status = 404, description = "Member not found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "members"
)]
pub async fn delete_member(
    State(state): State<AppState>,
    auth: BearerAuth,
    Path(id): Path<String>,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, &query)?;
    remove::<Member, _>(&state.backend, &id).await
}
