use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};

use super::{BearerAuth, Payload, TokenQuery, authorize, create, fetch, list, remove, replace};
use crate::models::{Booking, BookingInput};
use crate::{AppState, error::ApiError};

#[utoipa::path(
    get,
    path = "/bookings",
    responses(
        (status = 200, description = "All bookings", body = [Booking]),
        (status = 500, description = "Failed to retrieve bookings")
    ),
    tag = "bookings"
)]
pub async fn list_bookings(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    list::<Booking, _>(&state.sql).await
}

#[utoipa::path(
    get,
    path = "/bookings/{id}",
    params(("id" = String, Path, description = "Booking id")),
    responses(
        (status = 200, description = "The booking", body = Booking),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Booking not found")
    ),
    tag = "bookings"
)]
pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    fetch::<Booking, _>(&state.sql, &id).await
}

/// Books a class for a member if the admission check passes.
#[utoipa::path(
    post,
    path = "/bookings",
    request_body = BookingInput,
    params(("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")),
    responses(
        (status = 201, description = "Booking admitted", body = Booking),
        (status = 400, description = "Invalid booking data"),
        (status = 401, description = "Invalid authentication token"),
        (status = 409, description = "Booking rejected; `reasons` lists every cause")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "bookings"
)]
pub async fn create_booking(
    State(state): State<AppState>,
    auth: BearerAuth,
    Query(query): Query<TokenQuery>,
    Payload(input): Payload<BookingInput>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, &query)?;
    create::<Booking, _>(&state.sql, input).await
}

/// Rewrites a booking as given. Admission is only evaluated when booking.
#[utoipa::path(
    put,
    path = "/bookings/{id}",
    request_body = BookingInput,
    params(
        ("id" = String, Path, description = "Booking id"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Updated booking", body = Booking),
        (status = 400, description = "Invalid booking data or malformed id"),
        (status = 401, description = "Invalid authentication token"),
        (status = 404, description = "Booking not found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "bookings"
)]
pub async fn update_booking(
    State(state): State<AppState>,
    auth: BearerAuth,
    Path(id): Path<String>,
    Query(query): Query<TokenQuery>,
    Payload(input): Payload<BookingInput>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, &query)?;
    replace::<Booking, _>(&state.sql, &id, input).await
}

#[utoipa::path(
    delete,
    path = "/bookings/{id}",
    params(
        ("id" = String, Path, description = "Booking id"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 204, description = "Booking deleted"),
        (status = 400, description = "Malformed id"),
        (status = 401, description = "Invalid authentication token"),
        (status = 404, description = "Booking not found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "bookings"
)]
pub async fn delete_booking(
    State(state): State<AppState>,
    auth: BearerAuth,
    Path(id): Path<String>,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, &query)?;
    remove::<Booking, _>(&state.sql, &id).await
}
