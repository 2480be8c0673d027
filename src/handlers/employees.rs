use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};

use super::{BearerAuth, Payload, TokenQuery, authorize, create, fetch, list, remove, replace};
use crate::models::{Employee, EmployeeInput};
use crate::{AppState, error::ApiError};

#[utoipa::path(
    get,
    path = "/employees",
    responses(
        (status = 200, description = "All employees", body = [Employee]),
        (status = 500, description = "Failed to retrieve employees")
    ),
    tag = "employees"
)]
pub async fn list_employees(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    list::<Employee, _>(&state.sql).await
}

#[utoipa::path(
    get,
    path = "/employees/{id}",
    params(("id" = String, Path, description = "Employee id")),
    responses(
        (status = 200, description = "The employee", body = Employee),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Employee not found")
    ),
    tag = "employees"
)]
pub async fn get_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    fetch::<Employee, _>(&state.sql, &id).await
}

/// Hires an employee, reusing the person registered under the same email.
#[utoipa::path(
    post,
    path = "/employees",
    request_body = EmployeeInput,
    params(("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")),
    responses(
        (status = 201, description = "Employee hired; `person_origin` tells whether the person already existed", body = Employee),
        (status = 400, description = "Invalid employee data"),
        (status = 401, description = "Invalid authentication token"),
        (status = 409, description = "Employee already exists for this email")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "employees"
)]
pub async fn create_employee(
    State(state): State<AppState>,
    auth: BearerAuth,
    Query(query): Query<TokenQuery>,
    Payload(input): Payload<EmployeeInput>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, &query)?;
    create::<Employee, _>(&state.sql, input).await
}

/// Changes the employment details of an employee. Person details are left untouched.
#[utoipa::path(
    put,
    path = "/employees/{id}",
    request_body = EmployeeInput,
    params(
        ("id" = String, Path, description = "Employee id"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Updated employee", body = Employee),
        (status = 400, description = "Invalid employee data or malformed id"),
        (status = 401, description = "Invalid authentication token"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "employees"
)]
pub async fn update_employee(
    State(state): State<AppState>,
    auth: BearerAuth,
    Path(id): Path<String>,
    Query(query): Query<TokenQuery>,
    Payload(input): Payload<EmployeeInput>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, &query)?;
    replace::<Employee, _>(&state.sql, &id, input).await
}

#[utoipa::path(
    delete,
    path = "/employees/{id}",
    params(
        ("id" = String, Path, description = "Employee id"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 204, description = "Employee deleted"),
        (status = 400, description = "Malformed id"),
        (status = 401, description = "Invalid authentication token"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "employees"
)]
pub async fn delete_employee(
    State(state): State<AppState>,
    auth: BearerAuth,
    Path(id): Path<String>,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, &query)?;
    remove::<Employee, _>(&state.sql, &id).await
}
