use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Serialize;
use tracing::info;

use super::AppState;
use super::error::{ApiError, ApiResult};
use crate::domain::{UserCandidate, UserRecord};
use crate::store::{Catalog, CatalogRow};

#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub status: &'static str,
    pub message: String,
    pub user: UserRecord,
}

pub async fn home() -> &'static str {
    "Hello World!"
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<UserRecord>>> {
    let users = state
        .store
        .list_users()
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to fetch users"))?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<UserRecord>> {
    let id = parse_id(&raw_id).ok_or_else(ApiError::not_found)?;
    let user = state
        .store
        .get_user(id)
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to fetch user"))?
        .ok_or_else(ApiError::not_found)?;
    Ok(Json(user))
}

pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<UserCandidate>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MutationResponse>)> {
    let Json(candidate) =
        payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let user = state
        .store
        .create_user(candidate)
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to save user"))?;

    info!(id = user.id, "user added");
    Ok((
        StatusCode::CREATED,
        Json(MutationResponse {
            status: "success",
            message: format!("User {} added successfully", user.first_name),
            user,
        }),
    ))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<MutationResponse>> {
    let id = parse_id(&raw_id).ok_or_else(ApiError::not_found)?;
    let user = state
        .store
        .delete_user(id)
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to delete user"))?;

    info!(id = user.id, "user deleted");
    Ok(Json(MutationResponse {
        status: "success",
        message: format!("User named {} deleted successfully", user.first_name),
        user,
    }))
}

pub async fn list_customers(State(state): State<AppState>) -> ApiResult<Json<Vec<CatalogRow>>> {
    list_catalog(&state, Catalog::Customers, "Failed to fetch customers").await
}

pub async fn list_countries(State(state): State<AppState>) -> ApiResult<Json<Vec<CatalogRow>>> {
    list_catalog(&state, Catalog::Countries, "Failed to fetch countries").await
}

async fn list_catalog(
    state: &AppState,
    catalog: Catalog,
    failure: &'static str,
) -> ApiResult<Json<Vec<CatalogRow>>> {
    let rows = state
        .catalog
        .list_rows(catalog)
        .await
        .map_err(|e| ApiError::from_store(e, failure))?;
    Ok(Json(rows))
}

/// Ids are positive integers; anything else cannot name a user.
fn parse_id(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|id| *id > 0)
}
