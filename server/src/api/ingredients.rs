use super::labels::{self, LabelResponse, ListLabelsParams, RenameLabelRequest};
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiJson};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use recipebox_core::LabelKind;
use utoipa::OpenApi;

/// Returns the router for /api/ingredients endpoints (mounted at /api/ingredients)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_ingredients))
        .route(
            "/{id}",
            axum::routing::patch(rename_ingredient).delete(delete_ingredient),
        )
}

#[derive(OpenApi)]
#[openapi(paths(list_ingredients, rename_ingredient, delete_ingredient))]
pub struct ApiDoc;

#[utoipa::path(
    get,
    path = "/api/ingredients",
    tag = "ingredients",
    params(ListLabelsParams),
    responses(
        (status = 200, description = "The user's ingredients ordered by name", body = Vec<LabelResponse>),
        (status = 400, description = "Invalid query parameter"),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_ingredients(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListLabelsParams>,
) -> Result<Json<Vec<LabelResponse>>, ApiError> {
    labels::list(&state, user.id, LabelKind::Ingredient, &params)
}

#[utoipa::path(
    patch,
    path = "/api/ingredients/{id}",
    tag = "ingredients",
    params(
        ("id" = i64, Path, description = "Ingredient ID")
    ),
    request_body = RenameLabelRequest,
    responses(
        (status = 200, description = "Ingredient renamed", body = LabelResponse),
        (status = 400, description = "Invalid name"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Ingredient not found", body = ErrorResponse),
        (status = 409, description = "Another ingredient already has this name", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn rename_ingredient(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<RenameLabelRequest>,
) -> Result<Json<LabelResponse>, ApiError> {
    labels::rename(&state, user.id, LabelKind::Ingredient, id, &req)
}

#[utoipa::path(
    delete,
    path = "/api/ingredients/{id}",
    tag = "ingredients",
    params(
        ("id" = i64, Path, description = "Ingredient ID")
    ),
    responses(
        (status = 204, description = "Ingredient deleted and detached from its recipes"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Ingredient not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_ingredient(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    labels::delete(&state, user.id, LabelKind::Ingredient, id)
}
