use super::get::RecipeDetail;
use super::payload::{Mode, RecipePayload};
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiJson};
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};

fn apply(
    state: &AppState,
    user_id: i64,
    id: i64,
    payload: RecipePayload,
    mode: Mode,
) -> Result<Json<RecipeDetail>, ApiError> {
    // Someone else's recipe is a 404 even when the body is invalid.
    state
        .store
        .get_recipe(user_id, id)?
        .ok_or(ApiError::NotFound("Recipe"))?;

    let changes = payload.into_changes(mode)?;

    let recipe = state
        .store
        .update_recipe(user_id, id, &changes)?
        .ok_or(ApiError::NotFound("Recipe"))?;

    Ok(Json(RecipeDetail::new(recipe, &state.media)))
}

#[utoipa::path(
    put,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = i64, Path, description = "Recipe ID")
    ),
    request_body = RecipePayload,
    responses(
        (status = 200, description = "Recipe updated", body = RecipeDetail),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn replace_recipe(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<RecipePayload>,
) -> Result<Json<RecipeDetail>, ApiError> {
    apply(&state, user.id, id, payload, Mode::Full)
}

/// Relations present in the body are replaced wholesale; absent ones are kept.
#[utoipa::path(
    patch,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = i64, Path, description = "Recipe ID")
    ),
    request_body = RecipePayload,
    responses(
        (status = 200, description = "Recipe updated", body = RecipeDetail),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_recipe(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<RecipePayload>,
) -> Result<Json<RecipeDetail>, ApiError> {
    apply(&state, user.id, id, payload, Mode::Partial)
}
