use super::get::RecipeDetail;
use super::payload::RecipePayload;
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiJson};
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};

#[utoipa::path(
    post,
    path = "/api/recipes",
    tag = "recipes",
    request_body(content = RecipePayload, example = json!({
        "title": "Thai prawn curry",
        "time_minutes": 30,
        "price": "12.50",
        "tags": [{"name": "Thai"}, {"name": "Dinner"}],
        "ingredients": [{"name": "Prawns"}, {"name": "Coconut milk"}]
    })),
    responses(
        (status = 201, description = "Recipe created", body = RecipeDetail),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_recipe(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RecipePayload>,
) -> Result<(StatusCode, Json<RecipeDetail>), ApiError> {
    let draft = payload.into_draft()?;

    let recipe = state.store.create_recipe(user.id, &draft)?;

    tracing::info!(
        recipe_id = recipe.recipe.id,
        tags = recipe.tags.len(),
        ingredients = recipe.ingredients.len(),
        "recipe created"
    );

    Ok((
        StatusCode::CREATED,
        Json(RecipeDetail::new(recipe, &state.media)),
    ))
}
