use crate::api::labels::LabelResponse;
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::media::MediaStore;
use crate::models::RecipeWithLabels;
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use recipebox_core::validation;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeDetail {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    #[schema(example = "5.50")]
    pub price: String,
    pub link: String,
    pub description: String,
    /// Public URL of the uploaded image
    pub image: Option<String>,
    pub tags: Vec<LabelResponse>,
    pub ingredients: Vec<LabelResponse>,
}

impl RecipeDetail {
    pub fn new(row: RecipeWithLabels, media: &MediaStore) -> Self {
        let recipe = row.recipe;
        Self {
            id: recipe.id,
            title: recipe.title,
            time_minutes: recipe.time_minutes,
            price: validation::render_price(&recipe.price),
            link: recipe.link,
            description: recipe.description,
            image: recipe.image.as_deref().map(|path| media.url_for(path)),
            tags: row.tags.into_iter().map(LabelResponse::from).collect(),
            ingredients: row.ingredients.into_iter().map(LabelResponse::from).collect(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = i64, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "Recipe details", body = RecipeDetail),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_recipe(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RecipeDetail>, ApiError> {
    let recipe = state
        .store
        .get_recipe(user.id, id)?
        .ok_or(ApiError::NotFound("Recipe"))?;

    Ok(Json(RecipeDetail::new(recipe, &state.media)))
}
