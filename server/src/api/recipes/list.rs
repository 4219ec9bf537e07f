use crate::api::labels::LabelResponse;
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::RecipeWithLabels;
use crate::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use recipebox_core::{validation, RecipeFilter};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeSummary {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    /// Decimal string with two places
    #[schema(example = "5.50")]
    pub price: String,
    pub link: String,
    pub tags: Vec<LabelResponse>,
    pub ingredients: Vec<LabelResponse>,
}

impl From<RecipeWithLabels> for RecipeSummary {
    fn from(row: RecipeWithLabels) -> Self {
        Self {
            id: row.recipe.id,
            title: row.recipe.title,
            time_minutes: row.recipe.time_minutes,
            price: validation::render_price(&row.recipe.price),
            link: row.recipe.link,
            tags: row.tags.into_iter().map(LabelResponse::from).collect(),
            ingredients: row.ingredients.into_iter().map(LabelResponse::from).collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListRecipesParams {
    /// Comma-separated tag ids; matches recipes with any of them
    pub tags: Option<String>,
    /// Comma-separated ingredient ids; matches recipes with any of them
    pub ingredients: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/recipes",
    tag = "recipes",
    params(ListRecipesParams),
    responses(
        (status = 200, description = "The user's recipes, newest first", body = Vec<RecipeSummary>),
        (status = 400, description = "Unparseable id list"),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_recipes(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListRecipesParams>,
) -> Result<Json<Vec<RecipeSummary>>, ApiError> {
    let filter =
        RecipeFilter::from_params(params.tags.as_deref(), params.ingredients.as_deref())?;

    let recipes = state.store.list_recipes(user.id, &filter)?;

    Ok(Json(recipes.into_iter().map(RecipeSummary::from).collect()))
}
