pub mod create;
pub mod delete;
pub mod get;
pub mod list;
pub mod payload;
pub mod update;
pub mod upload_image;


use crate::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for /api/recipes endpoints (mounted at /api/recipes)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::list_recipes).post(create::create_recipe))
        .route(
            "/{id}",
            get(get::get_recipe)
                .put(update::replace_recipe)
                .patch(update::update_recipe)
                .delete(delete::delete_recipe),
        )
        .route(
            "/{id}/upload-image",
            post(upload_image::upload_image)
                .layer(DefaultBodyLimit::max(upload_image::UPLOAD_BODY_LIMIT)),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        list::list_recipes,
        create::create_recipe,
        get::get_recipe,
        update::replace_recipe,
        update::update_recipe,
        delete::delete_recipe,
        upload_image::upload_image,
    ),
    components(schemas(
        list::RecipeSummary,
        get::RecipeDetail,
        payload::RecipePayload,
        payload::NamePayload,
        upload_image::RecipeImageResponse,
        upload_image::UploadImageRequest,
    ))
)]
pub struct ApiDoc;
