use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use recipebox_core::{recipe_image_path, validate_image, FieldErrors, MAX_FILE_SIZE};
use serde::Serialize;
use utoipa::ToSchema;

/// Form field carrying the file
const IMAGE_FIELD: &str = "image";

/// Request body cap for the upload route; leaves room for multipart framing.
pub const UPLOAD_BODY_LIMIT: usize = MAX_FILE_SIZE + 64 * 1024;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeImageResponse {
    pub id: i64,
    /// Public URL of the stored image
    pub image: Option<String>,
}

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadImageRequest {
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

fn multipart_error(e: MultipartError) -> ApiError {
    tracing::warn!("Multipart read error: {}", e);
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        FieldErrors::single(
            IMAGE_FIELD,
            format!("File too large. Maximum size is {} bytes", MAX_FILE_SIZE),
        )
        .into()
    } else {
        ApiError::BadRequest(format!("Failed to read multipart data: {}", e.body_text()))
    }
}

#[utoipa::path(
    post,
    path = "/api/recipes/{id}/upload-image",
    tag = "recipes",
    params(
        ("id" = i64, Path, description = "Recipe ID")
    ),
    request_body(content_type = "multipart/form-data", content = UploadImageRequest),
    responses(
        (status = 200, description = "Image stored", body = RecipeImageResponse),
        (status = 400, description = "Missing or invalid image"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_image(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<RecipeImageResponse>, ApiError> {
    if state.store.get_recipe(user.id, id)?.is_none() {
        return Err(ApiError::NotFound("Recipe"));
    }

    let mut data = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some(IMAGE_FIELD) {
            data = Some(field.bytes().await.map_err(multipart_error)?);
            break;
        }
    }
    let data =
        data.ok_or_else(|| FieldErrors::single(IMAGE_FIELD, "No file was submitted."))?;

    // Nothing touches the filesystem until the bytes decode cleanly
    let image = validate_image(&data)
        .map_err(|e| FieldErrors::single(IMAGE_FIELD, e.to_string()))?;

    let relative = recipe_image_path(&image);
    let written = state.media.save(&relative, &data).await.map_err(|e| {
        tracing::error!("Failed to write image {}: {}", relative, e);
        ApiError::Internal("Failed to store image".to_string())
    })?;

    let Some(recipe) = state.store.set_recipe_image(user.id, id, &relative)? else {
        // Recipe vanished between the ownership check and the update
        let _ = tokio::fs::remove_file(&written).await;
        return Err(ApiError::NotFound("Recipe"));
    };

    tracing::info!(
        recipe_id = id,
        format = image.content_type(),
        width = image.width,
        height = image.height,
        "recipe image stored"
    );

    Ok(Json(RecipeImageResponse {
        id: recipe.recipe.id,
        image: recipe.recipe.image.as_deref().map(|path| state.media.url_for(path)),
    }))
}
