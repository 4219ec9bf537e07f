use crate::api::ErrorResponse;
use crate::auth::{create_session, hash_password};
use crate::error::{ApiError, ApiJson};
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use recipebox_core::{FieldErrors, NewAccount};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SignupResponse {
    pub user_id: i64,
    pub token: String,
}

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "auth",
    request_body(content = SignupRequest, example = json!({"email": "cook@example.com", "password": "password", "name": "Cook"})),
    responses(
        (status = 201, description = "User created successfully", body = SignupResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut account = NewAccount::regular(&req.email, &req.password).map_err(FieldErrors::from)?;
    if let Some(name) = &req.name {
        account = account.with_name(name);
    }

    let password_hash = hash_password(&account.password).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        ApiError::Internal("Failed to hash password".to_string())
    })?;

    let user = state.store.create_user(&account, &password_hash)?;
    let token = create_session(state.store.as_ref(), user.id)?;

    tracing::info!(user_id = user.id, "user signed up");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            user_id: user.id,
            token,
        }),
    ))
}
