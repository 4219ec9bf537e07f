//! Handlers shared by `/api/tags` and `/api/ingredients`.
//!
//! Both resources behave identically apart from the table they touch, so the
//! per-resource modules only carry routing and OpenAPI annotations.

use crate::error::ApiError;
use crate::models::Label;
use crate::AppState;
use axum::{http::StatusCode, Json};
use recipebox_core::validation;
use recipebox_core::{FieldErrors, LabelKind};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LabelResponse {
    pub id: i64,
    pub name: String,
}

impl From<Label> for LabelResponse {
    fn from(label: Label) -> Self {
        Self {
            id: label.id,
            name: label.name,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListLabelsParams {
    /// `1` to only list labels attached to at least one recipe
    pub assigned_only: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RenameLabelRequest {
    pub name: String,
}

fn parse_flag(field: &str, raw: Option<&str>) -> Result<bool, FieldErrors> {
    match raw.map(str::trim) {
        None | Some("") | Some("0") | Some("false") => Ok(false),
        Some("1") | Some("true") => Ok(true),
        Some(_) => Err(FieldErrors::single(field, "Must be 0 or 1.")),
    }
}

pub fn list(
    state: &AppState,
    user_id: i64,
    kind: LabelKind,
    params: &ListLabelsParams,
) -> Result<Json<Vec<LabelResponse>>, ApiError> {
    let assigned_only = parse_flag("assigned_only", params.assigned_only.as_deref())?;
    let labels = state.store.list_labels(kind, user_id, assigned_only)?;
    Ok(Json(labels.into_iter().map(LabelResponse::from).collect()))
}

pub fn rename(
    state: &AppState,
    user_id: i64,
    kind: LabelKind,
    id: i64,
    req: &RenameLabelRequest,
) -> Result<Json<LabelResponse>, ApiError> {
    let mut errors = FieldErrors::new();
    let Some(name) = validation::label_name(&mut errors, "name", &req.name) else {
        return Err(errors.into());
    };

    let label = state
        .store
        .rename_label(kind, user_id, id, &name)?
        .ok_or(ApiError::NotFound(kind.display_name()))?;

    Ok(Json(label.into()))
}

pub fn delete(
    state: &AppState,
    user_id: i64,
    kind: LabelKind,
    id: i64,
) -> Result<StatusCode, ApiError> {
    if state.store.delete_label(kind, user_id, id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(kind.display_name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("f", None), Ok(false));
        assert_eq!(parse_flag("f", Some("0")), Ok(false));
        assert_eq!(parse_flag("f", Some("1")), Ok(true));
        assert!(parse_flag("f", Some("yes")).unwrap_err().contains("f"));
    }
}
