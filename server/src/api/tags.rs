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

/// Returns the router for /api/tags endpoints (mounted at /api/tags)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tags))
        .route("/{id}", axum::routing::patch(rename_tag).delete(delete_tag))
}

#[derive(OpenApi)]
#[openapi(
    paths(list_tags, rename_tag, delete_tag),
    components(schemas(RenameLabelRequest))
)]
pub struct ApiDoc;

#[utoipa::path(
    get,
    path = "/api/tags",
    tag = "tags",
    params(ListLabelsParams),
    responses(
        (status = 200, description = "The user's tags ordered by name", body = Vec<LabelResponse>),
        (status = 400, description = "Invalid query parameter"),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_tags(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListLabelsParams>,
) -> Result<Json<Vec<LabelResponse>>, ApiError> {
    labels::list(&state, user.id, LabelKind::Tag, &params)
}

#[utoipa::path(
    patch,
    path = "/api/tags/{id}",
    tag = "tags",
    params(
        ("id" = i64, Path, description = "Tag ID")
    ),
    request_body = RenameLabelRequest,
    responses(
        (status = 200, description = "Tag renamed", body = LabelResponse),
        (status = 400, description = "Invalid name"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Tag not found", body = ErrorResponse),
        (status = 409, description = "Another tag already has this name", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn rename_tag(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<RenameLabelRequest>,
) -> Result<Json<LabelResponse>, ApiError> {
    labels::rename(&state, user.id, LabelKind::Tag, id, &req)
}

#[utoipa::path(
    delete,
    path = "/api/tags/{id}",
    tag = "tags",
    params(
        ("id" = i64, Path, description = "Tag ID")
    ),
    responses(
        (status = 204, description = "Tag deleted and detached from its recipes"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Tag not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_tag(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    labels::delete(&state, user.id, LabelKind::Tag, id)
}

#[cfg(test)]
mod tests {
    use crate::test_support::{body_json, TestApp};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    async fn create_recipe(app: &TestApp, token: &str, tags: &[&str]) -> serde_json::Value {
        let tags: Vec<_> = tags.iter().map(|name| json!({"name": name})).collect();
        let response = app
            .request(
                Method::POST,
                "/api/recipes",
                Some(token),
                Some(json!({"title": "Soup", "time_minutes": 10, "price": "2.50", "tags": tags})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await
    }

    #[tokio::test]
    async fn test_list_tags_requires_auth() {
        let app = TestApp::new();
        let response = app.request(Method::GET, "/api/tags", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_list_tags_sorted_and_scoped() {
        let app = TestApp::new();
        let (_, alice) = app.signup("alice@example.com").await;
        let (_, bob) = app.signup("bob@example.com").await;
        create_recipe(&app, &alice, &["Vegan", "Dessert"]).await;
        create_recipe(&app, &bob, &["Breakfast"]).await;

        let response = app.request(Method::GET, "/api/tags", Some(&alice), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let names: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["Dessert", "Vegan"]);
    }

    #[tokio::test]
    async fn test_assigned_only_hides_detached_tags() {
        let app = TestApp::new();
        let (_, token) = app.signup("alice@example.com").await;
        let recipe = create_recipe(&app, &token, &["Lunch", "Dinner"]).await;
        let id = recipe["id"].as_i64().unwrap();

        let response = app
            .request(
                Method::PATCH,
                &format!("/api/recipes/{}", id),
                Some(&token),
                Some(json!({"tags": [{"name": "Lunch"}]})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let all = body_json(app.request(Method::GET, "/api/tags", Some(&token), None).await).await;
        assert_eq!(all.as_array().unwrap().len(), 2);

        let assigned = body_json(
            app.request(Method::GET, "/api/tags?assigned_only=1", Some(&token), None)
                .await,
        )
        .await;
        let assigned = assigned.as_array().unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0]["name"], "Lunch");
    }

    #[tokio::test]
    async fn test_rename_tag() {
        let app = TestApp::new();
        let (_, token) = app.signup("alice@example.com").await;
        let recipe = create_recipe(&app, &token, &["Brekfast", "Lunch"]).await;
        let tag_id = recipe["tags"][0]["id"].as_i64().unwrap();

        let response = app
            .request(
                Method::PATCH,
                &format!("/api/tags/{}", tag_id),
                Some(&token),
                Some(json!({"name": " Breakfast "})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["name"], "Breakfast");

        let response = app
            .request(
                Method::PATCH,
                &format!("/api/tags/{}", tag_id),
                Some(&token),
                Some(json!({"name": "Lunch"})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app
            .request(
                Method::PATCH,
                &format!("/api/tags/{}", tag_id),
                Some(&token),
                Some(json!({"name": "  "})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["name"].is_array());
    }

    #[tokio::test]
    async fn test_delete_tag_detaches_from_recipe() {
        let app = TestApp::new();
        let (_, token) = app.signup("alice@example.com").await;
        let recipe = create_recipe(&app, &token, &["Spicy"]).await;
        let recipe_id = recipe["id"].as_i64().unwrap();
        let tag_id = recipe["tags"][0]["id"].as_i64().unwrap();

        let response = app
            .request(Method::DELETE, &format!("/api/tags/{}", tag_id), Some(&token), None)
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let detail = body_json(
            app.request(
                Method::GET,
                &format!("/api/recipes/{}", recipe_id),
                Some(&token),
                None,
            )
            .await,
        )
        .await;
        assert!(detail["tags"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_other_users_tag_is_not_found() {
        let app = TestApp::new();
        let (_, alice) = app.signup("alice@example.com").await;
        let (_, bob) = app.signup("bob@example.com").await;
        let recipe = create_recipe(&app, &alice, &["Private"]).await;
        let tag_id = recipe["tags"][0]["id"].as_i64().unwrap();

        let response = app
            .request(Method::DELETE, &format!("/api/tags/{}", tag_id), Some(&bob), None)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .request(
                Method::PATCH,
                &format!("/api/tags/{}", tag_id),
                Some(&bob),
                Some(json!({"name": "Mine"})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
