//! JSON authoring API served on the administrative listener.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::application::authoring::{
    AuthoringError, AuthoringService, CreatePostCommand, UpdatePostCommand,
};
use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;
use crate::infra::db::PostgresRepositories;

use super::{
    db_health_response,
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct AdminState {
    pub authoring: Arc<AuthoringService>,
    pub db: Arc<PostgresRepositories>,
}

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/api/posts", post(create_post))
        .route("/api/posts/{id}", patch(update_post).delete(delete_post))
        .route("/api/categories", post(create_category))
        .route("/api/tags", post(create_tag))
        .route("/_health/db", get(admin_health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Deserialize)]
pub struct PostCreateRequest {
    pub title: String,
    pub body_markdown: String,
    pub excerpt: Option<String>,
    pub author: String,
    pub category_id: Uuid,
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct PostUpdateRequest {
    pub title: String,
    pub body_markdown: String,
    pub excerpt: Option<String>,
    pub category_id: Uuid,
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryCreateRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TagCreateRequest {
    pub name: String,
}

/// JSON error envelope for the authoring API.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        }));
        let mut response = (self.status, body).into_response();
        ErrorReport::from_message("infra::http::admin::ApiError", self.status, self.message)
            .attach(&mut response);
        response
    }
}

impl From<AuthoringError> for ApiError {
    fn from(err: AuthoringError) -> Self {
        match err {
            AuthoringError::Validation(message) => {
                ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "validation_failed", message)
            }
            AuthoringError::UnknownCategory => ApiError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "unknown_category",
                "category does not exist",
            ),
            AuthoringError::UnknownPost => {
                ApiError::new(StatusCode::NOT_FOUND, "unknown_post", "post does not exist")
            }
            AuthoringError::Slug(err) => {
                ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "invalid_slug", err.to_string())
            }
            AuthoringError::Render(err) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "render_failed",
                err.to_string(),
            ),
            AuthoringError::Repo(err) => ApiError::from(err),
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate { constraint } => ApiError::new(
                StatusCode::CONFLICT,
                "duplicate",
                format!("unique constraint `{constraint}` violated"),
            ),
            RepoError::NotFound => {
                ApiError::new(StatusCode::NOT_FOUND, "not_found", "resource not found")
            }
            RepoError::InvalidInput { message } => {
                ApiError::new(StatusCode::BAD_REQUEST, "invalid_input", message)
            }
            RepoError::Integrity { message } => {
                ApiError::new(StatusCode::CONFLICT, "integrity", message)
            }
            RepoError::Timeout => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "timeout",
                "database timeout",
            ),
            RepoError::Persistence(message) => {
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "persistence", message)
            }
        }
    }
}

async fn create_post(
    State(state): State<AdminState>,
    Json(request): Json<PostCreateRequest>,
) -> Result<Response, ApiError> {
    let post = state
        .authoring
        .create_post(CreatePostCommand {
            title: request.title,
            body_markdown: request.body_markdown,
            excerpt: request.excerpt,
            author: request.author,
            category_id: request.category_id,
            tag_ids: request.tag_ids,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(post)).into_response())
}

async fn update_post(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(request): Json<PostUpdateRequest>,
) -> Result<Response, ApiError> {
    let post = state
        .authoring
        .update_post(UpdatePostCommand {
            id,
            title: request.title,
            body_markdown: request.body_markdown,
            excerpt: request.excerpt,
            category_id: request.category_id,
            tag_ids: request.tag_ids,
        })
        .await?;

    Ok(Json(post).into_response())
}

async fn delete_post(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    state.authoring.delete_post(id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn create_category(
    State(state): State<AdminState>,
    Json(request): Json<CategoryCreateRequest>,
) -> Result<Response, ApiError> {
    let category = state.authoring.create_category(&request.name).await?;
    Ok((StatusCode::CREATED, Json(category)).into_response())
}

async fn create_tag(
    State(state): State<AdminState>,
    Json(request): Json<TagCreateRequest>,
) -> Result<Response, ApiError> {
    let tag = state.authoring.create_tag(&request.name).await?;
    Ok((StatusCode::CREATED, Json(tag)).into_response())
}

async fn admin_health(State(state): State<AdminState>) -> Response {
    db_health_response(state.db.health_check().await)
}
