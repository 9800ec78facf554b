pub mod admin;
mod middleware;
mod public;

pub use admin::{AdminState, build_admin_router};
pub use public::{HttpState, build_router};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sqlx::Error as SqlxError;

use crate::application::error::{ErrorReport, HttpError};
use crate::application::feed::FeedError;

fn db_health_response(result: Result<(), SqlxError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// Map feed errors that are not rendered as a 404 page to an HTTP error.
pub fn feed_error_to_http(source: &'static str, err: FeedError) -> HttpError {
    match err {
        FeedError::UnknownCategory => HttpError::new(
            source,
            StatusCode::NOT_FOUND,
            "Unknown category",
            "Category filter did not match any known category",
        ),
        FeedError::UnknownTag => HttpError::new(
            source,
            StatusCode::NOT_FOUND,
            "Unknown tag",
            "Tag filter did not match any known tag",
        ),
        FeedError::UnknownMonth => HttpError::new(
            source,
            StatusCode::NOT_FOUND,
            "Unknown month",
            "Month filter did not match any archive",
        ),
        FeedError::PageOutOfRange(err) => HttpError::new(
            source,
            StatusCode::NOT_FOUND,
            "Unknown page",
            err.to_string(),
        ),
        FeedError::Render(err) => HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            &err,
        ),
        FeedError::Repo(err) => HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            &err,
        ),
    }
}
