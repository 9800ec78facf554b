use std::sync::Arc;

use axum::{
    Form, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::warn;

use crate::{
    application::{
        feed::{CommentSubmission, FeedError, FeedFilter, FeedService},
        repos::PostsWriteRepo,
    },
    domain::comments::NewComment,
    infra::db::PostgresRepositories,
    presentation::views::{
        CommentFormView, IndexTemplate, LayoutContext, PostTemplate, SidebarView,
        render_not_found_response, render_template_response,
    },
};

use super::{
    db_health_response, feed_error_to_http,
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts_write: Arc<dyn PostsWriteRepo>,
    pub db: Arc<PostgresRepositories>,
    pub site_title: String,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/posts/{slug}", get(post_detail))
        .route("/posts/{slug}/comments", post(submit_comment))
        .route("/categories/{slug}", get(category_index))
        .route("/tags/{slug}", get(tag_index))
        .route("/archives/{year}/{month}", get(archive_index))
        .route("/search", get(search))
        .route("/_health/db", get(public_health))
        .fallback(fallback_not_found)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageQuery {
    page: Option<u32>,
}

impl PageQuery {
    fn page(&self) -> u32 {
        self.page.unwrap_or(1)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchQuery {
    q: Option<String>,
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CommentForm {
    author_name: String,
    #[serde(default)]
    email: String,
    body: String,
}

async fn index(State(state): State<HttpState>, Query(query): Query<PageQuery>) -> Response {
    render_listing(&state, FeedFilter::All, query.page()).await
}

async fn category_index(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    render_listing(&state, FeedFilter::Category(slug), query.page()).await
}

async fn tag_index(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    render_listing(&state, FeedFilter::Tag(slug), query.page()).await
}

async fn archive_index(
    State(state): State<HttpState>,
    Path((year, month)): Path<(i32, u8)>,
    Query(query): Query<PageQuery>,
) -> Response {
    render_listing(&state, FeedFilter::Month { year, month }, query.page()).await
}

async fn render_listing(state: &HttpState, filter: FeedFilter, page: u32) -> Response {
    let sidebar = match state.feed.sidebar().await {
        Ok(sidebar) => sidebar,
        Err(err) => {
            return feed_error_to_http("infra::http::public::render_listing", err)
                .into_response();
        }
    };

    match state.feed.page_context(filter, page).await {
        Ok(content) => render_template_response(
            IndexTemplate {
                view: LayoutContext::new(state.site_title.clone(), sidebar, content),
            },
            StatusCode::OK,
        ),
        Err(err) => feed_error_to_response(err, state.site_title.clone(), sidebar),
    }
}

async fn search(State(state): State<HttpState>, Query(query): Query<SearchQuery>) -> Response {
    metrics::counter!("foglio_search_requests_total").increment(1);

    let sidebar = match state.feed.sidebar().await {
        Ok(sidebar) => sidebar,
        Err(err) => {
            return feed_error_to_http("infra::http::public::search", err).into_response();
        }
    };

    match state
        .feed
        .search_context(query.q.as_deref(), query.page.unwrap_or(1))
        .await
    {
        Ok(content) => render_template_response(
            IndexTemplate {
                view: LayoutContext::new(state.site_title.clone(), sidebar, content),
            },
            StatusCode::OK,
        ),
        Err(err) => feed_error_to_response(err, state.site_title.clone(), sidebar),
    }
}

async fn post_detail(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    let sidebar = match state.feed.sidebar().await {
        Ok(sidebar) => sidebar,
        Err(err) => {
            return feed_error_to_http("infra::http::public::post_detail", err).into_response();
        }
    };

    match state.feed.post_detail(&slug).await {
        Ok(Some(content)) => {
            // Fetch first, then bump the counter as its own explicit step. A
            // failed increment is logged and must not fail the page.
            match state.posts_write.increment_view_count(content.id).await {
                Ok(()) => metrics::counter!("foglio_post_views_total").increment(1),
                Err(err) => {
                    metrics::counter!("foglio_post_view_write_failures_total").increment(1);
                    warn!(
                        target = "foglio::http::post_detail",
                        slug = %slug,
                        error = %err,
                        "failed to record post view"
                    );
                }
            }

            render_template_response(
                PostTemplate {
                    view: LayoutContext::new(state.site_title.clone(), sidebar, content),
                },
                StatusCode::OK,
            )
        }
        Ok(None) => render_not_found_response(state.site_title.clone(), sidebar),
        Err(err) => feed_error_to_response(err, state.site_title.clone(), sidebar),
    }
}

async fn submit_comment(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
    Form(form): Form<CommentForm>,
) -> Response {
    let sidebar = match state.feed.sidebar().await {
        Ok(sidebar) => sidebar,
        Err(err) => {
            return feed_error_to_http("infra::http::public::submit_comment", err)
                .into_response();
        }
    };

    let input = NewComment {
        author_name: form.author_name.clone(),
        email: (!form.email.trim().is_empty()).then(|| form.email.clone()),
        body: form.body.clone(),
    };

    match state.feed.submit_comment(&slug, input).await {
        Ok(Some(CommentSubmission::Accepted)) => {
            Redirect::to(&format!("/posts/{slug}#comments")).into_response()
        }
        Ok(Some(CommentSubmission::Rejected { message })) => {
            let rejected_form = CommentFormView {
                author_name: form.author_name,
                email: form.email,
                body: form.body,
                error: Some(message),
            };

            match state.feed.post_detail_with_form(&slug, rejected_form).await {
                Ok(Some(content)) => render_template_response(
                    PostTemplate {
                        view: LayoutContext::new(state.site_title.clone(), sidebar, content),
                    },
                    StatusCode::UNPROCESSABLE_ENTITY,
                ),
                Ok(None) => render_not_found_response(state.site_title.clone(), sidebar),
                Err(err) => feed_error_to_response(err, state.site_title.clone(), sidebar),
            }
        }
        Ok(None) => render_not_found_response(state.site_title.clone(), sidebar),
        Err(err) => feed_error_to_response(err, state.site_title.clone(), sidebar),
    }
}

async fn fallback_not_found(State(state): State<HttpState>) -> Response {
    let sidebar = state.feed.sidebar().await.unwrap_or_else(|err| {
        warn!(
            target = "foglio::http::fallback",
            error = %err,
            "failed to build sidebar for 404 page"
        );
        SidebarView::default()
    });

    render_not_found_response(state.site_title.clone(), sidebar)
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.health_check().await)
}

/// Unknown filters and out-of-range pages render the 404 page; everything
/// else is a plain HTTP error.
fn feed_error_to_response(err: FeedError, site_title: String, sidebar: SidebarView) -> Response {
    match err {
        FeedError::UnknownCategory
        | FeedError::UnknownTag
        | FeedError::UnknownMonth
        | FeedError::PageOutOfRange(_) => {
            let mut response = render_not_found_response(site_title, sidebar);
            crate::application::error::ErrorReport::from_message(
                "infra::http::public::feed_error_to_response",
                StatusCode::NOT_FOUND,
                err.to_string(),
            )
            .attach(&mut response);
            response
        }
        err => feed_error_to_http("infra::http::public::feed_error_to_response", err)
            .into_response(),
    }
}
