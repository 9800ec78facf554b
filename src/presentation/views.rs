use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use uuid::Uuid;

use crate::application::error::{ErrorReport, HttpError};

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(site_title: String, sidebar: SidebarView) -> Response {
    let view = LayoutContext::new(site_title, sidebar, ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Everything a full page render needs besides its main content.
#[derive(Clone)]
pub struct LayoutContext<T> {
    pub site_title: String,
    pub sidebar: SidebarView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(site_title: String, sidebar: SidebarView, content: T) -> Self {
        Self {
            site_title,
            sidebar,
            content,
        }
    }
}

#[derive(Clone, Default)]
pub struct SidebarView {
    pub recent: Vec<RecentPostView>,
    pub months: Vec<SideLinkView>,
    pub categories: Vec<SideLinkView>,
    pub tags: Vec<SideLinkView>,
}

#[derive(Clone)]
pub struct RecentPostView {
    pub title: String,
    pub href: String,
}

#[derive(Clone)]
pub struct SideLinkView {
    pub label: String,
    pub href: String,
    pub count: u64,
}

#[derive(Clone)]
pub struct TagBadge {
    pub label: String,
    pub href: String,
}

#[derive(Clone)]
pub struct PostCard {
    pub title: String,
    pub href: String,
    pub excerpt: String,
    pub published: String,
    pub author: String,
    pub views: i64,
    pub category_label: String,
    pub category_href: String,
    pub badges: Vec<TagBadge>,
}

/// One rendered slot of the pagination strip: either a page link or an
/// ellipsis marker.
#[derive(Clone)]
pub struct StripSlot {
    pub ellipsis: bool,
    pub number: u32,
    pub href: String,
    pub current: bool,
}

impl StripSlot {
    pub fn page(number: u32, href: String, current: bool) -> Self {
        Self {
            ellipsis: false,
            number,
            href,
            current,
        }
    }

    pub fn ellipsis() -> Self {
        Self {
            ellipsis: true,
            number: 0,
            href: String::new(),
            current: false,
        }
    }
}

#[derive(Clone)]
pub struct PaginationView {
    pub slots: Vec<StripSlot>,
}

pub struct ListingContext {
    pub heading: Option<String>,
    pub posts: Vec<PostCard>,
    pub pagination: Option<PaginationView>,
    pub error_msg: Option<String>,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<ListingContext>,
}

#[derive(Clone)]
pub struct TocItemView {
    pub anchor: String,
    pub title: String,
    pub indent: u8,
}

#[derive(Clone)]
pub struct CommentView {
    pub author_name: String,
    pub published: String,
    pub body: String,
}

#[derive(Clone, Default)]
pub struct CommentFormView {
    pub author_name: String,
    pub email: String,
    pub body: String,
    pub error: Option<String>,
}

pub struct PostDetailContext {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub author: String,
    pub published: String,
    pub views: i64,
    pub category_label: String,
    pub category_href: String,
    pub badges: Vec<TagBadge>,
    pub body_html: String,
    pub toc: Vec<TocItemView>,
    pub comments: Vec<CommentView>,
    pub form: CommentFormView,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: LayoutContext<PostDetailContext>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist. Try returning to the homepage."
                .to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

pub fn build_tag_badges<'a, T>(tags: T) -> Vec<TagBadge>
where
    T: IntoIterator<Item = (&'a str, &'a str)>,
{
    tags.into_iter()
        .map(|(slug, name)| TagBadge {
            label: format!("#{}", name),
            href: format!("/tags/{slug}"),
        })
        .collect()
}
