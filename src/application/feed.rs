//! Reader-facing listing, search, detail, and comment services.

use std::num::NonZeroU32;
use std::sync::Arc;

use chrono_tz::Tz;
use thiserror::Error;
use time::{Date, Month};
use url::form_urlencoded;

use crate::application::pagination::{PaginationError, PaginationWindow, Paginator};
use crate::application::render::{MarkdownRenderService, RenderError};
use crate::application::repos::{
    CategoriesRepo, CommentsRepo, CreateCommentParams, PageRequest, PostQueryFilter, PostsRepo,
    RepoError, TagsRepo,
};
use crate::domain::comments::NewComment;
use crate::domain::entities::{CategoryRecord, PostRecord, TagRecord};
use crate::domain::error::DomainError;
use crate::domain::posts::{self, MonthKey};
use crate::presentation::views::{
    self, CommentFormView, CommentView, ListingContext, PaginationView, PostCard,
    PostDetailContext, RecentPostView, SideLinkView, SidebarView, StripSlot, TocItemView,
};
use crate::util::timezone;

pub const EMPTY_SEARCH_MESSAGE: &str = "Please enter a keyword.";

/// Which listing a request asked for.
#[derive(Debug, Clone)]
pub enum FeedFilter {
    All,
    Category(String),
    Tag(String),
    Month { year: i32, month: u8 },
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown category")]
    UnknownCategory,
    #[error("unknown tag")]
    UnknownTag,
    #[error("unknown month archive")]
    UnknownMonth,
    #[error(transparent)]
    PageOutOfRange(#[from] PaginationError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Outcome of a comment submission against an existing post.
pub enum CommentSubmission {
    Accepted,
    Rejected { message: String },
}

/// Listing/display knobs resolved from configuration at startup.
#[derive(Debug, Clone, Copy)]
pub struct FeedConfig {
    pub page_size: NonZeroU32,
    pub recent_limit: u32,
    pub timezone: Tz,
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    categories: Arc<dyn CategoriesRepo>,
    tags: Arc<dyn TagsRepo>,
    comments: Arc<dyn CommentsRepo>,
    renderer: Arc<MarkdownRenderService>,
    config: FeedConfig,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        categories: Arc<dyn CategoriesRepo>,
        tags: Arc<dyn TagsRepo>,
        comments: Arc<dyn CommentsRepo>,
        renderer: Arc<MarkdownRenderService>,
        config: FeedConfig,
    ) -> Self {
        Self {
            posts,
            categories,
            tags,
            comments,
            renderer,
            config,
        }
    }

    /// Context for the index and its filtered variants. Unknown filter slugs
    /// and out-of-range page numbers surface as typed errors the HTTP layer
    /// maps to a rendered 404.
    pub async fn page_context(
        &self,
        filter: FeedFilter,
        requested_page: u32,
    ) -> Result<ListingContext, FeedError> {
        let (query_filter, heading, base_path) = self.resolve_filter(&filter).await?;
        self.build_listing(query_filter, heading, base_path, String::new(), requested_page)
            .await
    }

    /// Context for the search route. An empty or whitespace query is a
    /// recoverable user-input error: no repository query is issued and the
    /// listing carries an inline message instead of results.
    pub async fn search_context(
        &self,
        raw_query: Option<&str>,
        requested_page: u32,
    ) -> Result<ListingContext, FeedError> {
        let query = raw_query.map(str::trim).unwrap_or_default();
        if query.is_empty() {
            return Ok(ListingContext {
                heading: Some("Search".to_string()),
                posts: Vec::new(),
                pagination: None,
                error_msg: Some(EMPTY_SEARCH_MESSAGE.to_string()),
            });
        }

        let query_filter = PostQueryFilter {
            search: Some(query.to_string()),
            ..PostQueryFilter::default()
        };
        let extra_query = format!(
            "&{}",
            form_urlencoded::Serializer::new(String::new())
                .append_pair("q", query)
                .finish()
        );

        self.build_listing(
            query_filter,
            Some(format!("Search · {query}")),
            "/search".to_string(),
            extra_query,
            requested_page,
        )
        .await
    }

    /// Detail context for one post: rendered body, table of contents,
    /// category, tags, and comments. `None` when no post carries the slug.
    pub async fn post_detail(&self, slug: &str) -> Result<Option<PostDetailContext>, FeedError> {
        let Some(post) = self.posts.find_by_slug(slug).await? else {
            return Ok(None);
        };

        self.build_detail(post, CommentFormView::default())
            .await
            .map(Some)
    }

    /// Persist a reader comment on the post behind `slug`. Validation
    /// failures are recoverable; the caller re-renders the detail page with
    /// the message inline.
    pub async fn submit_comment(
        &self,
        slug: &str,
        input: NewComment,
    ) -> Result<Option<CommentSubmission>, FeedError> {
        let Some(post) = self.posts.find_by_slug(slug).await? else {
            return Ok(None);
        };

        let comment = match input.validated() {
            Ok(comment) => comment,
            Err(DomainError::Validation { message }) => {
                return Ok(Some(CommentSubmission::Rejected { message }));
            }
            Err(DomainError::NotFound { .. }) => unreachable!("validation never reports not-found"),
        };

        self.comments
            .create_comment(CreateCommentParams {
                post_id: post.id,
                author_name: comment.author_name,
                email: comment.email,
                body: comment.body,
            })
            .await?;

        metrics::counter!("foglio_comments_total").increment(1);

        Ok(Some(CommentSubmission::Accepted))
    }

    /// Detail context with a pre-filled, rejected comment form. Used when a
    /// submission fails validation and the page is re-rendered inline.
    pub async fn post_detail_with_form(
        &self,
        slug: &str,
        form: CommentFormView,
    ) -> Result<Option<PostDetailContext>, FeedError> {
        let Some(post) = self.posts.find_by_slug(slug).await? else {
            return Ok(None);
        };

        self.build_detail(post, form).await.map(Some)
    }

    /// The aggregates every page shows beside its main content: recent
    /// posts, month archives, categories, and the tag cloud.
    pub async fn sidebar(&self) -> Result<SidebarView, FeedError> {
        let recent = self
            .posts
            .list_recent(self.config.recent_limit)
            .await?
            .into_iter()
            .map(|post| RecentPostView {
                href: format!("/posts/{}", post.slug),
                title: post.title,
            })
            .collect();

        let months = self
            .posts
            .list_month_counts()
            .await?
            .into_iter()
            .map(|entry| SideLinkView {
                href: format!("/archives/{}", entry.key.replace('-', "/")),
                label: entry.label,
                count: entry.count,
            })
            .collect();

        let categories = self
            .categories
            .list_with_counts()
            .await?
            .into_iter()
            .map(|entry| SideLinkView {
                label: entry.category.name,
                href: format!("/categories/{}", entry.category.slug),
                count: entry.post_count,
            })
            .collect();

        let tags = self
            .tags
            .list_with_counts()
            .await?
            .into_iter()
            .map(|entry| SideLinkView {
                label: format!("#{}", entry.tag.name),
                href: format!("/tags/{}", entry.tag.slug),
                count: entry.post_count,
            })
            .collect();

        Ok(SidebarView {
            recent,
            months,
            categories,
            tags,
        })
    }

    async fn resolve_filter(
        &self,
        filter: &FeedFilter,
    ) -> Result<(PostQueryFilter, Option<String>, String), FeedError> {
        match filter {
            FeedFilter::All => Ok((PostQueryFilter::default(), None, "/".to_string())),
            FeedFilter::Category(slug) => {
                let category = self
                    .categories
                    .find_by_slug(slug)
                    .await?
                    .ok_or(FeedError::UnknownCategory)?;
                Ok((
                    PostQueryFilter {
                        category: Some(category.id),
                        ..PostQueryFilter::default()
                    },
                    Some(format!("Category · {}", category.name)),
                    format!("/categories/{}", category.slug),
                ))
            }
            FeedFilter::Tag(slug) => {
                let tag = self
                    .tags
                    .find_by_slug(slug)
                    .await?
                    .ok_or(FeedError::UnknownTag)?;
                Ok((
                    PostQueryFilter {
                        tag: Some(tag.id),
                        ..PostQueryFilter::default()
                    },
                    Some(format!("Tag · #{}", tag.name)),
                    format!("/tags/{}", tag.slug),
                ))
            }
            FeedFilter::Month { year, month } => {
                let key =
                    MonthKey::new(*year, *month).map_err(|_| FeedError::UnknownMonth)?;
                let label = month_heading(&key);
                Ok((
                    PostQueryFilter {
                        month: Some(key),
                        ..PostQueryFilter::default()
                    },
                    Some(format!("Archive · {label}")),
                    format!("/archives/{year}/{month}"),
                ))
            }
        }
    }

    async fn build_listing(
        &self,
        query_filter: PostQueryFilter,
        heading: Option<String>,
        base_path: String,
        extra_query: String,
        requested_page: u32,
    ) -> Result<ListingContext, FeedError> {
        let total = self.posts.count_posts(&query_filter).await?;
        let paginator = Paginator::new(total, self.config.page_size, requested_page)?;

        let records = self
            .posts
            .list_posts(
                &query_filter,
                PageRequest::new(paginator.offset(), paginator.limit()),
            )
            .await?;

        let mut cards = Vec::with_capacity(records.len());
        for record in records {
            let category = self.category_for(&record).await?;
            let tags = self.tags.list_for_post(record.id).await?;
            cards.push(self.record_to_card(record, &category, &tags));
        }

        let pagination = build_pagination_strip(&paginator, &base_path, &extra_query);

        Ok(ListingContext {
            heading,
            posts: cards,
            pagination,
            error_msg: None,
        })
    }

    async fn build_detail(
        &self,
        post: PostRecord,
        form: CommentFormView,
    ) -> Result<PostDetailContext, FeedError> {
        let category = self.category_for(&post).await?;
        let tags = self.tags.list_for_post(post.id).await?;
        let document = self.renderer.render(&post.body_markdown)?;

        let comments = self
            .comments
            .list_for_post(post.id)
            .await?
            .into_iter()
            .map(|comment| CommentView {
                author_name: comment.author_name,
                published: self.display_date(comment.created_at),
                body: comment.body,
            })
            .collect();

        let min_level = document.toc.iter().map(|entry| entry.level).min();
        let toc = document
            .toc
            .iter()
            .map(|entry| TocItemView {
                anchor: entry.anchor.clone(),
                title: entry.title.clone(),
                indent: entry.level.saturating_sub(min_level.unwrap_or(1)),
            })
            .collect();

        Ok(PostDetailContext {
            id: post.id,
            published: self.display_date(post.created_at),
            slug: post.slug,
            title: post.title,
            author: post.author,
            views: post.views,
            category_label: category.name.clone(),
            category_href: format!("/categories/{}", category.slug),
            badges: views::build_tag_badges(
                tags.iter()
                    .map(|tag| (tag.slug.as_str(), tag.name.as_str())),
            ),
            body_html: document.html,
            toc,
            comments,
            form,
        })
    }

    async fn category_for(&self, post: &PostRecord) -> Result<CategoryRecord, FeedError> {
        self.categories
            .find_by_id(post.category_id)
            .await?
            .ok_or_else(|| {
                FeedError::Repo(RepoError::Integrity {
                    message: format!("post `{}` references a missing category", post.slug),
                })
            })
    }

    fn record_to_card(
        &self,
        record: PostRecord,
        category: &CategoryRecord,
        tags: &[TagRecord],
    ) -> PostCard {
        PostCard {
            href: format!("/posts/{}", record.slug),
            published: self.display_date(record.created_at),
            title: record.title,
            excerpt: record.excerpt,
            author: record.author,
            views: record.views,
            category_label: category.name.clone(),
            category_href: format!("/categories/{}", category.slug),
            badges: views::build_tag_badges(
                tags.iter()
                    .map(|tag| (tag.slug.as_str(), tag.name.as_str())),
            ),
        }
    }

    fn display_date(&self, stored: time::OffsetDateTime) -> String {
        posts::format_human_date(timezone::localized_date(stored, self.config.timezone))
    }
}

fn month_heading(key: &MonthKey) -> String {
    Month::try_from(key.month())
        .ok()
        .and_then(|month| Date::from_calendar_date(key.year(), month, 1).ok())
        .map(posts::month_label_for)
        .unwrap_or_else(|| key.as_query_key())
}

/// Flatten a [`PaginationWindow`] into the ordered strip the template
/// renders: boundary pages, ellipsis markers, side runs, and the current
/// page. `None` when there is nothing to paginate.
fn build_pagination_strip(
    paginator: &Paginator,
    base_path: &str,
    extra_query: &str,
) -> Option<PaginationView> {
    if !paginator.is_paginated() {
        return None;
    }

    let window: PaginationWindow = paginator.window();
    let href = |page: u32| format!("{base_path}?page={page}{extra_query}");
    let mut slots = Vec::new();

    if window.first {
        slots.push(StripSlot::page(1, href(1), false));
    }
    if window.left_has_more {
        slots.push(StripSlot::ellipsis());
    }
    for page in &window.left {
        slots.push(StripSlot::page(*page, href(*page), false));
    }

    let current = paginator.current_page();
    slots.push(StripSlot::page(current, href(current), true));

    for page in &window.right {
        slots.push(StripSlot::page(*page, href(*page), false));
    }
    if window.right_has_more {
        slots.push(StripSlot::ellipsis());
    }
    if window.last {
        let last = paginator.total_pages();
        slots.push(StripSlot::page(last, href(last), false));
    }

    Some(PaginationView { slots })
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use super::*;

    fn strip_numbers(view: &PaginationView) -> Vec<Option<u32>> {
        view.slots
            .iter()
            .map(|slot| (!slot.ellipsis).then_some(slot.number))
            .collect()
    }

    #[test]
    fn strip_for_first_of_ten_pages() {
        let paginator = Paginator::new(10, NonZeroU32::new(1).unwrap(), 1).unwrap();
        let view = build_pagination_strip(&paginator, "/", "").expect("paginated");

        // 1 2 3 … 10
        assert_eq!(
            strip_numbers(&view),
            vec![Some(1), Some(2), Some(3), None, Some(10)]
        );
        assert!(view.slots[0].current);
        assert_eq!(view.slots[4].href, "/?page=10");
    }

    #[test]
    fn strip_for_last_of_ten_pages() {
        let paginator = Paginator::new(10, NonZeroU32::new(1).unwrap(), 10).unwrap();
        let view = build_pagination_strip(&paginator, "/", "").expect("paginated");

        // 1 … 8 9 10
        assert_eq!(
            strip_numbers(&view),
            vec![Some(1), None, Some(8), Some(9), Some(10)]
        );
        assert!(view.slots[4].current);
    }

    #[test]
    fn strip_preserves_extra_query_for_search() {
        let paginator = Paginator::new(30, NonZeroU32::new(10).unwrap(), 2).unwrap();
        let view =
            build_pagination_strip(&paginator, "/search", "&q=rust").expect("paginated");

        assert!(view.slots.iter().all(|slot| slot.ellipsis
            || slot.href.starts_with("/search?page=") && slot.href.ends_with("&q=rust")));
    }

    #[test]
    fn single_page_renders_no_strip() {
        let paginator = Paginator::new(3, NonZeroU32::new(10).unwrap(), 1).unwrap();
        assert!(build_pagination_strip(&paginator, "/", "").is_none());
    }
}
