//! Repository traits describing persistence adapters.
//!
//! Domain entities carry no persistence behaviour; everything that reads or
//! writes the store goes through these traits so services stay independent of
//! the storage technology.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{CategoryRecord, CommentRecord, PostRecord, TagRecord};
use crate::domain::posts::{MonthCount, MonthKey};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Row window of an ordered result set, derived from a `Paginator`.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub offset: u64,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(offset: u64, limit: u32) -> Self {
        Self { offset, limit }
    }
}

/// Conjunctive filters over the post listing; identifiers are already
/// resolved from their slugs by the feed service.
#[derive(Debug, Clone, Default)]
pub struct PostQueryFilter {
    pub category: Option<Uuid>,
    pub tag: Option<Uuid>,
    pub month: Option<MonthKey>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub slug: String,
    pub title: String,
    pub body_markdown: String,
    pub excerpt: String,
    pub author: String,
    pub category_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: Uuid,
    pub title: String,
    pub body_markdown: String,
    pub excerpt: String,
    pub category_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: Uuid,
    pub author_name: String,
    pub email: Option<String>,
    pub body: String,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Posts ordered by `created_at DESC, id DESC`, restricted by `filter`.
    async fn list_posts(
        &self,
        filter: &PostQueryFilter,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, RepoError>;

    async fn count_posts(&self, filter: &PostQueryFilter) -> Result<u64, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;

    async fn list_recent(&self, limit: u32) -> Result<Vec<PostRecord>, RepoError>;

    /// Month buckets with published-post counts, newest month first.
    async fn list_month_counts(&self) -> Result<Vec<MonthCount>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError>;

    /// Single-statement counter bump; concurrent detail views must not lose
    /// updates.
    async fn increment_view_count(&self, id: Uuid) -> Result<(), RepoError>;

    async fn replace_post_tags(&self, post_id: Uuid, tag_ids: &[Uuid]) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct CategoryWithCount {
    pub category: CategoryRecord,
    pub post_count: u64,
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    /// Categories that have at least one post, with post counts.
    async fn list_with_counts(&self) -> Result<Vec<CategoryWithCount>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError>;
}

#[async_trait]
pub trait CategoriesWriteRepo: Send + Sync {
    async fn create_category(&self, slug: &str, name: &str) -> Result<CategoryRecord, RepoError>;
}

#[derive(Debug, Clone)]
pub struct TagWithCount {
    pub tag: TagRecord,
    pub post_count: u64,
}

#[async_trait]
pub trait TagsRepo: Send + Sync {
    /// Tags attached to at least one post, with post counts.
    async fn list_with_counts(&self) -> Result<Vec<TagWithCount>, RepoError>;

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<TagRecord>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<TagRecord>, RepoError>;
}

#[async_trait]
pub trait TagsWriteRepo: Send + Sync {
    async fn create_tag(&self, slug: &str, name: &str) -> Result<TagRecord, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Comments for one post, oldest first.
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError>;

    async fn create_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;
}
