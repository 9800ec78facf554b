//! Author-facing write operations: posts, categories, and tags.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::render::{MarkdownRenderService, RenderError};
use crate::application::repos::{
    CategoriesRepo, CategoriesWriteRepo, CreatePostParams, PostsRepo, PostsWriteRepo, RepoError,
    TagsRepo, TagsWriteRepo, UpdatePostParams,
};
use crate::domain::entities::{CategoryRecord, PostRecord, TagRecord};
use crate::domain::slug::{self, SlugAsyncError, SlugError};

#[derive(Debug, Error)]
pub enum AuthoringError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unknown category")]
    UnknownCategory,
    #[error("unknown post")]
    UnknownPost,
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl AuthoringError {
    fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<SlugAsyncError<RepoError>> for AuthoringError {
    fn from(err: SlugAsyncError<RepoError>) -> Self {
        match err {
            SlugAsyncError::Slug(err) => AuthoringError::Slug(err),
            SlugAsyncError::Predicate(err) => AuthoringError::Repo(err),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreatePostCommand {
    pub title: String,
    pub body_markdown: String,
    /// When absent, derived from the rendered body (first 54 characters).
    pub excerpt: Option<String>,
    pub author: String,
    pub category_id: Uuid,
    pub tag_ids: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct UpdatePostCommand {
    pub id: Uuid,
    pub title: String,
    pub body_markdown: String,
    pub excerpt: Option<String>,
    pub category_id: Uuid,
    pub tag_ids: Vec<Uuid>,
}

#[derive(Clone)]
pub struct AuthoringService {
    posts: Arc<dyn PostsRepo>,
    posts_write: Arc<dyn PostsWriteRepo>,
    categories: Arc<dyn CategoriesRepo>,
    categories_write: Arc<dyn CategoriesWriteRepo>,
    tags: Arc<dyn TagsRepo>,
    tags_write: Arc<dyn TagsWriteRepo>,
    renderer: Arc<MarkdownRenderService>,
}

impl AuthoringService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        posts_write: Arc<dyn PostsWriteRepo>,
        categories: Arc<dyn CategoriesRepo>,
        categories_write: Arc<dyn CategoriesWriteRepo>,
        tags: Arc<dyn TagsRepo>,
        tags_write: Arc<dyn TagsWriteRepo>,
        renderer: Arc<MarkdownRenderService>,
    ) -> Self {
        Self {
            posts,
            posts_write,
            categories,
            categories_write,
            tags,
            tags_write,
            renderer,
        }
    }

    pub async fn create_post(
        &self,
        command: CreatePostCommand,
    ) -> Result<PostRecord, AuthoringError> {
        let title = command.title.trim().to_string();
        if title.is_empty() {
            return Err(AuthoringError::validation("post title is required"));
        }
        if command.body_markdown.trim().is_empty() {
            return Err(AuthoringError::validation("post body is required"));
        }
        let author = command.author.trim().to_string();
        if author.is_empty() {
            return Err(AuthoringError::validation("post author is required"));
        }

        self.categories
            .find_by_id(command.category_id)
            .await?
            .ok_or(AuthoringError::UnknownCategory)?;

        let slug = slug::generate_unique_slug_async(&title, |candidate| {
            let posts = self.posts.clone();
            let candidate = candidate.to_string();
            async move { Ok::<bool, RepoError>(posts.find_by_slug(&candidate).await?.is_none()) }
        })
        .await?;

        let excerpt = self
            .resolve_excerpt(command.excerpt, &command.body_markdown)
            .await?;

        let post = self
            .posts_write
            .create_post(CreatePostParams {
                slug,
                title,
                body_markdown: command.body_markdown,
                excerpt,
                author,
                category_id: command.category_id,
            })
            .await?;

        self.posts_write
            .replace_post_tags(post.id, &command.tag_ids)
            .await?;

        Ok(post)
    }

    pub async fn update_post(
        &self,
        command: UpdatePostCommand,
    ) -> Result<PostRecord, AuthoringError> {
        let title = command.title.trim().to_string();
        if title.is_empty() {
            return Err(AuthoringError::validation("post title is required"));
        }
        if command.body_markdown.trim().is_empty() {
            return Err(AuthoringError::validation("post body is required"));
        }

        self.posts
            .find_by_id(command.id)
            .await?
            .ok_or(AuthoringError::UnknownPost)?;
        self.categories
            .find_by_id(command.category_id)
            .await?
            .ok_or(AuthoringError::UnknownCategory)?;

        let excerpt = self
            .resolve_excerpt(command.excerpt, &command.body_markdown)
            .await?;

        let post = self
            .posts_write
            .update_post(UpdatePostParams {
                id: command.id,
                title,
                body_markdown: command.body_markdown,
                excerpt,
                category_id: command.category_id,
            })
            .await?;

        self.posts_write
            .replace_post_tags(post.id, &command.tag_ids)
            .await?;

        Ok(post)
    }

    pub async fn delete_post(&self, id: Uuid) -> Result<(), AuthoringError> {
        self.posts
            .find_by_id(id)
            .await?
            .ok_or(AuthoringError::UnknownPost)?;
        self.posts_write.delete_post(id).await?;
        Ok(())
    }

    pub async fn create_category(&self, name: &str) -> Result<CategoryRecord, AuthoringError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthoringError::validation("category name is required"));
        }

        let slug = slug::derive_slug(name)?;
        Ok(self.categories_write.create_category(&slug, name).await?)
    }

    pub async fn create_tag(&self, name: &str) -> Result<TagRecord, AuthoringError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthoringError::validation("tag name is required"));
        }

        let slug = slug::derive_slug(name)?;
        Ok(self.tags_write.create_tag(&slug, name).await?)
    }

    /// An explicit excerpt wins; otherwise derive one from the rendered body.
    async fn resolve_excerpt(
        &self,
        explicit: Option<String>,
        body_markdown: &str,
    ) -> Result<String, AuthoringError> {
        match explicit.map(|excerpt| excerpt.trim().to_string()) {
            Some(excerpt) if !excerpt.is_empty() => Ok(excerpt),
            _ => Ok(self.renderer.derive_excerpt(body_markdown)?),
        }
    }
}
