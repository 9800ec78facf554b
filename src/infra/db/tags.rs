use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{RepoError, TagWithCount, TagsRepo, TagsWriteRepo};
use crate::domain::entities::TagRecord;

use super::PostgresRepositories;
use super::util::map_sqlx_error;

#[derive(sqlx::FromRow)]
struct TagRow {
    id: Uuid,
    slug: String,
    name: String,
    created_at: OffsetDateTime,
}

impl From<TagRow> for TagRecord {
    fn from(row: TagRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TagCountRow {
    id: Uuid,
    slug: String,
    name: String,
    created_at: OffsetDateTime,
    post_count: i64,
}

#[async_trait]
impl TagsRepo for PostgresRepositories {
    async fn list_with_counts(&self) -> Result<Vec<TagWithCount>, RepoError> {
        let rows = sqlx::query_as::<_, TagCountRow>(
            "SELECT t.id, t.slug, t.name, t.created_at, COUNT(pt.post_id) AS post_count \
             FROM tags t \
             LEFT JOIN post_tags pt ON pt.tag_id = t.id \
             GROUP BY t.id, t.slug, t.name, t.created_at \
             HAVING COUNT(pt.post_id) > 0 \
             ORDER BY LOWER(t.name), t.slug",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(TagWithCount {
                    post_count: Self::convert_count(row.post_count)?,
                    tag: TagRecord {
                        id: row.id,
                        slug: row.slug,
                        name: row.name,
                        created_at: row.created_at,
                    },
                })
            })
            .collect()
    }

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<TagRecord>, RepoError> {
        let rows = sqlx::query_as::<_, TagRow>(
            "SELECT t.id, t.slug, t.name, t.created_at \
             FROM tags t \
             INNER JOIN post_tags pt ON pt.tag_id = t.id \
             WHERE pt.post_id = $1 \
             ORDER BY LOWER(t.name), t.slug",
        )
        .bind(post_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(TagRecord::from).collect())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<TagRecord>, RepoError> {
        let row = sqlx::query_as::<_, TagRow>(
            "SELECT id, slug, name, created_at FROM tags WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(TagRecord::from))
    }
}

#[async_trait]
impl TagsWriteRepo for PostgresRepositories {
    async fn create_tag(&self, slug: &str, name: &str) -> Result<TagRecord, RepoError> {
        let row = sqlx::query_as::<_, TagRow>(
            "INSERT INTO tags (id, slug, name) VALUES ($1, $2, $3) \
             RETURNING id, slug, name, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(slug)
        .bind(name)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(TagRecord::from(row))
    }
}
