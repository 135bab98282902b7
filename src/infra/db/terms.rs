use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{CreateTermParams, RepoError, TermsRepo, TermsWriteRepo},
    domain::entities::TermRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

const TERM_COLUMNS: &str = "t.id, t.slug, t.name, t.parent_id, t.created_at, t.updated_at";

#[derive(sqlx::FromRow)]
struct TermRow {
    id: Uuid,
    slug: String,
    name: String,
    parent_id: Option<Uuid>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<TermRow> for TermRecord {
    fn from(row: TermRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            name: row.name,
            parent_id: row.parent_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl TermsRepo for PostgresRepositories {
    async fn list_all(&self) -> Result<Vec<TermRecord>, RepoError> {
        let sql = format!("SELECT {TERM_COLUMNS} FROM terms t ORDER BY LOWER(t.name), t.slug");
        let rows = sqlx::query_as::<_, TermRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(TermRecord::from).collect())
    }

    async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<TermRecord>, RepoError> {
        let sql = format!(
            "SELECT {TERM_COLUMNS} \
             FROM terms t \
             INNER JOIN event_terms et ON et.term_id = t.id \
             WHERE et.event_id = $1 \
             ORDER BY LOWER(t.name), t.slug"
        );
        let rows = sqlx::query_as::<_, TermRow>(&sql)
            .bind(event_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(TermRecord::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TermRecord>, RepoError> {
        let sql = format!("SELECT {TERM_COLUMNS} FROM terms t WHERE t.id = $1");
        let row = sqlx::query_as::<_, TermRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(TermRecord::from))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<TermRecord>, RepoError> {
        let sql = format!("SELECT {TERM_COLUMNS} FROM terms t WHERE t.slug = $1");
        let row = sqlx::query_as::<_, TermRow>(&sql)
            .bind(slug)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(TermRecord::from))
    }

    async fn count_usage(&self, id: Uuid) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM event_terms WHERE term_id = $1")
            .bind(id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }
}

#[async_trait]
impl TermsWriteRepo for PostgresRepositories {
    async fn create_term(&self, params: CreateTermParams) -> Result<TermRecord, RepoError> {
        let CreateTermParams {
            slug,
            name,
            parent_id,
        } = params;

        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();

        let sql = format!(
            "INSERT INTO terms AS t (id, slug, name, parent_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) \
             RETURNING {TERM_COLUMNS}"
        );
        let row = sqlx::query_as::<_, TermRow>(&sql)
            .bind(id)
            .bind(slug)
            .bind(name)
            .bind(parent_id)
            .bind(now)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(TermRecord::from(row))
    }

    async fn delete_term(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM terms WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }
}
