//! Postgres-backed repository implementations.

mod events;
mod settings;
mod terms;
mod util;

pub use util::map_sqlx_error;

use std::{sync::Arc, time::Duration};

use sqlx::{
    Postgres, QueryBuilder,
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::application::repos::{EventListScope, EventQueryFilter, RepoError};

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    fn apply_scope_conditions<'q>(qb: &mut QueryBuilder<'q, Postgres>, scope: EventListScope) {
        match scope {
            EventListScope::Upcoming { now } => {
                qb.push(" AND e.published_at IS NOT NULL AND e.dtend >= ");
                qb.push_bind(now);
                qb.push(" ");
            }
            EventListScope::Recent => {
                qb.push(" AND e.published_at IS NOT NULL ");
            }
            EventListScope::Admin => {}
        }
    }

    fn apply_event_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q EventQueryFilter) {
        if let Some(term) = filter.term.as_ref() {
            if filter.include_descendants {
                qb.push(
                    " AND EXISTS (SELECT 1 FROM event_terms et WHERE et.event_id = e.id \
                     AND et.term_id IN ( \
                         WITH RECURSIVE subtree AS ( \
                             SELECT id FROM terms WHERE slug = ",
                );
                qb.push_bind(term);
                qb.push(
                    " UNION ALL \
                             SELECT t.id FROM terms t INNER JOIN subtree s ON t.parent_id = s.id \
                         ) SELECT id FROM subtree))",
                );
            } else {
                qb.push(
                    " AND EXISTS (SELECT 1 FROM event_terms et INNER JOIN terms t ON t.id = et.term_id WHERE et.event_id = e.id AND t.slug = ",
                );
                qb.push_bind(term);
                qb.push(")");
            }
        }

        if let Some(featured) = filter.featured {
            qb.push(" AND e.featured = ");
            qb.push_bind(featured);
            qb.push(" ");
        }

        if let Some(search) = filter.search.as_ref() {
            qb.push(" AND (");
            qb.push("e.title ILIKE ");
            qb.push_bind(format!("%{}%", search));
            qb.push(" OR e.slug ILIKE ");
            qb.push_bind(format!("%{}%", search));
            qb.push(" OR e.location ILIKE ");
            qb.push_bind(format!("%{}%", search));
            qb.push(")");
        }
    }

    fn convert_count(value: i64) -> Result<u64, RepoError> {
        value
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }
}
