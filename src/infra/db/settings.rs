use async_trait::async_trait;
use chrono_tz::Tz;
use time::OffsetDateTime;

use crate::{
    application::repos::{RepoError, SettingsRepo},
    domain::entities::SiteSettingsRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct SiteSettingsRow {
    site_title: String,
    meta_description: String,
    public_site_url: String,
    timezone: String,
    updated_at: OffsetDateTime,
}

impl SiteSettingsRow {
    fn into_record(self) -> Result<SiteSettingsRecord, RepoError> {
        let timezone = self.timezone.parse::<Tz>().map_err(|err| {
            RepoError::from_persistence(format!("invalid timezone `{}`: {err}", self.timezone))
        })?;

        Ok(SiteSettingsRecord {
            site_title: self.site_title,
            meta_description: self.meta_description,
            public_site_url: self.public_site_url,
            timezone,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl SettingsRepo for PostgresRepositories {
    async fn load_site_settings(&self) -> Result<SiteSettingsRecord, RepoError> {
        let row = sqlx::query_as::<_, SiteSettingsRow>(
            "SELECT site_title, meta_description, public_site_url, timezone, updated_at \
             FROM site_settings \
             WHERE id = 1",
        )
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let row = row.ok_or_else(|| RepoError::from_persistence("site settings row missing"))?;

        row.into_record()
    }

    async fn upsert_site_settings(&self, settings: SiteSettingsRecord) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO site_settings ( \
                 id, site_title, meta_description, public_site_url, timezone, updated_at \
             ) VALUES (1, $1, $2, $3, $4, $5) \
             ON CONFLICT (id) DO UPDATE SET \
                 site_title = EXCLUDED.site_title, \
                 meta_description = EXCLUDED.meta_description, \
                 public_site_url = EXCLUDED.public_site_url, \
                 timezone = EXCLUDED.timezone, \
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(settings.site_title)
        .bind(settings.meta_description)
        .bind(settings.public_site_url)
        .bind(settings.timezone.name())
        .bind(settings.updated_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}
