use std::sync::Arc;

use chrono_tz::Tz;
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::repos::{RepoError, SettingsRepo};
use crate::domain::entities::SiteSettingsRecord;

#[derive(Debug, Error)]
pub enum AdminSettingsError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct UpdateSettingsCommand {
    pub site_title: String,
    pub meta_description: String,
    pub public_site_url: String,
    pub timezone: Tz,
}

#[derive(Clone)]
pub struct AdminSettingsService {
    repo: Arc<dyn SettingsRepo>,
}

impl AdminSettingsService {
    pub fn new(repo: Arc<dyn SettingsRepo>) -> Self {
        Self { repo }
    }

    pub async fn load(&self) -> Result<SiteSettingsRecord, AdminSettingsError> {
        self.repo
            .load_site_settings()
            .await
            .map_err(AdminSettingsError::from)
    }

    pub async fn update(
        &self,
        command: UpdateSettingsCommand,
    ) -> Result<SiteSettingsRecord, AdminSettingsError> {
        ensure_non_empty(&command.site_title, "site_title")?;
        ensure_non_empty(&command.meta_description, "meta_description")?;
        ensure_non_empty(&command.public_site_url, "public_site_url")?;

        let mut record = self.repo.load_site_settings().await?;
        record.site_title = command.site_title;
        record.meta_description = command.meta_description;
        record.public_site_url = command.public_site_url;
        record.timezone = command.timezone;
        record.updated_at = OffsetDateTime::now_utc();

        self.repo.upsert_site_settings(record).await?;
        let latest = self.repo.load_site_settings().await?;

        Ok(latest)
    }
}

fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), AdminSettingsError> {
    if value.trim().is_empty() {
        return Err(AdminSettingsError::ConstraintViolation(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct InMemorySettingsRepo {
        current: Mutex<SiteSettingsRecord>,
    }

    impl InMemorySettingsRepo {
        fn new() -> Self {
            Self {
                current: Mutex::new(SiteSettingsRecord {
                    site_title: "Velada".into(),
                    meta_description: "What is happening in town".into(),
                    public_site_url: "https://example.org".into(),
                    timezone: chrono_tz::America::Santiago,
                    updated_at: OffsetDateTime::now_utc(),
                }),
            }
        }
    }

    #[async_trait]
    impl SettingsRepo for InMemorySettingsRepo {
        async fn load_site_settings(&self) -> Result<SiteSettingsRecord, RepoError> {
            Ok(self.current.lock().unwrap().clone())
        }

        async fn upsert_site_settings(
            &self,
            settings: SiteSettingsRecord,
        ) -> Result<(), RepoError> {
            *self.current.lock().unwrap() = settings;
            Ok(())
        }
    }

    #[tokio::test]
    async fn update_replaces_editable_fields() {
        let service = AdminSettingsService::new(Arc::new(InMemorySettingsRepo::new()));

        let latest = service
            .update(UpdateSettingsCommand {
                site_title: "Velada Cultural".into(),
                meta_description: "Concerts and workshops".into(),
                public_site_url: "https://agenda.example.org".into(),
                timezone: chrono_tz::Europe::Madrid,
            })
            .await
            .expect("update succeeds");

        assert_eq!(latest.site_title, "Velada Cultural");
        assert_eq!(latest.public_site_url, "https://agenda.example.org");
        assert_eq!(latest.timezone, chrono_tz::Europe::Madrid);
    }

    #[tokio::test]
    async fn update_rejects_blank_title() {
        let service = AdminSettingsService::new(Arc::new(InMemorySettingsRepo::new()));

        let result = service
            .update(UpdateSettingsCommand {
                site_title: "   ".into(),
                meta_description: "Concerts".into(),
                public_site_url: "https://example.org".into(),
                timezone: chrono_tz::America::Santiago,
            })
            .await;

        match result {
            Err(AdminSettingsError::ConstraintViolation(field)) => {
                assert_eq!(field, "site_title");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
