use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::{CreateTermParams, RepoError, TermsRepo, TermsWriteRepo};
use crate::domain::entities::TermRecord;
use crate::domain::slug::{SlugAsyncError, SlugError, generate_unique_slug_async};

#[derive(Debug, Error)]
pub enum AdminTermError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error("term is assigned to {count} events")]
    InUse { count: u64 },
    #[error("term has child terms")]
    HasChildren,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateTermCommand {
    pub name: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct AdminTermService {
    reader: Arc<dyn TermsRepo>,
    writer: Arc<dyn TermsWriteRepo>,
}

impl AdminTermService {
    pub fn new(reader: Arc<dyn TermsRepo>, writer: Arc<dyn TermsWriteRepo>) -> Self {
        Self { reader, writer }
    }

    pub async fn list_all(&self) -> Result<Vec<TermRecord>, AdminTermError> {
        self.reader.list_all().await.map_err(AdminTermError::from)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<TermRecord>, AdminTermError> {
        self.reader
            .find_by_id(id)
            .await
            .map_err(AdminTermError::from)
    }

    pub async fn create_term(
        &self,
        command: CreateTermCommand,
    ) -> Result<TermRecord, AdminTermError> {
        ensure_non_empty(&command.name, "name")?;

        let CreateTermCommand { name, parent_id } = command;

        let name = name.trim().to_string();
        ensure_non_empty(&name, "name")?;

        if let Some(parent_id) = parent_id {
            if self.reader.find_by_id(parent_id).await?.is_none() {
                return Err(AdminTermError::ConstraintViolation("parent"));
            }
        }

        let reader = self.reader.clone();
        let slug = match generate_unique_slug_async(&name, move |candidate| {
            let reader = reader.clone();
            let candidate = candidate.to_string();
            async move {
                reader
                    .find_by_slug(&candidate)
                    .await
                    .map(|existing| existing.is_none())
            }
        })
        .await
        {
            Ok(slug) => slug,
            Err(SlugAsyncError::Slug(err)) => match err {
                SlugError::EmptyInput | SlugError::Unrepresentable { .. } => {
                    return Err(AdminTermError::ConstraintViolation("name"));
                }
                SlugError::Exhausted { .. } => {
                    return Err(AdminTermError::ConstraintViolation("slug"));
                }
            },
            Err(SlugAsyncError::Predicate(err)) => return Err(AdminTermError::Repo(err)),
        };

        let params = CreateTermParams {
            slug,
            name,
            parent_id,
        };

        self.writer
            .create_term(params)
            .await
            .map_err(AdminTermError::from)
    }

    pub async fn delete_term(&self, id: Uuid) -> Result<(), AdminTermError> {
        let usage = self.reader.count_usage(id).await?;
        if usage > 0 {
            return Err(AdminTermError::InUse { count: usage });
        }

        let has_children = self
            .reader
            .list_all()
            .await?
            .iter()
            .any(|term| term.parent_id == Some(id));
        if has_children {
            return Err(AdminTermError::HasChildren);
        }

        self.writer
            .delete_term(id)
            .await
            .map_err(AdminTermError::from)
    }
}

fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), AdminTermError> {
    if value.trim().is_empty() {
        return Err(AdminTermError::ConstraintViolation(field));
    }
    Ok(())
}
