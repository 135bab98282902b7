use std::sync::Arc;

use axum::http::StatusCode;

use crate::application::error::HttpError;
use crate::application::repos::{RepoError, SettingsRepo};
use crate::presentation::views::{
    BrandView, FooterView, LayoutChrome, NavigationLinkView, NavigationView, PageMetaView,
};

const SOURCE: &str = "application::chrome::ChromeService";

/// Loads the shared layout pieces (brand, navigation, meta defaults)
/// every public page renders around its content.
#[derive(Clone)]
pub struct ChromeService {
    settings: Arc<dyn SettingsRepo>,
}

impl ChromeService {
    pub fn new(settings: Arc<dyn SettingsRepo>) -> Self {
        Self { settings }
    }

    pub async fn load(&self) -> Result<LayoutChrome, HttpError> {
        let settings = self
            .settings
            .load_site_settings()
            .await
            .map_err(|err| repo_failure("load_site_settings", err))?;

        Ok(LayoutChrome {
            brand: BrandView {
                title: settings.site_title.clone(),
                href: "/".to_string(),
            },
            navigation: NavigationView {
                entries: vec![NavigationLinkView {
                    label: "Agenda".to_string(),
                    href: "/".to_string(),
                }],
            },
            footer: FooterView {
                copy: settings.site_title.clone(),
            },
            meta: PageMetaView {
                title: settings.site_title.clone(),
                description: settings.meta_description.clone(),
                og_title: settings.site_title,
                og_description: settings.meta_description,
                canonical: settings.public_site_url,
            },
        })
    }
}

fn repo_failure(operation: &'static str, err: RepoError) -> HttpError {
    HttpError::new(
        SOURCE,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to load site chrome",
        format!("{operation} failed: {err}"),
    )
}
