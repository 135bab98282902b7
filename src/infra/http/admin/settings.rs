use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono_tz::Tz;
use serde::Deserialize;
use thiserror::Error;

use crate::application::admin::settings::{AdminSettingsError, UpdateSettingsCommand};
use crate::application::error::HttpError;
use crate::domain::entities::SiteSettingsRecord;
use crate::infra::http::repo_error_to_http;
use crate::presentation::{admin::views as admin_views, views::render_template_response};

use super::{
    AdminState,
    shared::{AdminListQuery, redirect_with_notice},
};

const SETTINGS_FORM_ACTION: &str = "/settings/edit";

#[derive(Debug, Clone, Deserialize)]
pub(super) struct AdminSettingsForm {
    site_title: String,
    meta_description: String,
    public_site_url: String,
    timezone: String,
}

#[derive(Debug, Error)]
enum AdminSettingsFormError {
    #[error("`{value}` is not a recognised timezone")]
    InvalidTimezone { value: String },
}

impl AdminSettingsForm {
    fn to_command(&self) -> Result<UpdateSettingsCommand, AdminSettingsFormError> {
        let timezone = self.timezone.trim().parse::<Tz>().map_err(|_| {
            AdminSettingsFormError::InvalidTimezone {
                value: self.timezone.trim().to_string(),
            }
        })?;

        Ok(UpdateSettingsCommand {
            site_title: self.site_title.trim().to_string(),
            meta_description: self.meta_description.trim().to_string(),
            public_site_url: self.public_site_url.trim().to_string(),
            timezone,
        })
    }

    fn to_edit_view(
        &self,
        updated_at: String,
        notice: Option<admin_views::AdminNotice>,
    ) -> admin_views::AdminSettingsEditView {
        admin_views::AdminSettingsEditView {
            heading: "Site settings".to_string(),
            form_action: SETTINGS_FORM_ACTION.to_string(),
            notice,
            site_title: self.site_title.trim().to_string(),
            meta_description: self.meta_description.trim().to_string(),
            public_site_url: self.public_site_url.trim().to_string(),
            timezone: self.timezone.trim().to_string(),
            updated_at,
        }
    }
}

fn edit_view_from_record(
    record: &SiteSettingsRecord,
    notice: Option<admin_views::AdminNotice>,
) -> admin_views::AdminSettingsEditView {
    admin_views::AdminSettingsEditView {
        heading: "Site settings".to_string(),
        form_action: SETTINGS_FORM_ACTION.to_string(),
        notice,
        site_title: record.site_title.clone(),
        meta_description: record.meta_description.clone(),
        public_site_url: record.public_site_url.clone(),
        timezone: record.timezone.name().to_string(),
        updated_at: admin_views::format_timestamp(record.updated_at, record.timezone),
    }
}

fn notice_from_code(code: Option<&str>) -> Option<admin_views::AdminNotice> {
    match code? {
        "updated" => Some(admin_views::AdminNotice::success("Site settings updated.")),
        _ => None,
    }
}

fn admin_settings_error(source: &'static str, err: AdminSettingsError) -> HttpError {
    match err {
        AdminSettingsError::ConstraintViolation(field) => HttpError::new(
            source,
            StatusCode::UNPROCESSABLE_ENTITY,
            "Invalid input",
            format!("`{field}` failed validation"),
        ),
        AdminSettingsError::Repo(err) => repo_error_to_http(source, err),
    }
}

pub(super) async fn admin_settings_edit(
    State(state): State<AdminState>,
    Query(query): Query<AdminListQuery>,
) -> Response {
    const SOURCE: &str = "infra::http::admin_settings::edit";

    let chrome = match state.chrome.load("/settings").await {
        Ok(chrome) => chrome,
        Err(err) => return err.into_response(),
    };

    let settings = match state.settings.load().await {
        Ok(settings) => settings,
        Err(err) => return admin_settings_error(SOURCE, err).into_response(),
    };

    let content = edit_view_from_record(&settings, notice_from_code(query.notice.as_deref()));
    let view = admin_views::AdminLayout::new(chrome, content);
    render_template_response(
        admin_views::AdminSettingsEditTemplate { view },
        StatusCode::OK,
    )
}

pub(super) async fn admin_settings_update(
    State(state): State<AdminState>,
    Form(form): Form<AdminSettingsForm>,
) -> Response {
    const SOURCE: &str = "infra::http::admin_settings::update";

    let command = match form.to_command() {
        Ok(command) => command,
        Err(err) => {
            return rerender_editor(
                &state,
                &form,
                admin_views::AdminNotice::error(err.to_string()),
            )
            .await;
        }
    };

    match state.settings.update(command).await {
        Ok(_) => redirect_with_notice(SETTINGS_FORM_ACTION, "updated"),
        Err(AdminSettingsError::ConstraintViolation(field)) => {
            rerender_editor(
                &state,
                &form,
                admin_views::AdminNotice::error(format!("`{field}` must not be empty.")),
            )
            .await
        }
        Err(err) => admin_settings_error(SOURCE, err).into_response(),
    }
}

/// Re-render the edit form with the submitted values after a rejected
/// update, so the operator can correct the field in place.
async fn rerender_editor(
    state: &AdminState,
    form: &AdminSettingsForm,
    notice: admin_views::AdminNotice,
) -> Response {
    const SOURCE: &str = "infra::http::admin_settings::rerender";

    let chrome = match state.chrome.load("/settings").await {
        Ok(chrome) => chrome,
        Err(err) => return err.into_response(),
    };

    let updated_at = match state.settings.load().await {
        Ok(settings) => admin_views::format_timestamp(settings.updated_at, settings.timezone),
        Err(err) => return admin_settings_error(SOURCE, err).into_response(),
    };

    let content = form.to_edit_view(updated_at, Some(notice));
    let view = admin_views::AdminLayout::new(chrome, content);
    render_template_response(
        admin_views::AdminSettingsEditTemplate { view },
        StatusCode::UNPROCESSABLE_ENTITY,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(timezone: &str) -> AdminSettingsForm {
        AdminSettingsForm {
            site_title: "Velada".into(),
            meta_description: "What's on".into(),
            public_site_url: "https://example.org".into(),
            timezone: timezone.into(),
        }
    }

    #[test]
    fn command_parses_a_valid_timezone() {
        let command = form(" Europe/Madrid ").to_command().expect("valid form");
        assert_eq!(command.timezone, chrono_tz::Europe::Madrid);
        assert_eq!(command.site_title, "Velada");
    }

    #[test]
    fn command_rejects_an_unknown_timezone() {
        let err = form("Mars/Olympus_Mons").to_command().unwrap_err();
        assert!(err.to_string().contains("Mars/Olympus_Mons"));
    }
}
