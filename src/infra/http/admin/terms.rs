use axum::{
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::application::admin::terms::{AdminTermError, CreateTermCommand};
use crate::application::error::HttpError;
use crate::application::repos::TermsRepo;
use crate::domain::entities::TermRecord;
use crate::infra::http::repo_error_to_http;
use crate::presentation::{admin::views as admin_views, views::render_template_response};

use super::{
    AdminState,
    shared::{AdminListQuery, redirect_with_notice},
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(super) struct AdminTermForm {
    name: String,
    parent_id: String,
}

impl AdminTermForm {
    fn to_command(&self) -> Result<CreateTermCommand, &'static str> {
        let parent_id = match self.parent_id.trim() {
            "" => None,
            raw => Some(raw.parse::<Uuid>().map_err(|_| "invalid-parent")?),
        };

        Ok(CreateTermCommand {
            name: self.name.clone(),
            parent_id,
        })
    }
}

fn notice_from_code(code: Option<&str>) -> Option<admin_views::AdminNotice> {
    match code? {
        "created" => Some(admin_views::AdminNotice::success("Term created.")),
        "deleted" => Some(admin_views::AdminNotice::success("Term deleted.")),
        "invalid-name" => Some(admin_views::AdminNotice::error("Name must not be empty.")),
        "invalid-parent" => Some(admin_views::AdminNotice::error(
            "Parent must be an existing term.",
        )),
        "in-use" => Some(admin_views::AdminNotice::error(
            "Term is still assigned to events and cannot be deleted.",
        )),
        "has-children" => Some(admin_views::AdminNotice::error(
            "Term still has child terms and cannot be deleted.",
        )),
        "not-found" => Some(admin_views::AdminNotice::error("Term not found.")),
        _ => None,
    }
}

fn admin_term_error(source: &'static str, err: AdminTermError) -> HttpError {
    match err {
        AdminTermError::ConstraintViolation(field) => HttpError::new(
            source,
            StatusCode::UNPROCESSABLE_ENTITY,
            "Invalid input",
            format!("`{field}` failed validation"),
        ),
        AdminTermError::InUse { count } => HttpError::new(
            source,
            StatusCode::CONFLICT,
            "Term in use",
            format!("term is assigned to {count} events"),
        ),
        AdminTermError::HasChildren => HttpError::new(
            source,
            StatusCode::CONFLICT,
            "Term has children",
            "term has child terms",
        ),
        AdminTermError::Repo(err) => repo_error_to_http(source, err),
    }
}

fn parent_label(term: &TermRecord, all: &[TermRecord]) -> String {
    term.parent_id
        .and_then(|parent_id| all.iter().find(|candidate| candidate.id == parent_id))
        .map(|parent| parent.name.clone())
        .unwrap_or_default()
}

pub(super) async fn admin_terms(
    State(state): State<AdminState>,
    Query(query): Query<AdminListQuery>,
) -> Response {
    const SOURCE: &str = "infra::http::admin_terms::list";

    let chrome = match state.chrome.load("/terms").await {
        Ok(chrome) => chrome,
        Err(err) => return err.into_response(),
    };

    let terms = match state.terms.list_all().await {
        Ok(terms) => terms,
        Err(err) => return admin_term_error(SOURCE, err).into_response(),
    };

    let mut rows = Vec::with_capacity(terms.len());
    for term in &terms {
        let usage = match state.db.count_usage(term.id).await {
            Ok(usage) => usage,
            Err(err) => return repo_error_to_http(SOURCE, err).into_response(),
        };
        rows.push(admin_views::AdminTermRowView {
            id: term.id.to_string(),
            name: term.name.clone(),
            slug: term.slug.clone(),
            parent_label: parent_label(term, &terms),
            usage_count: usage,
            delete_action: format!("/terms/{}/delete", term.id),
        });
    }

    let mut parent_options = vec![admin_views::AdminSelectOption {
        value: String::new(),
        label: "No parent".to_string(),
        selected: true,
    }];
    parent_options.extend(terms.iter().map(|term| admin_views::AdminSelectOption {
        value: term.id.to_string(),
        label: term.name.clone(),
        selected: false,
    }));

    let content = admin_views::AdminTermListView {
        heading: "Terms".to_string(),
        notice: notice_from_code(query.notice.as_deref()),
        terms: rows,
        parent_options,
        create_action: "/terms/create".to_string(),
    };

    let view = admin_views::AdminLayout::new(chrome, content);
    render_template_response(admin_views::AdminTermsTemplate { view }, StatusCode::OK)
}

pub(super) async fn admin_term_create(
    State(state): State<AdminState>,
    Form(form): Form<AdminTermForm>,
) -> Response {
    const SOURCE: &str = "infra::http::admin_terms::create";

    let command = match form.to_command() {
        Ok(command) => command,
        Err(code) => return redirect_with_notice("/terms", code),
    };

    match state.terms.create_term(command).await {
        Ok(_) => redirect_with_notice("/terms", "created"),
        Err(AdminTermError::ConstraintViolation("parent")) => {
            redirect_with_notice("/terms", "invalid-parent")
        }
        Err(AdminTermError::ConstraintViolation(_)) => {
            redirect_with_notice("/terms", "invalid-name")
        }
        Err(err) => admin_term_error(SOURCE, err).into_response(),
    }
}

pub(super) async fn admin_term_delete(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Response {
    const SOURCE: &str = "infra::http::admin_terms::delete";

    match state.terms.find_by_id(id).await {
        Ok(Some(_)) => {}
        Ok(None) => return redirect_with_notice("/terms", "not-found"),
        Err(err) => return admin_term_error(SOURCE, err).into_response(),
    }

    match state.terms.delete_term(id).await {
        Ok(()) => redirect_with_notice("/terms", "deleted"),
        Err(AdminTermError::InUse { .. }) => redirect_with_notice("/terms", "in-use"),
        Err(AdminTermError::HasChildren) => redirect_with_notice("/terms", "has-children"),
        Err(err) => admin_term_error(SOURCE, err).into_response(),
    }
}
