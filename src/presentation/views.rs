use crate::application::error::{ErrorReport, HttpError};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let content = ErrorPageView::not_found();
    let view = LayoutContext::new(chrome, content);
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct NavigationView {
    pub entries: Vec<NavigationLinkView>,
}

#[derive(Clone)]
pub struct FooterView {
    pub copy: String,
}

#[derive(Clone)]
pub struct BrandView {
    pub title: String,
    pub href: String,
}

#[derive(Clone)]
pub struct NavigationLinkView {
    pub label: String,
    pub href: String,
}

#[derive(Clone)]
pub struct LayoutChrome {
    pub brand: BrandView,
    pub navigation: NavigationView,
    pub footer: FooterView,
    pub meta: PageMetaView,
}

impl LayoutChrome {
    pub fn with_canonical(self, canonical: String) -> Self {
        Self {
            meta: self.meta.with_canonical(canonical),
            ..self
        }
    }

    pub fn with_meta(self, meta: PageMetaView) -> Self {
        Self { meta, ..self }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub brand: BrandView,
    pub navigation: NavigationView,
    pub footer: FooterView,
    pub meta: PageMetaView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            brand: chrome.brand,
            navigation: chrome.navigation,
            footer: chrome.footer,
            meta: chrome.meta,
            content,
        }
    }
}

#[derive(Clone)]
pub struct TermBadge {
    pub value: String,
    pub label: String,
}

/// One entry on the upcoming agenda listing.
#[derive(Clone, Debug)]
pub struct EventCard {
    pub slug: String,
    pub title: String,
    pub href: String,
    pub month_badge: String,
    pub day_badge: String,
    pub date_range: String,
    pub time_range: String,
    pub iso_start: String,
    pub location_label: String,
    pub featured: bool,
}

impl EventCard {
    pub fn has_schedule(&self) -> bool {
        !self.date_range.is_empty()
    }

    pub fn has_location(&self) -> bool {
        !self.location_label.is_empty()
    }

    pub fn has_time(&self) -> bool {
        !self.time_range.is_empty()
    }
}

#[derive(Debug)]
pub struct FrontPageContext {
    pub events: Vec<EventCard>,
    pub event_count: usize,
    pub total_count: usize,
    pub has_results: bool,
    pub next_cursor: Option<String>,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<FrontPageContext>,
}

pub struct EventDetailContext {
    pub slug: String,
    pub title: String,
    pub has_schedule: bool,
    pub month_name: String,
    pub day_of_month: String,
    pub date_range: String,
    pub time_range: String,
    pub iso_start: String,
    pub attendance_label: String,
    pub status_label: String,
    pub show_status: bool,
    pub location: String,
    pub location_url: String,
    pub virtual_location_name: String,
    pub show_location: bool,
    pub show_virtual: bool,
    pub content_html: String,
    pub calendar_link: String,
    pub terms: Vec<TermBadge>,
    pub ld_json: Option<String>,
    pub noindex: bool,
    pub image_url: Option<String>,
}

impl EventDetailContext {
    pub fn has_calendar_link(&self) -> bool {
        !self.calendar_link.is_empty()
    }

    /// Text for the online-attendance link; falls back to the bare URL when
    /// the venue has no display name.
    pub fn virtual_label(&self) -> &str {
        if self.virtual_location_name.is_empty() {
            &self.location_url
        } else {
            &self.virtual_location_name
        }
    }

    pub fn has_terms(&self) -> bool {
        !self.terms.is_empty()
    }

    pub fn has_time(&self) -> bool {
        !self.time_range.is_empty()
    }

    pub fn has_virtual_url(&self) -> bool {
        !self.location_url.is_empty()
    }
}

#[derive(Template)]
#[template(path = "event.html")]
pub struct EventTemplate {
    pub view: LayoutContext<EventDetailContext>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub primary_action: Option<ErrorAction>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist. It may have been unpublished, or the address mistyped.".to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }
}

pub struct ErrorAction {
    pub href: String,
    pub label: String,
}

impl ErrorAction {
    pub fn home() -> Self {
        Self {
            href: "/".to_string(),
            label: "Back to the agenda".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
    pub description: String,
    pub og_title: String,
    pub og_description: String,
    pub canonical: String,
}

impl PageMetaView {
    pub fn has_canonical(&self) -> bool {
        !self.canonical.is_empty()
    }

    pub fn with_canonical(self, canonical: String) -> Self {
        Self { canonical, ..self }
    }

    pub fn with_content(self, title: String, description: String) -> Self {
        Self {
            og_title: title.clone(),
            og_description: description.clone(),
            title,
            description,
            ..self
        }
    }
}

pub fn build_term_badges<'a, T>(terms: T) -> Vec<TermBadge>
where
    T: IntoIterator<Item = (&'a str, &'a str)>,
{
    terms
        .into_iter()
        .map(|(value, name)| TermBadge {
            value: value.to_string(),
            label: name.to_string(),
        })
        .collect()
}
