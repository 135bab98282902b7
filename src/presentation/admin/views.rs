use askama::Template;
use chrono_tz::Tz;
use time::OffsetDateTime;

use crate::util::timezone;

#[derive(Clone)]
pub struct AdminBrandView {
    pub title: String,
}

#[derive(Clone)]
pub struct AdminNavigationItemView {
    pub label: String,
    pub href: String,
    pub is_active: bool,
    pub open_in_new_tab: bool,
}

#[derive(Clone)]
pub struct AdminNavigationView {
    pub items: Vec<AdminNavigationItemView>,
}

#[derive(Clone)]
pub struct AdminMetaView {
    pub title: String,
    pub description: String,
}

#[derive(Clone)]
pub struct AdminChrome {
    pub brand: AdminBrandView,
    pub navigation: AdminNavigationView,
    pub meta: AdminMetaView,
}

#[derive(Clone)]
pub struct AdminLayout<T> {
    pub chrome: AdminChrome,
    pub asset_version: String,
    pub content: T,
}

impl<T> AdminLayout<T> {
    pub fn new(chrome: AdminChrome, content: T) -> Self {
        Self {
            chrome,
            asset_version: asset_version(),
            content,
        }
    }
}

fn asset_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Outcome banner rendered at the top of an admin page after a redirect.
#[derive(Clone)]
pub struct AdminNotice {
    pub kind: &'static str,
    pub text: String,
}

impl AdminNotice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: "success",
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: "error",
            text: text.into(),
        }
    }
}

pub fn format_timestamp(time: OffsetDateTime, tz: Tz) -> String {
    let localized = timezone::localized_datetime(time, tz);
    localized.format("%Y/%m/%d %H:%M:%S").to_string()
}

#[derive(Clone)]
pub struct AdminEventRowView {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub status_label: String,
    pub schedule_label: String,
    pub updated_label: String,
    pub edit_href: String,
    pub preview_href: String,
    pub delete_action: String,
    pub is_draft: bool,
    pub featured: bool,
}

#[derive(Clone)]
pub struct AdminEventListView {
    pub heading: String,
    pub notice: Option<AdminNotice>,
    pub filter_action: String,
    pub search: Option<String>,
    pub events: Vec<AdminEventRowView>,
    pub total_count: u64,
    pub next_page_href: Option<String>,
    pub new_event_href: String,
}

impl AdminEventListView {
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }
}

#[derive(Template)]
#[template(path = "admin/events.html")]
pub struct AdminEventsTemplate {
    pub view: AdminLayout<AdminEventListView>,
}

#[derive(Clone)]
pub struct AdminSelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Clone)]
pub struct AdminTermOption {
    pub id: String,
    pub name: String,
    pub checked: bool,
}

/// Event editor state. Location fields carry a `*_hidden` flag so the
/// template can start the form collapsed to what the attendance mode
/// uses; the server still accepts every field on submit.
#[derive(Clone)]
pub struct AdminEventFormView {
    pub heading: String,
    pub form_action: String,
    pub delete_action: Option<String>,
    pub notice: Option<AdminNotice>,
    pub title: String,
    pub content_html: String,
    pub image_url: String,
    pub published: bool,
    pub featured: bool,
    pub full_day: bool,
    pub start_date: String,
    pub start_time: String,
    pub end_date: String,
    pub end_time: String,
    pub status_options: Vec<AdminSelectOption>,
    pub attendance_options: Vec<AdminSelectOption>,
    pub location: String,
    pub location_url: String,
    pub virtual_location_name: String,
    pub geo_address: String,
    pub geo_lat: String,
    pub geo_lng: String,
    pub geo_zoom: String,
    pub geo_components: String,
    pub location_hidden: bool,
    pub location_url_hidden: bool,
    pub virtual_location_name_hidden: bool,
    pub geo_picker_hidden: bool,
    pub terms: Vec<AdminTermOption>,
}

impl AdminEventFormView {
    pub fn has_terms(&self) -> bool {
        !self.terms.is_empty()
    }
}

#[derive(Template)]
#[template(path = "admin/event_edit.html")]
pub struct AdminEventEditTemplate {
    pub view: AdminLayout<AdminEventFormView>,
}

#[derive(Clone)]
pub struct AdminTermRowView {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub parent_label: String,
    pub usage_count: u64,
    pub delete_action: String,
}

impl AdminTermRowView {
    pub fn has_parent(&self) -> bool {
        !self.parent_label.is_empty()
    }
}

#[derive(Clone)]
pub struct AdminTermListView {
    pub heading: String,
    pub notice: Option<AdminNotice>,
    pub terms: Vec<AdminTermRowView>,
    pub parent_options: Vec<AdminSelectOption>,
    pub create_action: String,
}

impl AdminTermListView {
    pub fn has_terms(&self) -> bool {
        !self.terms.is_empty()
    }
}

#[derive(Template)]
#[template(path = "admin/terms.html")]
pub struct AdminTermsTemplate {
    pub view: AdminLayout<AdminTermListView>,
}

#[derive(Clone)]
pub struct AdminSettingsEditView {
    pub heading: String,
    pub form_action: String,
    pub notice: Option<AdminNotice>,
    pub site_title: String,
    pub meta_description: String,
    pub public_site_url: String,
    pub timezone: String,
    pub updated_at: String,
}

#[derive(Template)]
#[template(path = "admin/settings_edit.html")]
pub struct AdminSettingsEditTemplate {
    pub view: AdminLayout<AdminSettingsEditView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn timestamps_render_in_the_site_timezone() {
        let instant = datetime!(2024-06-01 12:00 UTC);
        let formatted = format_timestamp(instant, chrono_tz::Asia::Tokyo);
        assert_eq!(formatted, "2024/06/01 21:00:00");
    }

    #[test]
    fn layout_stamps_the_package_version() {
        let chrome = AdminChrome {
            brand: AdminBrandView {
                title: "Velada Admin".into(),
            },
            navigation: AdminNavigationView { items: Vec::new() },
            meta: AdminMetaView {
                title: "Velada Admin".into(),
                description: String::new(),
            },
        };

        let layout = AdminLayout::new(chrome, ());
        assert_eq!(layout.asset_version, env!("CARGO_PKG_VERSION"));
    }
}
