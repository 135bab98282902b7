use std::sync::Arc;

use crate::application::repos::{EventsRepo, SettingsRepo, TermsRepo};

#[derive(Clone)]
pub struct ApiState {
    pub events: Arc<dyn EventsRepo>,
    pub terms: Arc<dyn TermsRepo>,
    pub settings: Arc<dyn SettingsRepo>,
}
