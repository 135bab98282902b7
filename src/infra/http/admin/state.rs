use std::sync::Arc;

use crate::application::admin::{
    chrome::AdminChromeService, events::AdminEventService, settings::AdminSettingsService,
    terms::AdminTermService,
};
use crate::infra::db::PostgresRepositories;

#[derive(Clone)]
pub struct AdminState {
    pub db: Arc<PostgresRepositories>,
    pub chrome: Arc<AdminChromeService>,
    pub events: Arc<AdminEventService>,
    pub terms: Arc<AdminTermService>,
    pub settings: Arc<AdminSettingsService>,
}
