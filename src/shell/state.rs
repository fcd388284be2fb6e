use crate::modules::package_updates::use_cases::dispatch_updates::status::StatusBoard;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub status: Arc<StatusBoard>,
}
