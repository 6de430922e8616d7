//! Shared state handed to every request

use crate::proxy::backend::ChatBackend;
use std::sync::Arc;

pub struct AppState {
    pub backend: Arc<dyn ChatBackend>,
}

impl AppState {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }
}
