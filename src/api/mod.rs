pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::ml::ClassificationService;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<ClassificationService>,
}

impl AppState {
    pub fn new(classifier: Arc<ClassificationService>) -> Self {
        Self { classifier }
    }
}
