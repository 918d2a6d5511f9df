use std::sync::Arc;

use crate::app::import_use_case::ImportUseCase;

#[derive(Clone)]
pub struct AppState {
    pub importer: Arc<ImportUseCase>,
    pub max_upload_bytes: usize,
}
