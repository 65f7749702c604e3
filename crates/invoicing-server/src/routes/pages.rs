use std::path::Path;

use axum::routing::{get_service, MethodRouter};
use tower_http::services::ServeFile;

use super::AppState;

/// GET route serving one file from the static directory.
pub fn serve(static_dir: &Path, file: &str) -> MethodRouter<AppState> {
    get_service(ServeFile::new(static_dir.join(file)))
}
