use std::io::Write;

use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use tempfile::NamedTempFile;
use tracing::{error, info};

use crate::app::import_use_case::MappingErrorPolicy;
use crate::common::error::ImportError;
use crate::server::state::AppState;

const UPLOAD_FIELD: &str = "xmlFile";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    message: String,
    imported_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    skipped_count: Option<u64>,
}

/// Wire-shape error: `{ kind, message }` with an HTTP status.
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "BadRequest",
            message: message.into(),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::bad_request(format!("invalid multipart upload: {err}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "kind": self.kind, "message": self.message })),
        )
            .into_response()
    }
}

/// POST /importar-xml: accepts the feed as a multipart file upload and
/// replaces the imoveis table with its contents.
pub async fn import_feed(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImportResponse>, ApiError> {
    let mut upload: Option<Bytes> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) {
            upload = Some(field.bytes().await?);
            break;
        }
    }

    let bytes = match upload {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => return Err(ApiError::bad_request("no feed file was uploaded")),
    };

    info!(bytes = bytes.len(), "feed upload received");

    // The upload lives in a named temp file for the duration of one import;
    // dropping the handle removes it on every exit path.
    let mut temp = NamedTempFile::new().map_err(ImportError::from)?;
    temp.write_all(&bytes).map_err(ImportError::from)?;

    let outcome = state.importer.import_file(temp.path()).await.map_err(|err| {
        error!(%err, "import failed, table left untouched");
        err
    })?;

    let skipped_count = match state.importer.policy() {
        MappingErrorPolicy::Skip => Some(outcome.skipped),
        MappingErrorPolicy::Abort => None,
    };

    Ok(Json(ImportResponse {
        message: "Importação concluída com sucesso".to_string(),
        imported_count: outcome.imported,
        skipped_count,
    }))
}
