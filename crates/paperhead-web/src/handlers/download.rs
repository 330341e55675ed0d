use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};

use paperhead_core::{CSV_FILENAME, CSV_MIME, ExtractedRecord};

use crate::models::{DownloadForm, ErrorResponse};

/// Serve the displayed record back as `metadata.csv`.
pub async fn download(Form(form): Form<DownloadForm>) -> Response {
    let record = ExtractedRecord::from(form);
    let csv = match record.to_csv() {
        Ok(csv) => csv,
        Err(e) => {
            tracing::error!(error = %e, "failed to render CSV");
            let body = ErrorResponse {
                error: format!("Failed to render CSV: {}", e),
                kind: None,
            };
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
        }
    };
    let disposition = format!("attachment; filename=\"{}\"", CSV_FILENAME);
    (
        [
            (header::CONTENT_TYPE, CSV_MIME.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response()
}
