use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use paperhead_core::RequestError;

use crate::models::{ErrorResponse, ExtractResponse};
use crate::state::AppState;
use crate::upload;

pub async fn extract(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let file = match upload::parse_multipart(multipart).await {
        Ok(file) => file,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e, None),
    };

    let result = {
        let _gate = state.grobid_gate.lock().await;
        paperhead_core::handle_upload(&state.client, &file.filename, file.data).await
    };

    match result {
        Ok(extraction) => {
            let warning = extraction
                .parse_error
                .map(|e| format!("Failed to parse the XML returned by GROBID: {}", e));
            Json(ExtractResponse {
                record: extraction.record,
                warning,
            })
            .into_response()
        }
        Err(e) => {
            tracing::warn!(filename = %file.filename, kind = e.kind(), error = %e, "extraction failed");
            error_response(status_for(&e), e.to_string(), Some(e.kind()))
        }
    }
}

/// HTTP status reported to the page for each GROBID failure.
pub fn status_for(err: &RequestError) -> StatusCode {
    match err {
        RequestError::Status(_) | RequestError::Transport(_) => StatusCode::BAD_GATEWAY,
        RequestError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        RequestError::Timeout => StatusCode::GATEWAY_TIMEOUT,
    }
}

fn error_response(status: StatusCode, error: String, kind: Option<&'static str>) -> Response {
    (status, Json(ErrorResponse { error, kind })).into_response()
}
