//! Client for GROBID's header extraction endpoint.

use std::time::Duration;

use thiserror::Error;

/// Path of the header-only extraction service.
pub const HEADER_DOCUMENT_PATH: &str = "/api/processHeaderDocument";

/// Multipart field GROBID reads the PDF from.
const INPUT_FIELD: &str = "input";

/// Why a GROBID request produced no TEI document.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("GROBID returned status code {0}")]
    Status(u16),
    #[error("Request to GROBID timed out. Try again or use a smaller file.")]
    Timeout,
    #[error("Could not connect to the GROBID service. Please ensure it is running.")]
    Unavailable(#[source] reqwest::Error),
    #[error("An unexpected error occurred: {0}")]
    Transport(String),
}

impl RequestError {
    /// Short machine-readable tag for logs and JSON responses.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestError::Status(_) => "status",
            RequestError::Timeout => "timeout",
            RequestError::Unavailable(_) => "unavailable",
            RequestError::Transport(_) => "transport",
        }
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(e: reqwest::Error) -> Self {
        // Timeout first: a connect that runs out the clock is still a timeout.
        if e.is_timeout() {
            RequestError::Timeout
        } else if e.is_connect() {
            RequestError::Unavailable(e)
        } else {
            RequestError::Transport(e.to_string())
        }
    }
}

/// One GROBID instance, reached over HTTP with a fixed per-request timeout.
#[derive(Debug, Clone)]
pub struct GrobidClient {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl GrobidClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            timeout,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Full URL of the header extraction endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, HEADER_DOCUMENT_PATH)
    }

    /// Upload a PDF and return GROBID's TEI response as text.
    ///
    /// A single attempt; failures are classified into [`RequestError`] and never retried.
    pub async fn process_header_document(
        &self,
        filename: &str,
        pdf: Vec<u8>,
    ) -> Result<String, RequestError> {
        let url = self.endpoint();
        let size = pdf.len();
        tracing::debug!(url = %url, filename, bytes = size, "sending PDF to GROBID");

        let part = reqwest::multipart::Part::bytes(pdf)
            .file_name(filename.to_string())
            .mime_str("application/pdf")
            .map_err(|e| RequestError::Transport(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part(INPUT_FIELD, part);

        let resp = self
            .client
            .post(url.as_str())
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .inspect_err(|e| tracing::warn!(url = %url, error = %e, "GROBID request failed"))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "GROBID rejected the document");
            return Err(RequestError::Status(status.as_u16()));
        }

        let body = resp.bytes().await?;
        let text = String::from_utf8(body.to_vec())
            .map_err(|e| RequestError::Transport(format!("response is not valid UTF-8: {}", e)))?;

        tracing::info!(url = %url, filename, bytes = size, tei_bytes = text.len(), "GROBID header extracted");
        Ok(text)
    }
}
