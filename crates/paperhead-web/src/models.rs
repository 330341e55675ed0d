use paperhead_core::ExtractedRecord;
use serde::{Deserialize, Serialize};

/// Body of a successful `/extract` response.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractResponse {
    pub record: ExtractedRecord,
    /// Set when GROBID's reply could not be parsed and the record is all "Not Found".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
}

/// Fields posted back by the page's download button.
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadForm {
    pub title: String,
    pub authors: String,
    pub year: String,
}

impl From<DownloadForm> for ExtractedRecord {
    fn from(form: DownloadForm) -> Self {
        ExtractedRecord {
            title: form.title,
            authors: form.authors,
            year: form.year,
        }
    }
}
