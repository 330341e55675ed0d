//! The extracted header record and its CSV rendering.

use serde::{Deserialize, Serialize};

/// Sentinel for a field whose lookup rule matched no usable text.
pub const NOT_FOUND: &str = "Not Found";

/// Filename offered for the CSV download.
pub const CSV_FILENAME: &str = "metadata.csv";

/// MIME type of the CSV download.
pub const CSV_MIME: &str = "text/csv";

/// Header row of the CSV download.
pub const CSV_HEADER: [&str; 3] = ["Title", "Authors", "Year"];

/// Title, authors and year pulled from one document header.
///
/// Every field is either the found text or [`NOT_FOUND`]. Fields are looked up
/// independently, so a missing title says nothing about the authors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub title: String,
    /// Comma + space joined, de-duplicated in first-seen order.
    pub authors: String,
    pub year: String,
}

impl ExtractedRecord {
    /// A record with every field set to [`NOT_FOUND`].
    pub fn not_found() -> Self {
        Self {
            title: NOT_FOUND.to_string(),
            authors: NOT_FOUND.to_string(),
            year: NOT_FOUND.to_string(),
        }
    }

    /// Build a record from optional lookups, substituting the sentinel for misses.
    pub fn from_parts(title: Option<String>, authors: Vec<String>, year: Option<String>) -> Self {
        let authors = if authors.is_empty() {
            NOT_FOUND.to_string()
        } else {
            authors.join(", ")
        };
        Self {
            title: title.unwrap_or_else(|| NOT_FOUND.to_string()),
            authors,
            year: year.unwrap_or_else(|| NOT_FOUND.to_string()),
        }
    }

    /// Render as a two-row CSV: the `Title,Authors,Year` header and this record.
    pub fn to_csv(&self) -> csv::Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .from_writer(Vec::new());
        writer.write_record(CSV_HEADER)?;
        writer.write_record([&self.title, &self.authors, &self.year])?;
        let bytes = writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))?;
        // Every field came from a `String`, so the bytes are UTF-8.
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl Default for ExtractedRecord {
    fn default() -> Self {
        Self::not_found()
    }
}
