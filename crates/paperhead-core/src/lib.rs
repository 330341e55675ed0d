use std::time::Duration;

pub mod config_file;
pub mod grobid;
pub mod record;
pub mod tei;

// Re-export for convenience
pub use config_file::{ConfigFile, load_config};
pub use grobid::{GrobidClient, HEADER_DOCUMENT_PATH, RequestError};
pub use record::{CSV_FILENAME, CSV_MIME, ExtractedRecord, NOT_FOUND};
pub use tei::{Extraction, ParseError, extract_record, parse_tei};

/// GROBID's default local address.
pub const DEFAULT_GROBID_URL: &str = "http://localhost:8070";
/// Upper bound on one GROBID round trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Where the web form listens unless told otherwise.
pub const DEFAULT_BIND: &str = "0.0.0.0:8501";

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub grobid_url: String,
    pub timeout: Duration,
    pub bind: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grobid_url: DEFAULT_GROBID_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl Config {
    /// Defaults overlaid with a (possibly partial) config file.
    pub fn from_file(file: &ConfigFile) -> Self {
        let mut config = Config::default();
        if let Some(grobid) = &file.grobid {
            if let Some(url) = &grobid.url {
                config.grobid_url = url.clone();
            }
            if let Some(secs) = grobid.timeout_secs {
                config.timeout = Duration::from_secs(secs);
            }
        }
        if let Some(bind) = file.server.as_ref().and_then(|s| s.bind.clone()) {
            config.bind = bind;
        }
        config
    }

    /// Apply `GROBID_URL`, `GROBID_TIMEOUT` (seconds) and `PAPERHEAD_BIND` overrides.
    ///
    /// `lookup` is the environment; tests pass a closure over a fixed map.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("GROBID_URL").filter(|v| !v.is_empty()) {
            self.grobid_url = url;
        }
        match lookup("GROBID_TIMEOUT").map(|v| v.parse::<u64>()) {
            Some(Ok(secs)) => self.timeout = Duration::from_secs(secs),
            Some(Err(e)) => tracing::warn!(error = %e, "ignoring invalid GROBID_TIMEOUT"),
            None => {}
        }
        if let Some(bind) = lookup("PAPERHEAD_BIND").filter(|v| !v.is_empty()) {
            self.bind = bind;
        }
        self
    }

    /// Config files, then the process environment.
    pub fn load() -> Self {
        Config::from_file(&load_config()).with_env(|key| std::env::var(key).ok())
    }

    pub fn client(&self) -> GrobidClient {
        GrobidClient::new(self.grobid_url.clone(), self.timeout)
    }
}

/// Send one uploaded PDF through GROBID and pull the header record out of the reply.
///
/// Transport failures end the request with no record. A reply that is not
/// well-formed TEI still succeeds, carrying the all-"Not Found" record and the
/// parse error so the caller can report both.
pub async fn handle_upload(
    client: &GrobidClient,
    filename: &str,
    pdf: Vec<u8>,
) -> Result<Extraction, RequestError> {
    let tei_xml = client.process_header_document(filename, pdf).await?;
    let extraction = extract_record(&tei_xml);
    tracing::debug!(
        filename,
        title = %extraction.record.title,
        parsed = extraction.parse_error.is_none(),
        "header record extracted"
    );
    Ok(extraction)
}
