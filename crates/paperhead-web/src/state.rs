use paperhead_core::GrobidClient;
use tokio::sync::Mutex;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub client: GrobidClient,
    /// Held for the duration of each GROBID call so requests go out one at a time.
    pub grobid_gate: Mutex<()>,
}

impl AppState {
    pub fn new(client: GrobidClient) -> Self {
        Self {
            client,
            grobid_gate: Mutex::new(()),
        }
    }
}
