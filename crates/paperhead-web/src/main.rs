use std::sync::Arc;

use tracing_subscriber::EnvFilter;

mod handlers;
mod models;
mod state;
mod template;
mod upload;

use paperhead_core::Config;
use state::AppState;

/// Largest PDF the form accepts.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load();
    tracing::info!(
        grobid = %config.grobid_url,
        timeout_secs = config.timeout.as_secs(),
        "using GROBID"
    );

    let state = Arc::new(AppState::new(config.client()));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind.as_str()).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> axum::Router {
    let body_limit = axum::extract::DefaultBodyLimit::max(MAX_UPLOAD_BYTES);

    axum::Router::new()
        .route("/", axum::routing::get(handlers::index::index))
        .route("/extract", axum::routing::post(handlers::extract::extract))
        .route("/download", axum::routing::post(handlers::download::download))
        .layer(body_limit)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use paperhead_core::{GrobidClient, NOT_FOUND, RequestError};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tower::ServiceExt;

    use crate::handlers::extract::status_for;

    const BOUNDARY: &str = "paperhead-test-boundary";

    async fn unreachable_grobid() -> GrobidClient {
        let addr = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        GrobidClient::new(format!("http://{addr}"), Duration::from_secs(5))
    }

    /// A GROBID stand-in that answers one request with `200 OK` and `tei`.
    async fn grobid_replying(tei: &'static str) -> GrobidClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 4096];
            // The multipart body ends with the closing boundary line.
            while !request.ends_with(b"--\r\n") {
                let n = stream.read(&mut chunk).await.unwrap_or(0);
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
            }
            let head = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/xml\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                tei.len()
            );
            stream.write_all(head.as_bytes()).await.unwrap();
            stream.write_all(tei.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
        });

        GrobidClient::new(format!("http://{addr}"), Duration::from_secs(5))
    }

    fn multipart_body(field: &str, filename: &str, data: &[u8]) -> Body {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        Body::from(body)
    }

    fn extract_request(body: Body) -> Request<Body> {
        Request::post("/extract")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(body)
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn index_serves_upload_form() {
        let app = router(Arc::new(AppState::new(unreachable_grobid().await)));
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let page = String::from_utf8_lossy(&bytes);
        assert!(page.contains("type=\"file\""));
        assert!(page.contains("Download Metadata as CSV"));
    }

    #[tokio::test]
    async fn download_returns_csv_attachment() {
        let app = router(Arc::new(AppState::new(unreachable_grobid().await)));
        let request = Request::post("/download")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("title=A%2C+B&authors=X&year=2020"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"metadata.csv\""
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"Title,Authors,Year\r\n\"A, B\",X,2020\r\n");
    }

    #[tokio::test]
    async fn extract_without_file_is_bad_request() {
        let app = router(Arc::new(AppState::new(unreachable_grobid().await)));
        let body = Body::from(format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{BOUNDARY}--\r\n"
        ));
        let response = app.oneshot(extract_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["error"], "No file uploaded");
    }

    #[tokio::test]
    async fn extract_reports_unavailable_grobid() {
        let app = router(Arc::new(AppState::new(unreachable_grobid().await)));
        let body = multipart_body("pdf", "paper.pdf", b"%PDF-1.4\n%%EOF\n");
        let response = app.oneshot(extract_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = json_body(response).await;
        assert_eq!(json["kind"], "unavailable");
        assert!(json["error"].as_str().unwrap().contains("Could not connect"));
    }

    #[tokio::test]
    async fn extract_returns_record_from_grobid() {
        let tei = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><teiHeader><fileDesc>
            <titleStmt><title level="a" type="main">A Study of Things</title></titleStmt>
            <publicationStmt><date type="published">2019</date></publicationStmt>
            <sourceDesc><biblStruct><analytic>
              <author><persName><forename>Jane</forename><surname>Doe</surname></persName></author>
            </analytic></biblStruct></sourceDesc>
        </fileDesc></teiHeader></TEI>"#;
        let app = router(Arc::new(AppState::new(grobid_replying(tei).await)));
        let body = multipart_body("pdf", "paper.pdf", b"%PDF-1.4\n%%EOF\n");
        let response = app.oneshot(extract_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["record"]["title"], "A Study of Things");
        assert_eq!(json["record"]["authors"], "Jane Doe");
        assert_eq!(json["record"]["year"], "2019");
        assert!(json.get("warning").is_none());
        assert_eq!(json.as_object().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn extract_warns_when_grobid_reply_is_not_xml() {
        let app = router(Arc::new(AppState::new(
            grobid_replying("<TEI><title a=1>Broken</title></TEI>").await,
        )));
        let body = multipart_body("pdf", "paper.pdf", b"%PDF-1.4\n%%EOF\n");
        let response = app.oneshot(extract_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        for field in ["title", "authors", "year"] {
            assert_eq!(json["record"][field], NOT_FOUND);
        }
        assert!(
            json["warning"]
                .as_str()
                .unwrap()
                .starts_with("Failed to parse the XML returned by GROBID:")
        );
    }

    #[test]
    fn failures_map_to_distinct_statuses() {
        assert_eq!(status_for(&RequestError::Timeout), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(status_for(&RequestError::Status(500)), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_for(&RequestError::Transport("reset".into())),
            StatusCode::BAD_GATEWAY
        );
    }
}
