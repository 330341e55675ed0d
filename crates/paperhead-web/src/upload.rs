use axum::extract::Multipart;

/// An uploaded PDF with its original filename.
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Pull the `pdf` field out of a multipart upload.
pub async fn parse_multipart(mut multipart: Multipart) -> Result<UploadedFile, String> {
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Failed to read form field: {}", e))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "pdf" {
            let filename = field.file_name().unwrap_or("upload.pdf").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| format!("Failed to read file data: {}", e))?
                .to_vec();

            check_pdf(&filename, &data)?;
            file = Some(UploadedFile { filename, data });
        } else {
            // Ignore unknown fields
            let _ = field.bytes().await;
        }
    }

    file.ok_or_else(|| "No file uploaded".to_string())
}

/// The form only takes PDFs: accept a `.pdf` name or PDF magic bytes.
///
/// Content is not inspected further; GROBID rejects what it cannot read.
fn check_pdf(filename: &str, data: &[u8]) -> Result<(), String> {
    if data.is_empty() {
        return Err("Uploaded file is empty".to_string());
    }
    if filename.to_lowercase().ends_with(".pdf") || data.starts_with(b"%PDF-") {
        return Ok(());
    }
    Err("Unsupported file type. Please upload a PDF.".to_string())
}
