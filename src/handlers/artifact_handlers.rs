//! Streams produced artifacts back to clients while their expiry record is
//! still live.

use crate::{errors::AppError, models::artifact::Artifact, state::AppState};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// `GET /uploads/{filename}`
pub async fn download_artifact(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let (artifact, path) = state.artifacts.open(&filename).await?;
    let file = File::open(&path).await.map_err(|err| {
        tracing::warn!("artifact {} vanished before streaming: {}", filename, err);
        AppError::not_found("File not found")
    })?;

    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    *response.status_mut() = StatusCode::OK;
    set_artifact_headers(response.headers_mut(), &artifact);
    Ok(response)
}

fn set_artifact_headers(headers: &mut HeaderMap, artifact: &Artifact) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&artifact.filename)),
    );
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&artifact.size_bytes.max(0).to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
}

fn content_type_for(filename: &str) -> &'static str {
    let extension = filename.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    match extension.to_ascii_lowercase().as_str() {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_follow_extension() {
        assert_eq!(content_type_for("merged-1-abcdef12.pdf"), "application/pdf");
        assert_eq!(content_type_for("converted-1-abcdef12.ZIP"), "application/zip");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
