//! `POST /api/pdf/{operation}`: receive uploads, run one executor, publish
//! the artifact.
//!
//! Every request follows the same path: settings snapshot, upload receipt,
//! conversion on the blocking pool, temp cleanup, artifact persistence and a
//! fire-and-forget usage entry. The first failure ends the request and no
//! usage entry is written for it.

use crate::{
    errors::{AppError, INCORRECT_PASSWORD},
    services::{
        convert::{self, Cardinality, ConvertError, InputFile, Operation, OperationParams},
        upload::{UploadLimits, UploadSet},
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{ConnectInfo, FromRef, FromRequestParts, Multipart, Path, State},
    http::request::Parts,
};
use futures::future::try_join_all;
use serde::Serialize;
use std::{convert::Infallible, net::SocketAddr};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    pub message: String,
    pub download_url: String,
}

/// Whether `X-Forwarded-For` is believed. Off unless a proxy in front of the
/// service rewrites the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyTrust(pub bool);

/// Best-effort caller address: first `X-Forwarded-For` entry when the proxy
/// is trusted, then the socket peer, then `unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    ProxyTrust: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ProxyTrust(trusted) = ProxyTrust::from_ref(state);
        if trusted {
            let forwarded = parts
                .headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string);
            if let Some(ip) = forwarded {
                return Ok(ClientIp(ip));
            }
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        Ok(ClientIp(peer.unwrap_or_else(|| "unknown".to_string())))
    }
}

/// `POST /api/pdf/{operation}`
pub async fn run_operation(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    ClientIp(ip): ClientIp,
    multipart: Multipart,
) -> Result<Json<OperationResponse>, AppError> {
    let op = Operation::from_slug(&slug)
        .ok_or_else(|| AppError::not_found(format!("Unknown operation `{}`", slug)))?;

    let settings = state.registry.settings().await;
    if settings.maintenance_mode {
        return Err(AppError::unavailable(
            "Service is under maintenance. Please try again later.",
        ));
    }

    let limits = UploadLimits {
        field_name: op.field_name(),
        multiple: op.cardinality() == Cardinality::Multiple,
        max_file_size: settings.max_file_size_bytes(),
    };
    let uploads = state.uploads.receive(multipart, limits).await?;

    let outcome = convert_uploads(op, &uploads).await;
    uploads.cleanup().await;
    let output = outcome?;

    let artifact = state
        .artifacts
        .persist(op.artifact_prefix(), op.extension(), op.slug(), &output.bytes)
        .await?;

    state.usage.record(op.tool_name(), Some(ip));
    tracing::info!(
        "{} produced {} ({} bytes)",
        op.slug(),
        artifact.filename,
        artifact.size_bytes
    );

    Ok(Json(OperationResponse {
        message: output
            .message
            .unwrap_or_else(|| op.success_message().to_string()),
        download_url: artifact.download_url(),
    }))
}

async fn convert_uploads(
    op: Operation,
    uploads: &UploadSet,
) -> Result<convert::ExecutorOutput, AppError> {
    let inputs = try_join_all(uploads.files.iter().map(|file| async move {
        let bytes = tokio::fs::read(&file.path).await?;
        Ok::<_, std::io::Error>(InputFile {
            original_name: file.original_name.clone(),
            mime_type: file.mime_type.clone(),
            bytes,
        })
    }))
    .await
    .map_err(|err| {
        tracing::error!("failed to read received upload: {}", err);
        AppError::internal("Failed to process file")
    })?;

    let params = OperationParams {
        password: uploads.field("password").map(str::to_string),
        pages: uploads.field("pages").map(str::to_string),
    };

    let joined =
        tokio::task::spawn_blocking(move || convert::execute(op, &inputs, &params)).await;
    let result = match joined {
        Ok(result) => result,
        Err(err) => {
            tracing::error!("{} executor aborted: {}", op.slug(), err);
            return Err(AppError::internal("Failed to process file"));
        }
    };

    result.map_err(|err| match (op, err) {
        (_, ConvertError::InvalidInput(message)) => AppError::bad_request(message),
        (Operation::Unlock, other) => {
            tracing::debug!("unlock failed: {}", other);
            AppError::bad_request(INCORRECT_PASSWORD)
        }
        (_, other) => other.into(),
    })
}
