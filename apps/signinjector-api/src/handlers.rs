//! HTTP handlers for the signing API

use std::sync::Arc;

use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        rejection::JsonRejection,
        Multipart, Path, State,
    },
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use signinjector_core::{
    burn_signature, decode_signature_payload, fingerprint, parse_signing_request, Placement,
};
use tracing::{debug, info, warn};

use crate::audit::{self, AuditRecord};
use crate::error::ApiError;
use crate::state::AppState;

const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub pdf_id: String,
    pub url: String,
    pub original_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignResponse {
    pub success: bool,
    pub url: String,
    pub audit_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditListResponse {
    pub document_id: String,
    pub audits: Vec<AuditRecord>,
}

/// Handler: GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "signinjector-api",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn read_pdf_field(field: Field<'_>, max_bytes: usize) -> Result<(String, Vec<u8>), ApiError> {
    let original_name = field
        .file_name()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "document.pdf".to_string());

    let content_type = field.content_type().unwrap_or("").to_string();
    if content_type != PDF_CONTENT_TYPE {
        return Err(ApiError::InvalidFileType(format!(
            "Only PDF files are allowed, got '{}'",
            content_type
        )));
    }

    let data = field.bytes().await.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PdfTooLarge { limit: max_bytes }
        } else {
            ApiError::Upload(e.to_string())
        }
    })?;
    if data.len() > max_bytes {
        return Err(ApiError::PdfTooLarge { limit: max_bytes });
    }

    Ok((original_name, data.to_vec()))
}

/// Handler: POST /upload-pdf
///
/// Accepts a multipart form with the document in a `pdf` (or `file`) field.
pub async fn upload_pdf(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        debug!("Upload is not multipart: {}", e);
        ApiError::NoFile
    })?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Upload(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        debug!(field = %name, "Received multipart field");
        if name != "pdf" && name != "file" {
            continue;
        }

        let (original_name, data) = read_pdf_field(field, state.max_pdf_bytes).await?;
        let artifact = state
            .storage
            .write_upload(&original_name, &data)
            .await
            .map_err(|e| ApiError::Upload(e.to_string()))?;

        info!(
            pdf_id = %artifact.file_name,
            bytes = data.len(),
            "Stored uploaded PDF"
        );
        return Ok(Json(UploadResponse {
            success: true,
            pdf_id: artifact.file_name,
            url: artifact.url,
            original_name,
        }));
    }

    warn!("No file field found in multipart upload");
    Err(ApiError::NoFile)
}

/// Handler: POST /sign-pdf
///
/// Validates the request, burns the signature into a copy of the stored
/// document, writes the result and records an audit entry.
pub async fn sign_pdf(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SignResponse>, ApiError> {
    let Json(body) = body.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::BodyTooLarge(e.body_text())
        } else {
            ApiError::InvalidJson(e.body_text())
        }
    })?;

    let request = parse_signing_request(&body)?;
    let signature = decode_signature_payload(&request.signature_image)
        .map_err(|e| ApiError::InvalidSignature(e.to_string()))?;

    let original = state
        .storage
        .read_document(&request.document_id, state.max_pdf_bytes)
        .await?;

    debug!(
        document_id = %request.document_id,
        boxes = request.placements.len(),
        "Signing document"
    );

    // Compositing is CPU bound; keep it off the async workers
    let placements = request.placements.clone();
    let (original_hash, signed, signed_hash) = tokio::task::spawn_blocking(move || {
        let signed = burn_signature(&original, &signature, &placements)?;
        let signed_hash = fingerprint(&signed);
        Ok::<_, ApiError>((fingerprint(&original), signed, signed_hash))
    })
    .await
    .map_err(|e| ApiError::Internal(e.into()))??;

    let artifact = state.storage.write_signed(&signed).await?;

    let record = AuditRecord::new(
        &request.document_id,
        original_hash,
        signed_hash,
        artifact.url.clone(),
        audit_metadata(&request.placements),
    );
    // An output without an audit row must not stay published
    if let Err(e) = audit::insert(&state.db, &record).await {
        if let Err(cleanup) = state.storage.remove(&artifact.file_name).await {
            warn!(
                output = %artifact.file_name,
                "Failed to remove unaudited output: {}",
                cleanup
            );
        }
        return Err(e.into());
    }

    info!(
        document_id = %request.document_id,
        output = %artifact.file_name,
        audit_id = %record.id,
        "Signed PDF"
    );

    Ok(Json(SignResponse {
        success: true,
        url: artifact.url,
        audit_id: record.id,
    }))
}

fn audit_metadata(placements: &[Placement]) -> Value {
    json!({ "coordinates": placements })
}

/// Handler: GET /audits/:document_id
pub async fn list_audits(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
) -> Result<Json<AuditListResponse>, ApiError> {
    let audits = audit::list_for_document(&state.db, &document_id)
        .await
        .map_err(ApiError::AuditLookup)?;

    Ok(Json(AuditListResponse {
        document_id,
        audits,
    }))
}
