//! Sync REST API handlers.
//!
//! All routes require a bearer token.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::store::SyncBlob;
use crate::api::{now_iso, short_hash, ApiResponse, BearerToken, RelayError};
use crate::state::RelayState;

/// Longest user hash the relay keeps.
pub const MAX_USER_HASH_CHARS: usize = 64;

// ── Request / Response Types ─────────────────────────────────────────────────

/// POST /api/v1/sync/upload
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub encrypted_data: Option<String>,
    pub user_hash: Option<String>,
}

/// POST /api/v1/sync/download, DELETE /api/v1/user/delete
#[derive(Debug, Deserialize)]
pub struct UserHashRequest {
    pub user_hash: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub sync_id: String,
    pub timestamp: String,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub encrypted_data: Option<String>,
    pub last_sync: Option<String>,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub timestamp: String,
    pub confirmation_code: String,
}

/// Truncate a user hash to [`MAX_USER_HASH_CHARS`] characters.
fn truncate_hash(user_hash: &str) -> String {
    user_hash.chars().take(MAX_USER_HASH_CHARS).collect()
}

/// First `len` hex characters of SHA-256(`input`).
fn digest_prefix(input: &str, len: usize) -> String {
    let mut hex = hex::encode(Sha256::digest(input.as_bytes()));
    hex.truncate(len);
    hex
}

fn require_hash(user_hash: Option<String>) -> Result<String, RelayError> {
    user_hash
        .filter(|h| !h.is_empty())
        .map(|h| truncate_hash(&h))
        .ok_or(RelayError::MissingFields("The 'user_hash' field is required"))
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// Store an encrypted blob for a user.
///
/// POST /api/v1/sync/upload
pub async fn upload(
    State(state): State<RelayState>,
    _auth: BearerToken,
    body: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<UploadResponse>>, RelayError> {
    let Json(req) = body?;

    let (Some(encrypted_data), Some(user_hash)) = (req.encrypted_data, req.user_hash) else {
        return Err(RelayError::MissingFields(
            "Both 'encrypted_data' and 'user_hash' are required",
        ));
    };
    if encrypted_data.is_empty() || user_hash.is_empty() {
        return Err(RelayError::MissingFields(
            "Both 'encrypted_data' and 'user_hash' are required",
        ));
    }

    let limit = state.config.max_blob_bytes;
    if encrypted_data.len() > limit {
        return Err(RelayError::PayloadTooLarge {
            size: encrypted_data.len(),
            limit,
        });
    }

    let user_hash = truncate_hash(&user_hash);
    let timestamp = now_iso();
    let sync_id = digest_prefix(&format!("{}{}", user_hash, timestamp), 32);

    tracing::info!(user = %short_hash(&user_hash), "[Sync] Upload received");

    state
        .blobs
        .put(SyncBlob {
            user_hash,
            encrypted_data,
            sync_id: sync_id.clone(),
            uploaded_at: timestamp.clone(),
        })
        .map_err(|e| RelayError::Storage(e.to_string()))?;

    Ok(ApiResponse::success(
        UploadResponse {
            sync_id,
            timestamp,
            status: "stored",
        },
        "Data synced successfully",
    ))
}

/// Fetch the stored blob for a user.
///
/// POST /api/v1/sync/download
pub async fn download(
    State(state): State<RelayState>,
    _auth: BearerToken,
    body: Result<Json<UserHashRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<DownloadResponse>>, RelayError> {
    let Json(req) = body?;
    let user_hash = require_hash(req.user_hash)?;

    match state.blobs.get(&user_hash) {
        Some(blob) => {
            tracing::info!(user = %short_hash(&user_hash), "[Sync] Download served");
            Ok(ApiResponse::success(
                DownloadResponse {
                    encrypted_data: Some(blob.encrypted_data),
                    last_sync: Some(blob.uploaded_at),
                    status: "found",
                },
                "Sync data found",
            ))
        }
        None => Ok(ApiResponse::success(
            DownloadResponse {
                encrypted_data: None,
                last_sync: None,
                status: "no_data",
            },
            "No sync data found",
        )),
    }
}

/// Delete everything the relay holds for a user.
///
/// DELETE /api/v1/user/delete
pub async fn delete_user(
    State(state): State<RelayState>,
    _auth: BearerToken,
    body: Result<Json<UserHashRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<DeleteResponse>>, RelayError> {
    let Json(req) = body?;
    let user_hash = require_hash(req.user_hash)?;

    let existed = state
        .blobs
        .delete(&user_hash)
        .map_err(|e| RelayError::Storage(e.to_string()))?;

    tracing::info!(
        user = %short_hash(&user_hash),
        existed = existed,
        "[Sync] User data deletion requested"
    );

    let timestamp = now_iso();
    let confirmation_code = digest_prefix(&format!("deleted_{}_{}", user_hash, timestamp), 16);

    Ok(ApiResponse::success(
        DeleteResponse {
            deleted: true,
            timestamp,
            confirmation_code,
        },
        "All your data has been permanently deleted from our servers",
    ))
}
