// ABOUTME: Durable auth-key record plus the request and response body types
// ABOUTME: Wire shapes are JSON; the auth record mirrors the backing store's row
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vaultgate Project

//! Data model shared across the gateway.

use serde::{Deserialize, Serialize};

/// Durable authorization record owned by the backing store.
///
/// Read-mostly here: provisioning and mutation happen entirely outside the
/// gateway. The only write this system ever issues is the punitive delete
/// on privilege abuse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthKeyRecord {
    /// The authentication key itself; unique, and the lookup identity for
    /// all session issuance.
    pub key: String,
    /// Whether this key may perform administrator actions.
    pub admin: bool,
    /// Unix timestamp after which the key no longer authenticates.
    /// Zero means the key does not expire.
    pub expiration: i64,
    /// Addresses allowed to use this key. An empty list admits any address.
    pub ip_allow_list: Vec<String>,
    /// Name or handle of the key's owner, for operators.
    pub owner: String,
}

/// Body of an authentication request.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthRequest {
    /// The long-lived authentication key.
    pub key: String,
}

/// Body of a successful authentication response.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Signed session token to present on all protected endpoints.
    pub token: String,
    /// Unix timestamp at which the client should re-authenticate, ahead
    /// of the token's actual expiry.
    pub refresh_at: i64,
}

/// Body of an artifact download request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ArtifactDownloadRequest {
    /// Target operating system.
    pub os: String,
    /// Target architecture.
    pub arch: String,
}

/// Body of a successful artifact download response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ArtifactDownloadResponse {
    /// The artifact payload, encoded as the uploader provided it.
    pub data: String,
}

/// Body of an artifact upload request. Admin-only.
#[derive(Debug, Serialize, Deserialize)]
pub struct ArtifactUploadRequest {
    /// Target operating system.
    pub os: String,
    /// Target architecture.
    pub arch: String,
    /// The artifact payload.
    pub data: String,
}

/// Body of any failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable, user-safe description of the failure.
    pub message: String,
}

impl ErrorResponse {
    /// Wrap a message in the standard error body.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
