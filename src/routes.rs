// ABOUTME: Axum HTTP surface for the gateway operations
// ABOUTME: Owns kind-to-status mapping, per-kind logging, and client address extraction
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vaultgate Project

//! # HTTP Routes
//!
//! | Endpoint | Protected | Core operation |
//! |---|---|---|
//! | `POST /auth/login` | no | store lookup via broker, then token issue |
//! | `POST /auth/verify` | token | token validation only |
//! | `POST /artifact/download` | token | validation, then brokered lookup |
//! | `POST /artifact/upload` | token + admin | validation + admin enforcement, then brokered write |
//!
//! The session token travels in the [`HEADER_SESSION_TOKEN`] request
//! header. The client address comes from the [`HEADER_CLIENT_IP`] header
//! set by the fronting proxy; requests without it never reach the core.

use crate::errors::{ApiError, ErrorKind};
use crate::gateway::Gateway;
use crate::models::{
    ArtifactDownloadRequest, ArtifactUploadRequest, AuthRequest, ErrorResponse,
};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::StatusCode;
use std::sync::Arc;

/// Request header carrying the opaque signed session token.
pub const HEADER_SESSION_TOKEN: &str = "x-gate-token";

/// Request header carrying the client address, set by the fronting proxy.
pub const HEADER_CLIENT_IP: &str = "cf-connecting-ip";

/// Build the gateway router.
pub fn router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(login))
        .route("/auth/verify", post(verify))
        .route("/artifact/download", post(download))
        .route("/artifact/upload", post(upload))
        .with_state(gateway)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn login(
    State(gateway): State<Arc<Gateway>>,
    headers: HeaderMap,
    Json(request): Json<AuthRequest>,
) -> Response {
    let addr = match client_addr(&headers) {
        Ok(addr) => addr,
        Err(e) => return reject("/auth/login", "-", &e),
    };

    match gateway.authenticate(&request.key, &addr).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => reject("/auth/login", &addr, &e),
    }
}

async fn verify(State(gateway): State<Arc<Gateway>>, headers: HeaderMap) -> Response {
    let addr = match client_addr(&headers) {
        Ok(addr) => addr,
        Err(e) => return reject("/auth/verify", "-", &e),
    };
    let token = match session_token(&headers) {
        Ok(token) => token,
        Err(e) => return reject("/auth/verify", &addr, &e),
    };

    // Success carries no body; the status code is the whole answer.
    match gateway.verify(&token, &addr) {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => reject("/auth/verify", &addr, &e),
    }
}

async fn download(
    State(gateway): State<Arc<Gateway>>,
    headers: HeaderMap,
    Json(request): Json<ArtifactDownloadRequest>,
) -> Response {
    let addr = match client_addr(&headers) {
        Ok(addr) => addr,
        Err(e) => return reject("/artifact/download", "-", &e),
    };
    let token = match session_token(&headers) {
        Ok(token) => token,
        Err(e) => return reject("/artifact/download", &addr, &e),
    };

    match gateway
        .download(&token, &addr, &request.os, &request.arch)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => reject("/artifact/download", &addr, &e),
    }
}

async fn upload(
    State(gateway): State<Arc<Gateway>>,
    headers: HeaderMap,
    Json(request): Json<ArtifactUploadRequest>,
) -> Response {
    let addr = match client_addr(&headers) {
        Ok(addr) => addr,
        Err(e) => return reject("/artifact/upload", "-", &e),
    };
    let token = match session_token(&headers) {
        Ok(token) => token,
        Err(e) => return reject("/artifact/upload", &addr, &e),
    };

    let ArtifactUploadRequest { os, arch, data } = request;
    match gateway.upload(&token, &addr, &os, &arch, &data).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => reject("/artifact/upload", &addr, &e),
    }
}

/// Extract the client address forwarded by the fronting proxy.
fn client_addr(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(HEADER_CLIENT_IP)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| ApiError::user_fault("client address missing from request"))
}

/// Extract the session token header.
fn session_token(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(HEADER_SESSION_TOKEN)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| ApiError::user_fault(format!("{HEADER_SESSION_TOKEN} missing from header")))
}

/// Map an error to its response, logging per the error's kind. Plain user
/// faults stay silent; security-relevant faults log as warnings; server
/// faults and broker anomalies log as errors.
fn reject(endpoint: &str, addr: &str, err: &ApiError) -> Response {
    if err.should_log() {
        match err.kind() {
            ErrorKind::UserFaultNeedsLog | ErrorKind::PrivilegeViolation => {
                tracing::warn!(endpoint, client = addr, error = %err, "request rejected");
            }
            _ => {
                tracing::error!(endpoint, client = addr, error = %err, "request failed");
            }
        }
    }

    (
        err.status_code(),
        Json(ErrorResponse::new(err.message())),
    )
        .into_response()
}
