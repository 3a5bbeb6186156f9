// ABOUTME: Gateway operations composing the token service, job broker, and backing store
// ABOUTME: Each operation is validate-input, validate-token, broker-mediated store work
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vaultgate Project

//! # Gateway Operations
//!
//! The four externally visible operations — authenticate, verify, download,
//! upload — are thin wrappers over the core: each either submits work to
//! the [`JobBroker`] or validates a token through the [`TokenService`],
//! or both. The HTTP layer in [`crate::routes`] calls into this module and
//! does nothing but request parsing and response mapping.

use crate::auth::{SessionClaims, TokenService};
use crate::broker::JobBroker;
use crate::errors::{ApiError, ApiResult};
use crate::models::{ArtifactDownloadResponse, AuthResponse};
use crate::storage::BackingStore;
use chrono::{Duration, Utc};
use std::sync::Arc;

/// How far ahead of token expiry clients are told to re-authenticate,
/// in minutes.
const REFRESH_LEAD_MINUTES: i64 = 30;

/// Composition root for the gateway: broker, token service, and store,
/// all constructed once at startup and dependency-injected.
pub struct Gateway {
    broker: JobBroker,
    tokens: TokenService,
    store: Arc<dyn BackingStore>,
}

impl Gateway {
    /// Assemble the gateway from its explicitly constructed parts.
    #[must_use]
    pub fn new(broker: JobBroker, tokens: TokenService, store: Arc<dyn BackingStore>) -> Self {
        Self {
            broker,
            tokens,
            store,
        }
    }

    /// The backing store this gateway was built over.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn BackingStore> {
        &self.store
    }

    /// Exchange a long-lived authentication key for a session token bound
    /// to the caller's address.
    ///
    /// # Errors
    ///
    /// - Unknown key: user fault (the lookup succeeded, no row matched).
    /// - Expired key: user fault.
    /// - Address not on a non-empty allow-list: security-relevant user
    ///   fault. An empty allow-list admits any address.
    /// - Store failure, broker capacity/timeout, or signing failure,
    ///   each under its own kind.
    pub async fn authenticate(&self, key: &str, caller_addr: &str) -> ApiResult<AuthResponse> {
        let store = Arc::clone(&self.store);
        let lookup_key = key.to_string();
        let record = self
            .broker
            .submit(async move {
                match store.auth_record(&lookup_key).await {
                    Ok(Some(record)) => Ok(record),
                    Ok(None) => Err(ApiError::user_fault("invalid authentication key")),
                    Err(e) => Err(ApiError::database("failed to query auth record", e)),
                }
            })
            .await?;

        let now = Utc::now();
        if record.expiration != 0 && record.expiration <= now.timestamp() {
            return Err(ApiError::user_fault("authentication key expired"));
        }

        if !record.ip_allow_list.is_empty()
            && !record.ip_allow_list.iter().any(|ip| ip == caller_addr)
        {
            return Err(ApiError::user_fault_logged(
                "address not allowed to use this authentication key - this incident has been reported",
            ));
        }

        let token = self.tokens.issue(&record, caller_addr)?;
        Ok(AuthResponse {
            token,
            refresh_at: (now + Duration::minutes(REFRESH_LEAD_MINUTES)).timestamp(),
        })
    }

    /// Validate a session token presented from `caller_addr`.
    ///
    /// # Errors
    ///
    /// See [`TokenService::validate`].
    pub fn verify(&self, token: &str, caller_addr: &str) -> ApiResult<SessionClaims> {
        self.tokens.validate(token, caller_addr)
    }

    /// Fetch the artifact for an `(os, arch)` pair. Requires a valid
    /// session token.
    ///
    /// # Errors
    ///
    /// Token validation failures per [`TokenService::validate`]; a missing
    /// artifact is a security-relevant user fault; store and broker
    /// failures under their own kinds.
    pub async fn download(
        &self,
        token: &str,
        caller_addr: &str,
        os: &str,
        arch: &str,
    ) -> ApiResult<ArtifactDownloadResponse> {
        self.tokens.validate(token, caller_addr)?;

        let store = Arc::clone(&self.store);
        let (os, arch) = (os.to_string(), arch.to_string());
        let data = self
            .broker
            .submit(async move {
                match store.find_artifact(&os, &arch).await {
                    Ok(Some(data)) => Ok(data),
                    Ok(None) => Err(ApiError::user_fault_logged(format!(
                        "could not find artifact for {os}_{arch}"
                    ))),
                    Err(e) => Err(ApiError::database("failed to query artifact", e)),
                }
            })
            .await?;

        Ok(ArtifactDownloadResponse { data })
    }

    /// Publish the artifact for an `(os, arch)` pair. Requires a valid
    /// session token whose claims carry the admin flag; a non-admin
    /// attempt revokes the presenting key.
    ///
    /// # Errors
    ///
    /// Token validation failures per [`TokenService::validate`]; the
    /// privilege-violation failure (after revocation) for non-admin
    /// claims; store and broker failures under their own kinds.
    pub async fn upload(
        &self,
        token: &str,
        caller_addr: &str,
        os: &str,
        arch: &str,
        data: &str,
    ) -> ApiResult<()> {
        let claims = self.tokens.validate(token, caller_addr)?;
        self.tokens.enforce_admin(&claims, self.store.as_ref()).await?;

        let store = Arc::clone(&self.store);
        let (os, arch, data) = (os.to_string(), arch.to_string(), data.to_string());
        self.broker
            .submit(async move {
                store
                    .put_artifact(&os, &arch, &data)
                    .await
                    .map_err(|e| ApiError::database("failed to store artifact", e))
            })
            .await
    }
}
