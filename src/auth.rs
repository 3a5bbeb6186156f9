// ABOUTME: Stateless session token service with address binding and replay detection
// ABOUTME: Issues HS256 JWTs, validates them in a fixed order, and revokes abusive keys
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vaultgate Project

//! # Token Service
//!
//! Converts a long-lived secret key into a short-lived, address-bound,
//! tamper-evident session credential, and validates that credential on
//! every protected call — all without server-side session state. Validity
//! is entirely a function of the signature and the embedded claims.
//!
//! Tokens cannot be individually revoked (there is no session store).
//! Instead, [`TokenService::enforce_admin`] acts on the subject key in the
//! backing store: a non-admin presenting a privileged request loses their
//! key immediately. Tokens already issued for that key remain
//! cryptographically valid until their own expiry; this is an accepted
//! limitation of the stateless design, not a bug.

use crate::errors::{ApiError, ApiResult};
use crate::models::AuthKeyRecord;
use crate::storage::BackingStore;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims embedded in a session token.
///
/// All fields default when absent so that structurally incomplete tokens
/// from older deployments decode cleanly and are rejected by the
/// completeness check rather than a parse error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject authentication key.
    #[serde(default)]
    pub sub: String,
    /// Whether the subject may perform administrator actions.
    #[serde(default)]
    pub admin: bool,
    /// Network address the token is bound to; a presenting address that
    /// differs is a replay.
    #[serde(default)]
    pub addr: String,
    /// Issued-at Unix timestamp.
    #[serde(default)]
    pub iat: i64,
    /// Expiry Unix timestamp.
    #[serde(default)]
    pub exp: i64,
}

impl SessionClaims {
    /// Structural completeness: every required field present and non-zero.
    fn is_complete(&self) -> bool {
        !self.sub.is_empty() && !self.addr.is_empty() && self.exp != 0
    }
}

/// Issues and validates session tokens with a single process-wide secret.
///
/// Pure and stateless: any number of issuances and validations may proceed
/// fully in parallel without locking. Built once at startup and passed to
/// the gateway explicitly — the secret is never ambient global state.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    /// Build a token service from the signing secret and session lifetime.
    #[must_use]
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Issue a signed session token for a successfully looked-up record,
    /// bound to the caller's observed network address.
    ///
    /// # Errors
    ///
    /// Fails only if signing itself fails (e.g. misconfiguration) — a
    /// server fault, never attributable to the caller.
    pub fn issue(&self, record: &AuthKeyRecord, caller_addr: &str) -> ApiResult<String> {
        self.issue_with_expiry(record, caller_addr, Utc::now() + self.ttl)
    }

    /// Issue a token with an explicit expiry instant.
    ///
    /// # Errors
    ///
    /// Same as [`TokenService::issue`].
    pub fn issue_with_expiry(
        &self,
        record: &AuthKeyRecord,
        caller_addr: &str,
        expires_at: DateTime<Utc>,
    ) -> ApiResult<String> {
        let claims = SessionClaims {
            sub: record.key.clone(),
            admin: record.admin,
            addr: caller_addr.to_string(),
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ApiError::server_fault("cannot sign session token", e))
    }

    /// Validate a presented token against the caller's address.
    ///
    /// Checks run in a fixed order: signature, structural completeness,
    /// expiry, address binding. A caller that receives claims back may
    /// trust `admin` and `sub` as having been set by this service at
    /// issuance time and unmodified since.
    ///
    /// # Errors
    ///
    /// - Forged or tampered signature: security-relevant user fault.
    /// - Missing claim fields: ordinary user fault (stale token version).
    /// - Expired: ordinary user fault.
    /// - Address mismatch: security-relevant user fault (replay).
    /// - Anything else the JWT library reports: server fault.
    pub fn validate(&self, token: &str, caller_addr: &str) -> ApiResult<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry and completeness are checked manually below so that each
        // failure maps to its own error kind.
        validation.validate_exp = false;
        validation.validate_aud = false;

        let data = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| Self::classify_decode_error(&e))?;
        let claims = data.claims;

        if !claims.is_complete() {
            return Err(ApiError::user_fault("stale session token version"));
        }

        if claims.exp <= Utc::now().timestamp() {
            return Err(ApiError::user_fault("session token expired"));
        }

        if claims.addr != caller_addr {
            return Err(ApiError::user_fault_logged("session token replay detected"));
        }

        Ok(claims)
    }

    /// Require the admin claim, punishing its absence.
    ///
    /// A non-admin presenting a privileged request is treated as
    /// adversarial, not as a usage error: their authorization record is
    /// deleted from the backing store immediately, with no grace period
    /// and no notification to the owner.
    ///
    /// # Errors
    ///
    /// Returns the distinguished privilege-violation failure after the
    /// revocation has been issued. Admin claims return `Ok(())` with no
    /// side effect.
    pub async fn enforce_admin(
        &self,
        claims: &SessionClaims,
        store: &dyn BackingStore,
    ) -> ApiResult<()> {
        if claims.admin {
            return Ok(());
        }

        tracing::warn!(
            key = %claims.sub,
            addr = %claims.addr,
            "non-admin attempted privileged action, revoking authentication key"
        );
        if let Err(e) = store.delete_auth_record(&claims.sub).await {
            // The violation response wins either way; a failed revocation
            // still needs operator eyes.
            tracing::error!(key = %claims.sub, error = %e, "key revocation failed");
        }

        Err(ApiError::privilege_violation(
            "authentication key revoked due to privilege violation",
        ))
    }

    fn classify_decode_error(e: &jsonwebtoken::errors::Error) -> ApiError {
        match e.kind() {
            JwtErrorKind::InvalidSignature => {
                ApiError::user_fault_logged("invalid session token signature")
            }
            JwtErrorKind::MissingRequiredClaim(_) => {
                ApiError::user_fault("stale session token version")
            }
            JwtErrorKind::InvalidToken
            | JwtErrorKind::Base64(_)
            | JwtErrorKind::Json(_)
            | JwtErrorKind::Utf8(_) => ApiError::user_fault("malformed session token"),
            _ => ApiError::server_fault("unable to validate session token", e.to_string()),
        }
    }
}
