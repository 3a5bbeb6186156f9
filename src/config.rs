// ABOUTME: Environment-based configuration for the gateway server
// ABOUTME: One required secret, sensible defaults for everything else
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vaultgate Project

//! Environment-based configuration management.
//!
//! The only configured state the core itself consumes is the signing
//! secret, loaded once at startup. Everything else tunes the ambient
//! shell: bind address, database URL, broker sizing, deadlines.

use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;

/// Strongly typed log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Errors only.
    Error,
    /// Warnings and errors.
    Warn,
    /// Default operational verbosity.
    #[default]
    Info,
    /// Developer diagnostics.
    Debug,
    /// Everything, including per-job worker chatter.
    Trace,
}

impl LogLevel {
    /// Parse from string with fallback to `Info`.
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => Self::Error,
            "warn" => Self::Warn,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => Self::Info,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

/// Complete server configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub http_addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Process-wide token signing secret. Required; there is no insecure
    /// development fallback.
    pub signing_secret: String,
    /// Session token lifetime in hours.
    pub token_ttl_hours: i64,
    /// Broker worker count; also the job queue capacity. Should match the
    /// backing store's tolerable concurrency.
    pub worker_count: usize,
    /// Single deadline in seconds covering both a job's admission into the
    /// queue and the wait for its result, measured from submission.
    pub job_deadline_secs: u64,
    /// Log verbosity, overridable per-module via `RUST_LOG`.
    pub log_level: LogLevel,
}

impl ServerConfig {
    /// Load configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `GATE_SIGNING_SECRET` is unset or any numeric
    /// variable fails to parse.
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("GATE_HTTP_ADDR", "127.0.0.1:8080")
            .parse()
            .context("GATE_HTTP_ADDR is not a valid socket address")?;

        let signing_secret =
            env::var("GATE_SIGNING_SECRET").context("GATE_SIGNING_SECRET must be set")?;
        if signing_secret.is_empty() {
            anyhow::bail!("GATE_SIGNING_SECRET must not be empty");
        }

        Ok(Self {
            http_addr,
            database_url: env_or("GATE_DATABASE_URL", "sqlite:./vaultgate.db"),
            signing_secret,
            token_ttl_hours: parse_env("GATE_TOKEN_TTL_HOURS", 1)?,
            worker_count: parse_env("GATE_WORKER_COUNT", 64)?,
            job_deadline_secs: parse_env("GATE_JOB_DEADLINE_SECS", 10)?,
            log_level: LogLevel::from_str_or_default(&env_or("GATE_LOG_LEVEL", "info")),
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{name} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_parses_with_fallback() {
        assert_eq!(LogLevel::from_str_or_default("WARN"), LogLevel::Warn);
        assert_eq!(LogLevel::from_str_or_default("trace"), LogLevel::Trace);
        assert_eq!(LogLevel::from_str_or_default("loud"), LogLevel::Info);
    }
}
