// ABOUTME: Main library entry point for the Vaultgate artifact gateway
// ABOUTME: Exposes the job broker, token service, and the HTTP gateway built on them
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vaultgate Project

#![deny(unsafe_code)]

//! # Vaultgate
//!
//! A small authenticated resource-access gateway. Clients present a
//! long-lived secret key, receive a short-lived signed session token, and
//! use that token to fetch or publish a binary artifact.
//!
//! The interesting parts live in two modules:
//!
//! - [`broker`]: a bounded concurrent execution broker that protects the
//!   slow backing store from overload. Every store-touching operation is
//!   funneled through a fixed worker pool with explicit admission and
//!   completion deadlines.
//! - [`auth`]: stateless session tokens bound to the caller's network
//!   address, with automatic key revocation when a non-admin attempts a
//!   privileged action.
//!
//! Everything else — the HTTP surface in [`routes`], the SQLite store in
//! [`storage`], configuration and logging — is a thin shell around that
//! core.

/// Session token issuance, validation, and the admin-enforcement hook
pub mod auth;

/// Bounded job broker multiplexing requests onto a fixed worker pool
pub mod broker;

/// Environment-based server configuration
pub mod config;

/// Error kinds and their HTTP status mapping
pub mod errors;

/// Gateway operations composing the token service, broker, and store
pub mod gateway;

/// `tracing` subscriber initialization
pub mod logging;

/// Request, response, and durable record types
pub mod models;

/// HTTP routes for the gateway operations
pub mod routes;

/// Backing store boundary and its SQLite implementation
pub mod storage;
