//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! infrastructure (SQLite, the filesystem) and exposes the use cases
//! over HTTP.
//!
//! Adapter categories:
//! - `persistence`: SQLite record store
//! - `blobs`: local-filesystem image storage
//! - `http`: axum routes, payload decoding, health probes

pub mod blobs;
pub mod http;
pub mod persistence;
