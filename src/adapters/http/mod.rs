//! HTTP Adapters - Record API over axum
//!
//! Translates HTTP verbs into `RecordService` calls and shapes
//! request/response payloads.
//!
//! Modules:
//! - `routes`: record collection/item handlers
//! - `payload`: body decoding + field validation
//! - `view`: wire representation of a record
//! - `error`: error → status mapping
//! - `health`: /live and /ready probes
//! - `server`: router assembly and graceful serving

pub mod error;
pub mod health;
pub mod payload;
pub mod routes;
pub mod server;
pub mod view;

pub use error::{ApiError, ApiResult};
pub use server::{HttpServer, build_app};
pub use view::RecordView;
