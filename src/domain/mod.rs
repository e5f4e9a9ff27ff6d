//! Domain layer - Skin record entity and error taxonomy.
//!
//! Inner ring of the hexagonal architecture: plain data types and the
//! rules that need no I/O (memo normalization, patch application).
//! Ports and adapters depend on this module, never the reverse.

pub mod error;
pub mod record;

// Re-export core types for convenience
pub use error::{DUPLICATE_DATE_MESSAGE, FieldErrors, RecordError};
pub use record::{ImageRef, NewRecord, Record, RecordId, RecordPatch, normalize_memo};
