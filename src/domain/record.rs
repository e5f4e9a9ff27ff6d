//! Skin record domain types.
//!
//! Defines the single persisted entity and the value objects that flow
//! between the HTTP layer, the record service and the store:
//! `NewRecord` for inserts and `RecordPatch` for updates.
//! Pure data, no I/O.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────
// Identifiers and references
// ────────────────────────────────────────────

/// Store-assigned record identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Path of a stored image, relative to the blob area root.
///
/// Always forward-slash separated (`skin_records/<uuid>.png`) so it can
/// be appended to the media base URL as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ────────────────────────────────────────────
// Entity
// ────────────────────────────────────────────

/// A dated skin record: optional photo plus a memo, one per calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Store-assigned, immutable.
    pub id: RecordId,
    /// Stored image, if any.
    pub image: Option<ImageRef>,
    /// Free text, possibly empty.
    pub memo: String,
    /// Unique across all records.
    pub date: NaiveDate,
    /// Set once on insert.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every successful mutation.
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Apply a patch in place and stamp `updated_at`.
    ///
    /// `created_at` and `id` are never touched.
    pub fn apply(&mut self, patch: RecordPatch, now: DateTime<Utc>) {
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(memo) = patch.memo {
            self.memo = memo;
        }
        if let Some(image) = patch.image {
            self.image = image;
        }
        self.updated_at = now;
    }
}

// ────────────────────────────────────────────
// Write models
// ────────────────────────────────────────────

/// Fields supplied by a client when creating a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub date: NaiveDate,
    pub image: Option<ImageRef>,
    pub memo: String,
}

impl NewRecord {
    /// A record with no image and an empty memo.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            image: None,
            memo: String::new(),
        }
    }

    #[must_use]
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = normalize_memo(Some(memo.into()));
        self
    }

    #[must_use]
    pub fn with_image(mut self, image: ImageRef) -> Self {
        self.image = Some(image);
        self
    }
}

/// Partial change to an existing record.
///
/// `None` leaves the field untouched. For `image`, `Some(None)` clears
/// the stored reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub date: Option<NaiveDate>,
    pub memo: Option<String>,
    pub image: Option<Option<ImageRef>>,
}

impl RecordPatch {
    /// True if applying the patch replaces or clears the image.
    pub fn touches_image(&self) -> bool {
        self.image.is_some()
    }
}

/// Memo normalization: absent becomes empty, surrounding whitespace is
/// trimmed so a blank memo is stored as `""`.
pub fn normalize_memo(memo: Option<String>) -> String {
    match memo {
        Some(m) => m.trim().to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Record {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        Record {
            id: RecordId(7),
            image: Some(ImageRef::new("skin_records/a.png")),
            memo: "dry".to_string(),
            date: day(2024, 1, 1),
            created_at: t0,
            updated_at: t0,
        }
    }

    #[test]
    fn test_normalize_memo() {
        assert_eq!(normalize_memo(None), "");
        assert_eq!(normalize_memo(Some("   ".to_string())), "");
        assert_eq!(normalize_memo(Some("  oily  ".to_string())), "oily");
    }

    #[test]
    fn test_new_record_defaults() {
        let new = NewRecord::new(day(2024, 2, 3));
        assert!(new.image.is_none());
        assert!(new.memo.is_empty());

        let new = new.with_memo(" itchy ");
        assert_eq!(new.memo, "itchy");
    }

    #[test]
    fn test_apply_partial_patch_keeps_untouched_fields() {
        let mut record = sample();
        let later = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();

        record.apply(
            RecordPatch {
                memo: Some("better".to_string()),
                ..RecordPatch::default()
            },
            later,
        );

        assert_eq!(record.memo, "better");
        assert_eq!(record.date, day(2024, 1, 1));
        assert_eq!(record.image, Some(ImageRef::new("skin_records/a.png")));
        assert_eq!(record.updated_at, later);
        assert!(record.created_at < record.updated_at);
    }

    #[test]
    fn test_apply_clears_image() {
        let mut record = sample();
        let patch = RecordPatch {
            image: Some(None),
            ..RecordPatch::default()
        };
        assert!(patch.touches_image());
        record.apply(patch, Utc::now());
        assert!(record.image.is_none());
    }

    #[test]
    fn test_date_only_patch_keeps_image() {
        assert!(!RecordPatch::default().touches_image());
        let patch = RecordPatch {
            date: Some(day(2024, 5, 5)),
            ..RecordPatch::default()
        };
        assert!(!patch.touches_image());
    }

    #[test]
    fn test_record_id_parse() {
        assert_eq!("42".parse::<RecordId>().unwrap(), RecordId(42));
        assert!("abc".parse::<RecordId>().is_err());
        assert_eq!(RecordId(5).to_string(), "5");
    }
}
