//! Record Representation - Wire Shape of a Record
//!
//! `{ id, image, memo, date, created_at, updated_at }` with `image`
//! rendered as a URL below the media base URL.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Record;

/// JSON body for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordView {
    pub id: i64,
    /// Image URL, or `null`.
    pub image: Option<String>,
    pub memo: String,
    /// `YYYY-MM-DD`.
    pub date: NaiveDate,
    /// RFC 3339, UTC.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecordView {
    pub fn new(record: &Record, media_base_url: &str) -> Self {
        Self {
            id: record.id.0,
            image: record
                .image
                .as_ref()
                .map(|image| format!("{media_base_url}{image}")),
            memo: record.memo.clone(),
            date: record.date,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ImageRef, RecordId};
    use chrono::TimeZone;

    #[test]
    fn test_wire_shape() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let record = Record {
            id: RecordId(3),
            image: Some(ImageRef::new("skin_records/abc.png")),
            memo: "dry".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            created_at: at,
            updated_at: at,
        };

        let json = serde_json::to_value(RecordView::new(&record, "/media/")).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["image"], "/media/skin_records/abc.png");
        assert_eq!(json["memo"], "dry");
        assert_eq!(json["date"], "2024-01-01");
        assert_eq!(json["created_at"], "2024-01-01T12:00:00Z");
        assert_eq!(json.as_object().unwrap().len(), 6);
    }

    #[test]
    fn test_missing_image_is_null() {
        let now = Utc::now();
        let record = Record {
            id: RecordId(1),
            image: None,
            memo: String::new(),
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(RecordView::new(&record, "/media/")).unwrap();
        assert!(json["image"].is_null());
    }
}
