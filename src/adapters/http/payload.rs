//! Record Payloads - Request Body Decoding and Validation
//!
//! Accepts `multipart/form-data` (required for image uploads),
//! `application/x-www-form-urlencoded` and `application/json`. Each
//! encoding is first flattened into `(name, RawValue)` pairs, then the
//! pairs are validated against the static `RECORD_FIELDS` table.
//! Read-only and unknown fields are dropped; every field error is
//! collected before the request is rejected.

use std::collections::HashMap;

use axum::Form;
use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use chrono::{Datelike, NaiveDate};
use serde_json::Value;

use super::error::{ApiError, ApiResult};
use crate::domain::{FieldErrors, RecordError};
use crate::ports::Upload;
use crate::usecases::{CreateRecord, ImageChange, UpdateRecord};

/// Key for errors that belong to no single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const BAD_DATE: &str = "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const NOT_A_FILE: &str =
    "The submitted data was not a file. Check the encoding type on the form.";
pub const EMPTY_FILE: &str = "The submitted file is empty.";
pub const NO_FILE_NAME: &str = "No filename could be determined.";

/// How a record field is treated on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Must be present on create and full update.
    pub required: bool,
    /// Server-assigned; ignored when supplied.
    pub read_only: bool,
}

/// Every field of the record representation.
pub const RECORD_FIELDS: &[FieldSpec] = &[
    FieldSpec { name: "id", required: false, read_only: true },
    FieldSpec { name: "image", required: false, read_only: false },
    FieldSpec { name: "memo", required: false, read_only: false },
    FieldSpec { name: "date", required: true, read_only: false },
    FieldSpec { name: "created_at", required: false, read_only: true },
    FieldSpec { name: "updated_at", required: false, read_only: true },
];

fn field_spec(name: &str) -> Option<&'static FieldSpec> {
    RECORD_FIELDS.iter().find(|spec| spec.name == name)
}

/// Whether an update must carry every required field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// `PUT`: required fields as on create.
    Full,
    /// `PATCH`: everything optional.
    Partial,
}

/// A field value before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Null,
    Text(String),
    /// JSON array or object.
    Structured,
    File(Upload),
}

/// Decoded request body, not yet validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPayload {
    fields: Vec<(String, RawValue)>,
}

impl RawPayload {
    pub fn new(fields: Vec<(String, RawValue)>) -> Self {
        Self { fields }
    }

    /// Decode a request body according to its `Content-Type`.
    pub async fn from_request(request: Request) -> ApiResult<Self> {
        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase());

        match content_type.as_deref() {
            Some(ct) if ct.starts_with("multipart/form-data") => {
                let multipart = Multipart::from_request(request, &())
                    .await
                    .map_err(|e| rejected(e.status(), &e.body_text()))?;
                Self::from_multipart(multipart).await
            }
            Some(ct) if ct.starts_with("application/x-www-form-urlencoded") => {
                let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, &())
                    .await
                    .map_err(|e| rejected(e.status(), &e.body_text()))?;
                Ok(Self::new(
                    pairs
                        .into_iter()
                        .map(|(name, value)| (name, RawValue::Text(value)))
                        .collect(),
                ))
            }
            other => {
                let is_json = other.is_some_and(|ct| {
                    ct.starts_with("application/json") || ct.contains("+json")
                });
                let body = Bytes::from_request(request, &())
                    .await
                    .map_err(|e| rejected(e.status(), &e.body_text()))?;

                if body.is_empty() {
                    return Ok(Self::default());
                }
                if !is_json {
                    return Err(invalid(format!(
                        "Unsupported media type \"{}\" in request.",
                        other.unwrap_or("")
                    ))
                    .into());
                }
                Ok(Self::from_json(&body)?)
            }
        }
    }

    /// Decode a JSON object body.
    pub fn from_json(body: &[u8]) -> Result<Self, RecordError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| invalid(format!("JSON parse error - {e}")))?;

        let Value::Object(map) = value else {
            return Err(invalid(format!(
                "Invalid data. Expected a dictionary, but got {}.",
                json_kind(&value)
            )));
        };

        Ok(Self::new(
            map.into_iter()
                .map(|(name, value)| {
                    let raw = match value {
                        Value::Null => RawValue::Null,
                        Value::String(s) => RawValue::Text(s),
                        Value::Bool(_) | Value::Number(_) => RawValue::Text(value.to_string()),
                        Value::Array(_) | Value::Object(_) => RawValue::Structured,
                    };
                    (name, raw)
                })
                .collect(),
        ))
    }

    /// Drain a multipart form. Parts with a file name become uploads.
    pub async fn from_multipart(mut multipart: Multipart) -> ApiResult<Self> {
        let mut fields = Vec::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| rejected(e.status(), &e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            let value = match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| rejected(e.status(), &e.body_text()))?;
                    RawValue::File(Upload {
                        file_name: Some(file_name),
                        content_type,
                        bytes: bytes.to_vec(),
                    })
                }
                None => RawValue::Text(
                    field
                        .text()
                        .await
                        .map_err(|e| rejected(e.status(), &e.body_text()))?,
                ),
            };
            fields.push((name, value));
        }

        Ok(Self::new(fields))
    }

    /// Validate as a create payload.
    pub fn into_create(self) -> Result<CreateRecord, RecordError> {
        let mut errors = FieldErrors::new();
        let mut fields = self.into_writable();
        check_required(&fields, &mut errors);

        let date = fields.remove("date").and_then(|v| parse_date(v, &mut errors));
        let memo = fields.remove("memo").and_then(|v| parse_memo(v, &mut errors));
        let image = fields
            .remove("image")
            .map_or(ImageChange::Keep, |v| parse_image(v, &mut errors));

        errors.into_result()?;
        let Some(date) = date else {
            return Err(RecordError::Validation(FieldErrors::single("date", REQUIRED)));
        };

        Ok(CreateRecord {
            date,
            memo,
            image: match image {
                ImageChange::Replace(upload) => Some(upload),
                ImageChange::Keep | ImageChange::Clear => None,
            },
        })
    }

    /// Validate as an update payload.
    pub fn into_update(self, mode: UpdateMode) -> Result<UpdateRecord, RecordError> {
        let mut errors = FieldErrors::new();
        let mut fields = self.into_writable();
        if mode == UpdateMode::Full {
            check_required(&fields, &mut errors);
        }

        let date = fields.remove("date").and_then(|v| parse_date(v, &mut errors));
        let memo = fields.remove("memo").and_then(|v| parse_memo(v, &mut errors));
        let image = fields
            .remove("image")
            .map_or(ImageChange::Keep, |v| parse_image(v, &mut errors));

        errors.into_result()?;
        Ok(UpdateRecord { date, memo, image })
    }

    /// Known, client-writable fields. A repeated name keeps its last value.
    fn into_writable(self) -> HashMap<&'static str, RawValue> {
        self.fields
            .into_iter()
            .filter_map(|(name, value)| {
                field_spec(&name)
                    .filter(|spec| !spec.read_only)
                    .map(|spec| (spec.name, value))
            })
            .collect()
    }
}

fn check_required(fields: &HashMap<&'static str, RawValue>, errors: &mut FieldErrors) {
    for spec in RECORD_FIELDS.iter().filter(|s| s.required && !s.read_only) {
        if !fields.contains_key(spec.name) {
            errors.add(spec.name, REQUIRED);
        }
    }
}

fn parse_date(value: RawValue, errors: &mut FieldErrors) -> Option<NaiveDate> {
    match value {
        RawValue::Null => {
            errors.add("date", NOT_NULL);
            None
        }
        RawValue::Text(s) if s.trim().is_empty() => {
            errors.add("date", BAD_DATE);
            None
        }
        RawValue::Text(s) => {
            let date = parse_calendar_date(s.trim());
            if date.is_none() {
                errors.add("date", BAD_DATE);
            }
            date
        }
        RawValue::Structured | RawValue::File(_) => {
            errors.add("date", BAD_DATE);
            None
        }
    }
}

/// `YYYY-MM-DD` with a four-digit year in `1..=9999`.
///
/// `%Y` alone also takes signed and five-digit years; those are stored
/// as `+10000-…`/`-0005-…` and break the text ordering of the column.
fn parse_calendar_date(s: &str) -> Option<NaiveDate> {
    let year = s.split('-').next()?;
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    (date.year() >= 1).then_some(date)
}

/// Null and blank memos both become `Some("")` downstream.
fn parse_memo(value: RawValue, errors: &mut FieldErrors) -> Option<String> {
    match value {
        RawValue::Null => Some(String::new()),
        RawValue::Text(s) => Some(s),
        RawValue::Structured | RawValue::File(_) => {
            errors.add("memo", NOT_A_STRING);
            None
        }
    }
}

fn parse_image(value: RawValue, errors: &mut FieldErrors) -> ImageChange {
    match value {
        RawValue::Null => ImageChange::Clear,
        RawValue::Text(s) if s.is_empty() => ImageChange::Clear,
        RawValue::Text(_) | RawValue::Structured => {
            errors.add("image", NOT_A_FILE);
            ImageChange::Keep
        }
        RawValue::File(upload) => {
            let unnamed = upload.file_name.as_deref().is_none_or(str::is_empty);
            match (unnamed, upload.bytes.is_empty()) {
                // An untouched file input.
                (true, true) => ImageChange::Clear,
                (true, false) => {
                    errors.add("image", NO_FILE_NAME);
                    ImageChange::Keep
                }
                (false, true) => {
                    errors.add("image", EMPTY_FILE);
                    ImageChange::Keep
                }
                (false, false) => ImageChange::Replace(upload),
            }
        }
    }
}

fn invalid(message: String) -> RecordError {
    RecordError::Validation(FieldErrors::single(NON_FIELD_ERRORS, message))
}

/// Map an extractor rejection onto the API error taxonomy.
fn rejected(status: StatusCode, text: &str) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        invalid(text.to_string()).into()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
