//! Field-level rules for lead payloads.
//!
//! Both entry points are pure: they never touch the store and they report
//! every failing field, in `LeadField` order, followed by any server-owned
//! field the client tried to set.

mod payload;

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::database::models::{LeadField, LeadPatch, LeadStatus, NewLead};

pub use payload::{CreateLeadPayload, UpdateLeadPayload};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9 ().\-]{7,20}$").expect("valid phone regex"));

const MAX_NAME: usize = 100;
const MAX_EMAIL: usize = 254;
const MAX_COMPANY: usize = 100;
const MAX_SOURCE: usize = 50;
const MAX_NOTES: usize = 2000;
const MIN_PHONE_DIGITS: usize = 7;

/// Which fields must be present for each operation kind.
///
/// `name` and `email` are always required on create; the lists only add to that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRules {
    pub required_on_create: Vec<LeadField>,
    pub required_on_update: Vec<LeadField>,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            required_on_create: vec![LeadField::Name, LeadField::Email],
            required_on_update: Vec::new(),
        }
    }
}

impl ValidationRules {
    pub fn requires_on_create(&self, field: LeadField) -> bool {
        matches!(field, LeadField::Name | LeadField::Email) || self.required_on_create.contains(&field)
    }

    pub fn requires_on_update(&self, field: LeadField) -> bool {
        self.required_on_update.contains(&field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Ordered list of failing fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn fields(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.field.as_str()).collect()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{} {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for FieldErrors {}

enum Clean {
    Text(String),
    Status(LeadStatus),
}

/// Check a create payload. On success every required field is present.
pub fn validate_create(
    payload: &CreateLeadPayload,
    rules: &ValidationRules,
) -> Result<NewLead, FieldErrors> {
    let mut errors = FieldErrors::default();
    let mut clean = BTreeMap::new();

    for (field, raw) in payload.fields() {
        let raw = match text(field, raw, &mut errors) {
            Some(raw) => raw,
            None => continue,
        };
        match raw.map(str::trim).filter(|v| !v.is_empty()) {
            None if rules.requires_on_create(field) => errors.push(field.as_str(), "is required"),
            None => {}
            Some(value) => match check_field(field, value) {
                Ok(value) => {
                    clean.insert(field, value);
                }
                Err(message) => errors.push(field.as_str(), message),
            },
        }
    }

    reject_server_owned(payload.server_owned(), &mut errors);
    if !errors.is_empty() {
        return Err(errors);
    }

    let mut take = |field: LeadField| match clean.remove(&field) {
        Some(Clean::Text(value)) => Some(value),
        _ => None,
    };

    let name = take(LeadField::Name);
    let email = take(LeadField::Email);
    let phone = take(LeadField::Phone);
    let company = take(LeadField::Company);
    let source = take(LeadField::Source);
    let notes = take(LeadField::Notes);
    let status = match clean.remove(&LeadField::Status) {
        Some(Clean::Status(status)) => status,
        _ => LeadStatus::default(),
    };

    match (name, email) {
        (Some(name), Some(email)) => Ok(NewLead {
            name,
            email,
            phone,
            company,
            status,
            source,
            notes,
        }),
        // Unreachable while name and email are unconditionally required above.
        _ => Err(FieldErrors::single("_payload", "name and email are required")),
    }
}

/// Check a partial update. Only present fields are checked; empty optional
/// text fields clear the stored value.
pub fn validate_update(
    payload: &UpdateLeadPayload,
    rules: &ValidationRules,
) -> Result<LeadPatch, FieldErrors> {
    let mut errors = FieldErrors::default();
    let mut patch = LeadPatch::default();

    for (field, raw) in payload.fields() {
        let raw = match text(field, raw, &mut errors) {
            Some(raw) => raw,
            None => continue,
        };
        let value = match raw.map(str::trim) {
            None => {
                if rules.requires_on_update(field) {
                    errors.push(field.as_str(), "is required");
                }
                continue;
            }
            Some("") if is_clearable(field) => None,
            Some("") => {
                errors.push(field.as_str(), "cannot be empty");
                continue;
            }
            Some(value) => match check_field(field, value) {
                Ok(value) => Some(value),
                Err(message) => {
                    errors.push(field.as_str(), message);
                    continue;
                }
            },
        };

        match (field, value) {
            (LeadField::Status, Some(Clean::Status(status))) => patch.status = Some(status),
            (LeadField::Name, Some(Clean::Text(v))) => patch.name = Some(v),
            (LeadField::Email, Some(Clean::Text(v))) => patch.email = Some(v),
            (LeadField::Phone, v) => patch.phone = Some(into_text(v)),
            (LeadField::Company, v) => patch.company = Some(into_text(v)),
            (LeadField::Source, v) => patch.source = Some(into_text(v)),
            (LeadField::Notes, v) => patch.notes = Some(into_text(v)),
            _ => {}
        }
    }

    reject_server_owned(payload.server_owned(), &mut errors);
    if !errors.is_empty() {
        return Err(errors);
    }
    if patch.is_empty() {
        return Err(FieldErrors::single("_payload", "no fields to update"));
    }

    Ok(patch)
}

/// `Some(value)` when the field is absent, null or a string. Any other JSON
/// type is recorded as a field error and yields `None`.
fn text<'a>(
    field: LeadField,
    raw: Option<&'a Value>,
    errors: &mut FieldErrors,
) -> Option<Option<&'a str>> {
    match raw {
        None | Some(Value::Null) => Some(None),
        Some(Value::String(s)) => Some(Some(s.as_str())),
        Some(_) => {
            errors.push(field.as_str(), "must be a string");
            None
        }
    }
}

fn into_text(value: Option<Clean>) -> Option<String> {
    match value {
        Some(Clean::Text(v)) => Some(v),
        _ => None,
    }
}

fn is_clearable(field: LeadField) -> bool {
    matches!(
        field,
        LeadField::Phone | LeadField::Company | LeadField::Source | LeadField::Notes
    )
}

fn reject_server_owned(present: [(&'static str, bool); 4], errors: &mut FieldErrors) {
    for (field, set) in present {
        if set {
            errors.push(field, "cannot be set by the client");
        }
    }
}

/// `value` is already trimmed and non-empty.
fn check_field(field: LeadField, value: &str) -> Result<Clean, String> {
    match field {
        LeadField::Name => bounded(value, MAX_NAME).map(Clean::Text),
        LeadField::Email => check_email(value).map(Clean::Text),
        LeadField::Phone => check_phone(value).map(Clean::Text),
        LeadField::Company => bounded(value, MAX_COMPANY).map(Clean::Text),
        LeadField::Source => bounded(value, MAX_SOURCE).map(Clean::Text),
        LeadField::Notes => bounded(value, MAX_NOTES).map(Clean::Text),
        LeadField::Status => value.parse::<LeadStatus>().map(Clean::Status).map_err(|_| {
            let allowed: Vec<&str> = LeadStatus::ALL.iter().map(|s| s.as_str()).collect();
            format!("must be one of: {}", allowed.join(", "))
        }),
    }
}

fn bounded(value: &str, max: usize) -> Result<String, String> {
    if value.chars().count() > max {
        return Err(format!("must be at most {} characters", max));
    }
    Ok(value.to_string())
}

fn check_email(value: &str) -> Result<String, String> {
    let email = bounded(value, MAX_EMAIL)?.to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err("must be a valid email address".to_string());
    }
    Ok(email)
}

fn check_phone(value: &str) -> Result<String, String> {
    let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
    if !PHONE_RE.is_match(value) || digits < MIN_PHONE_DIGITS {
        return Err("must be a valid phone number".to_string());
    }
    Ok(value.to_string())
}
