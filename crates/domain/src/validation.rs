//! Field-level validation shared by every input type.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub(crate) const MISSING: &str = "Missing data for required field.";
pub(crate) const BLANK: &str = "Field may not be blank.";
pub(crate) const NEGATIVE: &str = "Must be greater than or equal to 0.";
pub(crate) const DATE_INVALID: &str = "Not a valid date.";

/// Every field-level problem found in one input, keyed by field name.
///
/// Validation never stops at the first problem: callers get all messages
/// for all fields at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message against a field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if at least one message is recorded for `field`.
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Returns the names of the fields that failed, in alphabetical order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns the messages recorded for a field.
    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns `value` if nothing was recorded, otherwise the errors.
    pub fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }

    /// Requires a non-blank string no longer than `max_len` characters.
    pub(crate) fn required_text(
        &mut self,
        field: &str,
        value: Option<String>,
        max_len: usize,
    ) -> Option<String> {
        match value {
            None => {
                self.missing(field);
                None
            }
            Some(text) if text.trim().is_empty() => {
                self.add(field, BLANK);
                None
            }
            Some(text) => self.optional_text(field, Some(text), max_len),
        }
    }

    /// Checks the length of an optional string.
    pub(crate) fn optional_text(
        &mut self,
        field: &str,
        value: Option<String>,
        max_len: usize,
    ) -> Option<String> {
        let text = value?;
        if text.chars().count() > max_len {
            self.add(field, format!("Longer than maximum length {max_len}."));
            return None;
        }
        Some(text)
    }

    /// Requires a value to be present.
    pub(crate) fn required<T>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.missing(field);
        }
        value
    }

    /// A field that failed to decode is not also reported as missing.
    fn missing(&mut self, field: &str) {
        if !self.contains(field) {
            self.add(field, MISSING);
        }
    }

    /// Parses an optional `YYYY-MM-DD` date.
    pub(crate) fn date(&mut self, field: &str, value: Option<&str>) -> Option<NaiveDate> {
        let raw = value?;
        match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                self.add(field, DATE_INVALID);
                None
            }
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.fields().collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

/// A JSON value type an input field can hold, with the message used when
/// the supplied value has some other type.
pub(crate) trait FieldType: DeserializeOwned {
    const INVALID: &'static str;
}

impl FieldType for String {
    const INVALID: &'static str = "Not a valid string.";
}

impl FieldType for i64 {
    const INVALID: &'static str = "Not a valid integer.";
}

impl FieldType for f64 {
    const INVALID: &'static str = "Not a valid number.";
}

impl FieldType for bool {
    const INVALID: &'static str = "Not a valid boolean.";
}

impl FieldType for Vec<i64> {
    const INVALID: &'static str = "Not a valid list of integers.";
}

/// A request body decoded one field at a time.
///
/// Only a body that is not a JSON object fails to deserialize. A field of
/// the wrong type is recorded and read as absent, so input types can report
/// it next to every other field problem.
pub(crate) struct JsonFields {
    map: Map<String, Value>,
    errors: ValidationErrors,
}

impl JsonFields {
    /// Removes `field` from the body. `null` reads as absent.
    pub(crate) fn take<T: FieldType>(&mut self, field: &str) -> Option<T> {
        self.take_or(field, T::INVALID)
    }

    /// Like [`take`](Self::take) with a custom message for a mistyped value.
    pub(crate) fn take_or<T: DeserializeOwned>(&mut self, field: &str, invalid: &str) -> Option<T> {
        match self.map.remove(field)? {
            Value::Null => None,
            value => match serde_json::from_value(value) {
                Ok(value) => Some(value),
                Err(_) => {
                    self.errors.add(field, invalid);
                    None
                }
            },
        }
    }

    /// Returns the type errors recorded so far.
    pub(crate) fn into_errors(self) -> ValidationErrors {
        self.errors
    }
}

impl<'de> Deserialize<'de> for JsonFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self {
            map: Map::deserialize(deserializer)?,
            errors: ValidationErrors::new(),
        })
    }
}

/// Syntactic email check: one `@`, a non-empty local part, and a dotted
/// domain whose labels are all non-empty.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
}
