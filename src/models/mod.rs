//! Record kinds and their declared field shapes.
//!
//! Every record kind is a plain serde struct plus a [`FieldSpec`] table listing
//! the same fields in the same order. Serializers check incoming
//! representations against the table before handing them to serde, so a bad
//! payload is reported per field instead of as one opaque parse error.

use std::fmt::Debug;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::error::FieldError;

pub mod master;
pub mod road_report;
pub mod user_history;
pub mod users;

pub use master::Master;
pub use road_report::RoadReport;
pub use user_history::UserHistory;
pub use users::Users;

/// External representation of one record: field name to JSON value, in
/// declaration order.
pub type Representation = Map<String, Value>;

/// Accepted value shape of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text { max_len: usize },
    Integer { min: Option<i64>, max: Option<i64> },
    /// RFC 3339 date-time string, normalized to UTC (`...Z`).
    Timestamp,
}

/// Declaration of one field of a record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub nullable: bool,
    pub allow_blank: bool,
}

impl FieldSpec {
    pub const fn text(name: &'static str, max_len: usize) -> Self {
        Self {
            name,
            kind: FieldKind::Text { max_len },
            required: true,
            nullable: false,
            allow_blank: false,
        }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Integer { min: None, max: None },
            required: true,
            nullable: false,
            allow_blank: false,
        }
    }

    pub const fn timestamp(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Timestamp,
            required: true,
            nullable: false,
            allow_blank: false,
        }
    }

    pub const fn bounded(mut self, min: i64, max: i64) -> Self {
        self.kind = FieldKind::Integer {
            min: Some(min),
            max: Some(max),
        };
        self
    }

    /// Not required, and may be sent as `null`.
    pub const fn optional(mut self) -> Self {
        self.required = false;
        self.nullable = true;
        self
    }

    /// Not required; serde fills the default when absent. Never `null`.
    pub const fn defaulted(mut self) -> Self {
        self.required = false;
        self
    }

    pub const fn blank(mut self) -> Self {
        self.allow_blank = true;
        self
    }

    /// Check one present, non-null value. Returns the value to hand to serde
    /// (integral strings are coerced to numbers, timestamps are rewritten in
    /// the canonical UTC form the record serializes to, text is kept verbatim).
    pub fn check(&self, value: &Value) -> Result<Value, String> {
        match self.kind {
            FieldKind::Text { max_len } => {
                let s = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return Err("Not a valid string.".into()),
                };
                if !self.allow_blank && s.trim().is_empty() {
                    return Err(crate::error::NOT_BLANK.into());
                }
                if s.chars().count() > max_len {
                    return Err(format!(
                        "Ensure this field has no more than {} characters.",
                        max_len
                    ));
                }
                Ok(Value::String(s))
            }
            FieldKind::Integer { min, max } => {
                let n = match value {
                    Value::Number(n) => n.as_i64(),
                    Value::String(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                }
                .ok_or_else(|| "A valid integer is required.".to_string())?;
                if let Some(min) = min {
                    if n < min {
                        return Err(format!(
                            "Ensure this value is greater than or equal to {}.",
                            min
                        ));
                    }
                }
                if let Some(max) = max {
                    if n > max {
                        return Err(format!(
                            "Ensure this value is less than or equal to {}.",
                            max
                        ));
                    }
                }
                Ok(Value::Number(Number::from(n)))
            }
            FieldKind::Timestamp => match value {
                Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
                    .map(|dt| Value::String(canonical_timestamp(&dt.with_timezone(&Utc))))
                    .map_err(|_| "Datetime has wrong format. Use RFC 3339.".to_string()),
                _ => Err("Datetime has wrong format. Use RFC 3339.".into()),
            },
        }
    }
}

/// The form a `DateTime<Utc>` field takes in a representation: `Z` suffix,
/// sub-second digits only when non-zero, in groups of three.
pub fn canonical_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// A persisted record kind.
pub trait Record: Serialize + DeserializeOwned + Clone + Debug {
    /// Stable kind name, also the store's table (file) name.
    const KIND: &'static str;

    /// Name of the field holding the record's key.
    const KEY_FIELD: &'static str;

    /// Whether the store assigns the key on insert.
    const AUTO_KEY: bool = false;

    /// Declared fields, in representation order.
    const FIELDS: &'static [FieldSpec];

    fn key(&self) -> Option<String>;

    /// Called by stores for `AUTO_KEY` kinds with the next free key.
    fn assign_key(&mut self, _next: u64) {}

    /// Cross-field and domain checks run after the shape is known to be valid.
    fn clean(&self) -> Vec<FieldError> {
        Vec::new()
    }
}

/// Check `data` against `fields`, returning the cleaned map of declared fields.
///
/// With `partial`, missing required fields are not reported. Undeclared keys
/// are dropped.
pub fn check_shape(
    fields: &[FieldSpec],
    data: &Representation,
    partial: bool,
) -> Result<Representation, Vec<FieldError>> {
    let mut cleaned = Representation::new();
    let mut errors = Vec::new();

    for spec in fields {
        match data.get(spec.name) {
            None => {
                if spec.required && !partial {
                    errors.push(FieldError::new(spec.name, crate::error::REQUIRED));
                }
            }
            Some(Value::Null) => {
                if spec.nullable {
                    cleaned.insert(spec.name.to_string(), Value::Null);
                } else {
                    errors.push(FieldError::new(spec.name, crate::error::NOT_NULL));
                }
            }
            Some(v) => match spec.check(v) {
                Ok(v) => {
                    cleaned.insert(spec.name.to_string(), v);
                }
                Err(reason) => errors.push(FieldError::new(spec.name, reason)),
            },
        }
    }

    for key in data.keys() {
        if !fields.iter().any(|f| f.name == key) {
            tracing::debug!(field = %key, "Ignoring undeclared field");
        }
    }

    if errors.is_empty() {
        Ok(cleaned)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FIELDS: &[FieldSpec] = &[
        FieldSpec::text("name", 5),
        FieldSpec::integer("age").bounded(1, 120).optional(),
        FieldSpec::timestamp("at").optional(),
    ];

    fn rep(v: Value) -> Representation {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn missing_required_field_is_reported() {
        let errs = check_shape(FIELDS, &rep(json!({})), false).unwrap_err();
        assert_eq!(errs, vec![FieldError::new("name", crate::error::REQUIRED)]);
    }

    #[test]
    fn partial_skips_missing_required() {
        let cleaned = check_shape(FIELDS, &rep(json!({"age": 3})), true).unwrap();
        assert_eq!(cleaned.get("age"), Some(&json!(3)));
        assert!(cleaned.get("name").is_none());
    }

    #[test]
    fn text_limits_and_blank() {
        let errs = check_shape(FIELDS, &rep(json!({"name": "toolong"})), false).unwrap_err();
        assert!(errs[0].reason.contains("no more than 5"));
        let errs = check_shape(FIELDS, &rep(json!({"name": "  "})), false).unwrap_err();
        assert_eq!(errs[0].reason, crate::error::NOT_BLANK);
    }

    #[test]
    fn integer_strings_are_coerced_and_bounded() {
        let cleaned = check_shape(FIELDS, &rep(json!({"name": "a", "age": "42"})), false).unwrap();
        assert_eq!(cleaned["age"], json!(42));
        let errs = check_shape(FIELDS, &rep(json!({"name": "a", "age": 0})), false).unwrap_err();
        assert_eq!(errs[0].field, "age");
    }

    #[test]
    fn bad_timestamp_is_rejected() {
        let errs =
            check_shape(FIELDS, &rep(json!({"name": "a", "at": "yesterday"})), false).unwrap_err();
        assert_eq!(errs[0].field, "at");
    }

    #[test]
    fn timestamps_are_normalized_to_utc() {
        let spec = FieldSpec::timestamp("at");
        assert_eq!(
            spec.check(&json!("2024-05-01T18:30:00+09:00")).unwrap(),
            json!("2024-05-01T09:30:00Z")
        );
        assert_eq!(
            spec.check(&json!("2024-05-01T09:30:00+00:00")).unwrap(),
            json!("2024-05-01T09:30:00Z")
        );
        assert_eq!(
            spec.check(&json!("2024-05-01T09:30:00.5Z")).unwrap(),
            json!("2024-05-01T09:30:00.500Z")
        );
    }

    #[test]
    fn null_only_for_nullable_fields() {
        let errs = check_shape(FIELDS, &rep(json!({"name": null})), false).unwrap_err();
        assert_eq!(errs[0].reason, crate::error::NOT_NULL);
        let cleaned = check_shape(FIELDS, &rep(json!({"name": "a", "age": null})), false).unwrap();
        assert_eq!(cleaned["age"], Value::Null);
    }

    #[test]
    fn undeclared_keys_are_dropped() {
        let cleaned = check_shape(FIELDS, &rep(json!({"name": "a", "extra": 1})), false).unwrap();
        assert!(cleaned.get("extra").is_none());
    }
}
