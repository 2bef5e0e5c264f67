//! Schema layer for hookq wire records.
//!
//! Every record implements [`Schema`]: it parses an untyped
//! [`serde_json::Value`] into the typed shape, walking the whole input and
//! recording one [`SchemaIssue`] per violated field. A failed parse therefore
//! reports everything that is wrong with a payload, not just the first field.
//!
//! Rules shared by all records:
//!
//! - message identifiers are `msg_` followed by a 26-character ULID whose
//!   first character is in `[0-7]` and whose remaining characters are upper
//!   case Crockford base32 (no `I`, `L`, `O`, `U`);
//! - timestamps are strict ISO-8601 in UTC, `YYYY-MM-DDTHH:MM:SS[.fff]Z`;
//!   numeric epoch values are rejected, not converted;
//! - enums are closed sets, unknown spellings are rejected;
//! - optional fields may be absent but not `null`, unless the field is a
//!   [`Nullable`] (see `TimelineEvent::details`).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::models::MessageId;

/// Literal prefix of every message identifier.
pub const MESSAGE_ID_PREFIX: &str = "msg_";

/// ULID payload: timestamp-bounded first character, then 25 Crockford symbols.
const ULID_PATTERN: &str = "[0-7][0-9A-HJKMNP-TV-Z]{25}";

const TIMESTAMP_PATTERN: &str =
    r"^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}(?:\.[0-9]+)?Z$";

#[allow(clippy::expect_used)]
static MESSAGE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!("^{}{ULID_PATTERN}$", regex::escape(MESSAGE_ID_PREFIX));
    Regex::new(&pattern).expect("message id regex")
});

#[allow(clippy::expect_used)]
static TIMESTAMP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(TIMESTAMP_PATTERN).expect("timestamp regex"));

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// A single violated rule: where it happened and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    /// Dotted field path, e.g. `lastError.createdAt` or `events[2].type`.
    /// Empty for the document root.
    pub path: String,
    pub reason: String,
}

impl SchemaIssue {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "<root>: {}", self.reason)
        } else {
            write!(f, "{}: {}", self.path, self.reason)
        }
    }
}

/// Aggregated validation failure. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("schema validation failed: {}", summarize(.issues))]
pub struct SchemaError {
    issues: Vec<SchemaIssue>,
}

impl SchemaError {
    pub(crate) fn from_issues(issues: Vec<SchemaIssue>) -> Self {
        debug_assert!(!issues.is_empty());
        Self { issues }
    }

    pub(crate) fn single(path: &str, reason: impl Into<String>) -> Self {
        Self {
            issues: vec![SchemaIssue::new(path, reason)],
        }
    }

    /// Every violated rule, in document order.
    #[must_use]
    pub fn issues(&self) -> &[SchemaIssue] {
        &self.issues
    }

    #[must_use]
    pub fn into_issues(self) -> Vec<SchemaIssue> {
        self.issues
    }

    /// True when some issue is reported for exactly `path`.
    #[must_use]
    pub fn has_issue_at(&self, path: &str) -> bool {
        self.issues.iter().any(|i| i.path == path)
    }
}

fn summarize(issues: &[SchemaIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ---------------------------------------------------------------------------
// Schema trait
// ---------------------------------------------------------------------------

/// A wire shape that can be parsed out of untyped JSON.
pub trait Schema: Sized {
    /// Parses `value` located at `path`, pushing every violation into
    /// `issues`. Returns `None` only after recording at least one issue.
    fn parse_at(value: &Value, path: &str, issues: &mut Vec<SchemaIssue>) -> Option<Self>;

    /// Validates `value` against this shape.
    ///
    /// # Errors
    /// Returns a [`SchemaError`] listing every violated field.
    fn validate(value: &Value) -> Result<Self, SchemaError> {
        let mut issues = Vec::new();
        let parsed = Self::parse_at(value, "", &mut issues);
        match parsed {
            Some(record) if issues.is_empty() => Ok(record),
            _ if issues.is_empty() => Err(SchemaError::single("", "value does not match schema")),
            _ => Err(SchemaError::from_issues(issues)),
        }
    }
}

/// Unconstrained JSON. Validation is the identity.
impl Schema for Value {
    fn parse_at(value: &Value, _path: &str, _issues: &mut Vec<SchemaIssue>) -> Option<Self> {
        Some(value.clone())
    }
}

/// Closed string enums exchanged on the wire.
pub trait WireEnum: Copy + 'static {
    const ALL: &'static [Self];

    fn as_str(self) -> &'static str;

    #[must_use]
    fn from_wire(raw: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == raw)
    }
}

/// Implements `TryFrom<Value>` through the record's schema, so serde can
/// deserialize validated records with `#[serde(try_from = "Value")]`.
macro_rules! schema_try_from {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl TryFrom<serde_json::Value> for $ty {
                type Error = $crate::schema::SchemaError;

                fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
                    <$ty as $crate::schema::Schema>::validate(&value)
                }
            }
        )+
    };
}
pub(crate) use schema_try_from;

// ---------------------------------------------------------------------------
// Public scalar validators
// ---------------------------------------------------------------------------

/// True when `raw` is a well-formed message identifier.
#[must_use]
pub fn is_valid_message_id(raw: &str) -> bool {
    MESSAGE_ID_RE.is_match(raw)
}

/// Parses a strict UTC ISO-8601 timestamp.
///
/// # Errors
/// Returns a [`SchemaError`] when `raw` is not `YYYY-MM-DDTHH:MM:SS[.fff]Z`
/// or names an impossible date or time.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, SchemaError> {
    timestamp_str(raw)
        .map_err(|reason| SchemaError::single("", reason))
}

/// Formats a timestamp the way the service emits it.
#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// A field that distinguishes an explicit `null` from absence.
///
/// Serializes `Present` as its value and `Null` as `null`; an `Absent` field
/// should be skipped with `skip_serializing_if = "Nullable::is_absent"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Nullable<T> {
    #[default]
    Absent,
    Null,
    Present(T),
}

impl<T> Nullable<T> {
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The value, when one was sent.
    #[must_use]
    pub fn as_present(&self) -> Option<&T> {
        match self {
            Self::Present(value) => Some(value),
            Self::Absent | Self::Null => None,
        }
    }
}

impl<T: Serialize> Serialize for Nullable<T> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Present(value) => value.serialize(s),
            Self::Absent | Self::Null => s.serialize_none(),
        }
    }
}

// ---------------------------------------------------------------------------
// Field readers
// ---------------------------------------------------------------------------

pub(crate) type FieldResult<T> = Result<T, String>;

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_owned()
    } else {
        format!("{base}.{name}")
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Field-by-field reader over one JSON object.
pub(crate) struct Fields<'v, 'i> {
    map: &'v Map<String, Value>,
    base: String,
    issues: &'i mut Vec<SchemaIssue>,
}

impl<'v, 'i> Fields<'v, 'i> {
    pub(crate) fn open(
        value: &'v Value,
        path: &str,
        issues: &'i mut Vec<SchemaIssue>,
    ) -> Option<Self> {
        if let Value::Object(map) = value {
            Some(Self {
                map,
                base: path.to_owned(),
                issues,
            })
        } else {
            issues.push(SchemaIssue::new(
                path,
                format!("expected object, received {}", json_kind(value)),
            ));
            None
        }
    }

    fn push(&mut self, name: &str, reason: impl Into<String>) {
        let path = join_path(&self.base, name);
        self.issues.push(SchemaIssue::new(path, reason));
    }

    fn apply<T>(
        &mut self,
        name: &str,
        value: &Value,
        parse: impl FnOnce(&Value) -> FieldResult<T>,
    ) -> Option<T> {
        match parse(value) {
            Ok(v) => Some(v),
            Err(reason) => {
                self.push(name, reason);
                None
            }
        }
    }

    pub(crate) fn required<T>(
        &mut self,
        name: &str,
        parse: impl FnOnce(&Value) -> FieldResult<T>,
    ) -> Option<T> {
        if let Some(value) = self.map.get(name) {
            self.apply(name, value, parse)
        } else {
            self.push(name, "required field is missing");
            None
        }
    }

    /// Absent is fine; `null` goes through `parse` and is rejected there.
    pub(crate) fn optional<T>(
        &mut self,
        name: &str,
        parse: impl FnOnce(&Value) -> FieldResult<T>,
    ) -> Option<T> {
        let value = self.map.get(name)?;
        self.apply(name, value, parse)
    }

    /// Keeps `null` distinct from absence. `None` only when a present value
    /// fails `parse`.
    pub(crate) fn nullable<T>(
        &mut self,
        name: &str,
        parse: impl FnOnce(&Value) -> FieldResult<T>,
    ) -> Option<Nullable<T>> {
        match self.map.get(name) {
            None => Some(Nullable::Absent),
            Some(Value::Null) => Some(Nullable::Null),
            Some(value) => self.apply(name, value, parse).map(Nullable::Present),
        }
    }

    pub(crate) fn optional_record<T: Schema>(&mut self, name: &str) -> Option<T> {
        let value = self.map.get(name)?;
        T::parse_at(value, &join_path(&self.base, name), self.issues)
    }

    pub(crate) fn required_list<T: Schema>(&mut self, name: &str) -> Option<Vec<T>> {
        let Some(value) = self.map.get(name) else {
            self.push(name, "required field is missing");
            return None;
        };
        let Value::Array(items) = value else {
            self.push(
                name,
                format!("expected array, received {}", json_kind(value)),
            );
            return None;
        };

        let base = join_path(&self.base, name);
        let mut out = Vec::with_capacity(items.len());
        let mut complete = true;
        for (idx, item) in items.iter().enumerate() {
            match T::parse_at(item, &format!("{base}[{idx}]"), self.issues) {
                Some(parsed) => out.push(parsed),
                None => complete = false,
            }
        }
        complete.then_some(out)
    }

    pub(crate) fn optional_record_map<T: Schema>(
        &mut self,
        name: &str,
    ) -> Option<BTreeMap<String, T>> {
        let value = self.map.get(name)?;
        let Value::Object(entries) = value else {
            self.push(
                name,
                format!("expected object, received {}", json_kind(value)),
            );
            return None;
        };

        let base = join_path(&self.base, name);
        let mut out = BTreeMap::new();
        let mut complete = true;
        for (key, item) in entries {
            match T::parse_at(item, &join_path(&base, key), self.issues) {
                Some(parsed) => {
                    out.insert(key.clone(), parsed);
                }
                None => complete = false,
            }
        }
        complete.then_some(out)
    }
}

// ---------------------------------------------------------------------------
// Field parsers
// ---------------------------------------------------------------------------

pub(crate) fn string(value: &Value) -> FieldResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(format!("expected string, received {}", json_kind(other))),
    }
}

pub(crate) fn non_empty_string(value: &Value) -> FieldResult<String> {
    let s = string(value)?;
    if s.is_empty() {
        return Err("must not be empty".to_owned());
    }
    Ok(s)
}

pub(crate) fn message_id(value: &Value) -> FieldResult<MessageId> {
    let s = string(value)?;
    if is_valid_message_id(&s) {
        Ok(MessageId::new_unchecked(s))
    } else {
        Err(format!(
            "invalid message id `{s}`: expected `{MESSAGE_ID_PREFIX}` followed by a 26-character ULID"
        ))
    }
}

fn timestamp_str(raw: &str) -> FieldResult<DateTime<Utc>> {
    if !TIMESTAMP_RE.is_match(raw) {
        return Err(format!(
            "invalid timestamp `{raw}`: expected ISO-8601 `YYYY-MM-DDTHH:MM:SS[.fff]Z`"
        ));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp `{raw}`: {e}"))
}

pub(crate) fn timestamp(value: &Value) -> FieldResult<DateTime<Utc>> {
    match value {
        Value::String(s) => timestamp_str(s),
        Value::Number(n) => Err(format!(
            "expected ISO-8601 timestamp string, received number {n} (epoch timestamps are not accepted)"
        )),
        other => Err(format!(
            "expected ISO-8601 timestamp string, received {}",
            json_kind(other)
        )),
    }
}

pub(crate) fn absolute_url(value: &Value) -> FieldResult<String> {
    let s = string(value)?;
    url::Url::parse(&s)
        .map(|_| s.clone())
        .map_err(|e| format!("invalid absolute URL `{s}`: {e}"))
}

pub(crate) fn object(value: &Value) -> FieldResult<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map.clone()),
        other => Err(format!("expected object, received {}", json_kind(other))),
    }
}

pub(crate) fn string_map(value: &Value) -> FieldResult<BTreeMap<String, String>> {
    let Value::Object(map) = value else {
        return Err(format!("expected object, received {}", json_kind(value)));
    };
    map.iter()
        .map(|(key, v)| match v {
            Value::String(s) => Ok((key.clone(), s.clone())),
            other => Err(format!(
                "entry `{key}` must be a string, received {}",
                json_kind(other)
            )),
        })
        .collect()
}

pub(crate) fn unsigned<T: TryFrom<u64>>(value: &Value) -> FieldResult<T> {
    let Some(n) = value.as_u64() else {
        return Err(format!(
            "expected non-negative integer, received {}",
            if value.is_number() {
                value.to_string()
            } else {
                json_kind(value).to_owned()
            }
        ));
    };
    T::try_from(n).map_err(|_| format!("integer {n} is out of range"))
}

pub(crate) fn non_negative_number(value: &Value) -> FieldResult<f64> {
    match value.as_f64() {
        Some(n) if n >= 0.0 => Ok(n),
        Some(n) => Err(format!("expected non-negative number, received {n}")),
        None => Err(format!("expected number, received {}", json_kind(value))),
    }
}

pub(crate) fn enumeration<E: WireEnum>(value: &Value) -> FieldResult<E> {
    let s = string(value)?;
    E::from_wire(&s).ok_or_else(|| {
        let expected = E::ALL
            .iter()
            .map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!("unknown value `{s}`, expected one of: {expected}")
    })
}

// ---------------------------------------------------------------------------
// Serialization helpers
// ---------------------------------------------------------------------------

pub(crate) mod wire_time {
    use super::{DateTime, Serializer, Utc, format_timestamp};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_timestamp(ts))
    }

    #[allow(clippy::ref_option)]
    pub fn serialize_opt<S: Serializer>(
        ts: &Option<DateTime<Utc>>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => s.serialize_str(&format_timestamp(ts)),
            None => s.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VALID_ID: &str = "msg_01HZX3K9Q8M7N6P5R4S3T2V1W0";

    #[test]
    fn accepts_well_formed_message_id() {
        assert_eq!(VALID_ID.len(), MESSAGE_ID_PREFIX.len() + 26);
        assert!(is_valid_message_id(VALID_ID));
        assert!(is_valid_message_id("msg_7ZZZZZZZZZZZZZZZZZZZZZZZZZ"));
    }

    #[test]
    fn rejects_single_character_deviations() {
        // wrong prefix
        assert!(!is_valid_message_id("msh_01HZX3K9Q8M7N6P5R4S3T2V1W0"));
        assert!(!is_valid_message_id("01HZX3K9Q8M7N6P5R4S3T2V1W0"));
        // first ULID char outside [0-7]
        assert!(!is_valid_message_id("msg_81HZX3K9Q8M7N6P5R4S3T2V1W0"));
        // excluded alphabet letters
        for bad in ['I', 'L', 'O', 'U'] {
            let id = format!("msg_01HZX3K9Q8M7N6P5R4S3T2V1W{bad}");
            assert!(!is_valid_message_id(&id), "{id} should be rejected");
        }
        // lowercase
        assert!(!is_valid_message_id("msg_01hzx3k9q8m7n6p5r4s3t2v1w0"));
        // length
        assert!(!is_valid_message_id("msg_01HZX3K9Q8M7N6P5R4S3T2V1W"));
        assert!(!is_valid_message_id("msg_01HZX3K9Q8M7N6P5R4S3T2V1W00"));
    }

    #[test]
    fn timestamp_accepts_utc_with_and_without_fraction() {
        assert!(parse_timestamp("2024-01-15T10:30:00Z").is_ok());
        assert!(parse_timestamp("2024-01-15T10:30:00.123Z").is_ok());
    }

    #[test]
    fn timestamp_rejects_loose_formats() {
        for raw in [
            "1705314600",
            "1705314600000",
            "2024-01-15",
            "2024-01-15 10:30:00Z",
            "2024-01-15T10:30:00",
            "2024-01-15T10:30:00+00:00",
            "2024-01-15T10:30:00.Z",
            "15/01/2024 10:30",
            "2024-02-30T10:30:00Z",
        ] {
            assert!(parse_timestamp(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn numeric_epoch_field_is_rejected_with_reason() {
        let err = timestamp(&json!(1_705_314_600)).unwrap_err();
        assert!(err.contains("epoch"), "{err}");
    }

    #[test]
    fn format_timestamp_round_trips() {
        let ts = parse_timestamp("2024-01-15T10:30:00.123Z").unwrap();
        assert_eq!(format_timestamp(&ts), "2024-01-15T10:30:00.123Z");
        let ts = parse_timestamp("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(format_timestamp(&ts), "2024-01-15T10:30:00Z");
    }

    #[test]
    fn unsigned_rejects_negative_and_fractional() {
        assert_eq!(unsigned::<u32>(&json!(3)).unwrap(), 3);
        assert!(unsigned::<u32>(&json!(-1)).is_err());
        assert!(unsigned::<u32>(&json!(1.5)).is_err());
        assert!(unsigned::<u32>(&json!("3")).is_err());
        assert!(unsigned::<u16>(&json!(70_000)).is_err());
    }

    #[test]
    fn string_map_requires_string_values() {
        assert!(string_map(&json!({"X-A": "1"})).is_ok());
        assert!(string_map(&json!({"X-A": 1})).is_err());
        assert!(string_map(&json!(["X-A"])).is_err());
    }

    #[test]
    fn nullable_reader_keeps_null_apart_from_absence() {
        let value = json!({"a": null, "b": {"k": 1}, "c": 3});
        let mut issues = Vec::new();
        let mut f = Fields::open(&value, "", &mut issues).unwrap();

        assert_eq!(f.nullable("a", object), Some(Nullable::Null));
        let Some(Nullable::Present(map)) = f.nullable("b", object) else {
            panic!("expected a present value");
        };
        assert_eq!(map["k"], 1);
        assert_eq!(f.nullable("missing", object), Some(Nullable::Absent));
        assert_eq!(f.nullable("c", object), None);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "c");
    }

    #[test]
    fn nullable_serializes_null_and_value() {
        let null: Nullable<u32> = Nullable::Null;
        assert_eq!(serde_json::to_value(&null).unwrap(), Value::Null);
        let present = serde_json::to_value(Nullable::Present(7)).unwrap();
        assert_eq!(present, json!(7));
        assert!(Nullable::<u32>::default().is_absent());
        assert_eq!(Nullable::Present(7).as_present(), Some(&7));
        assert!(null.is_null());
    }

    #[test]
    fn issue_display_includes_path() {
        let issue = SchemaIssue::new("lastError.createdAt", "bad");
        assert_eq!(issue.to_string(), "lastError.createdAt: bad");
        assert_eq!(SchemaIssue::new("", "bad").to_string(), "<root>: bad");
    }
}
