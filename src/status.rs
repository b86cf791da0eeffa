//! Import status payloads returned by `getGroupImportStatus`.
//!
//! Every field is optional on the wire; rendering substitutes `Unknown`
//! where a name is missing instead of failing.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Interpreted value of `data.status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportStatus {
    Importing,
    Completed,
    Failed,
    Unknown(String),
}

impl ImportStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "importing" => Self::Importing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Failure payload: `data.message` plus the per-group details.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct FailureReport {
    #[serde(default, deserialize_with = "lenient_text")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub details: Option<Vec<GroupDetail>>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetail {
    #[serde(default, deserialize_with = "lenient_text")]
    pub group_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub record_details: Option<Vec<RecordDetail>>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecordDetail {
    #[serde(default, deserialize_with = "lenient_text")]
    pub resource_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub resource_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub action: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub message: Option<String>,
}

/// Strings as-is, other scalars via their JSON text; `null`, objects and
/// arrays count as absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    })
}

/// A list whose entries are decoded one by one; entries that are not
/// objects are skipped instead of failing the whole list.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };
    Ok(Some(
        items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
    ))
}

impl FailureReport {
    /// Build the report from a full response document.
    ///
    /// Fields of an unexpected type are dropped one at a time, so a single
    /// odd value never hides the rest of the report.
    pub fn from_response(doc: &Value) -> Self {
        let Some(data) = doc.get("data").filter(|d| d.is_object()) else {
            return Self::default();
        };
        // Every field is lenient, so decoding an object cannot fail.
        serde_json::from_value(data.clone()).unwrap_or_default()
    }

    pub fn groups(&self) -> &[GroupDetail] {
        self.details.as_deref().unwrap_or_default()
    }
}

impl GroupDetail {
    pub fn records(&self) -> &[RecordDetail] {
        self.record_details.as_deref().unwrap_or_default()
    }
}

/// `data.status` as a non-empty string, if present.
pub fn extract_status(doc: &Value) -> Option<&str> {
    doc.pointer("/data/status")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// A scalar id field that the service may send as a string or a number.
pub fn extract_id(doc: &Value, pointer: &str) -> Option<String> {
    match doc.pointer(pointer)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
