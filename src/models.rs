use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{RemoteError, Result};

/// Uniform result shape every wrapper returns. Callers never need to know
/// whether the payload arrived on the first attempt or after retries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Success {
        success: bool,
        status: u16,
        payload: T,
    },
    Failure {
        success: bool,
        status: u16,
        message: String,
    },
}

impl<T> Envelope<T> {
    pub fn success(payload: T) -> Self {
        Self::Success {
            success: true,
            status: 200,
            payload,
        }
    }

    /// Build the terminal failure shape from the last remote error.
    /// A malformed error (no status, empty message) collapses to a generic 500.
    pub fn failure(error: &RemoteError) -> Self {
        let status = if error.status == 0 { 500 } else { error.status };
        let message = if error.message.is_empty() {
            "Remote call failed".to_string()
        } else {
            error.message.clone()
        };
        Self::Failure {
            success: false,
            status,
            message,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn status(&self) -> u16 {
        match self {
            Self::Success { status, .. } | Self::Failure { status, .. } => *status,
        }
    }

    pub fn payload(&self) -> Option<&T> {
        match self {
            Self::Success { payload, .. } => Some(payload),
            Self::Failure { .. } => None,
        }
    }

    pub fn into_payload(self) -> Option<T> {
        match self {
            Self::Success { payload, .. } => Some(payload),
            Self::Failure { .. } => None,
        }
    }

    /// Transform the success payload, leaving failures untouched
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        match self {
            Self::Success {
                success,
                status,
                payload,
            } => Envelope::Success {
                success,
                status,
                payload: f(payload),
            },
            Self::Failure {
                success,
                status,
                message,
            } => Envelope::Failure {
                success,
                status,
                message,
            },
        }
    }
}

/// Structured worker attributes. The platform stores these as a JSON-encoded
/// string field, so this type is the serialize/deserialize boundary for that
/// blob: decoded on every read, re-encoded on every write.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(pub serde_json::Map<String, Value>);

impl Attributes {
    pub fn from_encoded(raw: &str) -> Result<Self> {
        // the platform hands back an empty blob for never-updated workers
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let map = serde_json::from_str(raw)?;
        Ok(Self(map))
    }

    pub fn to_encoded(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }
}

impl From<serde_json::Map<String, Value>> for Attributes {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        Self(map)
    }
}

fn deserialize_encoded_attributes<'de, D>(deserializer: D) -> std::result::Result<Attributes, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Attributes::from_encoded(&raw).map_err(serde::de::Error::custom)
}

fn serialize_encoded_attributes<S>(
    attributes: &Attributes,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&attributes.to_encoded())
}

/// A Sync document as returned by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncDocument {
    pub sid: String,
    #[serde(default)]
    pub unique_name: Option<String>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_expires: Option<DateTime<Utc>>,
}

/// A TaskRouter task queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskQueue {
    pub sid: String,
    pub friendly_name: String,
    #[serde(default)]
    pub target_workers: Option<String>,
    #[serde(default)]
    pub max_reserved_workers: Option<u32>,
    #[serde(default)]
    pub task_order: Option<String>,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_updated: Option<DateTime<Utc>>,
}

/// A TaskRouter worker. On the wire `attributes` is a JSON-encoded string;
/// it is decoded into [`Attributes`] at this boundary so callers never see
/// the raw blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    pub sid: String,
    pub friendly_name: String,
    #[serde(
        deserialize_with = "deserialize_encoded_attributes",
        serialize_with = "serialize_encoded_attributes",
        default
    )]
    pub attributes: Attributes,
    #[serde(default)]
    pub activity_name: Option<String>,
    #[serde(default)]
    pub available: Option<bool>,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_status_changed: Option<DateTime<Utc>>,
}

/// Worker reduced to its identifier, for sid-only eligibility listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSummary {
    pub sid: String,
}

impl From<&Worker> for WorkerSummary {
    fn from(worker: &Worker) -> Self {
        Self {
            sid: worker.sid.clone(),
        }
    }
}

/// Result of an eligibility query: either the full worker records or,
/// when the caller asked for sids only, the reduced form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EligibleWorkers {
    Workers(Vec<Worker>),
    Sids(Vec<WorkerSummary>),
}

impl EligibleWorkers {
    pub fn len(&self) -> usize {
        match self {
            Self::Workers(workers) => workers.len(),
            Self::Sids(sids) => sids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_success_shape() {
        let envelope = Envelope::success(json!({"key": "value"}));
        assert!(envelope.is_success());
        assert_eq!(envelope.status(), 200);
        assert_eq!(envelope.payload(), Some(&json!({"key": "value"})));
    }

    #[test]
    fn envelope_failure_carries_status_and_message() {
        let error = RemoteError {
            status: 404,
            code: Some(20404),
            message: "The requested resource was not found".to_string(),
        };
        let envelope = Envelope::<Worker>::failure(&error);
        assert!(!envelope.is_success());
        assert_eq!(envelope.status(), 404);
    }

    #[test]
    fn envelope_failure_normalizes_malformed_errors() {
        let error = RemoteError {
            status: 0,
            code: None,
            message: String::new(),
        };
        let envelope = Envelope::<Worker>::failure(&error);
        match envelope {
            Envelope::Failure {
                success,
                status,
                message,
            } => {
                assert!(!success);
                assert_eq!(status, 500);
                assert!(!message.is_empty());
            }
            Envelope::Success { .. } => panic!("expected failure"),
        }
    }

    #[test]
    fn attributes_round_trip() {
        let mut attributes = Attributes::default();
        attributes.insert("skills", json!(["sales", "support"]));
        attributes.insert("routing", json!({"levels": {"sales": 3}}));

        let encoded = attributes.to_encoded();
        let decoded = Attributes::from_encoded(&encoded).unwrap();
        assert_eq!(decoded, attributes);
    }

    #[test]
    fn attributes_empty_blob_decodes_to_empty_map() {
        let decoded = Attributes::from_encoded("").unwrap();
        assert_eq!(decoded, Attributes::default());
    }

    #[test]
    fn attributes_rejects_non_object_blob() {
        assert!(Attributes::from_encoded("[1,2,3]").is_err());
        assert!(Attributes::from_encoded("not json").is_err());
    }

    #[test]
    fn worker_decodes_attribute_blob_from_wire_form() {
        let worker: Worker = serde_json::from_value(json!({
            "sid": "WK00000000000000000000000000000000",
            "friendly_name": "alice",
            "attributes": "{\"skills\":[\"sales\"]}",
            "activity_name": "Available",
            "available": true
        }))
        .unwrap();

        assert_eq!(worker.attributes.get("skills"), Some(&json!(["sales"])));
    }

    #[test]
    fn worker_attributes_reencode_to_wire_string() {
        let worker: Worker = serde_json::from_value(json!({
            "sid": "WK00000000000000000000000000000000",
            "friendly_name": "alice",
            "attributes": "{\"skills\":[\"sales\"]}"
        }))
        .unwrap();

        let wire = serde_json::to_value(&worker).unwrap();
        assert_eq!(wire["attributes"], json!("{\"skills\":[\"sales\"]}"));
    }
}
