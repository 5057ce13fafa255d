//! Protocol message types

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message kinds exchanged over the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Request,
    Query,
    Error,
    RequestEnd,
    History,
    Ping,
    Pong,
}

/// Envelope for every message on the wire
///
/// The payload stays untyped here; [`crate::codec::decode_event`] narrows
/// it according to the kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub payload: Value,
}

impl WireMessage {
    /// Liveness ping emitted by the client while connected
    pub fn ping() -> Self {
        Self {
            kind: MessageKind::Ping,
            payload: Value::Null,
        }
    }

    /// Serialize to a single-line JSON frame
    pub fn to_json(&self) -> String {
        // An envelope of plain enums and a Value cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// One tracked HTTP request with its nested telemetry
///
/// Created in-flight by a `request` event (no status code or end time yet),
/// replaced wholesale by the matching `request_end`, and appended to by
/// `query`/`error` events carrying its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestInfo {
    pub id: String,
    pub method: String,
    pub path: String,
    /// Absent until the request completes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Total duration in nanoseconds
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub duration_ms: f64,
    pub start_time: DateTime<Utc>,
    /// Absent until the request completes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub query_params: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,
    #[serde(default)]
    pub response_size: u64,
    #[serde(default)]
    pub client_ip: String,
    /// Append-only; insertion order is arrival order
    #[serde(default)]
    pub queries: Vec<QueryInfo>,
    /// Append-only; insertion order is arrival order
    #[serde(default)]
    pub errors: Vec<ErrorInfo>,
    #[serde(default)]
    pub memory_usage: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<HashMap<String, Value>>,
}

impl RequestInfo {
    /// Whether the terminating `request_end` has been observed
    pub fn is_complete(&self) -> bool {
        self.end_time.is_some()
    }
}

/// One database query attributed to a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryInfo {
    pub id: String,
    pub request_id: String,
    /// Statement text
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<Value>>,
    /// Duration in nanoseconds
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub duration_ms: f64,
    #[serde(default)]
    pub rows_affected: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub start_time: DateTime<Utc>,
    /// Provenance tag, e.g. the call site that issued the query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// One error attributed to a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub id: String,
    pub request_id: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Severity classification
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<HashMap<String, Value>>,
}

/// Error severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Exception,
    Warning,
    Notice,
    Debug,
}
