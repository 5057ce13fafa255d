//! Newline-batched framing and payload narrowing
//!
//! A single channel delivery may carry several JSON envelopes separated by
//! newlines. Each line is parsed and narrowed independently: a malformed
//! line is logged and dropped, the rest of the batch still goes through.

use serde_json::Value;
use tracing::{debug, warn};

use crate::messages::{ErrorInfo, MessageKind, QueryInfo, RequestInfo, WireMessage};

/// A fully decoded inbound event
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Replaces the tracked request list wholesale
    History(Vec<RequestInfo>),
    /// A request has started (still in flight)
    Request(RequestInfo),
    /// The completed version of a previously announced request
    RequestEnd(RequestInfo),
    Query(QueryInfo),
    Error(ErrorInfo),
    Ping,
    Pong,
}

/// Decode one channel delivery into events, skipping malformed lines
pub fn decode_batch(delivery: &str) -> Vec<Event> {
    let mut events = Vec::new();
    for line in delivery.lines().map(str::trim).filter(|line| !line.is_empty()) {
        match serde_json::from_str::<WireMessage>(line) {
            Ok(message) => {
                if let Some(event) = decode_event(message) {
                    events.push(event);
                }
            }
            Err(e) => warn!(error = %e, "dropping malformed frame"),
        }
    }
    events
}

/// Narrow an envelope into a typed event
///
/// Returns `None` when the payload does not have the shape its kind
/// requires; the caller skips the message. A non-sequence `history`
/// payload decodes to an empty history rather than failing.
pub fn decode_event(message: WireMessage) -> Option<Event> {
    match message.kind {
        MessageKind::History => Some(Event::History(parse_history(message.payload))),
        MessageKind::Request => parse_entity(message.payload).map(Event::Request),
        MessageKind::RequestEnd => parse_entity(message.payload).map(Event::RequestEnd),
        MessageKind::Query => parse_entity(message.payload).map(Event::Query),
        MessageKind::Error => parse_entity(message.payload).map(Event::Error),
        MessageKind::Ping => Some(Event::Ping),
        MessageKind::Pong => Some(Event::Pong),
    }
}

fn parse_history(payload: Value) -> Vec<RequestInfo> {
    let Value::Array(entries) = payload else {
        debug!("history payload is not a sequence, treating as empty");
        return Vec::new();
    };

    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(request) => Some(request),
            Err(e) => {
                warn!(error = %e, "skipping invalid history entry");
                None
            }
        })
        .collect()
}

fn parse_entity<T: serde::de::DeserializeOwned>(payload: Value) -> Option<T> {
    if !payload.is_object() {
        debug!("skipping non-object payload");
        return None;
    }
    match serde_json::from_value(payload) {
        Ok(entity) => Some(entity),
        Err(e) => {
            warn!(error = %e, "skipping malformed payload");
            None
        }
    }
}
