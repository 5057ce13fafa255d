//! Debug Bar Wire Protocol
//!
//! This crate defines the JSON message envelope exchanged with the debug
//! bar instrumentation server, the typed telemetry records carried in
//! payloads, and the newline-batched framing codec.
//!
//! Every message on the wire is an envelope `{"type": <kind>, "payload": <any>}`.
//! The server may batch several envelopes into a single channel delivery,
//! separated by newlines; [`decode_batch`] splits and narrows them
//! independently so one malformed frame never poisons the rest.

pub mod codec;
pub mod messages;

pub use codec::{decode_batch, decode_event, Event};
pub use messages::{ErrorInfo, ErrorKind, MessageKind, QueryInfo, RequestInfo, WireMessage};
