//! Wire-level request/response envelope.

// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use crate::util::MessageId;

/// The unit of request/response on the wire.
///
/// Created by the caller (or by the silo on the response path) and
/// immutable after send, except for the response fields which the
/// dispatcher fills in. The core never inspects `payload`/`response_payload`
/// contents: they are opaque bytes produced and consumed by a `Codec`
/// injected at dispatcher registration time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub message_id: MessageId,
    pub correlation_id: Option<String>,
    pub actor_id: String,
    pub actor_type: String,
    pub method_name: String,
    pub payload: Vec<u8>,
    pub response_payload: Option<Vec<u8>>,
    pub is_error: bool,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Envelope {
    /// Build a new request envelope. `response_payload`/`is_error` start
    /// unset; the dispatcher fills them in once the call completes.
    pub fn request(
        actor_type: impl Into<String>,
        actor_id: impl Into<String>,
        method_name: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            message_id: MessageId::new(),
            correlation_id: None,
            actor_id: actor_id.into(),
            actor_type: actor_type.into(),
            method_name: method_name.into(),
            payload,
            response_payload: None,
            is_error: false,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Build a success response that carries the same `message_id` and
    /// traceability fields as `self`
    pub fn success_response(&self, response_payload: Vec<u8>) -> Self {
        Self {
            message_id: self.message_id,
            correlation_id: self.correlation_id.clone(),
            actor_id: self.actor_id.clone(),
            actor_type: self.actor_type.clone(),
            method_name: self.method_name.clone(),
            payload: Vec::new(),
            response_payload: Some(response_payload),
            is_error: false,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    /// Build an error response carrying the same `message_id`.
    pub fn error_response(&self, error_message: impl Into<String>) -> Self {
        Self {
            message_id: self.message_id,
            correlation_id: self.correlation_id.clone(),
            actor_id: self.actor_id.clone(),
            actor_type: self.actor_type.clone(),
            method_name: self.method_name.clone(),
            payload: Vec::new(),
            response_payload: None,
            is_error: true,
            error_message: Some(error_message.into()),
            created_at: Utc::now(),
        }
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Envelope({} {}::{} id={})",
            if self.response_payload.is_some() || self.is_error {
                "resp"
            } else {
                "req"
            },
            self.actor_type,
            self.method_name,
            self.message_id
        )
    }
}
