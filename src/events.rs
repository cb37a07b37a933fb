//! Progress events: the wire envelope both pipelines stream to their consumer
//!
//! Every event is one JSON object with an `event_type` discriminant plus whichever optional
//! fields that event carries. Absent fields are omitted from the encoding.

use std::fmt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::error::Result;

/// Discriminant of a progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Multi-pass analysis started
    AnalysisStart,
    /// A pass is about to call the model
    PassStart,
    /// A pass finished, possibly with a parse warning embedded in `data`
    PassComplete,
    /// Discovery started
    DiscoveryStart,
    /// Discovery is waiting on the model
    DiscoveryThinking,
    /// Discovery produced recommendations
    DiscoveryComplete,
    /// A pass or the discovery round failed
    Error,
    /// The run is over; always the last event
    Done,
}

impl EventType {
    /// Wire name of this event type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnalysisStart => "analysis_start",
            Self::PassStart => "pass_start",
            Self::PassComplete => "pass_complete",
            Self::DiscoveryStart => "discovery_start",
            Self::DiscoveryThinking => "discovery_thinking",
            Self::DiscoveryComplete => "discovery_complete",
            Self::Error => "error",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional fields merged into the envelope next to `event_type`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFields {
    /// Stage identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass_name: Option<String>,
    /// 1-based stage number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass_number: Option<usize>,
    /// Parsed structured document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Human readable status line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Reasoning steps pulled out of `data`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Vec<String>>,
    /// Seconds spent in the model call, one decimal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<f64>,
    /// Number of passes in the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_passes: Option<usize>,
}

impl EventFields {
    /// Fields carrying only a message
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Attaches the stage identity
    pub fn with_pass(mut self, name: impl Into<String>, number: usize) -> Self {
        self.pass_name = Some(name.into());
        self.pass_number = Some(number);
        self
    }

    /// Attaches a parsed document
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attaches reasoning steps
    pub fn with_reasoning(mut self, reasoning: Vec<String>) -> Self {
        self.reasoning = Some(reasoning);
        self
    }

    /// Attaches the elapsed time
    pub fn with_elapsed(mut self, elapsed: f64) -> Self {
        self.elapsed = Some(elapsed);
        self
    }

    /// Attaches the pass count
    pub fn with_total_passes(mut self, total: usize) -> Self {
        self.total_passes = Some(total);
        self
    }
}

/// Decoded form of an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Discriminant
    pub event_type: EventType,
    /// Everything else
    #[serde(flatten)]
    pub fields: EventFields,
}

/// An encoded event, ready for the transport
#[derive(Debug, Clone, PartialEq)]
pub struct WireEvent {
    /// Discriminant, kept alongside the encoding so transports can route without decoding
    pub event_type: EventType,
    /// JSON encoding of the full envelope
    pub payload: String,
}

impl WireEvent {
    /// Decodes the payload back into a [`ProgressEvent`]
    pub fn decode(&self) -> Result<ProgressEvent> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}

/// Merges the discriminant with the fields and encodes the envelope
///
/// Callers are trusted to supply the fields their event type needs.
pub fn emit(event_type: EventType, fields: EventFields) -> Result<WireEvent> {
    let event = ProgressEvent { event_type, fields };
    let payload = serde_json::to_string(&event)?;
    Ok(WireEvent { event_type, payload })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_envelope_omits_absent_fields() {
        let event = emit(EventType::Done, EventFields::message("Analysis complete")).unwrap();
        assert_eq!(event.payload, r#"{"event_type":"done","message":"Analysis complete"}"#);
    }

    #[test]
    fn test_envelope_field_order_and_values() {
        let fields = EventFields::message("The Big Picture complete (1.5s)")
            .with_pass("system_overview", 1)
            .with_data(json!({"purpose": "demo", "reasoning_steps": ["a"]}))
            .with_reasoning(vec!["a".into()])
            .with_elapsed(1.5);
        let event = emit(EventType::PassComplete, fields).unwrap();

        let value: Value = serde_json::from_str(&event.payload).unwrap();
        assert_eq!(
            value,
            json!({
                "event_type": "pass_complete",
                "pass_name": "system_overview",
                "pass_number": 1,
                "data": {"purpose": "demo", "reasoning_steps": ["a"]},
                "message": "The Big Picture complete (1.5s)",
                "reasoning": ["a"],
                "elapsed": 1.5
            })
        );
        assert!(event.payload.starts_with(r#"{"event_type":"pass_complete","pass_name""#));
    }

    #[test]
    fn test_decode_round_trip() {
        let fields = EventFields::message("Starting analysis of axum").with_total_passes(6);
        let event = emit(EventType::AnalysisStart, fields.clone()).unwrap();
        let decoded = event.decode().unwrap();
        assert_eq!(decoded.event_type, EventType::AnalysisStart);
        assert_eq!(decoded.fields, fields);
    }

    #[test]
    fn test_wire_names() {
        for event_type in [
            EventType::AnalysisStart,
            EventType::PassStart,
            EventType::PassComplete,
            EventType::DiscoveryStart,
            EventType::DiscoveryThinking,
            EventType::DiscoveryComplete,
            EventType::Error,
            EventType::Done,
        ] {
            let encoded = serde_json::to_string(&event_type).unwrap();
            assert_eq!(encoded, format!("\"{}\"", event_type.as_str()));
        }
    }
}
