use super::states::AgentState;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const TOOL_SEND_MESSAGE: &str = "send_message";
pub const TOOL_UPDATE: &str = "update";
pub const TOOL_TEST_PING: &str = "test_ping";
pub const TOOL_ERROR: &str = "error";
pub const TOOL_USER_SAID: &str = "user_said";

/// A validated unit of intent: one per brain turn.
///
/// The brain transmits tool arguments as a verbatim JSON string; construction
/// parses and validates that string but never fails past this boundary.
/// Malformed input degrades into an `error`-flagged payload instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Free-text rationale. Not used for control flow.
    pub thought: String,
    pub tool_name: String,
    /// Parsed and validated tool arguments.
    pub payload: Value,
}

impl Action {
    /// Build an action from the brain's raw output.
    ///
    /// - Unparseable `payload_str` yields `{"error": "Invalid JSON string
    ///   from LLM"}`.
    /// - For `update`, an out-of-enumeration `state` key is stripped and
    ///   replaced by an `error` key; a valid `memory` sub-payload survives.
    pub fn parse(tool_name: &str, payload_str: &str, thought: &str) -> Self {
        let payload = match serde_json::from_str::<Value>(payload_str) {
            Ok(value) => value,
            Err(_) => serde_json::json!({"error": "Invalid JSON string from LLM"}),
        };

        let payload = if tool_name == TOOL_UPDATE {
            validate_update_payload(payload)
        } else {
            payload
        };

        Self {
            thought: thought.to_string(),
            tool_name: tool_name.to_string(),
            payload,
        }
    }

    /// Build an action from an already-parsed payload (runner rehydration,
    /// tests). `update` payloads still go through state validation.
    pub fn from_parts(tool_name: &str, payload: Value, thought: &str) -> Self {
        let payload = if tool_name == TOOL_UPDATE {
            validate_update_payload(payload)
        } else {
            payload
        };

        Self {
            thought: thought.to_string(),
            tool_name: tool_name.to_string(),
            payload,
        }
    }

    /// Degraded action for brain-side failures (missing credential, backend
    /// error). Keeps the protocol producing well-formed ledger entries.
    pub fn error(thought: impl Into<String>) -> Self {
        Self {
            thought: thought.into(),
            tool_name: TOOL_ERROR.to_string(),
            payload: serde_json::json!({}),
        }
    }
}

/// Reject an `update` payload's `state` key when it does not name a state in
/// the enumeration. Non-string values are rejected the same way. The rest of
/// the payload proceeds untouched.
fn validate_update_payload(mut payload: Value) -> Value {
    let Some(map) = payload.as_object_mut() else {
        return payload;
    };

    let rejected = match map.get("state") {
        Some(Value::String(state)) if AgentState::is_valid(state) => None,
        Some(Value::String(state)) => Some(state.clone()),
        Some(other) => Some(other.to_string()),
        None => None,
    };

    if let Some(state) = rejected {
        map.remove("state");
        map.insert(
            "error".to_string(),
            Value::String(format!(
                "Invalid state '{state}'. Allowed: {:?}",
                AgentState::all_names()
            )),
        );
    }

    payload
}
