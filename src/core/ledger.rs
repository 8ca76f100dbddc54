use super::states::AgentState;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

/// Accumulated key-value facts about the conversation subject. No schema
/// beyond "JSON-serializable value per key".
pub type Memory = serde_json::Map<String, Value>;

/// Coordination flag: the single source of truth for which worker may act
/// on a session next.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Status {
    NeedBrain,
    NeedRunner,
    Still,
    Done,
}

impl Default for Status {
    fn default() -> Self {
        Self::NeedBrain
    }
}

/// One immutable record in the ledger.
///
/// Persisted as the 6-element array
/// `[timestamp, tool_name, payload, state, memory, thought|null]`.
/// `state`/`memory` snapshot the context *after* this entry's effect, so the
/// latest entry is always authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EntryWire", into = "EntryWire")]
pub struct LedgerEntry {
    /// Seconds since the Unix epoch, fractional.
    pub timestamp: f64,
    pub tool_name: String,
    pub payload: Value,
    pub state: AgentState,
    pub memory: Memory,
    pub thought: Option<String>,
}

type EntryWire = (f64, String, Value, AgentState, Memory, Option<String>);

impl From<EntryWire> for LedgerEntry {
    fn from((timestamp, tool_name, payload, state, memory, thought): EntryWire) -> Self {
        Self {
            timestamp,
            tool_name,
            payload,
            state,
            memory,
            thought,
        }
    }
}

impl From<LedgerEntry> for EntryWire {
    fn from(entry: LedgerEntry) -> Self {
        (
            entry.timestamp,
            entry.tool_name,
            entry.payload,
            entry.state,
            entry.memory,
            entry.thought,
        )
    }
}

impl LedgerEntry {
    /// New entry stamped with the current wall clock.
    pub fn now(
        tool_name: impl Into<String>,
        payload: Value,
        state: AgentState,
        memory: Memory,
        thought: Option<String>,
    ) -> Self {
        Self {
            timestamp: now_seconds(),
            tool_name: tool_name.into(),
            payload,
            state,
            memory,
            thought,
        }
    }
}

/// Fractional seconds since the Unix epoch.
#[allow(clippy::cast_precision_loss)]
pub fn now_seconds() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Current context of a ledger: the last entry's snapshot, or the implicit
/// `(hello, {})` for an empty history.
pub fn latest_context(history: &[LedgerEntry]) -> (AgentState, Memory) {
    history
        .last()
        .map_or_else(|| (AgentState::Hello, Memory::new()), |entry| {
            (entry.state, entry.memory.clone())
        })
}

/// An action stashed by the brain, awaiting application by the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub tool_name: String,
    pub payload: Value,
    pub thought: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_action: Option<PendingAction>,
}

/// The unit of durability: metadata plus the full ordered history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDocument {
    #[serde(default)]
    pub metadata: SessionMetadata,
    #[serde(default)]
    pub history: Vec<LedgerEntry>,
}

impl Default for SessionMetadata {
    fn default() -> Self {
        Self {
            session_id: String::new(),
            status: Status::NeedBrain,
            pending_action: None,
        }
    }
}

impl SessionDocument {
    /// Fresh document for a session id: `need_brain`, empty history.
    pub fn new(session_id: &str) -> Self {
        Self {
            metadata: SessionMetadata {
                session_id: session_id.to_string(),
                status: Status::NeedBrain,
                pending_action: None,
            },
            history: Vec::new(),
        }
    }

    /// Normalize a persisted value into the wrapped document shape.
    ///
    /// A bare array (the pre-metadata format) becomes a document with default
    /// metadata. Anything that parses as neither shape returns `None` and the
    /// caller falls back to a fresh document.
    pub fn normalize(session_id: &str, value: Value) -> Option<Self> {
        if value.is_array() {
            let history = serde_json::from_value::<Vec<LedgerEntry>>(value).ok()?;
            let mut doc = Self::new(session_id);
            doc.history = history;
            return Some(doc);
        }

        let mut doc = serde_json::from_value::<Self>(value).ok()?;
        if doc.metadata.session_id.is_empty() {
            doc.metadata.session_id = session_id.to_string();
        }
        Some(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AgentState, LedgerEntry, Memory, SessionDocument, Status, latest_context, now_seconds,
    };
    use serde_json::json;

    fn entry(tool: &str, state: AgentState) -> LedgerEntry {
        LedgerEntry {
            timestamp: 1000.5,
            tool_name: tool.to_string(),
            payload: json!({"text": "hi"}),
            state,
            memory: Memory::new(),
            thought: Some("why".to_string()),
        }
    }

    #[test]
    fn entry_serializes_as_six_element_array() {
        let serialized = serde_json::to_value(entry("send_message", AgentState::AskName)).unwrap();

        assert_eq!(
            serialized,
            json!([1000.5, "send_message", {"text": "hi"}, "ask_name", {}, "why"])
        );
    }

    #[test]
    fn entry_deserializes_from_array_with_null_thought() {
        let raw = json!([7.0, "user_said", "Меня зовут Семен", "ask_name", {}, null]);
        let parsed: LedgerEntry = serde_json::from_value(raw).unwrap();

        assert_eq!(parsed.tool_name, "user_said");
        assert_eq!(parsed.payload, json!("Меня зовут Семен"));
        assert_eq!(parsed.state, AgentState::AskName);
        assert!(parsed.thought.is_none());
    }

    #[test]
    fn entry_with_unknown_state_fails_to_deserialize() {
        let raw = json!([7.0, "update", {}, "not_a_real_state", {}, null]);

        assert!(serde_json::from_value::<LedgerEntry>(raw).is_err());
    }

    #[test]
    fn document_round_trip_preserves_order_and_status() {
        let mut doc = SessionDocument::new("s1");
        doc.metadata.status = Status::Still;
        doc.history.push(entry("send_message", AgentState::AskName));
        doc.history.push(entry("user_said", AgentState::AskName));

        let serialized = serde_json::to_value(&doc).unwrap();
        let reloaded: SessionDocument = serde_json::from_value(serialized).unwrap();

        assert_eq!(reloaded, doc);
    }

    #[test]
    fn bare_array_normalizes_into_wrapped_shape() {
        let raw = json!([[1.0, "send_message", {"text": "hi"}, "hello", {}, null]]);
        let doc = SessionDocument::normalize("legacy", raw).unwrap();

        assert_eq!(doc.metadata.session_id, "legacy");
        assert_eq!(doc.metadata.status, Status::NeedBrain);
        assert_eq!(doc.history.len(), 1);
    }

    #[test]
    fn object_without_metadata_gets_defaults() {
        let raw = json!({"history": []});
        let doc = SessionDocument::normalize("s2", raw).unwrap();

        assert_eq!(doc.metadata.session_id, "s2");
        assert_eq!(doc.metadata.status, Status::NeedBrain);
    }

    #[test]
    fn garbage_value_does_not_normalize() {
        assert!(SessionDocument::normalize("s3", json!(42)).is_none());
    }

    #[test]
    fn latest_context_defaults_to_hello_and_empty_memory() {
        let (state, memory) = latest_context(&[]);

        assert_eq!(state, AgentState::Hello);
        assert!(memory.is_empty());
    }

    #[test]
    fn latest_context_reads_the_last_entry() {
        let mut with_memory = entry("update", AgentState::AskAge);
        with_memory.memory.insert("name".to_string(), json!("Sam"));
        let history = vec![entry("send_message", AgentState::AskName), with_memory];

        let (state, memory) = latest_context(&history);

        assert_eq!(state, AgentState::AskAge);
        assert_eq!(memory.get("name"), Some(&json!("Sam")));
    }

    #[test]
    fn now_seconds_is_fractional_epoch_time() {
        let now = now_seconds();
        // Sanity window: after 2020, before 2100.
        assert!(now > 1_577_836_800.0);
        assert!(now < 4_102_444_800.0);
    }
}
