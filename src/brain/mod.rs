mod openai;
mod prompts;

pub use openai::OpenAiBrain;
pub use prompts::system_prompt;

use crate::core::action::{
    Action, TOOL_SEND_MESSAGE, TOOL_TEST_PING, TOOL_UPDATE, TOOL_USER_SAID,
};
use crate::core::ledger::{LedgerEntry, latest_context};
use crate::core::states::AgentState;
use async_trait::async_trait;
use serde_json::{Value, json};

/// The decision-making collaborator: inspects ledger history, emits exactly
/// one action per turn.
///
/// Implementations must degrade to a `tool_name = "error"` action rather
/// than raise past this boundary — the protocol always gets a well-formed
/// action back.
#[async_trait]
pub trait Brain: Send + Sync {
    async fn decide(&self, history: &[LedgerEntry]) -> Action;
}

/// Render a bounded recent window of the ledger for the decision model.
///
/// Thoughts are omitted to save context; the window never drops the
/// authoritative last entry.
pub fn render_history(history: &[LedgerEntry], window: usize) -> String {
    let window = window.max(1);
    let start = history.len().saturating_sub(window);

    history[start..]
        .iter()
        .filter_map(render_entry)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_entry(entry: &LedgerEntry) -> Option<String> {
    match entry.tool_name.as_str() {
        TOOL_USER_SAID => {
            let text = entry
                .payload
                .as_str()
                .map_or_else(|| entry.payload.to_string(), str::to_string);
            Some(format!("[USER]: {text}"))
        }
        TOOL_SEND_MESSAGE => {
            let text = entry
                .payload
                .get("text")
                .and_then(Value::as_str)
                .map_or_else(|| entry.payload.to_string(), str::to_string);
            Some(format!("[AGENT]: {text}"))
        }
        TOOL_UPDATE => {
            let mut changes = Vec::new();
            if let Some(state) = entry.payload.get("state").and_then(Value::as_str) {
                changes.push(format!("State->{state}"));
            }
            if entry.payload.get("memory").is_some() {
                changes.push("Memory Updated".to_string());
            }
            Some(format!("[SYSTEM]: {}", changes.join(", ")))
        }
        TOOL_TEST_PING => Some("[SYSTEM]: Ping Executed".to_string()),
        _ => None,
    }
}

/// Deterministic brain for simulation and tests: fills name, then age, then
/// occupation, then fires the ping.
pub struct ScriptedBrain {
    pub name: Value,
    pub age: Value,
    pub occupation: Value,
}

impl Default for ScriptedBrain {
    fn default() -> Self {
        Self {
            name: json!("Demo User"),
            age: json!(30),
            occupation: json!("engineer"),
        }
    }
}

#[async_trait]
impl Brain for ScriptedBrain {
    async fn decide(&self, history: &[LedgerEntry]) -> Action {
        let (_, memory) = latest_context(history);

        if !memory.contains_key("name") {
            return Action::from_parts(
                TOOL_UPDATE,
                json!({"state": AgentState::AskAge, "memory": {"name": self.name}}),
                "Record the name and move on to age",
            );
        }
        if !memory.contains_key("age") {
            return Action::from_parts(
                TOOL_UPDATE,
                json!({"state": AgentState::AskOccupation, "memory": {"age": self.age}}),
                "Record the age and ask about occupation",
            );
        }
        if !memory.contains_key("occupation") {
            return Action::from_parts(
                TOOL_UPDATE,
                json!({"state": AgentState::CallPing, "memory": {"occupation": self.occupation}}),
                "Record the occupation and move to ping",
            );
        }

        Action::from_parts(
            TOOL_TEST_PING,
            json!({"payload": "ping"}),
            "All fields collected, triggering the ping",
        )
    }
}
