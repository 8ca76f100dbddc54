mod effects;

pub use effects::{ConsoleEffects, SideEffects};

use crate::config::UnknownToolPolicy;
use crate::core::action::{
    Action, TOOL_ERROR, TOOL_SEND_MESSAGE, TOOL_TEST_PING, TOOL_UPDATE,
};
use crate::core::ledger::{LedgerEntry, Status, latest_context};
use crate::core::states::AgentState;
use crate::core::update::apply_update;
use serde_json::Value;

/// Interpret a validated action against the latest ledger entry and produce
/// the next entry.
///
/// Context comes from the last entry, or the implicit `(hello, {})` for an
/// empty history. Only `update` changes state/memory; the other tools fire
/// side effects and carry the context through unchanged. Unknown tool names
/// follow `policy`: pass through as no-ops, or surface on the operator
/// channel — either way the entry is appended with the name verbatim.
pub async fn apply_action(
    history: &[LedgerEntry],
    action: &Action,
    effects: &dyn SideEffects,
    policy: UnknownToolPolicy,
) -> LedgerEntry {
    let (current_state, current_memory) = latest_context(history);

    let (next_state, next_memory) = match action.tool_name.as_str() {
        TOOL_UPDATE => apply_update(current_state, &current_memory, &action.payload),
        TOOL_SEND_MESSAGE => {
            effects.send_message(message_text(&action.payload)).await;
            (current_state, current_memory)
        }
        TOOL_TEST_PING => {
            effects.test_ping(&action.payload).await;
            (current_state, current_memory)
        }
        TOOL_ERROR => {
            effects.report_error(&action.thought).await;
            (current_state, current_memory)
        }
        unknown => {
            match policy {
                UnknownToolPolicy::Passthrough => {
                    tracing::debug!(tool = unknown, "unknown tool, passing through");
                }
                UnknownToolPolicy::Error => {
                    effects
                        .report_error(&format!("unknown tool '{unknown}'"))
                        .await;
                }
            }
            (current_state, current_memory)
        }
    };

    LedgerEntry::now(
        action.tool_name.clone(),
        action.payload.clone(),
        next_state,
        next_memory,
        Some(action.thought.clone()),
    )
}

/// Status policy after the runner applies a tool: `done` once the ping has
/// fired, `still` while waiting on the human, otherwise the brain goes again.
pub fn next_status(applied_tool: &str, resulting_state: AgentState) -> Status {
    if applied_tool == TOOL_TEST_PING {
        Status::Done
    } else if resulting_state.awaits_user_input() {
        Status::Still
    } else {
        Status::NeedBrain
    }
}

fn message_text(payload: &Value) -> &str {
    payload
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{apply_action, next_status};
    use crate::config::UnknownToolPolicy;
    use crate::core::action::Action;
    use crate::core::ledger::{LedgerEntry, Memory, Status};
    use crate::core::states::AgentState;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingEffects {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl super::SideEffects for RecordingEffects {
        async fn send_message(&self, text: &str) {
            self.calls.lock().unwrap().push(format!("message:{text}"));
        }

        async fn test_ping(&self, payload: &Value) {
            self.calls.lock().unwrap().push(format!("ping:{payload}"));
        }

        async fn report_error(&self, thought: &str) {
            self.calls.lock().unwrap().push(format!("error:{thought}"));
        }
    }

    fn history_at(state: AgentState, memory: Memory) -> Vec<LedgerEntry> {
        vec![LedgerEntry::now(
            "send_message",
            json!({"text": "?"}),
            state,
            memory,
            None,
        )]
    }

    #[tokio::test]
    async fn update_applies_state_and_memory() {
        let action = Action::parse(
            "update",
            r#"{"state": "ask_age", "memory": {"name": "Семен"}}"#,
            "save name",
        );
        let effects = RecordingEffects::default();

        let entry = apply_action(
            &history_at(AgentState::AskName, Memory::new()),
            &action,
            &effects,
            UnknownToolPolicy::Passthrough,
        )
        .await;

        assert_eq!(entry.state, AgentState::AskAge);
        assert_eq!(entry.memory.get("name"), Some(&json!("Семен")));
        assert!(effects.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_with_rejected_state_keeps_prior_state() {
        let action = Action::parse("update", r#"{"state": "not_a_real_state"}"#, "");
        let effects = RecordingEffects::default();

        let entry = apply_action(
            &history_at(AgentState::AskName, Memory::new()),
            &action,
            &effects,
            UnknownToolPolicy::Passthrough,
        )
        .await;

        assert_eq!(entry.state, AgentState::AskName);
        assert!(entry.payload["error"].as_str().unwrap().contains("not_a_real_state"));
    }

    #[tokio::test]
    async fn send_message_fires_delivery_and_keeps_context() {
        let action = Action::parse("send_message", r#"{"text": "Как тебя зовут?"}"#, "ask");
        let effects = RecordingEffects::default();
        let mut memory = Memory::new();
        memory.insert("name".to_string(), json!("Sam"));

        let entry = apply_action(
            &history_at(AgentState::AskAge, memory.clone()),
            &action,
            &effects,
            UnknownToolPolicy::Passthrough,
        )
        .await;

        assert_eq!(entry.state, AgentState::AskAge);
        assert_eq!(entry.memory, memory);
        assert_eq!(
            effects.calls.lock().unwrap().as_slice(),
            ["message:Как тебя зовут?"]
        );
    }

    #[tokio::test]
    async fn test_ping_fires_and_keeps_context() {
        let action = Action::parse("test_ping", r#"{"payload": "ping"}"#, "all data in");
        let effects = RecordingEffects::default();

        let entry = apply_action(
            &history_at(AgentState::CallPing, Memory::new()),
            &action,
            &effects,
            UnknownToolPolicy::Passthrough,
        )
        .await;

        assert_eq!(entry.state, AgentState::CallPing);
        assert_eq!(
            effects.calls.lock().unwrap().as_slice(),
            [r#"ping:{"payload":"ping"}"#]
        );
    }

    #[tokio::test]
    async fn error_surfaces_thought_to_operator() {
        let action = Action::error("No API key");
        let effects = RecordingEffects::default();

        let entry = apply_action(&[], &action, &effects, UnknownToolPolicy::Passthrough).await;

        assert_eq!(entry.state, AgentState::Hello);
        assert_eq!(effects.calls.lock().unwrap().as_slice(), ["error:No API key"]);
    }

    #[tokio::test]
    async fn empty_history_assumes_hello_and_empty_memory() {
        let action = Action::parse("send_message", r#"{"text": "hi"}"#, "");
        let effects = RecordingEffects::default();

        let entry = apply_action(&[], &action, &effects, UnknownToolPolicy::Passthrough).await;

        assert_eq!(entry.state, AgentState::Hello);
        assert!(entry.memory.is_empty());
    }

    #[tokio::test]
    async fn unknown_tool_passes_through_silently() {
        let action = Action::parse("future_tool", r"{}", "");
        let effects = RecordingEffects::default();

        let entry = apply_action(&[], &action, &effects, UnknownToolPolicy::Passthrough).await;

        assert_eq!(entry.tool_name, "future_tool");
        assert_eq!(entry.state, AgentState::Hello);
        assert!(effects.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_tool_error_policy_reports_to_operator() {
        let action = Action::parse("future_tool", r"{}", "");
        let effects = RecordingEffects::default();

        let entry = apply_action(&[], &action, &effects, UnknownToolPolicy::Error).await;

        // Context still carried through unchanged either way.
        assert_eq!(entry.state, AgentState::Hello);
        assert_eq!(
            effects.calls.lock().unwrap().as_slice(),
            ["error:unknown tool 'future_tool'"]
        );
    }

    #[test]
    fn status_policy_matches_the_turn_protocol() {
        assert_eq!(next_status("test_ping", AgentState::CallPing), Status::Done);
        assert_eq!(next_status("update", AgentState::AskName), Status::Still);
        assert_eq!(next_status("update", AgentState::AskAge), Status::Still);
        assert_eq!(
            next_status("update", AgentState::AskOccupation),
            Status::Still
        );
        assert_eq!(next_status("update", AgentState::Hello), Status::NeedBrain);
        assert_eq!(
            next_status("update", AgentState::CallPing),
            Status::NeedBrain
        );
        assert_eq!(
            next_status("send_message", AgentState::Hello),
            Status::NeedBrain
        );
    }
}
