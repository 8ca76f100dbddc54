use super::ledger::Memory;
use super::states::AgentState;
use serde_json::Value;

/// Apply an `update` payload to the current context.
///
/// - A non-empty `payload.state` replaces the state. Validation happened at
///   action construction, so any string reaching this point is a member of
///   the enumeration.
/// - `payload.memory`, when it is a mapping, merges key-by-key: an explicit
///   null deletes the key (no-op when absent), any other value sets it.
///
/// Pure and total: the input memory is never mutated, so readers of the
/// prior ledger entry observe unchanged data.
pub fn apply_update(
    current_state: AgentState,
    current_memory: &Memory,
    payload: &Value,
) -> (AgentState, Memory) {
    let mut next_state = current_state;
    let mut next_memory = current_memory.clone();

    if let Some(state) = payload.get("state").and_then(Value::as_str)
        && !state.is_empty()
        && let Ok(parsed) = state.parse::<AgentState>()
    {
        next_state = parsed;
    }

    if let Some(patch) = payload.get("memory").and_then(Value::as_object) {
        for (key, value) in patch {
            if value.is_null() {
                next_memory.remove(key);
            } else {
                next_memory.insert(key.clone(), value.clone());
            }
        }
    }

    (next_state, next_memory)
}
