use crate::core::ledger::Memory;
use crate::core::states::AgentState;
use serde_json::Value;

/// Tool catalogue shown to the decision model.
fn tools_schema() -> Value {
    serde_json::json!({
        "send_message": "Send text to user. Args: {'text': str}",
        "update": "Update context. Atomic operation. Args (optional): \
                   {'state': str (transition to new FSM state), \
                   'memory': dict (data to MERGE; set value to null to delete)}",
        "test_ping": "Execute ping logic. Args: {'payload': str}",
    })
}

/// System prompt anchoring the model in the current state and memory.
pub fn system_prompt(state: AgentState, memory: &Memory) -> String {
    let memory_json = serde_json::to_string(memory).unwrap_or_else(|_| "{}".to_string());
    let states_json =
        serde_json::to_string(&AgentState::all_names()).unwrap_or_else(|_| "[]".to_string());

    format!(
        "You are the 'Stateless Brain' of Bulus.\n\
         \n\
         CONTEXT:\n\
         - State: {state}\n\
         - Memory: {memory_json}\n\
         \n\
         CONSTRAINTS:\n\
         - Valid States: {states_json}\n\
         - Tools: {tools}\n\
         \n\
         STRATEGY:\n\
         1. If user provides info -> Call `update` to save (memory) AND switch state.\n\
         2. If state changed and you need to ask -> Call `send_message`.\n\
         3. Output arguments as JSON STRING in 'payload_str'.\n\
         4. If all fields (name, age, occupation) are known -> set state to 'call_ping'.\n\
         5. If state is 'call_ping' -> call `test_ping` (any payload).\n\
         \n\
         Decide the SINGLE next action.",
        tools = tools_schema(),
    )
}
