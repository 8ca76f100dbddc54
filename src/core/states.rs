use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Conversation progress through the fixed data-collection sequence.
///
/// The progression is linear: `hello → ask_name → ask_age → ask_occupation →
/// call_ping`. States never move backward on their own; only an explicit
/// `update` action changes them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AgentState {
    Hello,
    AskName,
    AskAge,
    AskOccupation,
    CallPing,
}

impl AgentState {
    /// States where the runner hands the turn to the human participant.
    pub fn awaits_user_input(self) -> bool {
        matches!(self, Self::AskName | Self::AskAge | Self::AskOccupation)
    }

    /// Whether a raw string names a member of the enumeration.
    pub fn is_valid(value: &str) -> bool {
        value.parse::<Self>().is_ok()
    }

    /// All wire-format state names, for prompts and rejection messages.
    pub fn all_names() -> Vec<String> {
        Self::iter().map(|state| state.to_string()).collect()
    }
}

impl Default for AgentState {
    fn default() -> Self {
        Self::Hello
    }
}
