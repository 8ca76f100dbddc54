pub mod action;
pub mod ledger;
pub mod states;
pub mod update;

pub use action::Action;
pub use ledger::{LedgerEntry, Memory, PendingAction, SessionDocument, Status};
pub use states::AgentState;
pub use update::apply_update;
