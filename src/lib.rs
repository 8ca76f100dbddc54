#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use
)]

pub mod brain;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod runner;
pub mod storage;

pub use config::{Config, UnknownToolPolicy};
pub use crate::core::{Action, AgentState, LedgerEntry, Memory, SessionDocument, Status};
pub use error::{BulusError, Result};
