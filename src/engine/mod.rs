use crate::brain::{Brain, ScriptedBrain};
use crate::config::UnknownToolPolicy;
use crate::core::action::{Action, TOOL_USER_SAID};
use crate::core::ledger::{
    LedgerEntry, PendingAction, SessionDocument, Status, latest_context,
};
use crate::core::states::AgentState;
use crate::runner::{self, SideEffects};
use crate::storage::SessionRepository;
use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write as _;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Brain phase: for every session whose status is `need_brain`, compute one
/// action, stash it as the pending action, and hand the session to the
/// runner. The brain never touches the ledger directly.
///
/// Returns how many sessions were acted on.
pub async fn brain_pass(repo: &dyn SessionRepository, brain: &dyn Brain) -> Result<usize> {
    let mut acted = 0;
    for session_id in repo.list_sessions().await? {
        let mut doc = repo.load(&session_id).await;
        if doc.metadata.status != Status::NeedBrain {
            continue;
        }

        let action = brain.decide(&doc.history).await;
        tracing::info!(
            %session_id,
            tool = %action.tool_name,
            "brain decided, handing to runner"
        );

        doc.metadata.pending_action = Some(PendingAction {
            tool_name: action.tool_name,
            payload: action.payload,
            thought: action.thought,
        });
        doc.metadata.status = Status::NeedRunner;
        repo.save(&doc).await?;
        acted += 1;
    }
    Ok(acted)
}

/// Runner phase: apply each `need_runner` session's pending action, append
/// the resulting entry, clear the stash, and set the next status by policy.
pub async fn runner_pass(
    repo: &dyn SessionRepository,
    effects: &dyn SideEffects,
    policy: UnknownToolPolicy,
) -> Result<usize> {
    let mut acted = 0;
    for session_id in repo.list_sessions().await? {
        let mut doc = repo.load(&session_id).await;
        if doc.metadata.status != Status::NeedRunner {
            continue;
        }
        let Some(pending) = doc.metadata.pending_action.take() else {
            continue;
        };

        let action = Action::from_parts(&pending.tool_name, pending.payload, &pending.thought);
        let entry = runner::apply_action(&doc.history, &action, effects, policy).await;
        let next_status = runner::next_status(&entry.tool_name, entry.state);

        tracing::info!(%session_id, tool = %entry.tool_name, status = %next_status, "runner applied action");

        doc.history.push(entry);
        doc.metadata.status = next_status;
        repo.save(&doc).await?;
        acted += 1;
    }
    Ok(acted)
}

/// Record external human input on a `still` session: a `user_said` entry
/// carrying the current state/memory unchanged, then back to the brain.
pub async fn push_user_input(
    repo: &dyn SessionRepository,
    session_id: &str,
    text: &str,
) -> Result<()> {
    let doc = repo.load(session_id).await;
    let (state, memory) = latest_context(&doc.history);

    let entry = LedgerEntry::now(
        TOOL_USER_SAID,
        Value::String(text.to_string()),
        state,
        memory,
        None,
    );
    repo.append(session_id, entry, Some(Status::NeedBrain)).await?;
    Ok(())
}

/// User phase for the simulator: feed canned replies keyed by state to every
/// `still` session. Sessions without a matching reply simply remain `still`.
pub async fn user_pass(
    repo: &dyn SessionRepository,
    replies: &HashMap<AgentState, String>,
) -> Result<usize> {
    let mut acted = 0;
    for session_id in repo.list_sessions().await? {
        let doc = repo.load(&session_id).await;
        if doc.metadata.status != Status::Still {
            continue;
        }

        let (state, _) = latest_context(&doc.history);
        let Some(reply) = replies.get(&state) else {
            continue;
        };

        push_user_input(repo, &session_id, reply).await?;
        acted += 1;
    }
    Ok(acted)
}

/// Drive one session interactively: the brain and runner alternate until the
/// session waits on the human, then stdin supplies the reply. `exit`/`q` or
/// end-of-input end the loop; `done` is terminal.
pub async fn run_session(
    repo: &dyn SessionRepository,
    brain: &dyn Brain,
    effects: &dyn SideEffects,
    policy: UnknownToolPolicy,
    session_id: &str,
) -> Result<()> {
    println!("Bulus engine started for session: {session_id}");
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let doc = repo.load(session_id).await;

        match doc.metadata.status {
            Status::Done => {
                println!("Session complete.");
                return Ok(());
            }
            Status::Still => {
                print!("\nUSER > ");
                std::io::stdout().flush().ok();

                let line = tokio::select! {
                    line = stdin.next_line() => line?,
                    _ = tokio::signal::ctrl_c() => None,
                };
                let Some(text) = line else {
                    return Ok(());
                };
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                if text.eq_ignore_ascii_case("exit") || text.eq_ignore_ascii_case("q") {
                    return Ok(());
                }

                push_user_input(repo, session_id, text).await?;
            }
            Status::NeedBrain => {
                println!("Thinking...");
                let action = brain.decide(&doc.history).await;
                println!("   [Thought]: {}", action.thought);
                println!("   [Tool]:    {} | {}", action.tool_name, action.payload);

                let mut doc = doc;
                doc.metadata.pending_action = Some(PendingAction {
                    tool_name: action.tool_name,
                    payload: action.payload,
                    thought: action.thought,
                });
                doc.metadata.status = Status::NeedRunner;
                repo.save(&doc).await?;
            }
            Status::NeedRunner => {
                let mut doc = doc;
                let Some(pending) = doc.metadata.pending_action.take() else {
                    // Nothing stashed: give the brain another turn.
                    repo.update_status(session_id, Status::NeedBrain).await?;
                    continue;
                };

                let action =
                    Action::from_parts(&pending.tool_name, pending.payload, &pending.thought);
                let entry = runner::apply_action(&doc.history, &action, effects, policy).await;
                let next_status = runner::next_status(&entry.tool_name, entry.state);

                doc.history.push(entry);
                doc.metadata.status = next_status;
                repo.save(&doc).await?;
            }
        }
    }
}

/// Canned replies used by the simulator's user phase.
pub fn demo_replies() -> HashMap<AgentState, String> {
    HashMap::from([
        (AgentState::AskName, "I am a test user".to_string()),
        (AgentState::AskAge, "I am 25".to_string()),
        (AgentState::AskOccupation, "I am an engineer".to_string()),
    ])
}

/// Deterministic multi-session demo: seeds two sessions and runs
/// brain/runner/user passes for a fixed number of cycles, printing a
/// snapshot after each.
pub async fn simulate(
    repo: &dyn SessionRepository,
    effects: &dyn SideEffects,
    policy: UnknownToolPolicy,
    cycles: usize,
) -> Result<()> {
    seed_demo_sessions(repo).await?;
    let brain = ScriptedBrain::default();
    let replies = demo_replies();

    for cycle in 1..=cycles {
        println!("--- cycle {cycle} ---");
        brain_pass(repo, &brain).await?;
        runner_pass(repo, effects, policy).await?;
        user_pass(repo, &replies).await?;
        print_snapshot(repo).await?;
    }

    Ok(())
}

async fn seed_demo_sessions(repo: &dyn SessionRepository) -> Result<()> {
    repo.save(&SessionDocument::new("sim_alpha")).await?;

    let mut bravo = SessionDocument::new("sim_bravo");
    bravo.history.push(LedgerEntry::now(
        TOOL_USER_SAID,
        Value::String("Hi, I'm Bravo!".to_string()),
        AgentState::Hello,
        crate::core::ledger::Memory::new(),
        None,
    ));
    repo.save(&bravo).await?;
    Ok(())
}

async fn print_snapshot(repo: &dyn SessionRepository) -> Result<()> {
    println!("=== BULUS SNAPSHOT ===");
    for session_id in repo.list_sessions().await? {
        let doc = repo.load(&session_id).await;
        let (state, memory) = latest_context(&doc.history);
        println!(
            "{session_id:10} | status={:11} | state={state:15} | memory={}",
            doc.metadata.status.to_string(),
            serde_json::to_string(&memory)?,
        );
    }
    println!("======================");
    Ok(())
}
