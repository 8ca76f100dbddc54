use async_trait::async_trait;
use serde_json::Value;

/// External side-effect collaborators invoked by the runner.
///
/// Fire-and-forget from the ledger's perspective: outcomes are not encoded
/// back into entries, so none of these return a value.
#[async_trait]
pub trait SideEffects: Send + Sync {
    /// Deliver text to the human participant.
    async fn send_message(&self, text: &str);

    /// Trigger the downstream ping service; the session has reached the
    /// terminal data-collection point.
    async fn test_ping(&self, payload: &Value);

    /// Surface a diagnostic to an operator channel, never to the
    /// conversation.
    async fn report_error(&self, thought: &str);
}

/// Console-backed effects for the interactive loop and the simulator.
pub struct ConsoleEffects;

#[async_trait]
impl SideEffects for ConsoleEffects {
    async fn send_message(&self, text: &str) {
        println!(" >>> [MESSAGE SENT]: {text}");
    }

    async fn test_ping(&self, payload: &Value) {
        tracing::info!(%payload, "ping triggered");
        println!(" >>> PONG! (backend service triggered)");
    }

    async fn report_error(&self, thought: &str) {
        tracing::error!(thought, "brain reported an error");
    }
}
