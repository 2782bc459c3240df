//! Unsaved-changes guard for every way out of a desk session

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Why the desk session is being left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    ClearPatron,
    NavigateAway,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitDecision {
    Proceed,
    Stay,
}

/// Asks the operator to confirm discarding pending actions
#[async_trait]
pub trait ConfirmPrompt: Send + Sync {
    /// `true` only on an explicit affirmative answer
    async fn confirm(&self, message: &str) -> bool;
}

/// Answer decided up front, e.g. a `confirm` flag sent by the UI
#[derive(Debug, Clone, Copy)]
pub struct PresetAnswer(pub bool);

#[async_trait]
impl ConfirmPrompt for PresetAnswer {
    async fn confirm(&self, _message: &str) -> bool {
        self.0
    }
}

pub const DISCARD_PROMPT: &str =
    "Some circulation actions have not been applied. Leave and discard them?";

/// Let the exit through when nothing is pending, otherwise only on confirmation
pub async fn guard_exit(has_pending_actions: bool, reason: ExitReason, prompt: &dyn ConfirmPrompt) -> ExitDecision {
    if !has_pending_actions {
        return ExitDecision::Proceed;
    }

    if prompt.confirm(DISCARD_PROMPT).await {
        tracing::info!("Pending actions discarded on {:?}", reason);
        ExitDecision::Proceed
    } else {
        ExitDecision::Stay
    }
}
