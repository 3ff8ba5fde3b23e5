use chat_api::ChatApiError;
use thiserror::Error;

use crate::chat::TurnId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("assistant message cannot directly follow another assistant message")]
    ConsecutiveAssistant,

    #[error("message content must not be empty")]
    EmptyContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("prompt must not be empty")]
    EmptyPrompt,

    #[error("turn {0} is still in flight")]
    TurnInFlight(TurnId),

    #[error("stale report for turn {actual}; in-flight turn is {expected:?}")]
    StaleTurn {
        expected: Option<TurnId>,
        actual: TurnId,
    },

    #[error(transparent)]
    Conversation(#[from] ConversationError),
}

/// Why a turn ended without an answer.
#[derive(Debug, Error)]
pub enum TurnFailure {
    #[error(transparent)]
    Transport(#[from] ChatApiError),

    /// Message carried by a server `error` event.
    #[error("{0}")]
    Server(String),
}

impl TurnFailure {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
