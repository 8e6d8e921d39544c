use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Delivery failure taxonomy the dispatcher classifies on.
#[derive(Error, Debug)]
pub enum MessengerError {
    /// The channel throttled us; the dispatcher backs its cadence off.
    #[error("Rate limited by the messaging channel")]
    RateLimited { retry_after: Option<u64> },

    /// The target message no longer exists or cannot be edited; the
    /// session is deactivated.
    #[error("Target message no longer editable")]
    MessageGone,

    /// Anything else; logged, the session stays active.
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// One inline keyboard button.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub enum KeyboardButton {
    WebApp { label: String, url: String },
    Callback { label: String, data: String },
}

/// Inline keyboard attached to every broadcast edit.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct Keyboard {
    pub rows: Vec<Vec<KeyboardButton>>,
}

/// Trait defining the contract for the outbound messaging channel.
#[async_trait]
pub trait MessengerTrait: Send + Sync {
    /// Edits a previously sent message in place.
    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: &Keyboard,
    ) -> std::result::Result<(), MessengerError>;
}
