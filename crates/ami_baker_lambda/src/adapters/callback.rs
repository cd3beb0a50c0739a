use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackError {
    #[error("failed to serialize callback response: {0}")]
    Serialization(String),

    #[error("failed to deliver callback response: {0}")]
    Transport(String),

    #[error("callback endpoint rejected response with status {status}")]
    Rejected { status: u16 },
}

/// Delivers a serialized callback body to the orchestrator's response URL.
pub trait CallbackSender {
    fn send(&self, response_url: &str, body: &[u8]) -> Result<(), CallbackError>;
}
