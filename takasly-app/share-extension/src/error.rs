use thiserror::Error;

use crate::state::HandoffPhase;

#[derive(Error, Debug)]
pub enum ShareError {
    #[error("Attachment load failed: {0}")]
    Load(String),

    #[error("Unsupported content: {0}")]
    UnsupportedContent(String),

    #[error("Shared container error: {0}")]
    Container(String),

    #[error("Handoff record error: {0}")]
    Record(String),

    #[error("Activation failed: {0}")]
    Activation(String),

    #[error("No handler can open {0}")]
    NoActivationHandler(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid phase transition: {from:?} -> {to:?}")]
    InvalidTransition { from: HandoffPhase, to: HandoffPhase },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl serde::Serialize for ShareError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShareError>;
