use reqwest::StatusCode;
use thiserror::Error;

use crate::activity::Operation;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("server responded with status {0}")]
    Status(StatusCode),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("response stream failed: {0}")]
    Stream(String),
}

/// Why a send never reached the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendRejected {
    #[error("message is empty")]
    EmptyInput,
    #[error("a {0} request is already in flight")]
    Busy(Operation),
}
