use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::Client;

use crate::config::Config;
use crate::error::TransportError;
use crate::feedback::FeedbackPayload;
use crate::state::ChatMessage;

/// Streamed reply body: a lazy, finite, non-restartable sequence of byte chunks
pub type ReplyBody = BoxStream<'static, Result<Vec<u8>, TransportError>>;

/// The two endpoints the chat client talks to
#[async_trait]
pub trait MentorTransport: Send + Sync {
    /// POST the transcript; on a success status, hand back the unread body.
    async fn open_chat(&self, messages: &[ChatMessage]) -> Result<ReplyBody, TransportError>;

    async fn send_feedback(&self, feedback: &FeedbackPayload) -> Result<(), TransportError>;
}

#[derive(Clone)]
pub struct MentorClient {
    client: Client,
    chat_url: String,
    feedback_url: String,
}

impl MentorClient {
    pub fn new(base_url: &str) -> Self {
        Self::from_config(&Config {
            base_url: base_url.to_string(),
            ..Config::new()
        })
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            client: Client::new(),
            chat_url: config.chat_url(),
            feedback_url: config.feedback_url(),
        }
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    pub fn feedback_url(&self) -> &str {
        &self.feedback_url
    }
}

#[async_trait]
impl MentorTransport for MentorClient {
    async fn open_chat(&self, messages: &[ChatMessage]) -> Result<ReplyBody, TransportError> {
        tracing::info!(url = %self.chat_url, messages = messages.len(), "opening chat stream");

        let response = self
            .client
            .post(&self.chat_url)
            .json(messages)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TransportError::Status(response.status()));
        }

        let body = response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| TransportError::Stream(e.to_string()))
            })
            .boxed();

        Ok(body)
    }

    async fn send_feedback(&self, feedback: &FeedbackPayload) -> Result<(), TransportError> {
        tracing::info!(url = %self.feedback_url, rating = feedback.rating, "sending feedback");

        let response = self
            .client
            .post(&self.feedback_url)
            .json(feedback)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TransportError::Status(response.status()));
        }

        Ok(())
    }
}
