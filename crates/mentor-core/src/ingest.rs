//! Pull-based driver for one chat request/response cycle
//!
//! `ReplyIngest` opens the chat request, then turns the streamed body into
//! decoded text one step at a time. It never touches the transcript itself;
//! whoever owns the session applies each step, which keeps every mutation on a
//! single task and in arrival order.

use std::sync::Arc;

use futures_util::StreamExt;

use crate::client::{MentorTransport, ReplyBody};
use crate::decoder::Utf8ChunkDecoder;
use crate::error::TransportError;
use crate::state::ChatMessage;

#[derive(Debug)]
pub enum IngestStep {
    /// Decoded text to append to the reply placeholder; never empty
    Chunk(String),
    /// End of stream
    Finished,
    Failed(TransportError),
}

impl IngestStep {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, IngestStep::Chunk(_))
    }
}

enum Phase {
    Pending(Vec<ChatMessage>),
    Streaming(ReplyBody),
    Draining,
    Done,
}

pub struct ReplyIngest {
    transport: Arc<dyn MentorTransport>,
    phase: Phase,
    decoder: Utf8ChunkDecoder,
}

impl ReplyIngest {
    pub fn new(transport: Arc<dyn MentorTransport>, request: Vec<ChatMessage>) -> Self {
        Self {
            transport,
            phase: Phase::Pending(request),
            decoder: Utf8ChunkDecoder::new(),
        }
    }

    /// Advance the cycle. Yields chunks in arrival order, then exactly one
    /// terminal step, then `None` forever.
    pub async fn next_step(&mut self) -> Option<IngestStep> {
        loop {
            match std::mem::replace(&mut self.phase, Phase::Done) {
                Phase::Pending(request) => match self.transport.open_chat(&request).await {
                    Ok(body) => self.phase = Phase::Streaming(body),
                    Err(e) => return Some(IngestStep::Failed(e)),
                },
                Phase::Streaming(mut body) => match body.next().await {
                    Some(Ok(bytes)) => {
                        let text = self.decoder.decode(&bytes);
                        self.phase = Phase::Streaming(body);
                        if !text.is_empty() {
                            return Some(IngestStep::Chunk(text));
                        }
                    }
                    Some(Err(e)) => return Some(IngestStep::Failed(e)),
                    None => {
                        self.phase = Phase::Draining;
                        let tail = self.decoder.finish();
                        if !tail.is_empty() {
                            return Some(IngestStep::Chunk(tail));
                        }
                    }
                },
                Phase::Draining => return Some(IngestStep::Finished),
                Phase::Done => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::FeedbackPayload;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::sync::Mutex;

    struct ScriptedTransport {
        status: Option<StatusCode>,
        chunks: Mutex<Option<Vec<Result<Vec<u8>, TransportError>>>>,
    }

    impl ScriptedTransport {
        fn ok(chunks: Vec<Result<Vec<u8>, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                status: None,
                chunks: Mutex::new(Some(chunks)),
            })
        }

        fn status(status: StatusCode) -> Arc<Self> {
            Arc::new(Self {
                status: Some(status),
                chunks: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl MentorTransport for ScriptedTransport {
        async fn open_chat(&self, _messages: &[ChatMessage]) -> Result<ReplyBody, TransportError> {
            if let Some(status) = self.status {
                return Err(TransportError::Status(status));
            }
            let chunks = self.chunks.lock().unwrap().take().unwrap_or_default();
            Ok(futures_util::stream::iter(chunks).boxed())
        }

        async fn send_feedback(&self, _feedback: &FeedbackPayload) -> Result<(), TransportError> {
            Ok(())
        }
    }

    async fn collect(mut ingest: ReplyIngest) -> Vec<IngestStep> {
        let mut steps = Vec::new();
        while let Some(step) = ingest.next_step().await {
            steps.push(step);
        }
        steps
    }

    fn texts(steps: &[IngestStep]) -> Vec<&str> {
        steps
            .iter()
            .filter_map(|s| match s {
                IngestStep::Chunk(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_chunks_then_finished() {
        let transport = ScriptedTransport::ok(vec![Ok(b"Sure".to_vec()), Ok(b"!".to_vec())]);
        let steps = collect(ReplyIngest::new(transport, Vec::new())).await;

        assert_eq!(texts(&steps), vec!["Sure", "!"]);
        assert!(matches!(steps.last(), Some(IngestStep::Finished)));
        assert_eq!(steps.iter().filter(|s| s.is_terminal()).count(), 1);
    }

    #[tokio::test]
    async fn test_split_character_emitted_once_complete() {
        let transport = ScriptedTransport::ok(vec![Ok(vec![b'a', 0xC3]), Ok(vec![0xA9, b'b'])]);
        let steps = collect(ReplyIngest::new(transport, Vec::new())).await;
        assert_eq!(texts(&steps), vec!["a", "éb"]);
    }

    #[tokio::test]
    async fn test_chunk_completing_nothing_is_skipped() {
        let euro = "€".as_bytes().to_vec();
        let transport = ScriptedTransport::ok(vec![
            Ok(euro[..1].to_vec()),
            Ok(euro[1..2].to_vec()),
            Ok(euro[2..].to_vec()),
        ]);
        let steps = collect(ReplyIngest::new(transport, Vec::new())).await;
        assert_eq!(texts(&steps), vec!["€"]);
    }

    #[tokio::test]
    async fn test_dangling_bytes_flushed_before_finish() {
        let transport = ScriptedTransport::ok(vec![Ok(vec![b'x', 0xF0, 0x9F])]);
        let steps = collect(ReplyIngest::new(transport, Vec::new())).await;
        assert_eq!(texts(&steps), vec!["x", "\u{FFFD}"]);
        assert!(matches!(steps.last(), Some(IngestStep::Finished)));
    }

    #[tokio::test]
    async fn test_error_status_fails_without_chunks() {
        let transport = ScriptedTransport::status(StatusCode::INTERNAL_SERVER_ERROR);
        let steps = collect(ReplyIngest::new(transport, Vec::new())).await;
        assert_eq!(steps.len(), 1);
        assert!(matches!(
            steps[0],
            IngestStep::Failed(TransportError::Status(status)) if status == StatusCode::INTERNAL_SERVER_ERROR
        ));
    }

    #[tokio::test]
    async fn test_stream_error_is_terminal() {
        let transport = ScriptedTransport::ok(vec![
            Ok(b"partial".to_vec()),
            Err(TransportError::Stream("connection reset".to_string())),
            Ok(b"never seen".to_vec()),
        ]);
        let steps = collect(ReplyIngest::new(transport, Vec::new())).await;
        assert_eq!(texts(&steps), vec!["partial"]);
        assert!(matches!(steps.last(), Some(IngestStep::Failed(TransportError::Stream(_)))));
    }
}
