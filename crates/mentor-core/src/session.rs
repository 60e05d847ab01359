//! The owned state behind one chat window
//!
//! `ChatSession` holds the transcript, the activity gate, the feedback draft
//! and the last notice, and is the only thing that mutates them. Front ends
//! either drive a whole cycle in-line (`send`, `submit_feedback`) or split it
//! into `begin_*` / apply / `finish_*` calls so the network part can run
//! elsewhere while the UI keeps rendering.

use std::sync::Arc;

use crate::activity::{Activity, ActivityGate, Operation, Permit};
use crate::client::MentorTransport;
use crate::error::{SendRejected, TransportError};
use crate::feedback::{FeedbackDraft, FeedbackPayload, Notice};
use crate::ingest::{IngestStep, ReplyIngest};
use crate::state::ChatMessage;
use crate::transcript::{Transcript, APOLOGY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Completed,
    Failed,
}

#[derive(Debug, Default)]
pub struct ChatSession {
    transcript: Transcript,
    gate: ActivityGate,
    in_flight: Option<Permit>,
    draft: FeedbackDraft,
    notice: Option<Notice>,
}

impl ChatSession {
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            transcript: Transcript::new(greeting),
            ..Self::default()
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.transcript.messages()
    }

    pub fn activity(&self) -> Activity {
        self.gate.state()
    }

    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    /// True while a reply is streaming but nothing has arrived yet
    pub fn awaiting_first_chunk(&self) -> bool {
        self.activity() == Activity::Busy(Operation::Chat)
            && self.transcript.last().is_some_and(|m| m.content.is_empty())
    }

    pub fn draft(&self) -> &FeedbackDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut FeedbackDraft {
        &mut self.draft
    }

    pub fn notice(&self) -> Option<Notice> {
        self.notice
    }

    pub fn dismiss_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    /// Append the exchange and take the gate. Returns the request body for the
    /// chat endpoint; nothing is mutated when the send is rejected.
    pub fn begin_send(&mut self, text: &str) -> Result<Vec<ChatMessage>, SendRejected> {
        if text.trim().is_empty() {
            return Err(SendRejected::EmptyInput);
        }
        let permit = self.gate.try_acquire(Operation::Chat).map_err(SendRejected::Busy)?;
        self.in_flight = Some(permit);

        self.transcript.append_exchange(text);
        tracing::info!(records = self.transcript.len(), "chat send started");
        Ok(self.transcript.request_payload())
    }

    /// Fold one ingest step into the transcript. Returns the outcome once the
    /// step was terminal and the gate has been released.
    pub fn apply_step(&mut self, step: IngestStep) -> Option<SendOutcome> {
        if self.activity() != Activity::Busy(Operation::Chat) {
            tracing::warn!(?step, "ingest step with no chat in flight, ignoring");
            return None;
        }

        match step {
            IngestStep::Chunk(text) => {
                self.transcript.append_chunk(&text);
                None
            }
            IngestStep::Finished => {
                tracing::info!("chat stream finished");
                self.release();
                Some(SendOutcome::Completed)
            }
            IngestStep::Failed(e) => {
                tracing::warn!(error = %e, "chat stream failed");
                self.transcript.replace_last_with_error(APOLOGY);
                self.release();
                Some(SendOutcome::Failed)
            }
        }
    }

    /// Run a complete send on the current task.
    pub async fn send(
        &mut self,
        transport: Arc<dyn MentorTransport>,
        text: &str,
    ) -> Result<SendOutcome, SendRejected> {
        let request = self.begin_send(text)?;
        let mut ingest = ReplyIngest::new(transport, request);

        while let Some(step) = ingest.next_step().await {
            if let Some(outcome) = self.apply_step(step) {
                return Ok(outcome);
            }
        }
        unreachable!("reply ingest ended without a terminal step")
    }

    /// Take the gate for a feedback submit. `Ok(None)` means there was nothing
    /// to send and nothing changed.
    pub fn begin_feedback(&mut self) -> Result<Option<FeedbackPayload>, SendRejected> {
        if !self.draft.is_submittable() {
            return Ok(None);
        }
        let permit = self
            .gate
            .try_acquire(Operation::Feedback)
            .map_err(SendRejected::Busy)?;
        self.in_flight = Some(permit);

        tracing::info!(rating = self.draft.rating(), "feedback submit started");
        Ok(Some(self.draft.payload()))
    }

    pub fn finish_feedback(&mut self, result: Result<(), TransportError>) -> Notice {
        let notice = match result {
            Ok(()) => {
                self.draft.reset();
                Notice::FeedbackThanks
            }
            Err(e) => {
                tracing::warn!(error = %e, "feedback submit failed");
                Notice::FeedbackFailed
            }
        };
        if self.activity() == Activity::Busy(Operation::Feedback) {
            self.release();
        }
        self.notice = Some(notice);
        notice
    }

    pub async fn submit_feedback(
        &mut self,
        transport: Arc<dyn MentorTransport>,
    ) -> Result<Option<Notice>, SendRejected> {
        let Some(payload) = self.begin_feedback()? else {
            return Ok(None);
        };
        let result = transport.send_feedback(&payload).await;
        Ok(Some(self.finish_feedback(result)))
    }

    fn release(&mut self) {
        if let Some(permit) = self.in_flight.take() {
            self.gate.release(permit);
        }
    }
}
