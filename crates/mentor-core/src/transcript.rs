//! Ordered, append-only chat transcript
//!
//! Insertion order is chronological order is rendering order. The transcript
//! always opens with a single assistant greeting, and the last record is always
//! an assistant record: the greeting before the first send, the reply
//! placeholder afterwards.

use crate::state::{ChatMessage, ChatRole};

/// Greeting shown before the user has said anything
pub const DEFAULT_GREETING: &str = "Hi! I'm an AI support assistant. My goal is to help you find and get a CS internship. How can I help you today?";

/// Replaces a reply whose stream failed
pub const APOLOGY: &str = "I'm sorry, but I encountered an error. Please try again later.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new(DEFAULT_GREETING)
    }
}

impl Transcript {
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::assistant(greeting)],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Never true; the greeting is always present
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Append the user's text and an empty assistant placeholder.
    ///
    /// Returns `false` (and appends nothing) when the text is blank. Admission
    /// against an in-flight request is the caller's job.
    pub fn append_exchange(&mut self, user_text: &str) -> bool {
        if user_text.trim().is_empty() {
            return false;
        }
        self.messages.push(ChatMessage::user(user_text));
        self.messages.push(ChatMessage::assistant(String::new()));
        true
    }

    /// Grow the trailing assistant record by `text`.
    pub fn append_chunk(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.last_assistant_mut() {
            last.content.push_str(text);
        }
    }

    /// Discard whatever was streamed into the trailing record and show `message`.
    pub fn replace_last_with_error(&mut self, message: &str) {
        if let Some(last) = self.last_assistant_mut() {
            last.content.clear();
            last.content.push_str(message);
        }
    }

    /// What the chat endpoint receives: everything up to and including the
    /// newest user message, without the trailing empty placeholder.
    pub fn request_payload(&self) -> Vec<ChatMessage> {
        let end = match self.messages.last() {
            Some(last) if last.role == ChatRole::Assistant && last.content.is_empty() => {
                self.messages.len() - 1
            }
            _ => self.messages.len(),
        };
        self.messages[..end].to_vec()
    }

    fn last_assistant_mut(&mut self) -> Option<&mut ChatMessage> {
        self.messages
            .last_mut()
            .filter(|m| m.role == ChatRole::Assistant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_transcript_has_only_greeting() {
        let transcript = Transcript::new("Hi!");
        assert_eq!(transcript.messages(), &[ChatMessage::assistant("Hi!")]);
        assert!(!transcript.is_empty());
    }

    #[test]
    fn test_append_exchange_adds_user_and_placeholder() {
        let mut transcript = Transcript::new("Hi!");
        assert!(transcript.append_exchange("intern advice?"));
        assert_eq!(
            transcript.messages(),
            &[
                ChatMessage::assistant("Hi!"),
                ChatMessage::user("intern advice?"),
                ChatMessage::assistant(""),
            ]
        );
    }

    #[test]
    fn test_append_exchange_keeps_literal_text() {
        let mut transcript = Transcript::default();
        assert!(transcript.append_exchange("  spaced out  "));
        assert_eq!(transcript.messages()[1].content, "  spaced out  ");
    }

    #[test]
    fn test_append_exchange_rejects_blank() {
        let mut transcript = Transcript::default();
        assert!(!transcript.append_exchange(""));
        assert!(!transcript.append_exchange(" \n\t "));
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn test_chunks_fold_in_order() {
        let mut split = Transcript::new("Hi!");
        split.append_exchange("q");
        split.append_chunk("Hel");
        split.append_chunk("lo");

        let mut whole = Transcript::new("Hi!");
        whole.append_exchange("q");
        whole.append_chunk("Hello");

        assert_eq!(split, whole);
        assert_eq!(split.last().unwrap().content, "Hello");
    }

    #[test]
    fn test_append_chunk_leaves_earlier_records() {
        let mut transcript = Transcript::new("Hi!");
        transcript.append_exchange("first");
        transcript.append_chunk("one");
        let before: Vec<_> = transcript.messages().to_vec();

        transcript.append_exchange("second");
        transcript.append_chunk("two");

        assert_eq!(&transcript.messages()[..3], before.as_slice());
    }

    #[test]
    fn test_empty_chunk_is_noop() {
        let mut transcript = Transcript::new("Hi!");
        transcript.append_exchange("q");
        let before = transcript.clone();
        transcript.append_chunk("");
        assert_eq!(transcript, before);
    }

    #[test]
    fn test_replace_last_with_error_discards_partial() {
        let mut transcript = Transcript::new("Hi!");
        transcript.append_exchange("q");
        transcript.append_chunk("half an ans");
        transcript.replace_last_with_error(APOLOGY);
        assert_eq!(transcript.last().unwrap(), &ChatMessage::assistant(APOLOGY));
        assert_eq!(transcript.len(), 3);
    }

    #[test]
    fn test_request_payload_excludes_placeholder() {
        let mut transcript = Transcript::new("Hi!");
        transcript.append_exchange("intern advice?");
        assert_eq!(
            transcript.request_payload(),
            vec![
                ChatMessage::assistant("Hi!"),
                ChatMessage::user("intern advice?"),
            ]
        );
    }

    #[test]
    fn test_roles_alternate_after_sends() {
        let mut transcript = Transcript::default();
        for n in 0..4 {
            transcript.append_exchange(&format!("question {}", n));
            transcript.append_chunk("answer");
        }
        assert_eq!(transcript.len(), 1 + 2 * 4);
        for (i, msg) in transcript.messages().iter().enumerate() {
            let expected = if i % 2 == 0 { ChatRole::Assistant } else { ChatRole::User };
            assert_eq!(msg.role, expected, "record {}", i);
        }
    }
}
