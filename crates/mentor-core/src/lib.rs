pub mod activity;
pub mod client;
pub mod config;
pub mod decoder;
pub mod error;
pub mod feedback;
pub mod ingest;
pub mod session;
pub mod state;
pub mod transcript;

// Re-export main types for convenience
pub use activity::{Activity, ActivityGate, Operation, Permit};
pub use client::{MentorClient, MentorTransport, ReplyBody};
pub use config::Config;
pub use decoder::Utf8ChunkDecoder;
pub use error::{SendRejected, TransportError};
pub use feedback::{FeedbackDraft, FeedbackPayload, Notice, MAX_RATING};
pub use ingest::{IngestStep, ReplyIngest};
pub use session::{ChatSession, SendOutcome};
pub use state::{ChatMessage, ChatRole};
pub use transcript::{Transcript, APOLOGY, DEFAULT_GREETING};
