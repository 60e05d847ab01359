//! Star rating plus free-text feedback
//!
//! The draft lives outside the transcript and is only cleared once the
//! feedback endpoint accepts it.

use serde::{Deserialize, Serialize};

pub const MAX_RATING: u8 = 5;

/// Wire body for the feedback endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackPayload {
    pub feedback: String,
    pub rating: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackDraft {
    rating: u8,
    pub text: String,
}

impl FeedbackDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// 0 means unset
    pub fn rating(&self) -> u8 {
        self.rating
    }

    /// Set the star count; anything above `MAX_RATING` is refused.
    pub fn set_rating(&mut self, rating: u8) -> bool {
        if rating > MAX_RATING {
            return false;
        }
        self.rating = rating;
        true
    }

    pub fn star_up(&mut self) {
        self.rating = (self.rating + 1).min(MAX_RATING);
    }

    pub fn star_down(&mut self) {
        self.rating = self.rating.saturating_sub(1);
    }

    /// Nothing worth sending unless there is text or a rating
    pub fn is_submittable(&self) -> bool {
        !self.text.trim().is_empty() || self.rating > 0
    }

    pub fn payload(&self) -> FeedbackPayload {
        FeedbackPayload {
            feedback: self.text.clone(),
            rating: self.rating,
        }
    }

    pub fn reset(&mut self) {
        self.rating = 0;
        self.text.clear();
    }
}

/// User-facing outcome of a feedback submit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    FeedbackThanks,
    FeedbackFailed,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::FeedbackThanks => "Thank you for your valued feedback! ⭐️",
            Notice::FeedbackFailed => "Failed to send feedback. Please try again later.",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::FeedbackFailed)
    }
}
