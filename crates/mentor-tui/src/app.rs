use std::sync::Arc;

use mentor_core::{
    Activity, ChatSession, Config, IngestStep, MentorTransport, Operation, ReplyIngest,
    SendRejected, TransportError, MAX_RATING,
};
use ratatui::layout::Rect;
use tokio::sync::mpsc;

use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Input,      // Message box
    Stars,      // Rating row
    Feedback,   // Feedback text box
    Transcript,
}

impl FocusPane {
    pub fn next(self) -> Self {
        match self {
            FocusPane::Input => FocusPane::Stars,
            FocusPane::Stars => FocusPane::Feedback,
            FocusPane::Feedback => FocusPane::Transcript,
            FocusPane::Transcript => FocusPane::Input,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            FocusPane::Input => FocusPane::Transcript,
            FocusPane::Stars => FocusPane::Input,
            FocusPane::Feedback => FocusPane::Stars,
            FocusPane::Transcript => FocusPane::Feedback,
        }
    }

    pub fn is_text_input(self) -> bool {
        matches!(self, FocusPane::Input | FocusPane::Feedback)
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Conversation, busy gate and feedback draft
    pub session: ChatSession,
    pub transport: Arc<dyn MentorTransport>,
    events: mpsc::UnboundedSender<AppEvent>,

    // Message input
    pub message_input: String,
    pub message_cursor: usize, // cursor position in message_input (chars)

    // Feedback text cursor (the text itself lives in the session draft)
    pub feedback_cursor: usize,

    // Transcript scrolling
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of transcript area for scroll calculations
    pub chat_width: u16,  // Width of transcript area for wrap calculations

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub stars_area: Option<Rect>,
}

impl App {
    pub fn new(
        config: &Config,
        transport: Arc<dyn MentorTransport>,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Input,

            session: ChatSession::new(config.greeting()),
            transport,
            events,

            message_input: String::new(),
            message_cursor: 0,
            feedback_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,

            chat_area: None,
            stars_area: None,
        }
    }

    /// Append the exchange and stream the reply on a background task.
    ///
    /// Blank input and sends while busy are dropped; the typed text stays put
    /// in the latter case so nothing is lost.
    pub fn send_message(&mut self) {
        let request = match self.session.begin_send(&self.message_input) {
            Ok(request) => request,
            Err(SendRejected::EmptyInput) => return,
            Err(e @ SendRejected::Busy(_)) => {
                tracing::debug!(error = %e, "send ignored");
                return;
            }
        };

        self.message_input.clear();
        self.message_cursor = 0;
        self.scroll_chat_to_bottom();

        let transport = self.transport.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let mut ingest = ReplyIngest::new(transport, request);
            while let Some(step) = ingest.next_step().await {
                if events.send(AppEvent::Reply(step)).is_err() {
                    break;
                }
            }
        });
    }

    pub fn apply_reply(&mut self, step: IngestStep) {
        self.session.apply_step(step);
        self.scroll_chat_to_bottom();
    }

    pub fn submit_feedback(&mut self) {
        let payload = match self.session.begin_feedback() {
            Ok(Some(payload)) => payload,
            Ok(None) => return,
            Err(e) => {
                tracing::debug!(error = %e, "feedback ignored");
                return;
            }
        };

        let transport = self.transport.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = transport.send_feedback(&payload).await;
            let _ = events.send(AppEvent::FeedbackDone(result));
        });
    }

    /// Text boxes are read-only while any request is in flight
    pub fn inputs_locked(&self) -> bool {
        self.session.is_busy()
    }

    /// The draft is about to be cleared on success, so it can't change meanwhile
    pub fn feedback_in_flight(&self) -> bool {
        self.session.activity() == Activity::Busy(Operation::Feedback)
    }

    pub fn set_rating(&mut self, rating: u8) {
        if !self.feedback_in_flight() {
            self.session.draft_mut().set_rating(rating);
        }
    }

    pub fn star_up(&mut self) {
        if !self.feedback_in_flight() {
            self.session.draft_mut().star_up();
        }
    }

    pub fn star_down(&mut self) {
        if !self.feedback_in_flight() {
            self.session.draft_mut().star_down();
        }
    }

    pub fn finish_feedback(&mut self, result: Result<(), TransportError>) {
        self.session.finish_feedback(result);
        let len = self.session.draft().text.chars().count();
        self.feedback_cursor = self.feedback_cursor.min(len);
    }

    pub fn set_rating_from_click(&mut self, column: u16) {
        if let Some(area) = self.stars_area {
            // Stars are drawn two cells apart starting inside the border
            let offset = column.saturating_sub(area.x + 1) / 2;
            if offset < MAX_RATING as u16 {
                self.set_rating(offset as u8 + 1);
            }
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.awaiting_first_chunk() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_down(&mut self) {
        let max = self.max_chat_scroll();
        if self.chat_scroll < max {
            self.chat_scroll = self.chat_scroll.saturating_add(1);
        }
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_half_page_down(&mut self) {
        let half_page = self.chat_height / 2;
        self.chat_scroll = self.chat_scroll.saturating_add(half_page).min(self.max_chat_scroll());
    }

    pub fn scroll_half_page_up(&mut self) {
        let half_page = self.chat_height / 2;
        self.chat_scroll = self.chat_scroll.saturating_sub(half_page);
    }

    /// Keep the newest text in view; called whenever the transcript changes
    pub fn scroll_chat_to_bottom(&mut self) {
        self.chat_scroll = self.max_chat_scroll();
    }

    fn max_chat_scroll(&self) -> u16 {
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };
        self.transcript_line_count().saturating_sub(visible_height)
    }

    /// Rendered height of the transcript at the current wrap width, capped at
    /// `u16::MAX` since that is as far as the paragraph can scroll
    pub fn transcript_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;

        for msg in self.session.messages() {
            // Role line, then the blank line after the message
            total_lines = total_lines.saturating_add(2);
            if msg.content.is_empty() {
                total_lines = total_lines.saturating_add(1); // Placeholder or "Thinking..."
            }
            for line in msg.content.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                total_lines = total_lines.saturating_add(char_count.div_ceil(wrap_width).max(1));
            }
        }

        u16::try_from(total_lines).unwrap_or(u16::MAX)
    }
}
