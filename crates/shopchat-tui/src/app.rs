use ratatui::layout::Rect;
use shopchat_core::{AgentClient, AgentError, ChatSession};
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Store,
    Question,
    Log,
}

impl FocusPane {
    pub fn next(self) -> Self {
        match self {
            FocusPane::Store => FocusPane::Question,
            FocusPane::Question => FocusPane::Log,
            FocusPane::Log => FocusPane::Store,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            FocusPane::Store => FocusPane::Log,
            FocusPane::Question => FocusPane::Store,
            FocusPane::Log => FocusPane::Question,
        }
    }
}

pub struct App {
    pub should_quit: bool,
    pub focus: FocusPane,

    // Chat state (store URL, draft, log, phase)
    pub session: ChatSession,
    pub store_cursor: usize, // cursor position in store_url (chars)
    pub draft_cursor: usize, // cursor position in draft (chars)

    // Outstanding agent request
    pub client: AgentClient,
    pub reply_task: Option<JoinHandle<Result<String, AgentError>>>,

    // Log scroll state (updated during render)
    pub log_scroll: u16,
    pub log_max_scroll: u16,
    pub log_height: u16,
    pub follow_log: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub store_area: Option<Rect>,
    pub log_area: Option<Rect>,
    pub question_area: Option<Rect>,
}

impl App {
    pub fn new(session: ChatSession, client: AgentClient) -> Self {
        let store_cursor = session.store_url().chars().count();
        let focus = if session.store_url().is_empty() {
            FocusPane::Store
        } else {
            FocusPane::Question
        };

        Self {
            should_quit: false,
            focus,

            session,
            store_cursor,
            draft_cursor: 0,

            client,
            reply_task: None,

            log_scroll: 0,
            log_max_scroll: 0,
            log_height: 0,
            follow_log: true,

            animation_frame: 0,

            store_area: None,
            log_area: None,
            question_area: None,
        }
    }

    /// Send the current draft, if it can be sent. The request runs on its
    /// own task; [`App::poll_reply`] picks up the result.
    pub fn submit(&mut self) -> bool {
        let Some(request) = self.session.begin_submit() else {
            return false;
        };

        info!(
            store_url = %request.store_url,
            history = request.chat_history.len(),
            "asking agent"
        );

        let client = self.client.clone();
        self.reply_task = Some(tokio::spawn(async move { client.send(&request).await }));
        self.animation_frame = 0;
        self.follow_log = true;
        true
    }

    /// Settle the session once the outstanding request has finished.
    pub async fn poll_reply(&mut self) -> bool {
        let finished = self.reply_task.as_ref().is_some_and(|task| task.is_finished());
        if !finished {
            return false;
        }
        let Some(task) = self.reply_task.take() else {
            return false;
        };

        let settled = match task.await {
            Ok(outcome) => self.session.settle(outcome),
            Err(e) => {
                warn!(error = %e, "agent request task did not complete");
                self.session.settle(Err::<String, _>(format!("request task failed: {}", e)))
            }
        };

        self.draft_cursor = 0;
        self.follow_log = true;
        settled
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.log_scroll = self.log_scroll.saturating_sub(lines);
        self.follow_log = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.log_scroll = self.log_scroll.saturating_add(lines).min(self.log_max_scroll);
        self.follow_log = self.log_scroll >= self.log_max_scroll;
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.log_height / 2).max(1));
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.log_height / 2).max(1));
    }

    pub fn scroll_to_top(&mut self) {
        self.log_scroll = 0;
        self.follow_log = false;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.log_scroll = self.log_max_scroll;
        self.follow_log = true;
    }

    pub fn thinking_indicator(&self) -> String {
        // Animated ellipsis: cycles through ".", "..", "..."
        format!("Agent is thinking{}", ".".repeat((self.animation_frame as usize) + 1))
    }
}
