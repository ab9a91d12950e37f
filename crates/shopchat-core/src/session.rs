//! Chat session state and its Idle/Busy transitions
//!
//! All mutable chat state lives in one [`ChatSession`]. Every transition is a
//! plain method; the only side effect (the agent request) happens between
//! [`ChatSession::begin_submit`] and [`ChatSession::settle`], outside this
//! type, so front ends decide how to run it.

use std::fmt::Display;

use tracing::{debug, warn};

use crate::agent::{AgentClient, AgentRequest};
use crate::state::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// Exactly one agent request is outstanding.
    Busy,
}

#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    store_url: String,
    draft: String,
    messages: Vec<ChatMessage>,
    phase: Phase,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store_url(store_url: impl Into<String>) -> Self {
        Self {
            store_url: store_url.into(),
            ..Self::default()
        }
    }

    pub fn store_url(&self) -> &str {
        &self.store_url
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase == Phase::Busy
    }

    /// The store identifier stays editable while a request is outstanding;
    /// it is only read when the next question is submitted.
    pub fn set_store_url(&mut self, store_url: impl Into<String>) {
        self.store_url = store_url.into();
    }

    pub fn edit_store_url(&mut self, edit: impl FnOnce(&mut String)) {
        edit(&mut self.store_url);
    }

    /// Returns `false` (and leaves the draft alone) while Busy.
    pub fn set_draft(&mut self, draft: impl Into<String>) -> bool {
        let draft = draft.into();
        self.edit_draft(|d| *d = draft)
    }

    /// Returns `false` (and leaves the draft alone) while Busy.
    pub fn edit_draft(&mut self, edit: impl FnOnce(&mut String)) -> bool {
        if self.is_busy() {
            return false;
        }
        edit(&mut self.draft);
        true
    }

    pub fn can_submit(&self) -> bool {
        !self.is_busy() && !self.draft.trim().is_empty()
    }

    /// Idle -> Busy. Appends the untrimmed draft as a user message and
    /// returns the request to send. The history is taken from the log as it
    /// was before that append.
    pub fn begin_submit(&mut self) -> Option<AgentRequest> {
        if !self.can_submit() {
            return None;
        }

        let chat_history: Vec<String> = self.messages.iter().map(|m| m.text.clone()).collect();
        let question = self.draft.clone();

        self.messages.push(ChatMessage::user(question.clone()));
        self.phase = Phase::Busy;

        debug!(history = chat_history.len(), "question submitted");

        Some(AgentRequest {
            question,
            store_url: self.store_url.clone(),
            chat_history,
        })
    }

    /// Busy -> Idle. Appends the reply, or `"Error: ..."` on failure, then
    /// clears the draft. No-op returning `false` when nothing is outstanding.
    pub fn settle<E: Display>(&mut self, outcome: Result<String, E>) -> bool {
        if !self.is_busy() {
            return false;
        }

        let message = match outcome {
            Ok(reply) => ChatMessage::agent(reply),
            Err(e) => {
                warn!(error = %e, "agent request failed");
                ChatMessage::agent(format!("Error: {}", e))
            }
        };
        self.messages.push(message);
        self.draft.clear();
        self.phase = Phase::Idle;
        true
    }

    /// Runs one full round trip against `client`. Returns `false` if the
    /// draft could not be submitted.
    pub async fn round_trip(&mut self, client: &AgentClient) -> bool {
        let Some(request) = self.begin_submit() else {
            return false;
        };
        let outcome = client.send(&request).await;
        self.settle(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentError;
    use crate::state::ChatRole;
    use crate::testing::StubServer;

    fn texts(session: &ChatSession) -> Vec<&str> {
        session.messages().iter().map(|m| m.text.as_str()).collect()
    }

    #[test]
    fn test_submit_appends_untrimmed_user_message_and_goes_busy() {
        let mut session = ChatSession::with_store_url("shop.example.com");
        session.set_draft("  hello  ");

        let request = session.begin_submit().unwrap();

        assert_eq!(request.question, "  hello  ");
        assert_eq!(request.store_url, "shop.example.com");
        assert!(request.chat_history.is_empty());
        assert_eq!(session.messages(), &[ChatMessage::user("  hello  ")]);
        assert!(session.is_busy());
        // Draft stays visible until the request settles
        assert_eq!(session.draft(), "  hello  ");
    }

    #[test]
    fn test_whitespace_draft_does_nothing() {
        let mut session = ChatSession::new();
        session.set_draft(" \t\n ");

        assert!(!session.can_submit());
        assert!(session.begin_submit().is_none());
        assert!(session.messages().is_empty());
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.draft(), " \t\n ");
    }

    #[test]
    fn test_no_second_submission_while_busy() {
        let mut session = ChatSession::new();
        session.set_draft("first");
        session.begin_submit().unwrap();

        assert!(!session.can_submit());
        assert!(session.begin_submit().is_none());
        assert!(!session.set_draft("second"));
        assert!(!session.edit_draft(|d| d.push('x')));
        assert_eq!(session.draft(), "first");
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn test_store_url_editable_while_busy() {
        let mut session = ChatSession::new();
        session.set_draft("q");
        let request = session.begin_submit().unwrap();

        session.set_store_url("other.example.com");

        assert_eq!(request.store_url, "");
        assert_eq!(session.store_url(), "other.example.com");
    }

    #[test]
    fn test_settle_success_appends_reply_and_clears() {
        let mut session = ChatSession::new();
        session.set_draft("q");
        session.begin_submit().unwrap();

        assert!(session.settle(Ok::<_, AgentError>("a".to_string())));

        assert_eq!(session.messages()[1], ChatMessage::agent("a"));
        assert_eq!(session.draft(), "");
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn test_settle_failure_prefixes_error() {
        let mut session = ChatSession::new();
        session.set_draft("q");
        session.begin_submit().unwrap();

        assert!(session.settle(Err::<String, _>(AgentError::Api)));

        let last = session.messages().last().unwrap();
        assert_eq!(last.role, ChatRole::Agent);
        assert_eq!(last.text, "Error: API error");
        assert_eq!(session.draft(), "");
        assert!(!session.is_busy());
    }

    #[test]
    fn test_settle_while_idle_is_ignored() {
        let mut session = ChatSession::new();
        assert!(!session.settle(Ok::<_, AgentError>("stray".to_string())));
        assert!(session.messages().is_empty());
    }

    #[test]
    fn test_log_grows_by_two_per_round_trip() {
        let mut session = ChatSession::new();
        let outcomes: Vec<Result<String, AgentError>> = vec![
            Ok("one".to_string()),
            Err(AgentError::Api),
            Err(AgentError::MalformedResponse("missing field".to_string())),
            Ok("four".to_string()),
        ];

        let mut previous: Vec<ChatMessage> = Vec::new();
        for (i, outcome) in outcomes.into_iter().enumerate() {
            session.set_draft(format!("q{}", i));
            session.begin_submit().unwrap();
            session.settle(outcome);

            assert_eq!(session.messages().len(), 2 * (i + 1));
            assert_eq!(&session.messages()[..previous.len()], previous.as_slice());
            previous = session.messages().to_vec();
        }
    }

    #[test]
    fn test_history_excludes_current_question() {
        let mut session = ChatSession::new();
        session.set_draft("Q1");
        session.begin_submit().unwrap();
        session.settle(Ok::<_, AgentError>("A1".to_string()));

        session.set_draft("Q2");
        let request = session.begin_submit().unwrap();

        assert_eq!(request.chat_history, vec!["Q1".to_string(), "A1".to_string()]);
        assert!(!request.chat_history.contains(&"Q2".to_string()));
    }

    #[tokio::test]
    async fn test_scenario_return_policy() {
        let server =
            StubServer::start(vec![(200, r#"{"response":"You have **30 days** to return."}"#)])
                .await;
        let client = AgentClient::new(&server.url());
        let mut session = ChatSession::with_store_url("shop.example.com");
        session.set_draft("What is your return policy?");

        assert!(session.round_trip(&client).await);

        assert_eq!(
            session.messages(),
            &[
                ChatMessage::user("What is your return policy?"),
                ChatMessage::agent("You have **30 days** to return."),
            ]
        );
        assert_eq!(server.requests()[0].body["store_url"], "shop.example.com");
    }

    #[tokio::test]
    async fn test_scenario_server_error() {
        let server = StubServer::start(vec![(500, "")]).await;
        let client = AgentClient::new(&server.url());
        let mut session = ChatSession::new();
        session.set_draft("anything");

        assert!(session.round_trip(&client).await);

        assert_eq!(session.messages().last(), Some(&ChatMessage::agent("Error: API error")));
        assert_eq!(session.draft(), "");
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_scenario_second_question_carries_history() {
        let server = StubServer::start(vec![
            (200, r#"{"response":"reply to Q1"}"#),
            (200, r#"{"response":"reply to Q2"}"#),
        ])
        .await;
        let client = AgentClient::new(&server.url());
        let mut session = ChatSession::new();

        session.set_draft("Q1");
        session.round_trip(&client).await;
        session.set_draft("Q2");
        session.round_trip(&client).await;

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].body["chat_history"], serde_json::json!([]));
        assert_eq!(
            requests[1].body["chat_history"],
            serde_json::json!(["Q1", "reply to Q1"])
        );
        assert_eq!(requests[1].body["question"], "Q2");
        assert_eq!(texts(&session), vec!["Q1", "reply to Q1", "Q2", "reply to Q2"]);
    }

    #[tokio::test]
    async fn test_network_failure_recovers_to_idle() {
        let client = AgentClient::new(&StubServer::unused_url().await);
        let mut session = ChatSession::new();
        session.set_draft("hello?");

        assert!(session.round_trip(&client).await);

        let last = session.messages().last().unwrap();
        assert!(last.text.starts_with("Error: "));
        assert!(session.draft().is_empty());
        assert!(!session.is_busy());

        session.set_draft("again");
        assert!(session.can_submit());
    }

    #[tokio::test]
    async fn test_round_trip_skips_blank_draft() {
        let server = StubServer::start(vec![(200, r#"{"response":"x"}"#)]).await;
        let client = AgentClient::new(&server.url());
        let mut session = ChatSession::new();
        session.set_draft("   ");

        assert!(!session.round_trip(&client).await);
        assert!(server.requests().is_empty());
        assert!(session.messages().is_empty());
    }
}
