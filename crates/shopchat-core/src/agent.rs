//! HTTP client for the remote store agent
//!
//! One request/response exchange per call: the question, the store
//! identifier and the prior chat texts go out as JSON, the `response`
//! string comes back.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/api/chat";

/// Payload posted to the agent endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub question: String,
    pub store_url: String,
    pub chat_history: Vec<String>,
}

#[derive(Deserialize)]
struct AgentResponse {
    response: String,
}

#[derive(Debug, Error)]
pub enum AgentError {
    /// The endpoint answered with a non-success status. The status itself
    /// is only logged.
    #[error("API error")]
    Api,
    #[error("{0}")]
    Network(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Clone)]
pub struct AgentClient {
    client: Client,
    endpoint: String,
}

impl AgentClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn ask(
        &self,
        question: &str,
        store_url: &str,
        chat_history: &[String],
    ) -> Result<String, AgentError> {
        let request = AgentRequest {
            question: question.to_string(),
            store_url: store_url.to_string(),
            chat_history: chat_history.to_vec(),
        };
        self.send(&request).await
    }

    pub async fn send(&self, request: &AgentRequest) -> Result<String, AgentError> {
        debug!(
            endpoint = %self.endpoint,
            history = request.chat_history.len(),
            "sending question to agent"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!(%status, "agent endpoint rejected request");
            return Err(AgentError::Api);
        }

        let body = response.text().await?;
        let agent_response: AgentResponse = serde_json::from_str(&body)
            .map_err(|e| AgentError::MalformedResponse(e.to_string()))?;

        debug!(chars = agent_response.response.len(), "agent replied");
        Ok(agent_response.response)
    }
}
