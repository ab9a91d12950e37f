pub mod agent;
pub mod config;
pub mod session;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use agent::{AgentClient, AgentError, AgentRequest, DEFAULT_ENDPOINT};
pub use config::Config;
pub use session::{ChatSession, Phase};
pub use state::{ChatMessage, ChatRole};
