pub mod assistant;
pub mod config;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod run_loop;
pub mod session;
pub mod tools;
pub mod util;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use config::Config;
pub use error::{Error, Result};
pub use protocol::{Message, MessagePayload, Role};
pub use relay::MessageRelay;
pub use run_loop::{RunLoop, RunOptions};
pub use session::ConversationSession;
