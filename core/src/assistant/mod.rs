//! Remote conversational assistant service
//!
//! The run loop talks to the service only through [`AssistantService`], so
//! tests and alternative backends can be swapped in.

pub mod openai;
pub mod types;

pub use openai::OpenAiAssistants;
pub use types::{
    Assistant, AssistantSpec, ContentBlock, FunctionCall, FunctionDefinition, MessageRole,
    RequiredAction, Run, RunError, RunStatus, SubmitToolOutputs, Thread, ThreadMessage, ToolCall,
    ToolDefinition, ToolOutput,
};

use crate::error::Result;
use async_trait::async_trait;

/// Capability interface of a hosted assistant with threads and runs.
///
/// Every method is one remote call and fails with
/// [`Error::Upstream`](crate::Error::Upstream) on transport or remote failure.
#[async_trait]
pub trait AssistantService: Send + Sync {
    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<Assistant>;

    async fn create_thread(&self) -> Result<Thread>;

    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ThreadMessage>;

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        additional_instructions: Option<&str>,
    ) -> Result<Run>;

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    /// Submit all outputs of one `requires_action` observation at once
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run>;

    /// Messages of a thread, newest first
    async fn list_messages(&self, thread_id: &str, limit: u32) -> Result<Vec<ThreadMessage>>;
}
