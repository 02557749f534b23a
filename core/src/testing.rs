//! Scripted in-memory doubles of the remote services

use crate::assistant::{
    Assistant, AssistantService, AssistantSpec, ContentBlock, FunctionCall, MessageRole,
    RequiredAction, Run, RunError, RunStatus, SubmitToolOutputs, Thread, ThreadMessage, ToolCall,
    ToolOutput,
};
use crate::error::{Error, Result};
use crate::tools::{CatSearch, SearchCatsArgs, SearchOutcome};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

pub fn run(status: RunStatus) -> Run {
    Run {
        id: "run_1".to_string(),
        status,
        required_action: None,
        last_error: None,
    }
}

pub fn failed_run(status: RunStatus, message: &str) -> Run {
    Run {
        last_error: Some(RunError {
            code: Some("server_error".to_string()),
            message: message.to_string(),
        }),
        ..run(status)
    }
}

pub fn requires_action(calls: &[(&str, &str, &str)]) -> Run {
    let tool_calls = calls
        .iter()
        .map(|(id, name, arguments)| ToolCall {
            id: id.to_string(),
            type_: "function".to_string(),
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        })
        .collect();
    Run {
        required_action: Some(RequiredAction {
            type_: "submit_tool_outputs".to_string(),
            submit_tool_outputs: Some(SubmitToolOutputs { tool_calls }),
        }),
        ..run(RunStatus::RequiresAction)
    }
}

/// Message attributed to the scripted run `run_1`
pub fn message(role: MessageRole, content: Vec<ContentBlock>) -> ThreadMessage {
    ThreadMessage {
        id: format!("msg_{}", content.len()),
        role,
        content,
        run_id: Some("run_1".to_string()),
    }
}

pub fn assistant_text(text: &str) -> ThreadMessage {
    message(
        MessageRole::Assistant,
        vec![ContentBlock::Text {
            value: text.to_string(),
        }],
    )
}

#[derive(Default)]
struct FakeState {
    next_id: u32,
    assistants_created: usize,
    threads_created: usize,
    user_messages: Vec<(String, String)>,
    runs: VecDeque<Run>,
    run_instructions: Vec<Option<String>>,
    retrievals: usize,
    submissions: Vec<Vec<ToolOutput>>,
    messages: Vec<ThreadMessage>,
}

/// Assistant service that replays a script of run observations.
///
/// `create_run`, `retrieve_run` and `submit_tool_outputs` each consume the
/// next scripted run; the last one repeats forever.
#[derive(Default)]
pub struct FakeAssistant {
    state: Mutex<FakeState>,
    fail_assistant_creation: bool,
    fail_operation: Option<&'static str>,
}

impl FakeAssistant {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_runs(self, runs: Vec<Run>) -> Self {
        self.state.lock().runs = runs.into();
        self
    }

    /// Messages returned by `list_messages`, newest first
    pub fn with_messages(self, messages: Vec<ThreadMessage>) -> Self {
        self.state.lock().messages = messages;
        self
    }

    pub fn failing_assistant_creation(mut self) -> Self {
        self.fail_assistant_creation = true;
        self
    }

    pub fn failing(mut self, operation: &'static str) -> Self {
        self.fail_operation = Some(operation);
        self
    }

    pub fn assistants_created(&self) -> usize {
        self.state.lock().assistants_created
    }

    pub fn threads_created(&self) -> usize {
        self.state.lock().threads_created
    }

    pub fn user_messages(&self) -> Vec<(String, String)> {
        self.state.lock().user_messages.clone()
    }

    pub fn run_instructions(&self) -> Vec<Option<String>> {
        self.state.lock().run_instructions.clone()
    }

    pub fn retrievals(&self) -> usize {
        self.state.lock().retrievals
    }

    pub fn submissions(&self) -> Vec<Vec<ToolOutput>> {
        self.state.lock().submissions.clone()
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        if self.fail_operation == Some(operation) {
            return Err(Error::upstream(operation, "connection reset by peer"));
        }
        Ok(())
    }

    fn next_run(&self) -> Run {
        let mut state = self.state.lock();
        if state.runs.len() > 1 {
            state.runs.pop_front().unwrap_or_else(|| run(RunStatus::Completed))
        } else {
            state
                .runs
                .front()
                .cloned()
                .unwrap_or_else(|| run(RunStatus::Completed))
        }
    }
}

#[async_trait]
impl AssistantService for FakeAssistant {
    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<Assistant> {
        if self.fail_assistant_creation {
            return Err(Error::upstream("create_assistant", "model not found"));
        }
        let mut state = self.state.lock();
        state.assistants_created += 1;
        state.next_id += 1;
        Ok(Assistant {
            id: format!("asst_{}", state.next_id),
            name: Some(spec.name.clone()),
        })
    }

    async fn create_thread(&self) -> Result<Thread> {
        self.check("create_thread")?;
        let mut state = self.state.lock();
        state.threads_created += 1;
        state.next_id += 1;
        Ok(Thread {
            id: format!("thread_{}", state.next_id),
        })
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ThreadMessage> {
        self.check("create_message")?;
        self.state
            .lock()
            .user_messages
            .push((thread_id.to_string(), content.to_string()));
        Ok(message(
            role,
            vec![ContentBlock::Text {
                value: content.to_string(),
            }],
        ))
    }

    async fn create_run(
        &self,
        _thread_id: &str,
        _assistant_id: &str,
        additional_instructions: Option<&str>,
    ) -> Result<Run> {
        self.check("create_run")?;
        self.state
            .lock()
            .run_instructions
            .push(additional_instructions.map(str::to_string));
        Ok(self.next_run())
    }

    async fn retrieve_run(&self, _thread_id: &str, _run_id: &str) -> Result<Run> {
        self.check("retrieve_run")?;
        self.state.lock().retrievals += 1;
        Ok(self.next_run())
    }

    async fn submit_tool_outputs(
        &self,
        _thread_id: &str,
        _run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run> {
        self.check("submit_tool_outputs")?;
        self.state.lock().submissions.push(outputs.to_vec());
        Ok(self.next_run())
    }

    async fn list_messages(&self, _thread_id: &str, _limit: u32) -> Result<Vec<ThreadMessage>> {
        self.check("list_messages")?;
        Ok(self.state.lock().messages.clone())
    }
}

/// Cat search returning a fixed outcome and recording its calls
pub struct FakeCats {
    outcome: SearchOutcome,
    calls: Mutex<Vec<SearchCatsArgs>>,
}

impl FakeCats {
    pub fn returning(outcome: SearchOutcome) -> Self {
        Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<SearchCatsArgs> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CatSearch for FakeCats {
    async fn search(&self, args: &SearchCatsArgs) -> SearchOutcome {
        self.calls.lock().push(args.clone());
        self.outcome.clone()
    }
}
