//! Run loop engine
//!
//! Drives one user turn against a remote assistant run: append the message,
//! start the run, then observe its state until it terminates. The run's
//! state machine belongs to the service; the loop only reacts to what it
//! observes:
//!
//! - `queued` / `in_progress` / `cancelling`: wait one poll interval
//! - `requires_action`: run the requested tools and submit every output at once
//! - `completed`: read the newest assistant message
//! - `failed` / `cancelled` / `expired` / `incomplete`: [`Error::RunFailed`]
//!
//! Observation is bounded by a wall-clock timeout, an optional poll count and
//! a cancellation token. Remote calls are never retried here.

use crate::assistant::{AssistantService, MessageRole, Run, RunStatus, ToolCall, ToolOutput};
use crate::config::{AssistantConfig, RunConfig};
use crate::error::{Error, Result};
use crate::session::ConversationSession;
use crate::tools::{CatSearch, SearchCatsArgs, SEARCH_CATS};
use futures::future::join_all;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

pub const NO_RESPONSE: &str = "No response generated. Please try again.";
pub const EMPTY_RESPONSE: &str = "Empty response received. Please try again.";

/// How many recent messages to scan for the assistant's reply
const MESSAGE_PAGE: u32 = 20;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub max_polls: Option<u32>,
    pub additional_instructions: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_config(&RunConfig::default(), &AssistantConfig::default())
    }
}

impl RunOptions {
    pub fn from_config(run: &RunConfig, assistant: &AssistantConfig) -> Self {
        Self {
            poll_interval: run.poll_interval(),
            timeout: run.timeout(),
            max_polls: run.max_polls,
            additional_instructions: assistant.run_instructions.clone(),
        }
    }
}

pub struct RunLoop {
    service: Arc<dyn AssistantService>,
    cats: Arc<dyn CatSearch>,
    options: RunOptions,
}

impl RunLoop {
    pub fn new(
        service: Arc<dyn AssistantService>,
        cats: Arc<dyn CatSearch>,
        options: RunOptions,
    ) -> Self {
        Self {
            service,
            cats,
            options,
        }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Drive one turn to completion and return the assistant's reply
    pub async fn run(&self, session: &ConversationSession, user_input: &str) -> Result<String> {
        self.run_with_cancel(session, user_input, &CancellationToken::new())
            .await
    }

    /// Like [`RunLoop::run`], aborting with [`Error::Cancelled`] once `cancel`
    /// fires. The remote run is left in whatever state the service keeps it.
    pub async fn run_with_cancel(
        &self,
        session: &ConversationSession,
        user_input: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let thread_id = session.thread_id.as_str();

        guarded(
            cancel,
            self.service
                .create_message(thread_id, MessageRole::User, user_input),
        )
        .await?;

        let mut run = guarded(
            cancel,
            self.service.create_run(
                thread_id,
                &session.assistant_id,
                self.options.additional_instructions.as_deref(),
            ),
        )
        .await?;
        tracing::info!(thread_id, run_id = %run.id, "Started run");

        let started = Instant::now();
        let mut polls: u32 = 0;

        loop {
            tracing::debug!(run_id = %run.id, status = %run.status, "Observed run");

            match run.status {
                RunStatus::Queued | RunStatus::InProgress | RunStatus::Cancelling => {
                    self.wait(started, polls, cancel).await?;
                    polls += 1;
                    run = guarded(cancel, self.service.retrieve_run(thread_id, &run.id)).await?;
                }
                RunStatus::RequiresAction => {
                    self.check_deadline(started)?;
                    let outputs = guarded(cancel, self.dispatch_tool_calls(&run)).await?;
                    tracing::info!(run_id = %run.id, outputs = outputs.len(), "Submitting tool outputs");
                    run = guarded(
                        cancel,
                        self.service.submit_tool_outputs(thread_id, &run.id, &outputs),
                    )
                    .await?;
                }
                RunStatus::Completed => {
                    tracing::info!(run_id = %run.id, polls, "Run completed");
                    return guarded(cancel, self.final_reply(thread_id, &run.id)).await;
                }
                state @ (RunStatus::Failed
                | RunStatus::Cancelled
                | RunStatus::Expired
                | RunStatus::Incomplete) => {
                    let detail = run.last_error.map(|e| e.message);
                    tracing::warn!(run_id = %run.id, %state, ?detail, "Run did not complete");
                    return Err(Error::RunFailed { state, detail });
                }
            }
        }
    }

    fn check_deadline(&self, started: Instant) -> Result<()> {
        if started.elapsed() >= self.options.timeout {
            return Err(Error::Timeout {
                duration: self.options.timeout,
            });
        }
        Ok(())
    }

    async fn wait(&self, started: Instant, polls: u32, cancel: &CancellationToken) -> Result<()> {
        if self.options.max_polls.is_some_and(|max| polls >= max) {
            tracing::warn!(polls, "Run exceeded the poll limit");
            return Err(Error::Timeout {
                duration: started.elapsed(),
            });
        }
        self.check_deadline(started)?;

        let remaining = self.options.timeout.saturating_sub(started.elapsed());
        let pause = self.options.poll_interval.min(remaining);
        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            _ = sleep(pause) => Ok(()),
        }
    }

    /// Run every pending tool call of a `requires_action` observation.
    ///
    /// Calls are independent reads and run concurrently; outputs keep the
    /// order of the calls. Every call gets an output, so a submission always
    /// answers the whole batch.
    async fn dispatch_tool_calls(&self, run: &Run) -> Result<Vec<ToolOutput>> {
        let calls = run.pending_tool_calls();
        if calls.is_empty() {
            return Err(Error::upstream(
                "retrieve_run",
                format!("run {} requires action but lists no tool calls", run.id),
            ));
        }

        Ok(join_all(calls.iter().map(|call| self.execute_tool_call(call))).await)
    }

    async fn execute_tool_call(&self, call: &ToolCall) -> ToolOutput {
        let name = call.function.name.as_str();
        if name != SEARCH_CATS {
            tracing::warn!(tool = name, tool_call_id = %call.id, "Assistant requested an unknown tool");
            return error_output(call, format!("Unknown tool '{name}'"));
        }

        let args = match SearchCatsArgs::parse(&call.function.arguments) {
            Ok(args) => args,
            Err(e) => {
                tracing::warn!(tool_call_id = %call.id, "Rejected tool arguments: {}", e);
                return error_output(call, e.to_string());
            }
        };
        tracing::info!(tool_call_id = %call.id, ?args, "Searching cats");
        let outcome = self.cats.search(&args).await;

        ToolOutput {
            tool_call_id: call.id.clone(),
            output: outcome.to_output(),
        }
    }

    /// Reply written by `run_id`; older turns on the thread are ignored
    async fn final_reply(&self, thread_id: &str, run_id: &str) -> Result<String> {
        let messages = self.service.list_messages(thread_id, MESSAGE_PAGE).await?;
        let Some(latest) = messages
            .into_iter()
            .find(|m| m.role == MessageRole::Assistant && m.run_id.as_deref() == Some(run_id))
        else {
            return Ok(NO_RESPONSE.to_string());
        };

        Ok(latest
            .content
            .first()
            .map(|block| block.render())
            .unwrap_or_else(|| EMPTY_RESPONSE.to_string()))
    }
}

fn error_output(call: &ToolCall, message: String) -> ToolOutput {
    ToolOutput {
        tool_call_id: call.id.clone(),
        output: json!({ "status": "error", "message": message }).to_string(),
    }
}

async fn guarded<T>(cancel: &CancellationToken, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = fut => result,
    }
}
