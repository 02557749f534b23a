//! Message relay: one HTTP-facing turn of the cat picker
//!
//! Each call obtains a session, drives the run loop and wraps the reply in
//! the response payload. Nothing is stored between calls.

use crate::assistant::{AssistantService, AssistantSpec, OpenAiAssistants};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::protocol::{Message, MessagePayload, Role};
use crate::run_loop::{RunLoop, RunOptions};
use crate::session::{assistant_spec, ConversationSession};
use crate::tools::{CatClient, CatSearch};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct MessageRelay {
    service: Arc<dyn AssistantService>,
    spec: AssistantSpec,
    assistant_id: Option<String>,
    engine: RunLoop,
}

impl MessageRelay {
    pub fn new(
        service: Arc<dyn AssistantService>,
        cats: Arc<dyn CatSearch>,
        spec: AssistantSpec,
        assistant_id: Option<String>,
        options: RunOptions,
    ) -> Self {
        let engine = RunLoop::new(service.clone(), cats, options);
        Self {
            service,
            spec,
            assistant_id,
            engine,
        }
    }

    /// Build the relay against the configured OpenAI and TheCatAPI endpoints
    pub fn from_config(config: &Config) -> Result<Self> {
        let service = OpenAiAssistants::new(&config.assistant)?;
        let cats = CatClient::new(&config.cats)?;

        Ok(Self::new(
            Arc::new(service),
            Arc::new(cats),
            assistant_spec(&config.assistant),
            config.assistant.assistant_id.clone(),
            RunOptions::from_config(&config.run, &config.assistant),
        ))
    }

    pub async fn message(&self, payload: MessagePayload) -> Result<MessagePayload> {
        self.message_with_cancel(payload, &CancellationToken::new())
            .await
    }

    /// Relay one user message and return the assistant's reply on the same thread
    pub async fn message_with_cancel(
        &self,
        payload: MessagePayload,
        cancel: &CancellationToken,
    ) -> Result<MessagePayload> {
        if payload.message.role != Role::User {
            return Err(Error::InvalidInput {
                message: "message role must be 'user'".to_string(),
            });
        }

        let session = ConversationSession::create(
            self.service.as_ref(),
            &self.spec,
            self.assistant_id.as_deref(),
            payload.thread_id.as_deref(),
        )
        .await?;

        let reply = self
            .engine
            .run_with_cancel(&session, &payload.message.content, cancel)
            .await?;

        Ok(MessagePayload {
            thread_id: Some(session.thread_id),
            message: Message::assistant(reply),
        })
    }
}
