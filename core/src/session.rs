//! Conversation sessions: the (assistant, thread) pair a run needs

use crate::assistant::{AssistantService, AssistantSpec};
use crate::config::AssistantConfig;
use crate::error::{Error, Result};
use crate::tools::search_cats_definition;

/// Assistant definition used for every session
pub fn assistant_spec(config: &AssistantConfig) -> AssistantSpec {
    AssistantSpec {
        name: config.name.clone(),
        model: config.model.clone(),
        instructions: config.instructions.clone(),
        tools: vec![search_cats_definition()],
    }
}

/// Identifiers of one request's conversation. Not persisted locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSession {
    pub thread_id: String,
    pub assistant_id: String,
}

impl ConversationSession {
    /// Obtain the assistant and thread for a run.
    ///
    /// `assistant_id` reuses a pre-provisioned assistant; otherwise one is
    /// created from `spec`. A blank or absent `thread_id` allocates a new
    /// remote thread, so calls without one are not idempotent.
    pub async fn create(
        service: &dyn AssistantService,
        spec: &AssistantSpec,
        assistant_id: Option<&str>,
        thread_id: Option<&str>,
    ) -> Result<Self> {
        let assistant_id = match assistant_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => {
                if !is_remote_id(id) {
                    return Err(Error::configuration(format!("invalid assistant id '{id}'")));
                }
                id.to_string()
            }
            None => {
                let assistant = service.create_assistant(spec).await.map_err(|e| {
                    Error::configuration(format!("could not create assistant: {e}"))
                })?;
                if assistant.id.trim().is_empty() {
                    return Err(Error::configuration("assistant service returned an empty id"));
                }
                assistant.id
            }
        };

        let thread_id = match thread_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => {
                if !is_remote_id(id) {
                    return Err(Error::InvalidInput {
                        message: format!("invalid thread_id '{id}'"),
                    });
                }
                tracing::debug!(thread_id = id, "Resuming thread");
                id.to_string()
            }
            None => {
                let thread = service.create_thread().await?;
                tracing::info!(thread_id = %thread.id, "Created thread");
                thread.id
            }
        };

        Ok(Self {
            thread_id,
            assistant_id,
        })
    }
}

/// Remote ids end up as URL path segments: `[A-Za-z0-9_-]+` only
fn is_remote_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssistantConfig;
    use crate::testing::FakeAssistant;

    fn spec() -> AssistantSpec {
        assistant_spec(&AssistantConfig::default())
    }

    #[tokio::test]
    async fn test_new_thread_per_session() {
        let fake = FakeAssistant::new();
        let first = ConversationSession::create(&fake, &spec(), None, None)
            .await
            .unwrap();
        let second = ConversationSession::create(&fake, &spec(), None, Some("  "))
            .await
            .unwrap();

        assert_ne!(first.thread_id, second.thread_id);
        assert_eq!(fake.threads_created(), 2);
        assert_eq!(fake.assistants_created(), 2);
    }

    #[tokio::test]
    async fn test_resume_thread() {
        let fake = FakeAssistant::new();
        let session = ConversationSession::create(&fake, &spec(), None, Some("thread_existing"))
            .await
            .unwrap();

        assert_eq!(session.thread_id, "thread_existing");
        assert_eq!(fake.threads_created(), 0);
    }

    #[tokio::test]
    async fn test_reuse_assistant_id() {
        let fake = FakeAssistant::new();
        let session = ConversationSession::create(&fake, &spec(), Some("asst_fixed"), None)
            .await
            .unwrap();

        assert_eq!(session.assistant_id, "asst_fixed");
        assert_eq!(fake.assistants_created(), 0);
    }

    #[tokio::test]
    async fn test_assistant_failure_is_configuration_error() {
        let fake = FakeAssistant::new().failing_assistant_creation();
        let err = ConversationSession::create(&fake, &spec(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_thread_id_must_be_a_plain_segment() {
        let fake = FakeAssistant::new();
        for bad in ["../assistants", "x?y=", "thread/1", "thread 1", "th%2Fread"] {
            let err = ConversationSession::create(&fake, &spec(), Some("asst_1"), Some(bad))
                .await
                .unwrap_err();
            assert!(err.is_client_error(), "{bad} gave {err:?}");
        }
        assert_eq!(fake.threads_created(), 0);

        let ok = ConversationSession::create(&fake, &spec(), Some("asst_1"), Some("thread_aB-9"))
            .await
            .unwrap();
        assert_eq!(ok.thread_id, "thread_aB-9");
    }

    #[tokio::test]
    async fn test_configured_assistant_id_is_checked() {
        let fake = FakeAssistant::new();
        let err = ConversationSession::create(&fake, &spec(), Some("asst/../x"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_spec_declares_search_tool() {
        let spec = spec();
        assert_eq!(spec.name, "Cat Picker");
        assert_eq!(spec.tools.len(), 1);
        assert_eq!(spec.tools[0].function.name, "search_cats");
    }
}
