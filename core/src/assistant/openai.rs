//! OpenAI Assistants v2 implementation of [`AssistantService`]

use super::{
    Assistant, AssistantService, AssistantSpec, MessageRole, Run, Thread, ThreadMessage,
    ToolOutput,
};
use crate::config::AssistantConfig;
use crate::error::{Error, Result};
use crate::util::{api_key_header, sanitize_base_url};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client as HttpClient, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

const BETA_HEADER: &str = "OpenAI-Beta";
const BETA_VALUE: &str = "assistants=v2";

#[derive(Serialize)]
struct CreateMessageRequest<'a> {
    role: MessageRole,
    content: &'a str,
}

#[derive(Serialize)]
struct CreateRunRequest<'a> {
    assistant_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    additional_instructions: Option<&'a str>,
}

#[derive(Serialize)]
struct SubmitToolOutputsRequest<'a> {
    tool_outputs: &'a [ToolOutput],
}

#[derive(Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

/// HTTP client for the Assistants API
pub struct OpenAiAssistants {
    http_client: HttpClient,
    base_url: String,
    headers: HeaderMap,
}

impl OpenAiAssistants {
    pub fn new(config: &AssistantConfig) -> Result<Self> {
        let base_url = sanitize_base_url(&config.base_url, "Assistant base URL")
            .map_err(|e| Error::configuration(e.to_string()))?;
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::configuration("assistant API key is not set"))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(BETA_HEADER, HeaderValue::from_static(BETA_VALUE));
        headers.insert(
            AUTHORIZATION,
            api_key_header(api_key, Some("Bearer")).map_err(|e| Error::configuration(e.to_string()))?,
        );

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("catpicker/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url,
            headers,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post<B, T>(&self, operation: &'static str, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .http_client
            .post(self.url(path))
            .headers(self.headers.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| Error::upstream(operation, e))?;
        decode(operation, response).await
    }

    async fn get<T>(&self, operation: &'static str, path: &str, query: &[(&str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self
            .http_client
            .get(self.url(path))
            .headers(self.headers.clone())
            .query(query)
            .send()
            .await
            .map_err(|e| Error::upstream(operation, e))?;
        decode(operation, response).await
    }
}

async fn decode<T: DeserializeOwned>(operation: &'static str, response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        let text = response
            .text()
            .await
            .map_err(|e| Error::upstream(operation, e))?;
        return serde_json::from_str(&text).map_err(|e| {
            tracing::error!(operation, "Failed to parse assistant response: {}. Raw body: {}", e, text);
            Error::upstream(operation, format!("unexpected response body: {e}"))
        });
    }

    let message = match status {
        StatusCode::UNAUTHORIZED => "authentication failed, check the API key".to_string(),
        StatusCode::TOO_MANY_REQUESTS => "rate limit exceeded".to_string(),
        _ => {
            let body: Option<serde_json::Value> = response.json().await.ok();
            body.as_ref()
                .and_then(|v| v.get("error"))
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string()
        }
    };
    Err(Error::upstream(operation, format!("{status}: {message}")))
}

#[async_trait]
impl AssistantService for OpenAiAssistants {
    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<Assistant> {
        self.post("create_assistant", "assistants", spec).await
    }

    async fn create_thread(&self) -> Result<Thread> {
        self.post("create_thread", "threads", &serde_json::json!({})).await
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ThreadMessage> {
        let body = CreateMessageRequest { role, content };
        self.post("create_message", &format!("threads/{thread_id}/messages"), &body)
            .await
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        additional_instructions: Option<&str>,
    ) -> Result<Run> {
        let body = CreateRunRequest {
            assistant_id,
            additional_instructions,
        };
        self.post("create_run", &format!("threads/{thread_id}/runs"), &body)
            .await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.get("retrieve_run", &format!("threads/{thread_id}/runs/{run_id}"), &[])
            .await
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run> {
        let body = SubmitToolOutputsRequest {
            tool_outputs: outputs,
        };
        self.post(
            "submit_tool_outputs",
            &format!("threads/{thread_id}/runs/{run_id}/submit_tool_outputs"),
            &body,
        )
        .await
    }

    async fn list_messages(&self, thread_id: &str, limit: u32) -> Result<Vec<ThreadMessage>> {
        let query = [("order", "desc".to_string()), ("limit", limit.to_string())];
        let list: ListResponse<ThreadMessage> = self
            .get("list_messages", &format!("threads/{thread_id}/messages"), &query)
            .await?;
        Ok(list.data)
    }
}
