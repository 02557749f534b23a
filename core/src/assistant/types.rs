//! Wire types of the remote assistant service
//!
//! Shapes follow the OpenAI Assistants v2 objects, trimmed to the fields the
//! run loop reads.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Definition of an assistant to create remotely
#[derive(Debug, Clone, Serialize)]
pub struct AssistantSpec {
    pub name: String,
    pub model: String,
    pub instructions: String,
    pub tools: Vec<ToolDefinition>,
}

/// Tool declaration attached to an assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub type_: String,
    pub function: FunctionDefinition,
}

impl ToolDefinition {
    pub fn function(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            type_: "function".to_string(),
            function: FunctionDefinition {
                name: name.to_string(),
                description: Some(description.to_string()),
                parameters,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thread {
    pub id: String,
}

/// Remote run state. Owned by the service; the run loop only observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub required_action: Option<RequiredAction>,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

impl Run {
    /// Tool calls the run is waiting on, empty unless `requires_action`
    pub fn pending_tool_calls(&self) -> &[ToolCall] {
        self.required_action
            .as_ref()
            .and_then(|action| action.submit_tool_outputs.as_ref())
            .map(|submit| submit.tool_calls.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequiredAction {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub submit_tool_outputs: Option<SubmitToolOutputs>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitToolOutputs {
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

/// A function call the assistant asked for mid-run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "default_tool_type")]
    pub type_: String,
    pub function: FunctionCall,
}

fn default_tool_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object
    pub arguments: String,
}

/// Result of one tool call, submitted back to resume the run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub run_id: Option<String>,
}

/// One block of message content, decided by the block's declared `type`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum ContentBlock {
    Text { value: String },
    ImageUrl { url: String },
    ImageFile { file_id: String },
    Unknown(Value),
}

impl From<Value> for ContentBlock {
    fn from(raw: Value) -> Self {
        let field = |outer: &str, inner: &str| {
            raw.get(outer)
                .and_then(|v| v.get(inner))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        let decoded = match raw.get("type").and_then(Value::as_str) {
            Some("text") => field("text", "value").map(|value| ContentBlock::Text { value }),
            Some("image_url") => field("image_url", "url").map(|url| ContentBlock::ImageUrl { url }),
            Some("image_file") => {
                field("image_file", "file_id").map(|file_id| ContentBlock::ImageFile { file_id })
            }
            _ => None,
        };
        decoded.unwrap_or(ContentBlock::Unknown(raw))
    }
}

impl ContentBlock {
    /// Text shown to the user for this block
    pub fn render(&self) -> String {
        match self {
            ContentBlock::Text { value } => value.clone(),
            ContentBlock::ImageUrl { url } => url.clone(),
            ContentBlock::ImageFile { file_id } => file_id.clone(),
            ContentBlock::Unknown(raw) => raw.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_status_decoding() {
        let run: Run = serde_json::from_value(json!({
            "id": "run_1",
            "object": "thread.run",
            "status": "requires_action",
            "required_action": {
                "type": "submit_tool_outputs",
                "submit_tool_outputs": {
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "search_cats", "arguments": "{\"breed\":\"abys\"}" }
                    }]
                }
            }
        }))
        .unwrap();

        assert_eq!(run.status, RunStatus::RequiresAction);
        let calls = run.pending_tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].function.name, "search_cats");
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let result = serde_json::from_value::<Run>(json!({ "id": "run_1", "status": "paused" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(RunStatus::InProgress.to_string(), "in_progress");
        assert_eq!(RunStatus::RequiresAction.to_string(), "requires_action");
        let status: RunStatus = serde_json::from_value(json!("cancelling")).unwrap();
        assert_eq!(status, RunStatus::Cancelling);
    }

    #[test]
    fn test_content_blocks_by_declared_type() {
        let message: ThreadMessage = serde_json::from_value(json!({
            "id": "msg_1",
            "role": "assistant",
            "content": [
                { "type": "text", "text": { "value": "Hello", "annotations": [] } },
                { "type": "image_url", "image_url": { "url": "https://cdn2.thecatapi.com/images/abc.jpg" } },
                { "type": "image_file", "image_file": { "file_id": "file_9" } },
                { "type": "refusal", "refusal": "no" },
                { "type": "text" }
            ]
        }))
        .unwrap();

        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(
            message.content[0],
            ContentBlock::Text {
                value: "Hello".to_string()
            }
        );
        assert_eq!(message.content[1].render(), "https://cdn2.thecatapi.com/images/abc.jpg");
        assert_eq!(message.content[2].render(), "file_9");
        assert!(matches!(message.content[3], ContentBlock::Unknown(_)));
        let raw: Value = serde_json::from_str(&message.content[3].render()).unwrap();
        assert_eq!(raw, json!({ "type": "refusal", "refusal": "no" }));
        // A text block without a value keeps its raw form.
        assert!(matches!(message.content[4], ContentBlock::Unknown(_)));
    }
}
