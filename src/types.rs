//! Shared types used across the errand runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Conversation messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// A role-tagged message in the conversation history.
///
/// Assistant messages may carry the tool calls the model issued; tool
/// messages carry the id of the call they answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(ChatRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(ChatRole::Assistant, content)
    }

    /// Assistant message carrying tool call requests.
    pub fn assistant_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Tool-result message answering the call with the given id.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn text(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tool calls and results
// ---------------------------------------------------------------------------

/// A tool call request issued by the model. The arguments are an untyped
/// payload; the dispatcher validates them against the registered spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Result of dispatching a single tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub payload: ToolPayload,
}

/// Success value or classified failure of a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolPayload {
    Ok { value: serde_json::Value },
    Error { kind: CallErrorKind, message: String },
}

/// Per-call failures. All three are recoverable: they are fed back to the
/// model as tool results so it can self-correct or report the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallErrorKind {
    UnknownTool,
    InvalidArguments,
    ExecutionFailed,
}

impl fmt::Display for CallErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTool => write!(f, "unknown_tool"),
            Self::InvalidArguments => write!(f, "invalid_arguments"),
            Self::ExecutionFailed => write!(f, "execution_failed"),
        }
    }
}

impl ToolResult {
    pub fn ok(tool_call_id: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            payload: ToolPayload::Ok { value },
        }
    }

    pub fn error(
        tool_call_id: impl Into<String>,
        kind: CallErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            payload: ToolPayload::Error {
                kind,
                message: message.into(),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.payload, ToolPayload::Ok { .. })
    }

    /// Render the payload as the content of a tool-role message.
    pub fn render(&self) -> String {
        serde_json::to_string(&self.payload)
            .unwrap_or_else(|_| r#"{"status":"error","message":"unrenderable result"}"#.into())
    }

    /// Convert into the history message answering the originating call.
    pub fn into_message(self) -> ChatMessage {
        let content = self.render();
        ChatMessage::tool_result(self.tool_call_id, content)
    }
}

// ---------------------------------------------------------------------------
// Backend reply
// ---------------------------------------------------------------------------

/// One classified reply from the chat backend: plain assistant text when
/// `tool_calls` is empty, otherwise a round of pending tool calls.
#[derive(Debug, Clone, Default)]
pub struct BackendReply {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl BackendReply {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
