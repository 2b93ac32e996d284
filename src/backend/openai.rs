//! OpenAI-compatible chat-completions client with SSE streaming.
//!
//! Works against any server speaking the `/v1/chat/completions` wire format
//! (LM Studio, OpenRouter, vLLM, ...). Requests always stream: content
//! deltas of a direct reply are forwarded to the sink as they arrive, and
//! tool-call fragments are reassembled by index before the reply is
//! returned. Once a tool-call fragment appears the reply is a tool round,
//! so any further content accumulates without being streamed.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::{ChatBackend, ChunkSink};
use crate::config::ErrandConfig;
use crate::error::BackendError;
use crate::schema::ToolSpec;
use crate::types::{BackendReply, ChatMessage, ChatRole, ToolCall};

#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    http: reqwest::Client,
}

// -- Wire request/response types ---------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<MessagePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolPayload>>,
    max_tokens: u32,
    temperature: f64,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct MessagePayload {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCallPayload>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ToolPayload {
    r#type: &'static str,
    function: FunctionPayload,
}

#[derive(Debug, Serialize)]
struct FunctionPayload {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolCallPayload {
    id: String,
    r#type: String,
    function: FunctionCallPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCallPayload {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallDelta>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<FunctionDelta>,
}

#[derive(Debug, Default, Deserialize)]
struct FunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// Tool call being reassembled from stream fragments.
#[derive(Debug, Default)]
struct PartialCall {
    id: String,
    name: String,
    arguments: String,
}

/// Accumulates raw stream bytes and yields complete SSE lines.
///
/// Network chunks end at arbitrary byte offsets, so decoding happens per
/// complete line; a multibyte character split across two reads stays intact.
#[derive(Debug, Default)]
struct LineBuffer {
    bytes: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    fn next_line(&mut self) -> Option<String> {
        let newline = self.bytes.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.bytes.drain(..=newline).collect();
        Some(String::from_utf8_lossy(&line).trim().to_string())
    }
}

impl OpenAiBackend {
    pub fn new(config: &ErrandConfig) -> Self {
        Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            http: reqwest::Client::new(),
        }
    }

    fn message_payloads(messages: &[ChatMessage]) -> Vec<MessagePayload> {
        messages
            .iter()
            .map(|m| MessagePayload {
                role: m.role.to_string(),
                // Some servers reject null content on non-call messages.
                content: match (&m.content, m.role) {
                    (Some(c), _) => Some(c.clone()),
                    (None, ChatRole::Assistant) if !m.tool_calls.is_empty() => None,
                    (None, _) => Some(String::new()),
                },
                tool_calls: if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|tc| ToolCallPayload {
                                id: tc.id.clone(),
                                r#type: "function".into(),
                                function: FunctionCallPayload {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.to_string(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    fn tool_payloads(tools: &[ToolSpec]) -> Option<Vec<ToolPayload>> {
        if tools.is_empty() {
            return None;
        }
        Some(
            tools
                .iter()
                .map(|t| ToolPayload {
                    r#type: "function",
                    function: FunctionPayload {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.json_schema(),
                    },
                })
                .collect(),
        )
    }

    /// Fold one SSE data payload into the accumulating reply state.
    ///
    /// Tool fragments are applied before content so that a mixed delta
    /// already counts as a tool round; only direct-reply text reaches the
    /// sink.
    fn apply_chunk(
        chunk: &StreamChunk,
        content: &mut String,
        calls: &mut Vec<PartialCall>,
        sink: &mut (dyn FnMut(&str) + Send),
    ) {
        for choice in &chunk.choices {
            for tc in &choice.delta.tool_calls {
                if calls.len() <= tc.index {
                    calls.resize_with(tc.index + 1, PartialCall::default);
                }
                let partial = &mut calls[tc.index];
                if let Some(id) = &tc.id {
                    partial.id = id.clone();
                }
                if let Some(f) = &tc.function {
                    if let Some(name) = &f.name {
                        partial.name.push_str(name);
                    }
                    if let Some(args) = &f.arguments {
                        partial.arguments.push_str(args);
                    }
                }
            }
            if let Some(delta) = &choice.delta.content {
                if !delta.is_empty() {
                    if calls.is_empty() {
                        sink(delta);
                    }
                    content.push_str(delta);
                }
            }
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
        sink: ChunkSink<'_>,
    ) -> Result<BackendReply, BackendError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: Self::message_payloads(messages),
            tools: Self::tool_payloads(tools),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stream: true,
        };

        debug!("Chat request: {} messages, {} tools", messages.len(), tools.len());

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let mut content = String::new();
        let mut partial_calls: Vec<PartialCall> = Vec::new();
        let mut buffer = LineBuffer::default();
        let mut stream = resp.bytes_stream();

        'outer: while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| BackendError::Network(e.to_string()))?;
            buffer.push(&bytes);

            // SSE events are newline-delimited `data:` lines.
            while let Some(line) = buffer.next_line() {
                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data == "[DONE]" {
                    break 'outer;
                }
                let parsed: StreamChunk = serde_json::from_str(data)
                    .map_err(|e| BackendError::Malformed(format!("{e}: {data}")))?;
                Self::apply_chunk(&parsed, &mut content, &mut partial_calls, sink);
            }
        }

        let tool_calls = partial_calls
            .into_iter()
            .filter(|p| !p.name.is_empty())
            .map(|p| ToolCall {
                id: p.id,
                name: p.name,
                // A model that emits unparsable arguments gets an empty
                // payload; validation then reports the missing fields.
                arguments: serde_json::from_str(&p.arguments)
                    .unwrap_or(serde_json::Value::Object(Default::default())),
            })
            .collect::<Vec<_>>();

        debug!(
            "Chat reply: {} chars, {} tool calls",
            content.len(),
            tool_calls.len()
        );

        Ok(BackendReply {
            content: if content.is_empty() {
                None
            } else {
                Some(content)
            },
            tool_calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(lines: &[&str]) -> (String, Vec<ToolCall>) {
        let mut content = String::new();
        let mut calls = Vec::new();
        let mut sink = |_: &str| {};
        for line in lines {
            let parsed: StreamChunk = serde_json::from_str(line).unwrap();
            OpenAiBackend::apply_chunk(&parsed, &mut content, &mut calls, &mut sink);
        }
        let calls = calls
            .into_iter()
            .filter(|p| !p.name.is_empty())
            .map(|p| ToolCall {
                id: p.id,
                name: p.name,
                arguments: serde_json::from_str(&p.arguments)
                    .unwrap_or(serde_json::Value::Object(Default::default())),
            })
            .collect();
        (content, calls)
    }

    #[test]
    fn content_deltas_accumulate_in_order() {
        let (content, calls) = feed(&[
            r#"{"choices":[{"delta":{"content":"Hel"}}]}"#,
            r#"{"choices":[{"delta":{"content":"lo"}}]}"#,
        ]);
        assert_eq!(content, "Hello");
        assert!(calls.is_empty());
    }

    #[test]
    fn tool_call_fragments_reassemble_by_index() {
        let (_, calls) = feed(&[
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"c1","function":{"name":"add","arguments":""}}]}}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"a\":2,"}}]}}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"b\":3}"}}]}}]}"#,
        ]);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "c1");
        assert_eq!(calls[0].name, "add");
        assert_eq!(calls[0].arguments, serde_json::json!({"a": 2, "b": 3}));
    }

    #[test]
    fn multibyte_characters_survive_a_chunk_split() {
        let event = "data: {\"choices\":[{\"delta\":{\"content\":\"café\"}}]}\n".as_bytes();
        // Split inside the two-byte encoding of 'é'.
        let split = event.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let (head, tail) = event.split_at(split);

        let mut buffer = LineBuffer::default();
        buffer.push(head);
        assert!(buffer.next_line().is_none());
        buffer.push(tail);

        let line = buffer.next_line().unwrap();
        let data = line.strip_prefix("data:").unwrap().trim();
        let parsed: StreamChunk = serde_json::from_str(data).unwrap();

        let mut content = String::new();
        let mut calls = Vec::new();
        let mut streamed = String::new();
        let mut sink = |c: &str| streamed.push_str(c);
        OpenAiBackend::apply_chunk(&parsed, &mut content, &mut calls, &mut sink);

        assert_eq!(content, "café");
        assert_eq!(streamed, "café");
    }

    #[test]
    fn tool_round_content_is_not_streamed() {
        let mut content = String::new();
        let mut calls = Vec::new();
        let mut streamed = String::new();
        let mut sink = |c: &str| streamed.push_str(c);

        for line in [
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"c1","function":{"name":"add","arguments":"{}"}}]}}]}"#,
            r#"{"choices":[{"delta":{"content":"Let me check that."}}]}"#,
        ] {
            let parsed: StreamChunk = serde_json::from_str(line).unwrap();
            OpenAiBackend::apply_chunk(&parsed, &mut content, &mut calls, &mut sink);
        }

        // The text still travels with the assistant message, just silently.
        assert_eq!(content, "Let me check that.");
        assert!(streamed.is_empty());
    }

    #[test]
    fn unparsable_arguments_degrade_to_an_empty_object() {
        let (_, calls) = feed(&[
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"c1","function":{"name":"add","arguments":"{oops"}}]}}]}"#,
        ]);
        assert_eq!(calls[0].arguments, serde_json::json!({}));
    }
}
