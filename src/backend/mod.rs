//! Chat backend abstraction.
//!
//! The orchestrator depends only on this contract: submit the running
//! history plus the advertised tool specifications, get back either plain
//! assistant text or a round of tool calls. Text deltas are pushed to the
//! caller's sink as they arrive so final replies render incrementally.

pub mod openai;

pub use openai::OpenAiBackend;

use async_trait::async_trait;

use crate::error::BackendError;
use crate::schema::ToolSpec;
use crate::types::{BackendReply, ChatMessage};

/// Sink receiving streamed text chunks of the reply being produced.
pub type ChunkSink<'a> = &'a mut (dyn FnMut(&str) + Send);

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Submit one completion request. The sink observes content deltas in
    /// arrival order; the returned reply carries the assembled content and
    /// any tool calls the model issued.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
        sink: ChunkSink<'_>,
    ) -> Result<BackendReply, BackendError>;
}
