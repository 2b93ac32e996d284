//! Conversation orchestrator.
//!
//! Drives the turn loop: submit history plus advertised tool specs, classify
//! the backend's reply as a direct answer or a round of tool calls, dispatch
//! rounds until the model converges on a plain reply, and keep the history
//! append-only throughout. One session is strictly sequential; concurrency
//! only exists inside a single dispatch round.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::backend::{ChatBackend, ChunkSink};
use crate::config::ErrandConfig;
use crate::dispatch::Dispatcher;
use crate::error::BackendError;
use crate::tools::ToolRegistry;
use crate::types::{BackendReply, ChatMessage};

/// Literal token that closes the session (case-sensitive exact match).
pub const EXIT_COMMAND: &str = "quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingInput,
    Closed,
}

/// Outcome of submitting one line of user input.
#[derive(Debug)]
pub enum TurnOutcome {
    /// The model produced a final reply (already streamed to the sink).
    Reply(String),
    /// The user issued the exit command; no backend call was made.
    Closed,
    /// The turn was cancelled at a suspension point; partial output was
    /// discarded and the history holds only completed rounds.
    Cancelled,
}

pub struct Session {
    backend: Arc<dyn ChatBackend>,
    dispatcher: Dispatcher,
    registry: Arc<ToolRegistry>,
    history: Vec<ChatMessage>,
    max_tool_rounds: u32,
    state: SessionState,
}

impl Session {
    pub fn new(
        config: &ErrandConfig,
        backend: Arc<dyn ChatBackend>,
        registry: Arc<ToolRegistry>,
    ) -> Self {
        let dispatcher = Dispatcher::new(registry.clone()).with_timeout(config.tool_timeout());
        let mut history = Vec::new();
        if !config.system_prompt.is_empty() {
            history.push(ChatMessage::system(&config.system_prompt));
        }
        Self {
            backend,
            dispatcher,
            registry,
            history,
            max_tool_rounds: config.max_tool_rounds,
            state: SessionState::AwaitingInput,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// The full conversation so far, append-only.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Handle one line of user input.
    ///
    /// Backend failures propagate so the caller can report them; the
    /// session stays open and the next submission retries from the same
    /// history.
    pub async fn submit(
        &mut self,
        input: &str,
        cancel: &CancellationToken,
        sink: ChunkSink<'_>,
    ) -> Result<TurnOutcome, BackendError> {
        if input == EXIT_COMMAND {
            info!("Exit command received, closing session");
            self.state = SessionState::Closed;
            return Ok(TurnOutcome::Closed);
        }

        self.history.push(ChatMessage::user(input));

        let mut round = 0u32;
        loop {
            // Past the round cap the specs are withheld, forcing the model
            // to produce a plain reply instead of looping on tools forever.
            let advertise = round < self.max_tool_rounds;
            let specs = if advertise {
                self.registry.specs()
            } else {
                warn!("Tool round cap reached, requesting a plain reply");
                Vec::new()
            };

            let reply = tokio::select! {
                _ = cancel.cancelled() => return Ok(TurnOutcome::Cancelled),
                reply = self.backend.chat(&self.history, &specs, sink) => reply?,
            };

            if !(advertise && reply.has_tool_calls()) {
                let text = reply.content.unwrap_or_default();
                self.history.push(ChatMessage::assistant(&text));
                return Ok(TurnOutcome::Reply(text));
            }

            if !self.run_round(reply, cancel).await {
                return Ok(TurnOutcome::Cancelled);
            }
            round += 1;
        }
    }

    /// Dispatch one round of tool calls and append it to the history.
    ///
    /// The assistant message and its results are committed together after
    /// the whole round finishes, so a cancellation mid-round leaves no
    /// half-appended state. Returns false when cancelled.
    async fn run_round(&mut self, reply: BackendReply, cancel: &CancellationToken) -> bool {
        for call in &reply.tool_calls {
            info!("Tool call: {}({})", call.name, call.arguments);
        }

        let results = tokio::select! {
            _ = cancel.cancelled() => return false,
            results = self.dispatcher.dispatch_round(&reply.tool_calls) => results,
        };

        self.history
            .push(ChatMessage::assistant_calls(reply.content, reply.tool_calls));
        for result in results {
            if !result.is_ok() {
                warn!("Tool result for {}: {}", result.tool_call_id, result.render());
            }
            self.history.push(result.into_message());
        }
        true
    }
}
