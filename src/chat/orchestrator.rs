//! Chat request orchestration.
//!
//! # Responsibilities
//! - Enforce the per-conversation turn limit before touching any dependency
//! - Acquire a tool session and run the agent under the request deadline
//! - Report tool usage alongside the answer
//! - Turn every failure, panics included, into a well-formed response

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::Instrument;
use uuid::Uuid;

use crate::agent::{AgentOutput, AgentRuntime, ChatAgent};
use crate::chat::advisory::{self, Advisory};
use crate::chat::context::{build_agent_message, build_instruction, count_user_messages, extract_user_identity};
use crate::chat::types::{ChatRequest, ChatResponse};
use crate::config::{ChatConfig, ServiceConfig, ToolServerConfig};
use crate::error::{ErrorKind, ServiceError, ServiceResult};
use crate::resilience::{
    BreakerSnapshot, CircuitBreaker, ConnectionRetryOrchestrator, RetryPolicy, TimeoutEnvelope,
};
use crate::tools::{normalize, ToolConnector, ToolUsage};

/// Serves chat requests against the tool service and agent runtime.
pub struct ChatOrchestrator {
    breaker: Arc<CircuitBreaker>,
    retry: ConnectionRetryOrchestrator,
    envelope: TimeoutEnvelope,
    agent: Arc<dyn AgentRuntime>,
    agent_name: String,
    tool_server: ToolServerConfig,
    chat: ChatConfig,
}

impl ChatOrchestrator {
    pub fn new(
        config: &ServiceConfig,
        connector: Arc<dyn ToolConnector>,
        agent: Arc<dyn AgentRuntime>,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        let retry = ConnectionRetryOrchestrator::new(
            connector,
            breaker.clone(),
            RetryPolicy::from(&config.resilience),
        );
        let envelope = TimeoutEnvelope::new(config.resilience.request_timeout(), breaker.clone());

        Self {
            breaker,
            retry,
            envelope,
            agent,
            agent_name: config.agent.name.clone(),
            tool_server: config.tool_server.clone(),
            chat: config.chat.clone(),
        }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Side-effect-free view of the breaker for health reporting.
    pub fn health(&self) -> BreakerSnapshot {
        self.breaker.snapshot()
    }

    /// Answer one chat message. Never fails: degraded outcomes carry an
    /// advisory as the response text.
    pub async fn handle_chat(&self, request: ChatRequest) -> ChatResponse {
        let session_id = request
            .session_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let user_message_count = count_user_messages(&request.conversation_history);

        let span = tracing::info_span!(
            "chat",
            session_id = %session_id,
            user_messages = user_message_count
        );

        async move {
            let reply = |response_text: String, tool_usage: Option<ToolUsage>| ChatResponse {
                response_text,
                session_id: session_id.clone(),
                user_message_count,
                tool_usage,
            };

            if user_message_count > self.chat.max_user_messages {
                tracing::info!(limit = self.chat.max_user_messages, "Conversation turn limit reached");
                return reply(advisory::limit_reached(self.chat.max_user_messages), None);
            }

            let outcome = AssertUnwindSafe(self.respond(&request, &session_id))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(output)) => {
                    let tool_usage = normalize(&output.raw);
                    tracing::info!(
                        tool_calls = tool_usage.as_ref().map_or(0, |u| u.tool_calls.len()),
                        "Chat request completed"
                    );
                    reply(output.text, tool_usage)
                }
                Ok(Err(err)) => reply(self.degrade(&err), None),
                Err(panic) => {
                    self.breaker.record_failure();
                    tracing::error!(panic = panic_message(panic.as_ref()), "Chat request panicked");
                    reply(advisory::TECHNICAL_DIFFICULTIES.to_string(), None)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn respond(&self, request: &ChatRequest, session_id: &str) -> ServiceResult<AgentOutput> {
        let identity = extract_user_identity(&request.conversation_history);
        if identity.is_none() {
            tracing::warn!("No user ID in conversation history, tool calls may fail");
        }
        let instruction = build_instruction(&self.tool_server.name, identity.as_deref());
        let message = build_agent_message(
            &request.conversation_history,
            &request.message,
            self.chat.include_history_context,
        );

        let output = self
            .envelope
            .run(|token| async move {
                let session = self.retry.acquire(&self.tool_server, &token).await?;
                let agent = ChatAgent {
                    name: &self.agent_name,
                    instruction,
                    tools: session.as_ref(),
                };

                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(ServiceError::Invocation("agent invocation cancelled".into())),
                    res = self.agent.invoke(&agent, &message, session_id) => res.map_err(ServiceError::from),
                }
            })
            .await?;

        self.breaker.record_success();
        Ok(output)
    }

    /// Record the failure where the pipeline has not already done so and
    /// pick the advisory text.
    fn degrade(&self, err: &ServiceError) -> String {
        match err.kind() {
            // Recorded by the envelope.
            ErrorKind::OperationTimeout => {}
            // Deliberately not recorded, unlike other failures: recording a
            // rejection would keep re-arming the recovery window.
            ErrorKind::ServiceUnavailable => {}
            _ => self.breaker.record_failure(),
        }

        let advisory = advisory::classify(err);
        match advisory {
            Advisory::Generic => tracing::error!(error = %err, kind = ?err.kind(), "Chat request failed"),
            _ => tracing::warn!(error = %err, kind = ?err.kind(), advisory = ?advisory, "Chat request degraded"),
        }
        advisory.message(&err.to_string())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
