use crate::interview::CompletionRequest;
use crate::topic::{Message, Role};
use anyhow::{Context, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;
use tracing::{debug, instrument};

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// A chat-completion backend that returns a single, non-streamed reply.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, system_prompt: String, history: Vec<Message>) -> Result<String>;
}

/// An implementation of `ChatModel` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the OpenAI client, including API key and base URL.
    /// * `model` - The model identifier to use for chat completions (e.g., "gpt-4").
    /// * `temperature` - Sampling temperature sent with every request.
    pub fn new(config: OpenAIConfig, model: String, temperature: f32) -> Self {
        Self {
            client: Client::with_config(config),
            model,
            temperature,
        }
    }
}

fn to_request_messages(
    system_prompt: String,
    history: Vec<Message>,
) -> Result<Vec<ChatCompletionRequestMessage>> {
    let mut messages: Vec<ChatCompletionRequestMessage> =
        vec![ChatCompletionRequestSystemMessageArgs::default()
            .content(system_prompt)
            .build()?
            .into()];
    for msg in history {
        match msg.role {
            Role::User => messages.push(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(msg.content)
                    .build()?
                    .into(),
            ),
            Role::Assistant => messages.push(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .content(msg.content)
                    .build()?
                    .into(),
            ),
        };
    }
    Ok(messages)
}

#[async_trait]
impl ChatModel for OpenAICompatibleClient {
    async fn chat(&self, system_prompt: String, history: Vec<Message>) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(to_request_messages(system_prompt, history)?)
            .temperature(self.temperature)
            .build()?;

        let response: CreateChatCompletionResponse = self.client.chat().create(request).await?;

        let answer = response
            .choices
            .first()
            .context("No response choice from LLM")?
            .message
            .content
            .clone()
            .context("No content in LLM response")?;
        Ok(answer)
    }
}

/// The instruction that frames every request for a topic.
pub fn framing_prompt(topic: &str) -> String {
    format!(
        "You are an interview bot assessing a candidate's {} skills. Ask thoughtful, follow-up questions, and when you're satisfied, say 'Thank you, let's move on.'",
        topic
    )
}

/// Produces the interviewer's next line for the active topic.
///
/// Errors from the backend are returned as-is; there is no retry.
#[derive(Clone)]
pub struct CompletionGenerator {
    model: Arc<dyn ChatModel>,
}

impl CompletionGenerator {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    #[instrument(skip(self, request), fields(topic = %request.topic, turns = request.history.len()))]
    pub async fn generate(&self, request: &CompletionRequest) -> Result<String> {
        let reply = self
            .model
            .chat(framing_prompt(&request.topic), request.history.clone())
            .await?;
        debug!(reply_len = reply.len(), "Received model reply");
        Ok(reply)
    }
}
