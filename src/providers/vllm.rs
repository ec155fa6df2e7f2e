use serde::{Deserialize, Serialize};
use async_trait::async_trait;
use log::{debug, trace, error, info};
use std::time::Duration;

// ===== Message Types =====

#[derive(Debug, Clone, Serialize)]
pub struct ChatTemplateKwargs
{   pub enable_thinking: bool
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenizeChatRequest<'a>
{   pub model: &'a str
  , pub messages: &'a [crate::Message]
  , pub add_generation_prompt: bool
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_template_kwargs: Option<ChatTemplateKwargs>
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenizeResponse
{   pub count: usize
  , #[serde(default)]
    pub tokens: Vec<u32>
}

#[derive(Debug, Clone, Serialize)]
pub struct DetokenizeRequest<'a>
{   pub model: &'a str
  , pub tokens: &'a [u32]
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetokenizeResponse
{   pub prompt: String
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest<'a>
{   pub model: &'a str
  , pub prompt: &'a str
  , pub max_tokens: usize
  , pub temperature: f32
  , pub seed: u64
  , pub stop: &'a [String]
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse
{   pub choices: Vec<CompletionChoice>
  , pub usage: Option<Usage>
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChoice
{   pub text: String
  , pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Usage
{   pub completion_tokens: usize
}

// ===== vLLM Engine =====

/// Inference engine backed by a vLLM OpenAI-compatible server.
/// The HTTP client is pooled, so one instance serves concurrent requests.
pub struct VllmEngine
{   config: crate::config::EngineConfig
  , http_client: reqwest::Client
}

impl VllmEngine
{   pub fn new(
      config: crate::config::EngineConfig
    ) -> Result<Self, crate::error::Error>
    {   info!(
          "Creating VllmEngine for {} ({}) at {}",
          config.model, config.dtype, config.api_base
        );
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs
        {   builder = builder.timeout(Duration::from_secs(secs));
        }
        let http_client = builder.build()
          .map_err(|e| {
            error!("Failed to build HTTP client: {}", e);
            crate::error::Error::InvalidConfiguration(e.to_string())
          })?;
        Ok(VllmEngine
        {   config
          , http_client
        })
    }

    fn url(&self, path: &str) -> String
    {   format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    async fn post_json<B, R>(
      &self
    , path: &str
    , body: &B
    ) -> Result<R, crate::error::Error>
    where
      B: Serialize + ?Sized
    , R: for<'de> Deserialize<'de>
    {   let response = self.http_client
          .post(self.url(path))
          .header("Content-Type", "application/json")
          .json(body)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error on {}: {}", path, e);
            crate::error::Error::HttpError(e.to_string())
          })?;

        let status = response.status();
        trace!("vLLM {} status: {}", path, status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            error!("vLLM API error on {}: {}", path, error_text);
            return Err(crate::error::Error::ApiError(
              format!("vLLM {} ({}): {}", path, status, error_text)
            ));
        }

        response.json::<R>().await.map_err(|e| {
          error!("Parse error on {}: {}", path, e);
          crate::error::Error::ParseError(e.to_string())
        })
    }

    async fn tokenize_chat(
      &self
    , messages: &[crate::Message]
    , add_generation_prompt: bool
    , enable_thinking: Option<bool>
    ) -> Result<TokenizeResponse, crate::error::Error>
    {   let request = TokenizeChatRequest
        {   model: &self.config.model
          , messages
          , add_generation_prompt
          , chat_template_kwargs: enable_thinking
              .map(|enable_thinking| ChatTemplateKwargs { enable_thinking })
        };
        self.post_json("/tokenize", &request).await
    }
}

#[async_trait]
impl crate::engine::TokenCounter for VllmEngine
{   async fn count_tokens(
      &self
    , messages: &[crate::Message]
    ) -> Result<usize, crate::error::Error>
    {   debug!("Counting tokens for {} messages", messages.len());
        let response = self.tokenize_chat(messages, false, None).await?;
        Ok(response.count)
    }
}

#[async_trait]
impl crate::engine::InferenceEngine for VllmEngine
{   async fn render(
      &self
    , messages: &[crate::Message]
    , add_generation_prompt: bool
    , enable_thinking: bool
    ) -> Result<String, crate::error::Error>
    {   debug!("Rendering chat template (thinking={})", enable_thinking);
        let tokenized = self
          .tokenize_chat(messages, add_generation_prompt, Some(enable_thinking))
          .await?;

        let request = DetokenizeRequest
        {   model: &self.config.model
          , tokens: &tokenized.tokens
        };
        let response: DetokenizeResponse
          = self.post_json("/detokenize", &request).await?;
        trace!("Rendered prompt: {:?}", response.prompt);
        Ok(response.prompt)
    }

    async fn generate(
      &self
    , prompt: &str
    , params: &crate::engine::SamplingParams
    ) -> Result<crate::engine::Completion, crate::error::Error>
    {   debug!(
          "Completion request: max_tokens={}, temperature={}, stop={:?}",
          params.max_tokens, params.temperature, params.stop
        );
        let request = CompletionRequest
        {   model: &self.config.model
          , prompt
          , max_tokens: params.max_tokens
          , temperature: params.temperature
          , seed: params.seed
          , stop: &params.stop
        };

        let response: CompletionResponse
          = self.post_json("/v1/completions", &request).await?;

        let choice = response.choices.into_iter().next()
          .ok_or_else(|| {
            error!("No choices in completion response");
            crate::error::Error::ParseError(
              "completion response contained no choices".to_string()
            )
          })?;
        let usage = response.usage
          .ok_or_else(|| {
            error!("No usage in completion response");
            crate::error::Error::ParseError(
              "completion response contained no usage".to_string()
            )
          })?;

        trace!(
          "Completion finished ({:?}) with {} tokens",
          choice.finish_reason, usage.completion_tokens
        );
        Ok(crate::engine::Completion
        {   text: choice.text
          , tokens_produced: usage.completion_tokens
        })
    }
}
