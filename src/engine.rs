//! Inference capabilities the controller delegates to
//!
//! One engine instance is loaded per process and shared through `Arc`
//! by every in-flight request. Implementations must be safe to call
//! concurrently, either reentrant or serializing internally. The
//! controller never issues two calls for the same request at once.

use async_trait::async_trait;

/// Sampling settings for a single generation pass
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams
{   pub max_tokens: usize
  , pub temperature: f32
  , pub seed: u64
  , /// Generation ends early when any of these is produced
    pub stop: Vec<String>
}

/// Output of a single generation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion
{   pub text: String
  , pub tokens_produced: usize
}

/// Counts the tokens a message list consumes in the model's vocabulary
#[async_trait]
pub trait TokenCounter: Send + Sync
{   async fn count_tokens(
      &self
    , messages: &[crate::Message]
    ) -> Result<usize, crate::error::Error>;
}

/// Chat template rendering plus token generation
#[async_trait]
pub trait InferenceEngine: TokenCounter
{   /// Render messages into a prompt with the model's chat template
    async fn render(
      &self
    , messages: &[crate::Message]
    , add_generation_prompt: bool
    , enable_thinking: bool
    ) -> Result<String, crate::error::Error>;

    /// Continue `prompt`, returning only the newly produced text
    async fn generate(
      &self
    , prompt: &str
    , params: &SamplingParams
    ) -> Result<Completion, crate::error::Error>;
}
