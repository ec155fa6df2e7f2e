//! Plan resolution and the bounded multi-pass generation protocol

use std::sync::Arc;
use serde_json::Value;
use log::{debug, trace, error, info};

use crate::engine::{Completion, InferenceEngine, SamplingParams};
use crate::error::Error;

/// Seed used for every pass so reruns are reproducible
pub const SAMPLING_SEED: u64 = 0;
/// Marker that closes the reasoning section
pub const THINK_STOP_MARKER: &str = "</think>";
/// Appended before each extension pass
pub const CONTINUATION_MARKER: &str = "\nAlternatively";
/// Forces the model out of reasoning before the answer pass
pub const CLOSING_SENTENCE: &str
  = "\nTime's up. End of thinking process. Will answer immediately.\n";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Share of the remaining budget available without an override
const HEADROOM_FACTOR: f64 = 0.95;

/// Resolved output ceiling and mode for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationPlan
{   /// Ceiling for the final answer pass (or the single pass)
    pub max_tokens: usize
  , pub think_mode: bool
}

/// Derive the plan from request fields and the remaining budget
pub fn resolve_plan(
  request: &crate::request::GenerationRequest
, remaining: i64
, config: &crate::config::ControllerConfig
) -> Result<GenerationPlan, Error>
{   if remaining <= 0
    {   error!("Input leaves {} tokens, rejecting", remaining);
        return Err(Error::ContextExceeded);
    }
    let remaining = remaining as usize;

    let default_max = config.task_defaults
      .get(&request.task_type.to_lowercase())
      .copied()
      .unwrap_or(remaining);

    let max_tokens = match request.max_tokens
    {   Some(0) => {
          return Err(Error::InvalidInput(
            "max_tokens must be at least 1".to_string()
          ));
        }
      , Some(max) => max
      , None => {
          let headroom = (remaining as f64 * HEADROOM_FACTOR).floor() as usize;
          default_max.min(headroom)
        }
    };
    let max_tokens = max_tokens.min(remaining);
    // headroom floors to zero when a single token remains
    if max_tokens == 0
    {   error!("No output tokens left after headroom (remaining {})", remaining);
        return Err(Error::ContextExceeded);
    }

    let think_mode = request.think
      .unwrap_or_else(|| request.task_type.eq_ignore_ascii_case("blog"));

    debug!(
      "Plan for task_type={:?}: max_tokens={}, think_mode={} (remaining {})",
      request.task_type, max_tokens, think_mode, remaining
    );

    Ok(GenerationPlan
    {   max_tokens
      , think_mode
    })
}

/// Accumulates the rendered prompt and every pass output, in order.
/// Owned by a single request and moved through each transition.
#[derive(Debug, Default)]
pub struct ThinkingTranscript
{   text: String
}

impl ThinkingTranscript
{   pub fn new(prompt: String) -> Self
    {   ThinkingTranscript
        {   text: prompt
        }
    }

    pub fn push(&mut self, text: &str)
    {   self.text.push_str(text);
    }

    pub fn as_str(&self) -> &str
    {   &self.text
    }

    pub fn into_text(self) -> String
    {   self.text
    }
}

/// States of the thinking protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThinkState
{   Render
  , Think
  , Extend(usize)
  , Answer
  , Done
}

/// Counters reported after a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport
{   pub passes: usize
  , pub think_tokens: usize
  , pub extensions: usize
}

/// Request-level driver over a shared inference engine
pub struct GenerationController<E>
where
  E: InferenceEngine + ?Sized
{   engine: Arc<E>
  , config: Arc<crate::config::ControllerConfig>
}

impl<E> Clone for GenerationController<E>
where
  E: InferenceEngine + ?Sized
{   fn clone(&self) -> Self
    {   GenerationController
        {   engine: Arc::clone(&self.engine)
          , config: Arc::clone(&self.config)
        }
    }
}

impl<E> GenerationController<E>
where
  E: InferenceEngine + ?Sized
{   /// The engine handle is shared, never copied
    pub fn new(
      engine: Arc<E>
    , config: crate::config::ControllerConfig
    ) -> Result<Self, Error>
    {   config.validate()?;
        info!(
          "GenerationController ready: context_limit={}, max_think_tokens={}, max_ignore={}",
          config.context_limit, config.max_think_tokens, config.max_ignore
        );
        Ok(GenerationController
        {   engine
          , config: Arc::new(config)
        })
    }

    /// Estimate the budget and resolve the plan, no generation happens here
    pub async fn plan(
      &self
    , request: &crate::request::GenerationRequest
    ) -> Result<GenerationPlan, Error>
    {   if request.messages.is_empty()
        {   return Err(Error::MissingInput(
              "`messages` required".to_string()
            ));
        }
        let remaining = crate::budget::estimate_remaining(
          &*self.engine,
          &request.messages,
          self.config.context_limit
        ).await?;
        resolve_plan(request, remaining, &self.config)
    }

    /// Run a validated request to its full transcript
    pub async fn run(
      &self
    , request: &crate::request::GenerationRequest
    ) -> Result<String, Error>
    {   let plan = self.plan(request).await?;
        let (system, user) = merge_messages(&request.messages);

        let result = if plan.think_mode
        {   self.run_thinking(&system, &user, request.temperature, plan.max_tokens)
              .await
        } else
        {   self.run_single(&system, &user, request.temperature, plan.max_tokens)
              .await
        };

        result.map_err(|e| {
          error!("Generation aborted: {}", e);
          match e
          {   Error::GenerationFailed(msg) => Error::GenerationFailed(msg)
            , other => Error::GenerationFailed(other.to_string())
          }
        })
    }

    /// Validate a raw payload and run it, always producing an envelope
    pub async fn handle_input(&self, input: &Value)
      -> crate::request::JobOutput
    {   let result = match crate::request::parse_job_input(input)
        {   Ok(request) => self.run(&request).await
          , Err(e) => Err(e)
        };
        if let Err(e) = &result
        {   debug!("Request failed: {}", e);
        }
        crate::request::JobOutput::from(result)
    }

    /// Serverless entry point, reads the job's `input` object
    pub async fn handle_job(&self, job: &Value)
      -> crate::request::JobOutput
    {   let input = crate::request::job_input(job);
        self.handle_input(&input).await
    }

    async fn run_single(
      &self
    , system: &str
    , user: &str
    , temperature: f32
    , max_tokens: usize
    ) -> Result<String, Error>
    {   debug!("Single pass with max_tokens={}", max_tokens);
        let prompt = self.engine
          .render(&prompt_messages(system, user), true, false)
          .await?;
        let mut transcript = ThinkingTranscript::new(prompt);
        let params = SamplingParams
        {   max_tokens
          , temperature
          , seed: SAMPLING_SEED
          , stop: vec![]
        };
        let out = self.engine.generate(transcript.as_str(), &params).await?;
        transcript.push(&out.text);
        Ok(transcript.into_text())
    }

    async fn run_thinking(
      &self
    , system: &str
    , user: &str
    , temperature: f32
    , max_tokens: usize
    ) -> Result<String, Error>
    {   let max_think = self.config.max_think_tokens;
        let think_params = |budget: usize| SamplingParams
        {   max_tokens: budget
          , temperature
          , seed: SAMPLING_SEED
          , stop: vec![THINK_STOP_MARKER.to_string()]
        };

        let mut state = ThinkState::Render;
        let mut transcript = ThinkingTranscript::default();
        let mut tokens_used = 0usize;
        let mut report = PassReport::default();

        loop
        { trace!("Thinking state {:?}", state);
          state = match state
          {   ThinkState::Render => {
                let prompt = self.engine
                  .render(&prompt_messages(system, user), true, true)
                  .await?;
                transcript.push(&prompt);
                ThinkState::Think
              }
            , ThinkState::Think => {
                let out = self.pass(&transcript, &think_params(max_think)).await?;
                tokens_used += out.tokens_produced;
                transcript.push(&out.text);
                report.passes += 1;
                ThinkState::Extend(1)
              }
            , ThinkState::Extend(i) if i > self.config.max_ignore => {
                ThinkState::Answer
              }
            , ThinkState::Extend(i) => {
                let left = max_think.saturating_sub(tokens_used);
                if left == 0
                {   debug!("Think budget exhausted before extension {}", i);
                    ThinkState::Answer
                } else
                {   debug!("Extension {} with {} tokens left", i, left);
                    transcript.push(CONTINUATION_MARKER);
                    let out = self.pass(&transcript, &think_params(left)).await?;
                    tokens_used += out.tokens_produced;
                    transcript.push(&out.text);
                    report.passes += 1;
                    report.extensions += 1;
                    ThinkState::Extend(i + 1)
                }
              }
            , ThinkState::Answer => {
                transcript.push(CLOSING_SENTENCE);
                transcript.push(THINK_STOP_MARKER);
                let params = SamplingParams
                {   max_tokens
                  , temperature
                  , seed: SAMPLING_SEED
                  , stop: vec![]
                };
                let out = self.pass(&transcript, &params).await?;
                transcript.push(&out.text);
                report.passes += 1;
                ThinkState::Done
              }
            , ThinkState::Done => break
          };
        }

        report.think_tokens = tokens_used;
        debug!("Thinking run finished: {:?}", report);
        Ok(transcript.into_text())
    }

    async fn pass(
      &self
    , transcript: &ThinkingTranscript
    , params: &SamplingParams
    ) -> Result<Completion, Error>
    {   trace!("Generating with {:?}", params);
        let out = self.engine.generate(transcript.as_str(), params).await?;
        trace!("Pass produced {} tokens", out.tokens_produced);
        Ok(out)
    }
}

/// First system message (or the default) and every other message's
/// content joined with single spaces, in order
pub fn merge_messages(messages: &[crate::Message]) -> (String, String)
{   let system = messages.iter()
      .find(|m| m.role == crate::Role::System)
      .map(|m| m.content.clone())
      .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
    let user = messages.iter()
      .filter(|m| m.role != crate::Role::System)
      .map(|m| m.content.as_str())
      .collect::<Vec<_>>()
      .join(" ");
    (system, user)
}

fn prompt_messages(system: &str, user: &str) -> Vec<crate::Message>
{   vec![
      crate::Message::system(system)
    , crate::Message::user(user)
    ]
}
