#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use async_trait::async_trait;
use textgen::engine::{Completion, InferenceEngine, SamplingParams, TokenCounter};
use textgen::error::Error;
use textgen::Message;

/// Prompt text returned by `render`
pub const RENDERED: &str = "<prompt>";

pub fn init_logger()
{   let _ = env_logger::builder().is_test(true).try_init();
}

/// Arguments of one `generate` call
#[derive(Debug, Clone)]
pub struct GenerateCall
{   pub prompt: String
  , pub params: SamplingParams
}

/// Scripted engine that records every call.
/// Once the script runs out, each pass fills its whole budget.
pub struct MockEngine
{   pub input_tokens: Result<usize, Error>
  , pub render_error: Option<Error>
  , pub script: Mutex<VecDeque<Result<Completion, Error>>>
  , pub generate_calls: Mutex<Vec<GenerateCall>>
  , pub render_calls: Mutex<Vec<(Vec<Message>, bool)>>
  , pub count_calls: Mutex<usize>
}

impl MockEngine
{   pub fn new(input_tokens: usize) -> Self
    {   MockEngine
        {   input_tokens: Ok(input_tokens)
          , render_error: None
          , script: Mutex::new(VecDeque::new())
          , generate_calls: Mutex::new(vec![])
          , render_calls: Mutex::new(vec![])
          , count_calls: Mutex::new(0)
        }
    }

    pub fn failing_tokenizer(err: Error) -> Self
    {   let mut engine = MockEngine::new(0);
        engine.input_tokens = Err(err);
        engine
    }

    pub fn with_render_error(mut self, err: Error) -> Self
    {   self.render_error = Some(err);
        self
    }

    pub fn with_script(
      self
    , script: Vec<Result<Completion, Error>>
    ) -> Self
    {   *self.script.lock().unwrap() = script.into();
        self
    }

    pub fn generate_calls(&self) -> Vec<GenerateCall>
    {   self.generate_calls.lock().unwrap().clone()
    }

    pub fn render_calls(&self) -> Vec<(Vec<Message>, bool)>
    {   self.render_calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self) -> usize
    {   *self.count_calls.lock().unwrap()
    }
}

pub fn completion(text: &str, tokens_produced: usize)
  -> Result<Completion, Error>
{   Ok(Completion
    {   text: text.to_string()
      , tokens_produced
    })
}

#[async_trait]
impl TokenCounter for MockEngine
{   async fn count_tokens(
      &self
    , _messages: &[Message]
    ) -> Result<usize, Error>
    {   *self.count_calls.lock().unwrap() += 1;
        self.input_tokens.clone()
    }
}

#[async_trait]
impl InferenceEngine for MockEngine
{   async fn render(
      &self
    , messages: &[Message]
    , _add_generation_prompt: bool
    , enable_thinking: bool
    ) -> Result<String, Error>
    {   self.render_calls.lock().unwrap()
          .push((messages.to_vec(), enable_thinking));
        match &self.render_error
        {   Some(err) => Err(err.clone())
          , None => Ok(RENDERED.to_string())
        }
    }

    async fn generate(
      &self
    , prompt: &str
    , params: &SamplingParams
    ) -> Result<Completion, Error>
    {   self.generate_calls.lock().unwrap().push(GenerateCall
        {   prompt: prompt.to_string()
          , params: params.clone()
        });
        let scripted = self.script.lock().unwrap().pop_front();
        match scripted
        {   Some(result) => result
          , None => completion("x", params.max_tokens)
        }
    }
}
