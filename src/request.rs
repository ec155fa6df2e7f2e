//! Request validation and the response envelope

use serde::{Deserialize, Serialize};
use serde_json::Value;
use log::{debug, warn};

pub const DEFAULT_TEMPERATURE: f32 = 0.6;

const MESSAGES_REQUIRED: &str = "`messages` required";

/// Validated generation request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest
{   /// Conversation in original order, never empty
    pub messages: Vec<crate::Message>
  , /// Sampling temperature for every pass
    pub temperature: f32
  , /// Lower-cased task category, empty when absent
    pub task_type: String
  , /// Explicit output ceiling, at least 1
    pub max_tokens: Option<usize>
  , /// Explicit think mode
    pub think: Option<bool>
}

impl GenerationRequest
{   /// Request with default temperature, no category and no overrides
    pub fn new(messages: Vec<crate::Message>) -> Self
    {   GenerationRequest
        {   messages
          , temperature: DEFAULT_TEMPERATURE
          , task_type: String::new()
          , max_tokens: None
          , think: None
        }
    }

    pub fn with_task_type(mut self, task_type: &str) -> Self
    {   self.task_type = task_type.to_lowercase();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self
    {   self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_think(mut self, think: bool) -> Self
    {   self.think = Some(think);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self
    {   self.temperature = temperature;
        self
    }
}

/// Outbound envelope, every outcome of a job ends up in one of these
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobOutput
{   Generated
    {   generated_text: String
    }
  , Failed
    {   error: String
    }
}

impl JobOutput
{   pub fn is_error(&self) -> bool
    {   matches!(self, JobOutput::Failed { .. })
    }
}

impl From<Result<String, crate::error::Error>> for JobOutput
{   fn from(result: Result<String, crate::error::Error>) -> Self
    {   match result
        {   Ok(generated_text) => JobOutput::Generated { generated_text }
          , Err(e) => JobOutput::Failed { error: e.to_string() }
        }
    }
}

/// Extract the `input` object of a serverless job document
pub fn job_input(job: &Value) -> Value
{   job.get("input")
      .cloned()
      .unwrap_or_else(|| Value::Object(Default::default()))
}

/// Validate a loosely typed payload into a `GenerationRequest`
pub fn parse_job_input(input: &Value)
  -> Result<GenerationRequest, crate::error::Error>
{   let messages = parse_messages(input.get("messages"))?;
    let temperature = parse_temperature(input.get("temperature"))?;
    let task_type = parse_task_type(input.get("task_type"))?;
    let max_tokens = parse_max_tokens(input.get("max_tokens"))?;
    let think = parse_think(input.get("think"))?;

    debug!(
      "Parsed request: {} messages, task_type={:?}, max_tokens={:?}, think={:?}",
      messages.len(), task_type, max_tokens, think
    );

    Ok(GenerationRequest
    {   messages
      , temperature
      , task_type
      , max_tokens
      , think
    })
}

fn present(value: Option<&Value>) -> Option<&Value>
{   value.filter(|v| !v.is_null())
}

fn parse_messages(value: Option<&Value>)
  -> Result<Vec<crate::Message>, crate::error::Error>
{   let items = match present(value)
    {   Some(Value::Array(items)) if !items.is_empty() => items
      , _ => {
          warn!("Request without messages");
          return Err(crate::error::Error::MissingInput(
            MESSAGES_REQUIRED.to_string()
          ));
        }
    };

    items.iter()
      .enumerate()
      .map(|(i, item)| {
        serde_json::from_value::<crate::Message>(item.clone())
          .map_err(|e| {
            crate::error::Error::InvalidInput(
              format!("messages[{}]: {}", i, e)
            )
          })
      })
      .collect()
}

fn parse_temperature(value: Option<&Value>)
  -> Result<f32, crate::error::Error>
{   let temperature = match present(value)
    {   None => return Ok(DEFAULT_TEMPERATURE)
      , Some(Value::Number(n)) => n.as_f64()
      , Some(Value::String(s)) => s.trim().parse::<f64>().ok()
      , Some(_) => None
    };

    match temperature.map(|t| t as f32)
    {   Some(t) if t.is_finite() && t >= 0.0 => Ok(t)
      , _ => Err(crate::error::Error::InvalidInput(
          format!("temperature must be a non-negative number, got {}",
            value.map(Value::to_string).unwrap_or_default())
        ))
    }
}

fn parse_task_type(value: Option<&Value>)
  -> Result<String, crate::error::Error>
{   match present(value)
    {   None => Ok(String::new())
      , Some(Value::String(s)) => Ok(s.to_lowercase())
      , Some(other) => Err(crate::error::Error::InvalidInput(
          format!("task_type must be a string, got {}", other)
        ))
    }
}

fn parse_max_tokens(value: Option<&Value>)
  -> Result<Option<usize>, crate::error::Error>
{   let value = match present(value)
    {   None => return Ok(None)
      , Some(v) => v
    };

    let parsed = match value
    {   Value::Number(n) => n.as_i64().or_else(|| {
          n.as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
        })
      , Value::String(s) => s.trim().parse::<i64>().ok()
      , _ => None
    };

    match parsed
    {   Some(n) if n >= 1 => Ok(Some(n as usize))
      , Some(n) => Err(crate::error::Error::InvalidInput(
          format!("max_tokens must be at least 1, got {}", n)
        ))
      , None => Err(crate::error::Error::InvalidInput(
          format!("max_tokens must be an integer, got {}", value)
        ))
    }
}

fn parse_think(value: Option<&Value>)
  -> Result<Option<bool>, crate::error::Error>
{   match present(value)
    {   None => Ok(None)
      , Some(Value::Bool(b)) => Ok(Some(*b))
      , Some(other) => Err(crate::error::Error::InvalidInput(
          format!("think must be a boolean, got {}", other)
        ))
    }
}
