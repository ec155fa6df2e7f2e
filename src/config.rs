//! Configuration for the inference engine and the generation controller

use std::collections::HashMap;
use std::path::Path;
use serde::{Deserialize, Serialize};
use log::debug;

/// Inference engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig
{   /// Model identifier served by the engine
    pub model: String
  , /// Numeric precision the model was loaded with
    pub dtype: String
  , /// Inference server base URL
    pub api_base: String
  , /// Per-call timeout in seconds, none means wait forever
    pub timeout_secs: Option<u64>
}

impl Default for EngineConfig
{   fn default() -> Self
    {   EngineConfig
        {   model: "scb10x/typhoon2.1-gemma3-4b".to_string()
          , dtype: "bfloat16".to_string()
          , api_base: "http://localhost:8000".to_string()
          , timeout_secs: None
        }
    }
}

/// Generation controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig
{   /// Total tokens (input + output) the model can process
    pub context_limit: usize
  , /// Token ceiling shared by the think and extension passes
    pub max_think_tokens: usize
  , /// Maximum number of extension passes
    pub max_ignore: usize
  , /// Default output ceiling per lower-cased task category
    pub task_defaults: HashMap<String, usize>
}

impl Default for ControllerConfig
{   fn default() -> Self
    {   let task_defaults = [("blog", 800), ("fb_post", 150), ("ad", 60)]
          .into_iter()
          .map(|(task, max)| (task.to_string(), max))
          .collect();
        ControllerConfig
        {   context_limit: 8192
          , max_think_tokens: 2048
          , max_ignore: 5
          , task_defaults
        }
    }
}

impl ControllerConfig
{   /// Reject limits that would make every request fail
    pub fn validate(&self) -> Result<(), crate::error::Error>
    {   if self.context_limit == 0
        {   return Err(crate::error::Error::InvalidConfiguration(
              "context_limit must be positive".to_string()
            ));
        }
        if self.max_think_tokens == 0
        {   return Err(crate::error::Error::InvalidConfiguration(
              "max_think_tokens must be positive".to_string()
            ));
        }
        Ok(())
    }
}

/// textgen configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextGenConfig
{   /// Engine configuration
    pub engine: EngineConfig
  , /// Controller configuration
    pub controller: ControllerConfig
}

impl TextGenConfig
{   /// Parse a JSON configuration document, missing fields use defaults
    pub fn from_json_str(json: &str)
      -> Result<Self, crate::error::Error>
    {   let config: TextGenConfig = serde_json::from_str(json)
          .map_err(|e| {
            crate::error::Error::InvalidConfiguration(e.to_string())
          })?;
        config.controller.validate()?;
        debug!(
          "Loaded config for model {} ({})",
          config.engine.model, config.engine.dtype
        );
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P)
      -> Result<Self, crate::error::Error>
    {   let path = path.as_ref();
        let json = std::fs::read_to_string(path)
          .map_err(|e| {
            crate::error::Error::InvalidConfiguration(
              format!("{}: {}", path.display(), e)
            )
          })?;
        Self::from_json_str(&json)
    }
}
