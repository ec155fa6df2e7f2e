pub mod error;
pub mod config;
pub mod engine;
pub mod providers;
pub mod request;
pub mod budget;
pub mod controller;
pub mod client;
use serde::{Deserialize, Serialize};

pub use client::TextGenBackend;
pub use controller::{GenerationController, GenerationPlan};
pub use request::{GenerationRequest, JobOutput};

/*

textgen is an async request-time controller for a local text generation
service: it budgets output tokens against a fixed context window and
drives a bounded think -> extend -> answer protocol over a shared
inference engine.

textgen/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Shared structures and backend channel types
│   ├── error.rs        # Error taxonomy
│   ├── config.rs       # Engine and controller configuration
│   ├── engine.rs       # Inference capability traits
│   ├── providers/      # Engine implementations
│   │   ├── mod.rs
│   │   └── vllm.rs     # vLLM OpenAI-compatible server
│   ├── request.rs      # Request validation and response envelope
│   ├── budget.rs       # Context budget estimation
│   ├── controller.rs   # Plan resolution and multi-pass generation
│   └── client.rs       # Backend actor
└── tests/

*/

/// TEXTGEN API INTERFACE:

// ===== Generate =====

pub type GenerateReplySender
  = tokio::sync::mpsc::UnboundedSender<crate::request::JobOutput>;

pub struct GenerateArgs
{   pub input: serde_json::Value
  , pub reply: GenerateReplySender
}

// ===== KillProcess =====

pub type KillProcessReply = Result<(), crate::error::Error>;
pub type KillProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<KillProcessReply>;

pub struct KillProcessArgs
{   pub reply: KillProcessReplySender
}

// ===== TextGenHand (sender side) =====

pub struct TextGenHand
{   pub generate_tx
      : tokio::sync::mpsc::UnboundedSender<GenerateArgs>
  , pub kill_process_tx
      : tokio::sync::mpsc::UnboundedSender<KillProcessArgs>
}

// ===== TextGenFoot (receiver side) =====

pub struct TextGenFoot
{   pub generate_rx
      : tokio::sync::mpsc::UnboundedReceiver<GenerateArgs>
  , pub kill_process_rx
      : tokio::sync::mpsc::UnboundedReceiver<KillProcessArgs>
}

/// TEXTGEN STRUCTURES:

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role
{   System
  , User
  , Assistant
}

/// One turn of the conversation, order within a request is meaningful
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Message
{   pub role: Role
  , pub content: String
}

impl Message
{   pub fn new(role: Role, content: impl Into<String>) -> Self
    {   Message
        {   role
          , content: content.into()
        }
    }

    pub fn system(content: impl Into<String>) -> Self
    {   Message::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self
    {   Message::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self
    {   Message::new(Role::Assistant, content)
    }
}
