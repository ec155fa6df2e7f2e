//! Inference engine implementations

pub mod vllm;

// Re-export for convenience
pub use vllm::VllmEngine;
