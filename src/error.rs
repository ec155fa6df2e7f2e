use std::fmt;

/// Custom error type for textgen operations
/// Implements Clone for sending through channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// Required request input is missing
    MissingInput(String)
  , /// Request field is present but malformed
    InvalidInput(String)
  , /// Input messages leave no room in the context window
    ContextExceeded
  , /// Token counting failed while estimating the budget
    TokenizationError(String)
  , /// A generation pass failed, the transcript is discarded
    GenerationFailed(String)
  , /// Invalid configuration
    InvalidConfiguration(String)
  , /// HTTP request error
    HttpError(String)
  , /// Inference server returned an error response
    ApiError(String)
  , /// Failed to parse inference server response
    ParseError(String)
  , /// Generic error
    Other(String)
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::MissingInput(msg) => {
              write!(f, "{}", msg)
            }
          , Error::InvalidInput(msg) => {
              write!(f, "Invalid input: {}", msg)
            }
          , Error::ContextExceeded => {
              write!(f, "Input exceeds context window limit.")
            }
          , Error::TokenizationError(msg) => {
              write!(f, "Tokenization failed: {}", msg)
            }
          , Error::GenerationFailed(msg) => {
              write!(f, "Generation failed: {}", msg)
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::HttpError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::ApiError(msg) => {
              write!(f, "API error: {}", msg)
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl Error
{   /// True for errors the caller can fix by changing the request
    pub fn is_user_correctable(&self) -> bool
    {   matches!(
          self,
          Error::MissingInput(_)
            | Error::InvalidInput(_)
            | Error::ContextExceeded
        )
    }
}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}
