//! Context budget estimation

use log::{debug, error};

/// Tokens left in the context window after the input messages.
///
/// Negative values mean the input alone is over the limit; clamping
/// or rejecting is up to the caller. An empty message list consumes
/// nothing and the tokenizer is not consulted.
pub async fn estimate_remaining<C>(
  counter: &C
, messages: &[crate::Message]
, context_limit: usize
) -> Result<i64, crate::error::Error>
where
  C: crate::engine::TokenCounter + ?Sized
{   if messages.is_empty()
    {   debug!("No messages, full context of {} remains", context_limit);
        return Ok(context_limit as i64);
    }

    let consumed = counter.count_tokens(messages).await
      .map_err(|e| {
        error!("Token counting failed: {}", e);
        match e
        {   crate::error::Error::TokenizationError(msg) => {
              crate::error::Error::TokenizationError(msg)
            }
          , other => {
              crate::error::Error::TokenizationError(other.to_string())
            }
        }
      })?;

    let remaining = context_limit as i64 - consumed as i64;
    debug!(
      "Input consumes {} of {} tokens, {} remain",
      consumed, context_limit, remaining
    );
    Ok(remaining)
}
