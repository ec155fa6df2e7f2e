use std::sync::Arc;
use tokio::sync::mpsc;
use log::{debug, trace, error, info};
use crate::TextGenFoot;

/// Public API for the textgen backend - owns the task
pub struct TextGenBackend
{   hand: crate::TextGenHand
  , _task_handle: tokio::task::JoinHandle<()>
}

impl TextGenBackend
{   /// Create and spawn a new backend around a loaded engine
    /// Returns immediately - spawns background task
    pub fn new<E>(
      engine: Arc<E>
    , config: crate::config::ControllerConfig
    ) -> Result<Self, crate::error::Error>
    where
      E: crate::engine::InferenceEngine + ?Sized + 'static
    {   debug!("Creating TextGenBackend with task ownership");
        let controller
          = crate::controller::GenerationController::new(engine, config)?;

        let (generate_tx, generate_rx)
          = mpsc::unbounded_channel();
        let (kill_process_tx, kill_process_rx)
          = mpsc::unbounded_channel();

        let hand = crate::TextGenHand
        {   generate_tx
          , kill_process_tx
        };

        let foot = crate::TextGenFoot
        {   generate_rx
          , kill_process_rx
        };

        let _task_handle = tokio::spawn(async move {
          run_backend_loop(foot, controller).await
        });

        Ok(TextGenBackend
        {   hand
          , _task_handle
        })
    }

    /// Queue a job input - returns almost immediately
    pub async fn generate(
      &self
    , input: serde_json::Value
    ) -> Result<
        mpsc::UnboundedReceiver<crate::request::JobOutput>,
        crate::error::Error
      >
    {   debug!("generate queuing command");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::GenerateArgs
        {   input
          , reply: reply_tx
        };

        self.hand.generate_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel closed");
            crate::error::Error::Other(
              "Backend disconnected".to_string()
            )
          })?;

        Ok(reply_rx)
    }

    /// Gracefully shutdown the backend
    pub async fn shutdown(self)
      -> Result<(), crate::error::Error>
    {   debug!("Shutting down TextGenBackend");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::KillProcessArgs
        {   reply: reply_tx
        };

        self.hand.kill_process_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel already closed");
            crate::error::Error::Other(
              "Backend already shutdown".to_string()
            )
          })?;

        // Wait for shutdown confirmation
        if let Some(result) = reply_rx.recv().await
        {   debug!("Backend shutdown confirmed");
            result
        } else
        {   error!("Backend shutdown lost its reply");
            Err(crate::error::Error::Other(
              "Backend disconnected".to_string()
            ))
        }
    }
}

/// Main backend event loop
///
/// tokio::select! only routes. Each job runs on its own task so
/// independent requests overlap; passes within one job never do.
async fn run_backend_loop<E>(
  foot: crate::TextGenFoot
, controller: crate::controller::GenerationController<E>
)
where
  E: crate::engine::InferenceEngine + ?Sized + 'static
{   debug!("Starting TextGenBackend event loop");
    let TextGenFoot
    {   mut generate_rx
      , mut kill_process_rx
    } = foot;
    let mut next_job: u64 = 0;

    loop
    { tokio::select!
      { Some(cmd) = generate_rx.recv() => {
          next_job += 1;
          let job_id = next_job;
          debug!("Received Generate, job {}", job_id);
          let controller = controller.clone();
          tokio::spawn(async move {
            let output = controller.handle_input(&cmd.input).await;
            trace!("Job {} finished, error={}", job_id, output.is_error());
            let _ = cmd.reply.send(output);
          });
        }
      , Some(cmd) = kill_process_rx.recv() => {
          debug!("Received KillProcess");
          let _ = cmd.reply.send(Ok(()));
          info!("TextGenBackend shutting down");
          break;
        }
      , else => {
          debug!("All command channels closed");
          break;
        }
      }
    }
}
