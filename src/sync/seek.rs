use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Result, SubweaveError};

/// Instruction for the media player
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekCommand {
    pub target: f64,
    pub play: bool,
}

/// Deferred click-to-seek
///
/// A scheduled seek fires when the caption track reports ready or when the
/// fallback delay elapses, whichever comes first. Scheduling again aborts the
/// pending seek.
pub struct SeekScheduler {
    delay: Duration,
    ready: Arc<Notify>,
    sender: UnboundedSender<SeekCommand>,
    receiver: Option<UnboundedReceiver<SeekCommand>>,
    pending: Option<JoinHandle<()>>,
}

impl SeekScheduler {
    pub fn new(delay: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            delay,
            ready: Arc::new(Notify::new()),
            sender,
            receiver: Some(receiver),
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Hand the command stream to the player; only the first call gets it
    pub fn take_receiver(&mut self) -> Option<UnboundedReceiver<SeekCommand>> {
        self.receiver.take()
    }

    /// Must be called from within a tokio runtime
    pub fn schedule(&mut self, command: SeekCommand) -> Result<()> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| SubweaveError::Scheduler(format!("No async runtime available: {}", e)))?;

        self.cancel();

        // Register for the ready signal before the task first runs
        let mut ready = Box::pin(Arc::clone(&self.ready).notified_owned());
        ready.as_mut().enable();
        let sender = self.sender.clone();
        let delay = self.delay;

        self.pending = Some(handle.spawn(async move {
            tokio::select! {
                _ = ready => debug!("Caption track ready, seeking to {:.3}", command.target),
                _ = tokio::time::sleep(delay) => debug!("Seek delay elapsed, seeking to {:.3}", command.target),
            }
            if sender.send(command).is_err() {
                warn!("Seek receiver dropped, discarding seek to {:.3}", command.target);
            }
        }));

        Ok(())
    }

    /// Release a waiting seek right away
    pub fn notify_ready(&self) {
        self.ready.notify_waiters();
    }

    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            if !pending.is_finished() {
                debug!("Cancelling pending seek");
            }
            pending.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|pending| !pending.is_finished())
    }
}

impl Drop for SeekScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
