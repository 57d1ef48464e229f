//! Dedicated background threads for platform adapters which must poll.

use crate::errors::{Context, Result};

use ::std::{
    thread::{self, JoinHandle},
    time::Duration,
};
use ::tokio::sync::oneshot::{self, error::TryRecvError};
use ::tracing::{debug, error};

/// A named worker thread which invokes a poll function at a fixed interval
/// until stopped.
///
/// Stopping is explicit and blocking: [`stop`] (or dropping the poller)
/// signals the thread and joins it. The thread checks the signal between
/// polls, so a stop completes within one poll plus one interval.
///
/// [`stop`]: Self::stop
#[derive(Debug)]
pub struct BackgroundPoller {
    name: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundPoller {
    /// Spawn a thread called `name` which calls `poll` every `interval`.
    pub fn spawn<F>(name: impl Into<String>, interval: Duration, mut poll: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let name = name.into();
        let (shutdown, mut signal) = oneshot::channel::<()>();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || loop {
                match signal.try_recv() {
                    Err(TryRecvError::Empty) => {
                        poll();
                        thread::sleep(interval);
                    }
                    Ok(()) | Err(TryRecvError::Closed) => break,
                }
            })
            .context(format!("Failed to spawn poller thread \"{name}\""))?;

        debug!(poller = %name, interval = ?interval, "Started background poller");
        Ok(Self {
            name,
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Signal the thread to exit and wait for it.
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            // The thread may already have exited; nothing to signal then.
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!(poller = %self.name, "Background poller panicked");
            } else {
                debug!(poller = %self.name, "Stopped background poller");
            }
        }
    }
}

impl Drop for BackgroundPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
