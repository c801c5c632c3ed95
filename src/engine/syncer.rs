//! Background syncer
//!
//! A thread that runs a sync callback, then sleeps for the interval. The sleep
//! is a `recv_timeout` on a stop channel, so stopping never waits out a full
//! interval.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use tracing::debug;

use crate::error::Result;

/// Handle to a running periodic sync thread
pub(crate) struct Syncer {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Syncer {
    /// Spawn the thread; `tick` runs immediately and then once per `interval`
    pub(crate) fn spawn<F>(interval: Duration, tick: F) -> Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let (stop_tx, stop_rx) = channel::bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("twinlog-syncer".to_string())
            .spawn(move || {
                debug!(?interval, "syncer started");
                loop {
                    tick();
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("syncer stopped");
            })?;

        Ok(Self {
            stop_tx,
            handle: Some(handle),
        })
    }

    /// Signal the thread and wait for it to exit
    pub(crate) fn stop(self) {
        drop(self);
    }
}

impl Drop for Syncer {
    fn drop(&mut self) {
        let _ = self.stop_tx.try_send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
