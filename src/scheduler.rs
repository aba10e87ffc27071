use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Owns every periodic job of a session. Dropping the scheduler does not stop
/// the jobs; call [`Scheduler::shutdown`].
pub struct Scheduler {
    token: CancellationToken,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl Scheduler {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            handles: Vec::new(),
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Run `job` right away and then once per `period` until shutdown.
    ///
    /// The job gets the tick number, starting at 0. A tick that falls due while
    /// the previous run is still going is pushed back rather than bunched up.
    pub fn every<F, Fut>(&mut self, name: &'static str, period: Duration, mut job: F)
    where
        F: FnMut(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.token.clone();
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            for tick in 0u64.. {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {}
                }
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = job(tick) => {}
                }
            }
            debug!("Job {} stopped", name);
        });

        self.handles.push((name, handle));
    }

    /// Run a one-off task until it finishes or the session ends.
    pub fn spawn<Fut>(&mut self, name: &'static str, task: Fut)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = task => {}
            }
            debug!("Task {} stopped", name);
        });

        self.handles.push((name, handle));
    }

    /// Like [`Scheduler::spawn`], but the task watches the token itself so it
    /// can clean up before returning.
    pub fn spawn_with_token<F, Fut>(&mut self, name: &'static str, task: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task(self.token.clone()));
        self.handles.push((name, handle));
    }

    /// Cancel the session and wait for every job to wind down.
    pub async fn shutdown(self) {
        self.token.cancel();
        for (name, handle) in self.handles {
            if let Err(err) = handle.await {
                warn!("Job {} ended abnormally: {}", name, err);
            }
        }
    }
}
