//! Poll loop driving fetches and redraws
//!
//! Handles:
//! - One fetch right away, then one per poll interval
//! - Fetches run as independent tasks and may overlap; results come back over
//!   single-slot channels and every draw happens on the loop task
//! - Idempotent stop from any task via `SchedulerHandle`
//! - Terminal restoration on every exit path

use crate::client::DeviceSource;
use crate::display::Dashboard;
use crate::error::{MonitorError, Result};
use crate::grouping::group;
use crate::models::DeviceList;
use crate::retry::RetryPolicy;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Cloneable stop switch for a running scheduler
#[derive(Clone)]
pub struct SchedulerHandle {
    state: Arc<Mutex<SchedulerState>>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl SchedulerHandle {
    /// Request shutdown of a running scheduler. A no-op in any other state.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if *state != SchedulerState::Running {
            return;
        }
        *state = SchedulerState::Stopping;
        debug!("scheduler stop requested");
        self.shutdown.send_replace(true);
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.lock()
    }
}

pub struct Scheduler<S: DeviceSource, W: Write> {
    source: Arc<S>,
    dashboard: Dashboard<W>,
    poll_interval: Duration,
    retry: RetryPolicy,
    handle: SchedulerHandle,
}

impl<S: DeviceSource, W: Write> Scheduler<S, W> {
    pub fn new(source: Arc<S>, dashboard: Dashboard<W>, poll_interval: Duration, retry: RetryPolicy) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            source,
            dashboard,
            poll_interval,
            retry,
            handle: SchedulerHandle {
                state: Arc::new(Mutex::new(SchedulerState::Idle)),
                shutdown: Arc::new(shutdown),
            },
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> SchedulerState {
        self.handle.state()
    }

    pub fn stop(&self) {
        self.handle.stop()
    }

    pub fn dashboard(&self) -> &Dashboard<W> {
        &self.dashboard
    }

    /// Take over the terminal and poll until stopped. Only an idle scheduler
    /// starts; in any other state this returns immediately.
    pub async fn start(&mut self) -> Result<()> {
        let mut shutdown = self.handle.shutdown.subscribe();
        {
            let mut state = self.handle.state.lock();
            if *state != SchedulerState::Idle {
                debug!("scheduler not idle ({:?}), not starting", *state);
                return Ok(());
            }
            *state = SchedulerState::Running;
        }

        let result = self.poll(&mut shutdown).await;

        if let Err(e) = self.dashboard.restore() {
            warn!("failed to restore terminal: {}", e);
        }
        *self.handle.state.lock() = SchedulerState::Stopped;
        info!("scheduler stopped");
        result
    }

    async fn poll(&mut self, shutdown: &mut watch::Receiver<bool>) -> Result<()> {
        self.dashboard.start()?;
        info!(
            "polling every {}",
            humantime::format_duration(self.poll_interval)
        );

        let (list_tx, mut list_rx) = mpsc::channel::<DeviceList>(1);
        let (error_tx, mut error_rx) = mpsc::channel::<MonitorError>(1);

        let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.spawn_fetch(&list_tx, &error_tx);

        loop {
            tokio::select! {
                biased;
                _ = cancelled(shutdown) => return Ok(()),
                _ = ticker.tick() => self.spawn_fetch(&list_tx, &error_tx),
                Some(list) = list_rx.recv() => {
                    let view = group(&list.physical_devices);
                    debug!("rendering {} devices in {} groups", view.total_devices, view.groups.len());
                    self.dashboard.render_success(view)?;
                }
                Some(err) = error_rx.recv() => {
                    warn!("fetch failed: {}", err);
                    self.dashboard.render_failure(&err)?;
                }
            }
        }
    }

    fn spawn_fetch(&self, list_tx: &mpsc::Sender<DeviceList>, error_tx: &mpsc::Sender<MonitorError>) {
        let source = Arc::clone(&self.source);
        let retry = self.retry;
        let mut shutdown = self.handle.shutdown.subscribe();
        let list_tx = list_tx.clone();
        let error_tx = error_tx.clone();

        tokio::spawn(async move {
            if *shutdown.borrow() {
                return;
            }

            let outcome = tokio::select! {
                biased;
                _ = cancelled(&mut shutdown) => return,
                outcome = retry.run(|| source.fetch_devices()) => outcome,
            };

            match outcome {
                Ok(list) => {
                    tokio::select! {
                        biased;
                        _ = cancelled(&mut shutdown) => {}
                        _ = list_tx.send(list) => {}
                    }
                }
                Err(err) => {
                    tokio::select! {
                        biased;
                        _ = cancelled(&mut shutdown) => {}
                        _ = error_tx.send(err) => {}
                    }
                }
            }
        });
    }

    /// Fetch and render once, outside the poll loop. The fetch error, if any,
    /// is rendered and then returned.
    pub async fn run_once(&mut self) -> Result<()> {
        let source = Arc::clone(&self.source);
        match self.retry.run(|| source.fetch_devices()).await {
            Ok(list) => {
                self.dashboard.render_success(group(&list.physical_devices))?;
                Ok(())
            }
            Err(err) => {
                self.dashboard.render_failure(&err)?;
                Err(err)
            }
        }
    }
}

/// Resolves once shutdown is requested or the scheduler is gone.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stopped| *stopped).await;
}
