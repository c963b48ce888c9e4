use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::tasks::reconciler::leader::LeaderLease;
use crate::tasks::reconciler::Reconciler;

/// Running reconciler loop. Dropping the handle leaves the loop running;
/// call [`ReconcilerHandle::stop`] to end it.
pub(crate) struct ReconcilerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReconcilerHandle {
    /// Signals the loop and waits for the in-flight tick to finish.
    pub(crate) async fn stop(self) {
        if self.shutdown.send(true).is_err() {
            tracing::warn!("Reconciler loop already exited");
        }
        if let Err(err) = self.task.await {
            tracing::error!(error = %err, "Reconciler task join failed");
        }
    }
}

pub(crate) fn spawn(
    reconciler: Reconciler,
    period: Duration,
    lease: Option<LeaderLease>,
) -> ReconcilerHandle {
    let (shutdown, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(reconcile_loop(reconciler, period, lease, shutdown_rx));
    ReconcilerHandle { shutdown, task }
}

async fn reconcile_loop(
    reconciler: Reconciler,
    period: Duration,
    mut lease: Option<LeaderLease>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(interval_secs = period.as_secs(), "Reconciler started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Some(lease) = lease.as_mut() {
                    match lease.ensure().await {
                        Ok(true) => {}
                        Ok(false) => continue,
                        Err(err) => {
                            tracing::error!(error = %err, "Failed to check reconciler leadership");
                            continue;
                        }
                    }
                }

                // Errors are logged and counted inside the tick.
                let _ = reconciler.tick().await;
            }
        }
    }

    if let Some(lease) = lease.as_mut() {
        lease.release().await;
    }
    tracing::info!("Reconciler stopped");
}
