//! PublishScheduler - fixed-rate timer driving publish cycles

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use capture::Clock;
use contracts::{ContractError, RenderTarget};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::CaptureCycle;

/// Handle to the running timer task
struct Armed {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Fires a callback every `1 / rate` seconds
///
/// - First fire happens one full period after `start`
/// - A cycle that overruns its period delays the next fire; cycles never overlap
/// - `stop` lets the in-flight cycle finish and guarantees no fire afterwards
pub struct PublishScheduler {
    rate: f64,
    period: Duration,
    fires: Arc<AtomicU64>,
    completed: Arc<watch::Sender<u64>>,
    armed: Mutex<Option<Armed>>,
}

impl PublishScheduler {
    /// Create a scheduler for `rate` cycles per second
    ///
    /// # Errors
    /// `InvalidRate` if `rate` is not finite, not positive, or so large the
    /// period rounds to zero.
    pub fn new(rate: f64) -> Result<Self, ContractError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ContractError::InvalidRate { rate });
        }
        let period = Duration::try_from_secs_f64(1.0 / rate)
            .map_err(|_| ContractError::InvalidRate { rate })?;
        if period.is_zero() {
            return Err(ContractError::InvalidRate { rate });
        }

        Ok(Self {
            rate,
            period,
            fires: Arc::new(AtomicU64::new(0)),
            completed: Arc::new(watch::channel(0).0),
            armed: Mutex::new(None),
        })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Whether the timer is running
    pub fn is_armed(&self) -> bool {
        self.armed.lock().is_some()
    }

    /// Cycles fired since creation
    pub fn fire_count(&self) -> u64 {
        self.fires.load(Ordering::Relaxed)
    }

    /// Observe the number of cycles that have run to completion
    pub fn completed_cycles(&self) -> watch::Receiver<u64> {
        self.completed.subscribe()
    }

    /// Arm the timer; must be called from within a Tokio runtime
    ///
    /// Calling `start` on an armed scheduler does nothing.
    pub fn start<F, Fut>(&self, mut on_fire: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut armed = self.armed.lock();
        if armed.is_some() {
            debug!("publish scheduler already armed");
            return;
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let period = self.period;
        let fires = Arc::clone(&self.fires);
        let completed = Arc::clone(&self.completed);

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;

                    _ = shutdown_rx.changed() => break,

                    _ = ticker.tick() => {
                        fires.fetch_add(1, Ordering::Relaxed);
                        on_fire().await;
                        completed.send_modify(|n| *n += 1);
                    }
                }
            }

            debug!(fires = fires.load(Ordering::Relaxed), "publish timer stopped");
        });

        info!(
            rate_hz = self.rate,
            period_ms = period.as_secs_f64() * 1000.0,
            "publish scheduler armed"
        );
        observability::record_publish_rate(self.rate);

        *armed = Some(Armed { shutdown, handle });
    }

    /// Arm the timer with a capture cycle
    ///
    /// Each fire runs the cycle on the blocking pool; the next fire waits for
    /// it to complete.
    pub fn start_cycle<T, C>(&self, cycle: Arc<CaptureCycle<T, C>>)
    where
        T: RenderTarget + 'static,
        C: Clock + 'static,
    {
        self.start(move || {
            let cycle = Arc::clone(&cycle);
            async move {
                if let Err(e) = tokio::task::spawn_blocking(move || cycle.run_once()).await {
                    error!(error = %e, "capture cycle task failed");
                }
            }
        });
    }

    /// Disarm the timer
    ///
    /// Waits for an in-flight cycle to complete. No cycle fires after this
    /// returns. Stopping an idle scheduler does nothing.
    pub async fn stop(&self) {
        let Some(Armed { shutdown, handle }) = self.armed.lock().take() else {
            return;
        };

        let _ = shutdown.send(true);
        if let Err(e) = handle.await {
            error!(error = %e, "publish timer task failed");
        }

        info!(fires = self.fire_count(), "publish scheduler stopped");
    }
}

impl Drop for PublishScheduler {
    fn drop(&mut self) {
        if let Some(Armed { shutdown, handle }) = self.armed.get_mut().take() {
            let _ = shutdown.send(true);
            handle.abort();
        }
    }
}
