//! Auto-close countdown. Runs on its own task, repainting the remaining ratio
//! every frame, and fires the completion signal when it reaches zero.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use survey_core::config::CountdownConfig;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::signal::CompletionSignal;

/// Cancelable countdown handle. Dropping it aborts the underlying task.
pub struct Countdown {
    signal: Arc<dyn CompletionSignal>,
    frame: Duration,
    duration_secs: Option<u64>,
    remaining: Arc<watch::Sender<f64>>,
    stopped: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Countdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Countdown")
            .field("duration_secs", &self.duration_secs)
            .field("remaining", &*self.remaining.borrow())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl Countdown {
    /// Creates an idle countdown. Nothing runs until a duration is set.
    pub fn new(config: &CountdownConfig, signal: Arc<dyn CompletionSignal>) -> Self {
        let (tx, _rx) = watch::channel(1.0);
        Self {
            signal,
            frame: Duration::from_millis(config.frame_interval_ms.max(1)),
            duration_secs: None,
            remaining: Arc::new(tx),
            stopped: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Sets the auto-close duration. A changed duration restarts the
    /// countdown from full; the same duration again is a no-op, so a canceled
    /// countdown stays canceled. `None` or zero disables it. Must be called
    /// from within a tokio runtime.
    pub fn set_duration(&mut self, duration_secs: Option<u64>) {
        let duration_secs = duration_secs.filter(|secs| *secs > 0);
        if duration_secs == self.duration_secs {
            return;
        }

        self.abort_task();
        self.duration_secs = duration_secs;

        let Some(secs) = duration_secs else {
            return;
        };

        self.stopped.store(false, Ordering::SeqCst);
        self.remaining.send_replace(1.0);

        let timeout = Duration::from_secs(secs);
        let frame = self.frame;
        let remaining = self.remaining.clone();
        let stopped = self.stopped.clone();
        let signal = self.signal.clone();

        info!(duration_secs = secs, "Starting auto-close countdown");
        self.handle = Some(tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval(frame);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let left = timeout.saturating_sub(started.elapsed());
                remaining.send_replace(left.as_secs_f64() / timeout.as_secs_f64());

                if left.is_zero() {
                    stopped.store(true, Ordering::SeqCst);
                    info!("Auto-close countdown elapsed");
                    signal.on_auto_close();
                    break;
                }
            }
        }));
    }

    /// Stops the countdown for good, typically on user interaction.
    pub fn cancel(&mut self) {
        if self.handle.is_some() && !self.is_stopped() {
            debug!("Auto-close countdown canceled");
            self.stopped.store(true, Ordering::SeqCst);
        }
        self.abort_task();
    }

    /// Whether the countdown has been canceled or has run out.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Remaining share of the duration, from 1 down to 0.
    pub fn remaining(&self) -> f64 {
        *self.remaining.borrow()
    }

    /// Presentation subscribes here to repaint the countdown bar.
    pub fn subscribe(&self) -> watch::Receiver<f64> {
        self.remaining.subscribe()
    }

    fn abort_task(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.abort_task();
    }
}
