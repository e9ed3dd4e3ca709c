use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use tokio::{
    task::JoinHandle,
    time::{self, Duration, Instant},
};

/// Seconds until resend is allowed again, optionally driven by a background one-second
/// ticker. The ticker is aborted on `stop`, on `restart` and on drop.
#[derive(Debug, Default)]
pub struct Countdown {
    remaining: Arc<AtomicU64>,
    ticker: Option<JoinHandle<()>>,
}

impl Countdown {
    pub fn remaining(&self) -> u64 {
        self.remaining.load(Ordering::SeqCst)
    }

    /// Decrement by one second, clamping at zero. Returns the new value.
    pub fn tick(&self) -> u64 {
        decrement(&self.remaining)
    }

    /// Reset to `seconds`. With `auto_tick` a task decrements once per second until zero;
    /// it must be called from within a Tokio runtime.
    pub fn restart(&mut self, seconds: u64, auto_tick: bool) {
        self.stop();
        self.remaining.store(seconds, Ordering::SeqCst);
        if auto_tick && seconds > 0 {
            let remaining = Arc::clone(&self.remaining);
            self.ticker = Some(tokio::spawn(async move {
                let period = Duration::from_secs(1);
                let mut interval = time::interval_at(Instant::now() + period, period);
                loop {
                    interval.tick().await;
                    if decrement(&remaining) == 0 {
                        break;
                    }
                }
            }));
        }
    }

    pub fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    /// Stop ticking and zero the counter.
    pub fn clear(&mut self) {
        self.stop();
        self.remaining.store(0, Ordering::SeqCst);
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.stop();
    }
}

fn decrement(remaining: &AtomicU64) -> u64 {
    let previous = remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| Some(v.saturating_sub(1)))
        .unwrap_or(0);
    previous.saturating_sub(1)
}
