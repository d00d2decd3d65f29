//! Cancellable sleeping, one-shot timers and periodic tickers.
//!
//! Sleeping is the only point where a goroutine observes cancellation on its own,
//! see [JoinHandle::cancel](crate::JoinHandle::cancel).

use std::time::{Duration, Instant};

use crate::runtime::{go, tls, JoinHandle};
use crate::sync::Channel;
use crate::{Error, Select};

/// Puts the current goroutine to sleep for at least `duration`.
///
/// Returns early with [Error::Cancelled] if the goroutine is cancelled.
pub fn sleep(duration: Duration) -> crate::CancellableResult<()> {
    match Instant::now().checked_add(duration) {
        Some(deadline) => sleep_until(deadline),
        // unrepresentable deadline, only cancellation ends this
        None => loop {
            sleep(Duration::from_secs(60 * 60 * 24))?;
        },
    }
}

/// Puts the current goroutine to sleep until `deadline`.
///
/// Returns early with [Error::Cancelled] if the goroutine is cancelled.
pub fn sleep_until(deadline: Instant) -> crate::CancellableResult<()> {
    if tls::current().sleep_until(deadline) {
        Ok(())
    } else {
        Err(Error::Cancelled)
    }
}

/// Delivers a single [Instant] on its channel once the duration has passed.
#[derive(Debug)]
pub struct Timer {
    channel: Channel<Instant>,
    goroutine: JoinHandle<()>,
}

impl Timer {
    pub fn new(duration: Duration) -> Self {
        let channel = Channel::bounded(1);

        let goroutine = go({
            let channel = channel.clone();
            move || {
                if sleep(duration).is_err() || crate::runtime::is_cancelled() {
                    return;
                }

                // only send on a capacity 1 channel, never parks
                channel.send(Instant::now());
            }
        });

        Timer { channel, goroutine }
    }

    /// Receives the firing time.
    pub fn channel(&self) -> &Channel<Instant> {
        &self.channel
    }

    /// Prevents the timer from firing, unless it already has.
    pub fn stop(&self) {
        self.goroutine.cancel();
    }
}

/// Channel receiving the time once `duration` has passed.
pub fn after(duration: Duration) -> Channel<Instant> {
    Timer::new(duration).channel
}

/// Delivers an [Instant] on its channel every period.
///
/// Ticks are dropped while the previous one hasn't been received yet.
#[derive(Debug)]
pub struct Ticker {
    channel: Channel<Instant>,
    goroutine: JoinHandle<()>,
}

impl Ticker {
    /// # Panics
    /// If `period` is zero.
    pub fn new(period: Duration) -> Self {
        assert!(!period.is_zero(), "ticker period must be positive");

        let channel = Channel::bounded(1);

        let goroutine = go({
            let channel = channel.clone();
            move || {
                let mut deadline = Instant::now();
                loop {
                    deadline += period;
                    if sleep_until(deadline).is_err() || crate::runtime::is_cancelled() {
                        break;
                    }

                    let dropped = Select::new().send(&channel, Instant::now(), || false).or_else(|| true);
                    if dropped {
                        tracing::trace!("ticker dropped a tick");
                    }
                }
            }
        });

        Ticker { channel, goroutine }
    }

    /// Receives the tick times.
    pub fn channel(&self) -> &Channel<Instant> {
        &self.channel
    }

    /// Stops further ticks, one already delivered stays in the channel.
    pub fn stop(&self) {
        self.goroutine.cancel();
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Channel receiving the time every `period`, forever.
///
/// # Panics
/// If `period` is zero.
pub fn tick(period: Duration) -> Channel<Instant> {
    let ticker = Ticker::new(period);
    let channel = ticker.channel.clone();
    // keep ticking once the ticker is gone
    std::mem::forget(ticker);
    channel
}
