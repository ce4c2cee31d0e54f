use std::time::Duration;

use futures::{Stream, StreamExt, stream::BoxStream};
use tokio::time::{Instant, MissedTickBehavior, interval};

pub trait TickStream: Stream<Item = Instant> + Send + Unpin {}

impl<T> TickStream for T where T: Stream<Item = Instant> + Send + Unpin {}

pub type BoxTickStream = BoxStream<'static, Instant>;

/// Fixed-period ticks. The first tick fires immediately; a tick that comes
/// due while a cycle is still running is delayed, never stacked.
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    period: Duration,
}

impl Schedule {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn into_stream(self) -> BoxTickStream {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        futures::stream::unfold(ticker, |mut ticker| async move {
            let at = ticker.tick().await;
            Some((at, ticker))
        })
        .boxed()
    }

    /// A single tick, for one-shot runs.
    pub fn once() -> BoxTickStream {
        futures::stream::once(async { Instant::now() }).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_are_spaced_by_period() {
        let mut ticks = Schedule::new(Duration::from_secs(600)).into_stream();
        let first = ticks.next().await.unwrap();
        let second = ticks.next().await.unwrap();
        assert_eq!(second - first, Duration::from_secs(600));
    }

    #[tokio::test]
    async fn once_yields_one_tick() {
        assert_eq!(Schedule::once().count().await, 1);
    }
}
