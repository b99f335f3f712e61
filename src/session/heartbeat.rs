//! # Heartbeat
//!
//! Liveness and round-trip latency measurement.
//!
//! Every period the session sends a ping and remembers when. A pong is
//! attributed to the most recent ping: there is no request id, so the
//! latency is only right while the receiver answers pings in order and
//! exactly once.
//!
//! [`Heartbeat`] is the bookkeeping owned by the session manager;
//! [`HeartbeatTimer`] is the tokio interval the event loop arms while the
//! heartbeat is active.

use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Default heartbeat period.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(5000);

/// Heartbeat bookkeeping: running flag and the latest ping timestamp.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    period: Duration,
    active: bool,
    last_sent: Option<Instant>,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new(HEARTBEAT_INTERVAL)
    }
}

impl Heartbeat {
    /// Creates a stopped heartbeat.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            active: false,
            last_sent: None,
        }
    }

    /// Tick period.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Whether ticks should currently fire.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Starts ticking.
    pub fn start(&mut self) {
        self.active = true;
    }

    /// Stops ticking. Safe to call any number of times, started or not.
    ///
    /// Returns `true` if the heartbeat was running.
    pub fn cancel(&mut self) -> bool {
        std::mem::replace(&mut self.active, false)
    }

    /// Records that a ping went out at `now`.
    pub fn record_ping(&mut self, now: Instant) {
        self.last_sent = Some(now);
    }

    /// Timestamp of the most recent ping.
    #[must_use]
    pub fn last_sent(&self) -> Option<Instant> {
        self.last_sent
    }

    /// Round-trip time for a pong observed at `now`, measured from the
    /// most recent ping. `None` if no ping was ever sent.
    #[must_use]
    pub fn round_trip(&self, now: Instant) -> Option<Duration> {
        self.last_sent.map(|sent| now.saturating_duration_since(sent))
    }
}

/// Cancellable periodic timer driving [`Heartbeat`] ticks.
///
/// The first tick fires one full period after arming.
#[derive(Debug, Default)]
pub struct HeartbeatTimer {
    interval: Option<Interval>,
}

impl HeartbeatTimer {
    /// Creates a disarmed timer.
    #[must_use]
    pub fn new() -> Self {
        Self { interval: None }
    }

    /// Whether the timer is armed.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.interval.is_some()
    }

    /// Arms the timer with `period`. No-op if already armed.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm(&mut self, period: Duration) {
        if self.interval.is_none() {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.interval = Some(interval);
        }
    }

    /// Disarms the timer. Idempotent.
    pub fn disarm(&mut self) {
        self.interval = None;
    }

    /// Arms or disarms to match the heartbeat.
    pub fn follow(&mut self, heartbeat: &Heartbeat) {
        if heartbeat.is_active() {
            self.arm(heartbeat.period());
        } else {
            self.disarm();
        }
    }

    /// Waits for the next tick. Pends forever while disarmed.
    pub async fn tick(&mut self) -> Instant {
        match self.interval.as_mut() {
            Some(interval) => interval.tick().await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_period_is_five_seconds() {
        assert_eq!(HEARTBEAT_INTERVAL, Duration::from_millis(5000));
        assert_eq!(Heartbeat::default().period(), HEARTBEAT_INTERVAL);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut hb = Heartbeat::default();
        assert!(!hb.cancel(), "cancel before start is safe");

        hb.start();
        assert!(hb.is_active());
        assert!(hb.cancel());
        assert!(!hb.cancel());
        assert!(!hb.is_active());
    }

    #[test]
    fn test_round_trip_from_latest_ping() {
        let t0 = Instant::now();
        let mut hb = Heartbeat::default();
        assert_eq!(hb.round_trip(t0), None);

        hb.record_ping(t0 + Duration::from_millis(1000));
        assert_eq!(
            hb.round_trip(t0 + Duration::from_millis(1042)),
            Some(Duration::from_millis(42))
        );

        // A newer ping replaces the older one
        hb.record_ping(t0 + Duration::from_millis(6000));
        assert_eq!(
            hb.round_trip(t0 + Duration::from_millis(6010)),
            Some(Duration::from_millis(10))
        );
    }

    #[test]
    fn test_round_trip_never_negative() {
        let t0 = Instant::now();
        let mut hb = Heartbeat::default();
        hb.record_ping(t0 + Duration::from_millis(50));
        assert_eq!(hb.round_trip(t0), Some(Duration::ZERO));
    }

    #[tokio::test]
    async fn test_timer_ticks_when_armed() {
        let mut timer = HeartbeatTimer::new();
        assert!(!timer.is_armed());

        timer.arm(Duration::from_millis(5));
        assert!(timer.is_armed());

        let ticked = tokio::time::timeout(Duration::from_secs(1), timer.tick()).await;
        assert!(ticked.is_ok(), "armed timer should tick");
    }

    #[tokio::test]
    async fn test_disarmed_timer_never_ticks() {
        let mut timer = HeartbeatTimer::new();
        timer.arm(Duration::from_millis(5));
        timer.disarm();
        timer.disarm();

        let ticked = tokio::time::timeout(Duration::from_millis(30), timer.tick()).await;
        assert!(ticked.is_err(), "disarmed timer must not tick");
    }

    #[test]
    fn test_never_armed_timer_is_pending() {
        let mut timer = HeartbeatTimer::new();
        let mut tick = tokio_test::task::spawn(timer.tick());
        tokio_test::assert_pending!(tick.poll());
        tokio_test::assert_pending!(tick.poll());
    }

    #[tokio::test]
    async fn test_timer_follows_heartbeat() {
        let mut hb = Heartbeat::new(Duration::from_millis(10));
        let mut timer = HeartbeatTimer::new();

        timer.follow(&hb);
        assert!(!timer.is_armed());

        hb.start();
        timer.follow(&hb);
        assert!(timer.is_armed());

        hb.cancel();
        timer.follow(&hb);
        assert!(!timer.is_armed());
    }
}
