//! Frame-aligned render coalescing.
//!
//! Callers mark a render as requested as often as they like; the session awaits
//! [`RenderCoalescer::next_frame`] only while a request is pending and renders the
//! latest content once per tick.

use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug)]
pub struct RenderCoalescer {
    frames: Interval,
    render_requested: bool,
    requests: u64,
}

impl RenderCoalescer {
    /// The first frame fires one `period` after construction. A zero period is
    /// raised to one millisecond.
    pub fn new(period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let mut frames = interval_at(Instant::now() + period, period);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            frames,
            render_requested: false,
            requests: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.frames.period()
    }

    pub fn request_render(&mut self) {
        self.render_requested = true;
        self.requests += 1;
    }

    pub fn is_pending(&self) -> bool {
        self.render_requested
    }

    /// Total requests since construction, coalesced or not.
    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// Waits for the next frame tick. Cancel-safe.
    pub async fn next_frame(&mut self) {
        self.frames.tick().await;
    }

    /// Clears the pending flag, returning whether a render was requested.
    pub fn take_pending(&mut self) -> bool {
        std::mem::take(&mut self.render_requested)
    }

    /// Drops any pending request; used by the final, non-coalesced render.
    pub fn cancel(&mut self) {
        self.render_requested = false;
    }
}

impl Default for RenderCoalescer {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_INTERVAL)
    }
}
