//! Presentation clock for outbound video

use std::time::Instant;

/// RTP video clock rate (90 kHz)
pub const VIDEO_CLOCK_RATE: u32 = 90_000;

/// Timestamp units as a rational (numerator, denominator)
pub const VIDEO_TIME_BASE: (u32, u32) = (1, VIDEO_CLOCK_RATE);

/// Monotonic presentation clock, one per session.
///
/// Timestamps are strictly increasing across calls even when frames arrive
/// faster than one clock tick apart.
pub struct VideoClock {
    epoch: Instant,
    last_pts: i64,
}

impl VideoClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            last_pts: -1,
        }
    }

    /// Next presentation timestamp in 90 kHz ticks
    pub fn next_pts(&mut self) -> i64 {
        let elapsed = self.epoch.elapsed().as_secs_f64();
        let ticks = (elapsed * f64::from(VIDEO_CLOCK_RATE)) as i64;
        let pts = ticks.max(self.last_pts + 1);
        self.last_pts = pts;
        pts
    }
}

impl Default for VideoClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pts_strictly_increasing() {
        let mut clock = VideoClock::new();
        let mut last = clock.next_pts();
        for _ in 0..1000 {
            let pts = clock.next_pts();
            assert!(pts > last, "pts {} not greater than {}", pts, last);
            last = pts;
        }
    }

    #[test]
    fn test_pts_tracks_wall_clock() {
        let mut clock = VideoClock::new();
        let first = clock.next_pts();
        std::thread::sleep(std::time::Duration::from_millis(20));
        let second = clock.next_pts();
        // 20ms at 90kHz is 1800 ticks; allow generous scheduling slack
        assert!(second - first >= 900, "delta {} too small", second - first);
    }
}
