use std::time::{Duration, Instant};

/// Paces the render loop to one analysis buffer per buffer-length of audio.
#[derive(Clone, Copy, Debug)]
pub struct PacingClock {
    interval: Duration,
}

impl PacingClock {
    pub fn new(fft_size: usize, sample_rate: u32) -> Self {
        Self {
            interval: Duration::from_secs_f64(fft_size as f64 / sample_rate.max(1) as f64),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Deadlines advance from the previous deadline, not from now, so a late
    /// iteration doesn't push every later one back.
    pub fn next_deadline(&self, last: Instant) -> Instant {
        last + self.interval
    }

    /// Blocks until `deadline`. Returns at once if it already passed.
    pub fn wait_until(&self, deadline: Instant) {
        loop {
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            std::thread::sleep(deadline - now);
        }
    }
}
