use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic session clock in milliseconds
pub trait Clock {
    /// Milliseconds since creation or the last `reset`
    fn now_ms(&self) -> u64;
    fn sleep(&self, d: Duration);
    /// Restart counting from zero (trigger received)
    fn reset(&mut self);
}

/// Platform-specific high-precision timer.
/// Time is taken from `Instant`, never from the wall clock, so system clock
/// adjustments do not move deadlines.
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    start: Instant,
}

impl Clock for HighPrecisionTimer {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d)
    }

    fn reset(&mut self) {
        self.start = Instant::now();
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Nanoseconds since start, for sub-millisecond diagnostics
    pub fn now_ns(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(not(target_os = "linux"))]
        self.portable_sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC};

        let req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        unsafe {
            clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn portable_sleep(&self, duration: Duration) {
        // scheduler granularity makes short sleeps overshoot; spin instead
        if duration < Duration::from_micros(100) {
            let start = Instant::now();
            while start.elapsed() < duration {
                std::hint::spin_loop();
            }
        } else {
            std::thread::sleep(duration);
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic clock for tests and dry runs: `sleep` advances time
/// instead of blocking. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.set(self.now_ms.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.now_ms.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }

    fn sleep(&self, d: Duration) {
        // sub-millisecond sleeps still move time forward
        self.advance((d.as_millis() as u64).max(1));
    }

    fn reset(&mut self) {
        self.now_ms.set(0);
    }
}
