use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// A stop flag shared by the client and its background threads.
///
/// Threads poll [`RunSignal::is_running`] between blocking operations, periodic tasks sleep through
/// [`RunSignal::sleep`] so that a stop request wakes them immediately.
#[derive(Debug)]
pub struct RunSignal {
    running: Mutex<bool>,
    condvar: Condvar,
}

impl Default for RunSignal {
    fn default() -> Self {
        Self {
            running: Mutex::new(true),
            condvar: Condvar::new(),
        }
    }
}

impl RunSignal {
    pub fn is_running(&self) -> bool {
        *self.running.lock()
    }

    /// Flags the signal as stopped and wakes all sleepers. Returns `true` if it was running.
    pub fn stop(&self) -> bool {
        let mut running = self.running.lock();
        let was_running = *running;
        *running = false;
        self.condvar.notify_all();
        was_running
    }

    /// Sleeps for `duration` unless stopped meanwhile.
    ///
    /// # Returns
    /// `true` if still running after the sleep.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut running = self.running.lock();
        while *running {
            if self.condvar.wait_until(&mut running, deadline).timed_out() {
                break;
            }
        }
        *running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_sleep_runs_to_completion() {
        let signal = RunSignal::default();
        let start = Instant::now();
        assert!(signal.sleep(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_stop_wakes_sleepers() {
        let signal = Arc::new(RunSignal::default());
        let sleeper = {
            let signal = signal.clone();
            thread::spawn(move || signal.sleep(Duration::from_secs(10)))
        };
        thread::sleep(Duration::from_millis(20));
        assert!(signal.stop());
        assert!(!signal.stop(), "Second stop is a no-op");
        assert!(!sleeper.join().unwrap());
        assert!(!signal.is_running());
    }
}
