use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Stop flag for the supervisor thread and multi-hop navigation.
///
/// Waits on this signal return as soon as it is triggered, so a session is
/// torn down within one poll interval.
pub struct ShutdownSignal {
    shutdown: AtomicBool,
    condvar: Condvar,
    mutex: Mutex<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self {
            shutdown: AtomicBool::new(false),
            condvar: Condvar::new(),
            mutex: Mutex::new(()),
        }
    }

    /// Trigger the signal, waking every waiter.
    pub fn trigger(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // Take the lock so a waiter between its check and its wait sees the notify
        let _guard = self.mutex.lock();
        self.condvar.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Wait for `duration` or until the signal is triggered.
    ///
    /// Returns `true` if the signal was triggered.
    pub fn wait(&self, duration: Duration) -> bool {
        if self.is_shutdown() {
            return true;
        }

        let Ok(guard) = self.mutex.lock() else {
            return true;
        };
        match self
            .condvar
            .wait_timeout_while(guard, duration, |_| !self.is_shutdown())
        {
            Ok((_, timeout)) => !timeout.timed_out(),
            // Poisoned; treat as shutdown
            Err(_) => true,
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Instant;

    const LONG: Duration = Duration::from_secs(10);

    #[test]
    fn untriggered_wait_runs_out() {
        let signal = ShutdownSignal::default();
        let start = Instant::now();

        assert!(!signal.wait(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert!(!signal.is_shutdown());
    }

    #[test]
    fn wait_after_trigger_returns_at_once() {
        let signal = ShutdownSignal::new();
        signal.trigger();

        let start = Instant::now();
        assert!(signal.wait(LONG));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn racing_waiters_never_miss_the_wakeup() {
        // Waiters and the trigger are released together, so the trigger
        // lands between a waiter's flag check and its wait.
        for _ in 0..100 {
            let signal = Arc::new(ShutdownSignal::new());
            let barrier = Arc::new(Barrier::new(5));

            let waiters: Vec<_> = (0..4)
                .map(|_| {
                    let signal = Arc::clone(&signal);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        let start = Instant::now();
                        (signal.wait(LONG), start.elapsed())
                    })
                })
                .collect();

            barrier.wait();
            signal.trigger();

            for waiter in waiters {
                let (interrupted, elapsed) = waiter.join().unwrap();
                assert!(interrupted);
                assert!(elapsed < Duration::from_secs(2));
            }
        }
    }
}
