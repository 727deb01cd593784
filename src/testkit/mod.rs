//! Helpers for testing code that uses timers

use crate::cfg::TimerConfig;
use crate::facility::{Facility, Notify, ThreadFacility, TimerId, TimerSpec};
use parking_lot::Mutex;
use std::io;
use std::thread;
use std::time::{Duration, Instant};

/// Repeatedly evaluate the provided function upto
/// a specified limit, sleeping for 10ms between
/// executions.
///
/// If the function doesn't return true within the
/// limit, this panics and thus fails the test.
///
/// This is useful for testing asynchronous behavior
/// from different threads in a polling fashion.
pub fn eventually<F: FnMut() -> bool>(limit: Duration, mut f: F) {
    let start = Instant::now();

    while !f() {
        if start.elapsed() > limit {
            panic!("provided function hasn't returned true within {:?}", limit);
        }

        thread::sleep(Duration::from_millis(10));
    }
}

/// Which facility calls a `FaultyFacility` should reject.
#[derive(Clone, Copy, Debug, Default)]
pub struct Faults {
    pub create: bool,
    pub set_time: bool,
    pub release: bool,
}

/// A `ThreadFacility` that can be told to fail, and that records every
/// id it was asked to release.
pub struct FaultyFacility {
    inner: ThreadFacility,
    faults: Mutex<Faults>,
    released: Mutex<Vec<TimerId>>,
}

impl FaultyFacility {
    pub fn new() -> Self {
        Self::with_config(&TimerConfig::default())
    }

    pub fn with_config(config: &TimerConfig) -> Self {
        Self {
            inner: ThreadFacility::new(config).expect("failed to start test facility"),
            faults: Mutex::new(Faults::default()),
            released: Mutex::new(Vec::new()),
        }
    }

    pub fn set_faults(&self, faults: Faults) {
        *self.faults.lock() = faults;
    }

    pub fn released(&self) -> Vec<TimerId> {
        self.released.lock().clone()
    }

    pub fn live(&self) -> usize {
        self.inner.len()
    }

    fn injected(what: &str) -> io::Error {
        io::Error::new(io::ErrorKind::Other, format!("injected {} failure", what))
    }
}

impl Default for FaultyFacility {
    fn default() -> Self {
        Self::new()
    }
}

impl Facility for FaultyFacility {
    fn create(&self, notify: Notify) -> io::Result<TimerId> {
        if self.faults.lock().create {
            return Err(Self::injected("create"));
        }

        self.inner.create(notify)
    }

    fn set_time(&self, id: TimerId, spec: TimerSpec) -> io::Result<()> {
        if self.faults.lock().set_time {
            return Err(Self::injected("set_time"));
        }

        self.inner.set_time(id, spec)
    }

    fn release(&self, id: TimerId) -> io::Result<()> {
        if self.faults.lock().release {
            return Err(Self::injected("release"));
        }

        self.inner.release(id)?;
        self.released.lock().push(id);

        Ok(())
    }
}
