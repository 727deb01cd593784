//! Interval-timer facilities
//!
//! A facility tracks elapsed time for a set of timer resources and notifies
//! each one's target whenever its schedule expires. It is the only place
//! that knows about clocks; `Timer` layers repeat counting and callbacks on
//! top of it.

mod schedule;
mod thread;

use crate::cfg::{Config, TimerConfig};
use parking_lot::Mutex;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

pub use self::thread::ThreadFacility;

/// The notification target of a timer resource, invoked once per expiry.
pub type Notify = Arc<dyn Fn() + Send + Sync + 'static>;

/// Identifies a timer resource within the facility that created it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub(crate) u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// An `(interval, value)` pair, as accepted by `timer_settime`.
///
/// `value` is the delay until the next expiry; zero disarms the timer
/// regardless of `interval`. `interval` is the period of subsequent
/// expiries; zero makes the timer one-shot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimerSpec {
    pub interval: Duration,
    pub value: Duration,
}

impl TimerSpec {
    /// Smallest positive delay a spec can express. Used to fire "now"
    /// without disarming.
    pub const EARLIEST: Duration = Duration::from_nanos(1);

    /// First expiry after `timeout_ms`, then every `timeout_ms`.
    pub fn periodic(timeout_ms: u32) -> Self {
        let timeout = millis(timeout_ms);

        Self {
            interval: timeout,
            value: timeout,
        }
    }

    /// First expiry as soon as possible, then every `timeout_ms`.
    pub fn immediate(timeout_ms: u32) -> Self {
        Self {
            interval: millis(timeout_ms),
            value: Self::EARLIEST,
        }
    }

    pub fn disarmed() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.value > Duration::from_secs(0)
    }
}

/// Split milliseconds into whole seconds plus nanoseconds.
pub fn millis(ms: u32) -> Duration {
    Duration::new(u64::from(ms / 1000), (ms % 1000) * 1_000_000)
}

/// The contract a `Timer` needs from its clock source.
///
/// Implementations must measure time on a monotonic clock, notify from a
/// context other than the caller's, and keep every call bounded and
/// non-blocking.
pub trait Facility: Send + Sync {
    /// Allocate a disarmed timer resource bound to `notify`.
    fn create(&self, notify: Notify) -> io::Result<TimerId>;

    /// Arm or disarm `id`, replacing any pending expiry.
    fn set_time(&self, id: TimerId, spec: TimerSpec) -> io::Result<()>;

    /// Release `id`. No new notification is issued for it afterwards,
    /// though one already handed to a dispatcher may still run.
    fn release(&self, id: TimerId) -> io::Result<()>;
}

lazy_static! {
    static ref DEFAULT_FACILITY: Mutex<Option<Arc<ThreadFacility>>> = Mutex::new(None);
}

/// The process-wide facility used by `Timer::create`.
///
/// It is started on first use from the environment configuration (see
/// `TimerConfig`) and lives for the rest of the process.
pub fn default_facility() -> io::Result<Arc<dyn Facility>> {
    let mut slot = DEFAULT_FACILITY.lock();

    if let Some(ref facility) = *slot {
        return Ok(facility.clone());
    }

    let config = TimerConfig::new(&Config::default())?;

    if config.init_logger {
        if let Err(e) = crate::logging::init_logger(config.log_level) {
            // another logger being installed already is fine
            debug!("not installing logger: {}", e);
        }
    }

    if config.log_config_on_start {
        info!("configuration: {:?}", config);
    }

    let facility = Arc::new(ThreadFacility::new(&config)?);

    *slot = Some(facility.clone());

    Ok(facility)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_split() {
        assert_eq!(millis(0), Duration::from_secs(0));
        assert_eq!(millis(999), Duration::new(0, 999_000_000));
        assert_eq!(millis(1500), Duration::new(1, 500_000_000));
        assert_eq!(millis(u32::max_value()), Duration::from_millis(4_294_967_295));
    }

    #[test]
    fn test_specs() {
        let periodic = TimerSpec::periodic(250);
        assert_eq!(periodic.interval, Duration::from_millis(250));
        assert_eq!(periodic.value, Duration::from_millis(250));
        assert!(periodic.is_armed());

        let immediate = TimerSpec::immediate(250);
        assert_eq!(immediate.interval, Duration::from_millis(250));
        assert_eq!(immediate.value, TimerSpec::EARLIEST);
        assert!(immediate.is_armed());

        assert!(!TimerSpec::disarmed().is_armed());
        assert!(!TimerSpec::periodic(0).is_armed());
        assert!(TimerSpec::immediate(0).is_armed());
    }

    #[test]
    fn test_default_facility_is_shared() {
        let first = default_facility().unwrap();
        let second = default_facility().unwrap();

        assert_eq!(
            Arc::as_ptr(&first) as *const (),
            Arc::as_ptr(&second) as *const ()
        );
    }
}
