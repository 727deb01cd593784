use super::schedule::Schedule;
use super::{Facility, Notify, TimerId, TimerSpec};
use crate::cfg::TimerConfig;
use crate::dispatcher::{self, Dispatcher};
use parking_lot::{Condvar, Mutex};
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

struct State {
    schedule: Schedule,
    running: bool,
}

struct Shared {
    state: Mutex<State>,
    wakeup: Condvar,
}

/// A facility driven by one scheduler thread.
///
/// The scheduler sleeps on a condition variable until the earliest armed
/// deadline (measured with `Instant`, a monotonic clock) or until a caller
/// changes the schedule, then hands every due notification to the
/// configured dispatcher. Callers mutate the schedule under the same lock,
/// so once `set_time` or `release` returns the scheduler observes the
/// change before dispatching anything else for that timer.
///
/// Dropping the facility stops the scheduler thread.
pub struct ThreadFacility {
    shared: Arc<Shared>,
}

impl ThreadFacility {
    pub fn new(config: &TimerConfig) -> io::Result<Self> {
        let dispatcher = dispatcher::from_config(config)?;

        Self::with_dispatcher(config, dispatcher)
    }

    pub fn with_dispatcher(
        config: &TimerConfig,
        dispatcher: Box<dyn Dispatcher + Send + Sync>,
    ) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                schedule: Schedule::new(config.max_timers),
                running: true,
            }),
            wakeup: Condvar::new(),
        });

        {
            let shared = shared.clone();

            thread::Builder::new()
                .name(config.scheduler_thread_name.clone())
                .spawn(move || Self::run(&shared, dispatcher))?;
        }

        debug!(
            "started timer facility (dispatcher: {}, max timers: {})",
            config.dispatcher_logic, config.max_timers
        );

        Ok(Self { shared })
    }

    /// Number of live timer resources.
    pub fn len(&self) -> usize {
        self.shared.state.lock().schedule.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn run(shared: &Shared, dispatcher: Box<dyn Dispatcher + Send + Sync>) {
        let mut state = shared.state.lock();

        while state.running {
            for notify in state.schedule.expire(Instant::now()) {
                dispatcher.execute(Box::new(move || notify()));
            }

            match state.schedule.next_deadline() {
                Some(deadline) => {
                    shared.wakeup.wait_until(&mut state, deadline);
                }

                None => {
                    shared.wakeup.wait(&mut state);
                }
            }
        }

        drop(state);

        dispatcher.shutdown();

        debug!("timer facility stopped");
    }

    fn update<A, F: FnOnce(&mut Schedule) -> io::Result<A>>(&self, f: F) -> io::Result<A> {
        let mut state = self.shared.state.lock();

        if !state.running {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "timer facility has stopped",
            ));
        }

        let result = f(&mut state.schedule);

        self.shared.wakeup.notify_one();

        result
    }
}

impl Facility for ThreadFacility {
    fn create(&self, notify: Notify) -> io::Result<TimerId> {
        self.update(|schedule| schedule.create(notify))
    }

    fn set_time(&self, id: TimerId, spec: TimerSpec) -> io::Result<()> {
        self.update(|schedule| schedule.set_time(id, spec, Instant::now()))
    }

    fn release(&self, id: TimerId) -> io::Result<()> {
        self.update(|schedule| schedule.release(id))
    }
}

impl Drop for ThreadFacility {
    fn drop(&mut self) {
        self.shared.state.lock().running = false;
        self.shared.wakeup.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::DISPATCHER_LOGIC_THREAD_PER_FIRING;
    use crate::testkit::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting() -> (Notify, Arc<AtomicUsize>) {
        let counter = Arc::new(AtomicUsize::new(0));
        let notify: Notify = {
            let counter = counter.clone();
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        };

        (notify, counter)
    }

    #[test]
    fn test_periodic_notifications() {
        let facility = ThreadFacility::new(&TimerConfig::default()).unwrap();
        let (notify, counter) = counting();

        let id = facility.create(notify).unwrap();
        facility.set_time(id, TimerSpec::periodic(20)).unwrap();

        eventually(Duration::from_millis(3000), || {
            counter.load(Ordering::SeqCst) >= 3
        });

        facility.release(id).unwrap();

        let after_release = counter.load(Ordering::SeqCst);

        thread::sleep(Duration::from_millis(100));

        // a firing already queued on the dispatcher may still land
        assert!(counter.load(Ordering::SeqCst) <= after_release + 1);
        assert!(facility.is_empty());
    }

    #[test]
    fn test_disarm() {
        let facility = ThreadFacility::new(&TimerConfig::default()).unwrap();
        let (notify, counter) = counting();

        let id = facility.create(notify).unwrap();
        facility.set_time(id, TimerSpec::periodic(30)).unwrap();
        facility.set_time(id, TimerSpec::disarmed()).unwrap();

        thread::sleep(Duration::from_millis(150));

        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_immediate_one_shot() {
        let config = TimerConfig {
            dispatcher_logic: DISPATCHER_LOGIC_THREAD_PER_FIRING.to_string(),
            ..TimerConfig::default()
        };

        let facility = ThreadFacility::new(&config).unwrap();
        let (notify, counter) = counting();

        let id = facility.create(notify).unwrap();
        facility.set_time(id, TimerSpec::immediate(0)).unwrap();

        eventually(Duration::from_millis(1000), || {
            counter.load(Ordering::SeqCst) == 1
        });

        thread::sleep(Duration::from_millis(50));

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_limit_is_a_resource_error() {
        let config = TimerConfig {
            max_timers: 1,
            ..TimerConfig::default()
        };

        let facility = ThreadFacility::new(&config).unwrap();

        facility.create(counting().0).unwrap();

        assert!(facility.create(counting().0).is_err());
    }

    #[test]
    fn test_unknown_id() {
        let facility = ThreadFacility::new(&TimerConfig::default()).unwrap();

        assert_eq!(
            facility
                .set_time(TimerId(42), TimerSpec::periodic(10))
                .unwrap_err()
                .kind(),
            io::ErrorKind::InvalidInput
        );
        assert!(facility.release(TimerId(42)).is_err());
    }
}
