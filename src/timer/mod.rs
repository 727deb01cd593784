//! Timers fire a callback once or repeatedly after a delay


use crate::error::TimerError;
use crate::facility::{self, Facility, Notify, TimerId, TimerSpec};
use crate::util::Deferred;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use std::sync::Arc;

/// Repeat count of a timer that never deletes itself.
pub const REPEAT_FOREVER: i32 = -1;

/// The function a timer invokes on every firing, or none at all.
///
/// Any `Fn(&Timer<T>)` closure converts into a `Callback`.
pub struct Callback<T>(Option<Arc<dyn Fn(&Timer<T>) + Send + Sync + 'static>>);

impl<T> Callback<T> {
    pub fn none() -> Self {
        Callback(None)
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }
}

impl<T> Clone for Callback<T> {
    fn clone(&self) -> Self {
        Callback(self.0.clone())
    }
}

impl<T> Default for Callback<T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T, F> From<F> for Callback<T>
where
    F: Fn(&Timer<T>) + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Callback(Some(Arc::new(f)))
    }
}

struct Inner<T> {
    facility: Arc<dyn Facility>,
    handle: Mutex<Option<TimerId>>,
    callback: Mutex<Callback<T>>,
    repeat_count: AtomicI32,
    timeout: AtomicU32,
    user_data: T,
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        if let Some(id) = self.handle.get_mut().take() {
            if let Err(e) = self.facility.release(id) {
                error!("failed to release dropped {}: {}", id, e);
            }
        }
    }
}

/// A software timer owning one schedule in a `Facility`.
///
/// A `Timer` is a shared handle: clones refer to the same schedule, and the
/// callback receives one as its argument. Dropping the last clone releases
/// the facility resource as `delete` would.
///
/// # Lifecycle
///
/// `create` arms the timer to fire every `timeout` milliseconds, starting one
/// full `timeout` from now, forever. `set_repeat_count(n)` bounds the
/// remaining firings: each firing decrements a positive count, and the one
/// that brings it to zero deletes the timer *before* invoking the callback,
/// so the final callback observes `is_active() == false`. A deleted timer
/// cannot be re-armed; create a new one instead.
///
/// A timeout of zero leaves the timer disarmed (zero delay disarms the
/// facility), except through `ready`, which then fires exactly once.
///
/// # Concurrency
///
/// Callbacks run on a dispatcher thread concurrently with the owner. Each
/// field is individually synchronized, but operations are **not**
/// serialized against a firing in progress:
///
/// * a callback already dispatched may run during or after `delete` or
///   `pause`, neither of which waits for it;
/// * reconfiguring a timer while it fires may apply before or after that
///   firing's repeat-count bookkeeping.
///
/// Callers that need a strict order between their own calls and firings
/// must serialize access to the timer themselves, e.g. with a mutex held
/// both around their calls and inside the callback.
pub struct Timer<T = ()> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Timer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> Timer<T> {
    /// Create a timer on the process-wide default facility.
    pub fn create<C: Into<Callback<T>>>(
        callback: C,
        timeout_ms: u32,
        user_data: T,
    ) -> Result<Self, TimerError> {
        let facility = facility::default_facility()?;

        Self::create_with(facility, callback, timeout_ms, user_data)
    }

    /// Create a timer on `facility`, firing every `timeout_ms` milliseconds
    /// until deleted.
    ///
    /// If arming fails, the resource acquired from the facility is released
    /// before the error is returned.
    pub fn create_with<C: Into<Callback<T>>>(
        facility: Arc<dyn Facility>,
        callback: C,
        timeout_ms: u32,
        user_data: T,
    ) -> Result<Self, TimerError> {
        let inner = Arc::new(Inner {
            facility: facility.clone(),
            handle: Mutex::new(None),
            callback: Mutex::new(callback.into()),
            repeat_count: AtomicI32::new(REPEAT_FOREVER),
            timeout: AtomicU32::new(timeout_ms),
            user_data,
        });

        let notify: Notify = {
            let inner = Arc::downgrade(&inner);

            Arc::new(move || {
                if let Some(inner) = inner.upgrade() {
                    Timer { inner }.fire();
                }
            })
        };

        let id = facility.create(notify)?;

        let mut handle = inner.handle.lock();
        *handle = Some(id);

        let undo = {
            let facility = facility.clone();

            Deferred::new(move || {
                if let Err(e) = facility.release(id) {
                    error!("failed to release {} after failed create: {}", id, e);
                }
            })
        };

        if let Err(e) = facility.set_time(id, TimerSpec::periodic(timeout_ms)) {
            *handle = None;
            return Err(e.into());
        }

        undo.disarm();
        drop(handle);

        debug!("created {} firing every {}ms", id, timeout_ms);

        Ok(Self { inner })
    }

    /// Release the facility resource. Succeeds trivially if the timer has
    /// already been deleted; on failure the timer stays active and the call
    /// may be retried.
    pub fn delete(&self) -> Result<(), TimerError> {
        let mut handle = self.inner.handle.lock();

        release(&*self.inner.facility, &mut handle)
    }

    /// Replace the callback. A firing already in progress keeps the one it
    /// started with.
    pub fn set_callback<C: Into<Callback<T>>>(&self, callback: C) {
        *self.inner.callback.lock() = callback.into();
    }

    /// Re-arm with a new timeout: the next firing is `timeout_ms` from now,
    /// then every `timeout_ms`. The stored timeout only changes if re-arming
    /// succeeds.
    pub fn set_timeout(&self, timeout_ms: u32) -> Result<(), TimerError> {
        let handle = self.inner.handle.lock();
        let id = armable(*handle)?;

        self.inner
            .facility
            .set_time(id, TimerSpec::periodic(timeout_ms))?;
        self.inner.timeout.store(timeout_ms, Ordering::SeqCst);

        Ok(())
    }

    /// Set the number of remaining firings, `REPEAT_FOREVER` for unbounded.
    ///
    /// This doesn't touch the schedule; it only changes what future firings
    /// count down from.
    pub fn set_repeat_count(&self, count: i32) -> Result<(), TimerError> {
        if count == 0 || count < REPEAT_FOREVER {
            return Err(TimerError::InvalidArgument(
                "repeat count must be positive or REPEAT_FOREVER",
            ));
        }

        self.inner.repeat_count.store(count, Ordering::SeqCst);

        Ok(())
    }

    /// Fire as soon as possible, then every stored timeout as before.
    pub fn ready(&self) -> Result<(), TimerError> {
        self.rearm(TimerSpec::immediate)
    }

    /// Stop firing without losing the configuration.
    pub fn pause(&self) -> Result<(), TimerError> {
        self.rearm(|_| TimerSpec::disarmed())
    }

    /// Re-arm with the stored timeout, as if freshly created: the next
    /// firing is one full timeout from now.
    pub fn resume(&self) -> Result<(), TimerError> {
        self.rearm(TimerSpec::periodic)
    }

    fn rearm<F: FnOnce(u32) -> TimerSpec>(&self, spec: F) -> Result<(), TimerError> {
        let handle = self.inner.handle.lock();
        let id = armable(*handle)?;

        self.inner
            .facility
            .set_time(id, spec(self.inner.timeout.load(Ordering::SeqCst)))?;

        Ok(())
    }

    /// Handle one expiry delivered by the facility.
    fn fire(&self) {
        {
            let mut handle = self.inner.handle.lock();

            let id = match *handle {
                Some(id) => id,

                None => {
                    // queued on the dispatcher before the timer was deleted
                    trace!("dropping firing of deleted timer");
                    return;
                }
            };

            let remaining = self
                .inner
                .repeat_count
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                    if count > 0 {
                        Some(count - 1)
                    } else {
                        None
                    }
                })
                .map(|previous| previous - 1)
                .unwrap_or_else(|count| count);

            trace!("{} fired, repeat count now {}", id, remaining);

            if remaining == 0 {
                if let Err(e) = release(&*self.inner.facility, &mut handle) {
                    error!("failed to delete exhausted {}: {}", id, e);
                }
            }
        }

        let callback = self.inner.callback.lock().clone();

        if let Some(f) = callback.0 {
            f(self);
        }
    }
}

impl<T> Timer<T> {
    /// The timeout in milliseconds last applied successfully.
    pub fn timeout(&self) -> u32 {
        self.inner.timeout.load(Ordering::SeqCst)
    }

    pub fn repeat_count(&self) -> i32 {
        self.inner.repeat_count.load(Ordering::SeqCst)
    }

    /// Whether the timer still holds a facility resource, i.e. hasn't been
    /// deleted explicitly or by exhausting its repeat count.
    pub fn is_active(&self) -> bool {
        self.inner.handle.lock().is_some()
    }

    pub fn id(&self) -> Option<TimerId> {
        *self.inner.handle.lock()
    }

    pub fn user_data(&self) -> &T {
        &self.inner.user_data
    }
}

impl<T> fmt::Debug for Timer<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Timer")
            .field("id", &self.id())
            .field("timeout", &self.timeout())
            .field("repeat_count", &self.repeat_count())
            .finish()
    }
}

fn armable(handle: Option<TimerId>) -> Result<TimerId, TimerError> {
    handle.ok_or(TimerError::InvalidArgument("timer has been deleted"))
}

fn release(facility: &dyn Facility, handle: &mut Option<TimerId>) -> Result<(), TimerError> {
    if let Some(id) = *handle {
        facility.release(id)?;
        *handle = None;

        debug!("deleted {}", id);
    }

    Ok(())
}
