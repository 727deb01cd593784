//! Dispatchers deliver timer firings

mod single_threaded;
mod thread_per_firing;

use crate::cfg::{TimerConfig, DISPATCHER_LOGIC_THREAD_PER_FIRING};
use crossbeam::channel::{unbounded, Receiver, RecvError, Sender};
use std::{io, thread};

pub use self::single_threaded::SingleThreadedDispatcher;
pub use self::thread_per_firing::ThreadPerFiringDispatcher;

/// A `Dispatcher` is a service that can execute `Thunk`s, which
/// are boxed functions.
///
/// The scheduler of a facility hands every expiry to its dispatcher, so
/// `execute` must not block: it is called while the scheduler holds its
/// state lock.
pub trait Dispatcher {
    /// Execute the thunk on this dispatcher
    fn execute(&self, thunk: Thunk);

    /// Stop accepting work. Thunks already queued still run.
    fn shutdown(self: Box<Self>);
}

pub trait BoxedFn {
    fn apply(self: Box<Self>);
}

impl<F: FnOnce()> BoxedFn for F {
    #[inline(always)]
    fn apply(self: Box<F>) {
        (*self)()
    }
}

pub type Thunk = Box<dyn BoxedFn + Send + 'static>;

/// Build the dispatcher named by `config.dispatcher_logic`.
pub fn from_config(config: &TimerConfig) -> io::Result<Box<dyn Dispatcher + Send + Sync>> {
    if config.dispatcher_logic == DISPATCHER_LOGIC_THREAD_PER_FIRING {
        Ok(Box::new(ThreadPerFiringDispatcher::new()))
    } else {
        Ok(Box::new(SingleThreadedDispatcher::new()?))
    }
}
