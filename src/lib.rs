//! # itimer
//!
//! Lightweight one-shot and periodic timers built on an interval-timer
//! facility. A [`Timer`](timer::Timer) fires a callback after a delay,
//! optionally repeating a bounded or unbounded number of times, and can be
//! paused, resumed, reconfigured or forced to fire immediately.
//!
//! This is not a task scheduler: there are no queues, priorities or
//! cross-timer ordering guarantees. Each timer owns exactly one schedule
//! within a [`Facility`](facility::Facility), and each expiry is handed to a
//! [`Dispatcher`](dispatcher::Dispatcher) which runs the callback on a thread
//! of its own.

extern crate atty;
extern crate chrono;
extern crate crossbeam;
extern crate fern;
extern crate parking_lot;

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate log;

pub mod cfg;
pub mod dispatcher;
pub mod error;
pub mod facility;
pub mod logging;
pub mod prelude;
pub mod timer;
pub mod util;

#[cfg(feature = "testkit")]
pub mod testkit;

#[cfg(all(test, not(feature = "testkit")))]
pub mod testkit;
