//! Common types necessary for most applications

pub use log::{debug, error, info, trace, warn};

pub use crate::cfg::{Config, TimerConfig};
pub use crate::error::TimerError;
pub use crate::facility::{Facility, ThreadFacility, TimerSpec};
pub use crate::timer::{Callback, Timer, REPEAT_FOREVER};
