use crate::dispatcher::Thunk;

/// Runs a thunk when dropped, unless it is disarmed first.
///
/// Used to undo a partially completed operation on every early return.
pub struct Deferred {
    thunk: Option<Thunk>,
}

impl Deferred {
    pub fn new<F: FnOnce()>(f: F) -> Self
    where
        F: 'static + Send,
    {
        Self {
            thunk: Some(Box::new(f)),
        }
    }

    /// Consume this without running the thunk.
    pub fn disarm(mut self) {
        self.thunk.take();
    }
}

impl Drop for Deferred {
    fn drop(&mut self) {
        if let Some(thunk) = self.thunk.take() {
            thunk.apply();
        }
    }
}
