use super::*;

/// Runs every thunk on a freshly spawned thread, the way a POSIX timer
/// created with `SIGEV_THREAD` notifies.
///
/// Firings of the same timer may overlap if a callback outlives the
/// timer's interval, and no ordering is guaranteed between them.
#[derive(Clone, Default)]
pub struct ThreadPerFiringDispatcher;

impl ThreadPerFiringDispatcher {
    pub fn new() -> Self {
        ThreadPerFiringDispatcher
    }
}

impl Dispatcher for ThreadPerFiringDispatcher {
    fn execute(&self, thunk: Thunk) {
        let spawned = thread::Builder::new()
            .name("itimer-firing".to_string())
            .spawn(move || thunk.apply());

        if let Err(e) = spawned {
            error!("failed to spawn firing thread: {}", e);
        }
    }

    fn shutdown(self: Box<Self>) {}
}
