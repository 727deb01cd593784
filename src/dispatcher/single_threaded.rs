use super::*;

enum SingleThreadedDispatcherMessage {
    Execute(Thunk),
    Shutdown,
}

/// A single threaded dispatcher that is backed by crossbeam_channel.
///
/// This is an MPSC queue that allows producer handlers (senders) to
/// be cloned. The worker thread owns the consumer handler (receiver)
/// and executes firings in the order they were submitted.
///
/// If a thunk panics, the worker is replaced and the remaining queue
/// continues on the new thread.
pub struct SingleThreadedDispatcher {
    sender: Sender<SingleThreadedDispatcherMessage>,
}

impl SingleThreadedDispatcher {
    pub fn new() -> io::Result<Self> {
        let (sender, receiver) = unbounded::<SingleThreadedDispatcherMessage>();

        Self::spawn(receiver)?;

        Ok(Self { sender })
    }

    fn spawn(receiver: Receiver<SingleThreadedDispatcherMessage>) -> io::Result<()> {
        struct Panicking {
            receiver: Receiver<SingleThreadedDispatcherMessage>,
        }

        impl Drop for Panicking {
            fn drop(&mut self) {
                if thread::panicking() {
                    warn!("timer callback panicked, respawning dispatcher thread");

                    if let Err(e) = SingleThreadedDispatcher::spawn(self.receiver.clone()) {
                        error!("failed to respawn dispatcher thread: {}", e);
                    }
                }
            }
        }

        thread::Builder::new()
            .name("itimer-dispatcher".to_string())
            .spawn(move || {
                let p = Panicking {
                    receiver: receiver.clone(),
                };

                loop {
                    match receiver.recv() {
                        Ok(SingleThreadedDispatcherMessage::Execute(work)) => {
                            work.apply();
                        }

                        Ok(SingleThreadedDispatcherMessage::Shutdown) => {
                            break;
                        }

                        Err(RecvError) => {
                            break;
                        }
                    }
                }

                drop(receiver);
                drop(p);
            })
            .map(|_| ())
    }
}

impl Dispatcher for SingleThreadedDispatcher {
    fn execute(&self, thunk: Thunk) {
        if let Err(e) = self
            .sender
            .send(SingleThreadedDispatcherMessage::Execute(thunk))
        {
            error!("failed to dispatch firing: {}", e);
        }
    }

    fn shutdown(self: Box<Self>) {
        let _ = self.sender.send(SingleThreadedDispatcherMessage::Shutdown);
    }
}

impl Clone for SingleThreadedDispatcher {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}
