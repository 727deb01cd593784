use super::{Notify, TimerId, TimerSpec};
use std::collections::{BTreeSet, HashMap};
use std::io;
use std::time::{Duration, Instant};

struct Entry {
    notify: Notify,
    interval: Duration,
    deadline: Option<Instant>,
}

/// The bookkeeping behind a facility: every live timer resource and the
/// pending deadlines in firing order.
///
/// Each armed timer has exactly one `(deadline, id)` pair in `deadlines`;
/// re-arming, disarming, releasing and expiring all remove the previous
/// pair.
pub(crate) struct Schedule {
    entries: HashMap<TimerId, Entry>,
    deadlines: BTreeSet<(Instant, TimerId)>,
    next_id: u64,
    max_timers: usize,
}

impl Schedule {
    pub(crate) fn new(max_timers: usize) -> Self {
        Self {
            entries: HashMap::new(),
            deadlines: BTreeSet::new(),
            next_id: 0,
            max_timers,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of armed timers.
    pub(crate) fn armed(&self) -> usize {
        self.deadlines.len()
    }

    pub(crate) fn create(&mut self, notify: Notify) -> io::Result<TimerId> {
        if self.max_timers > 0 && self.entries.len() >= self.max_timers {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("timer limit reached: {}", self.max_timers),
            ));
        }

        self.next_id += 1;

        let id = TimerId(self.next_id);

        self.entries.insert(
            id,
            Entry {
                notify,
                interval: Duration::from_secs(0),
                deadline: None,
            },
        );

        Ok(id)
    }

    pub(crate) fn set_time(&mut self, id: TimerId, spec: TimerSpec, now: Instant) -> io::Result<()> {
        let entry = self.entries.get_mut(&id).ok_or_else(|| unknown(id))?;

        if let Some(previous) = entry.deadline.take() {
            self.deadlines.remove(&(previous, id));
        }

        entry.interval = spec.interval;

        if spec.is_armed() {
            let deadline = now + spec.value;

            entry.deadline = Some(deadline);

            self.deadlines.insert((deadline, id));
        }

        Ok(())
    }

    pub(crate) fn release(&mut self, id: TimerId) -> io::Result<()> {
        let entry = self.entries.remove(&id).ok_or_else(|| unknown(id))?;

        if let Some(deadline) = entry.deadline {
            self.deadlines.remove(&(deadline, id));
        }

        Ok(())
    }

    /// Collect the targets of every timer due at `now`, advancing periodic
    /// timers and disarming one-shot ones.
    ///
    /// Periodic deadlines advance from the previous deadline. If more than
    /// one interval has already passed, the missed expiries collapse into
    /// this one and the next deadline is measured from `now`.
    pub(crate) fn expire(&mut self, now: Instant) -> Vec<Notify> {
        let mut due = Vec::new();

        loop {
            let (deadline, id) = match self.next_due(now) {
                Some(pending) => pending,
                None => break,
            };

            self.deadlines.remove(&(deadline, id));

            let entry = match self.entries.get_mut(&id) {
                Some(entry) => entry,
                None => continue,
            };

            due.push(entry.notify.clone());

            if entry.interval > Duration::from_secs(0) {
                let mut next = deadline + entry.interval;

                if next <= now {
                    next = now + entry.interval;
                }

                entry.deadline = Some(next);

                self.deadlines.insert((next, id));
            } else {
                entry.deadline = None;
            }
        }

        due
    }

    fn next_due(&self, now: Instant) -> Option<(Instant, TimerId)> {
        self.deadlines
            .iter()
            .next()
            .cloned()
            .filter(|&(deadline, _)| deadline <= now)
    }

    /// The earliest pending deadline.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.iter().next().map(|&(deadline, _)| deadline)
    }
}

fn unknown(id: TimerId) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("unknown timer: {}", id),
    )
}
