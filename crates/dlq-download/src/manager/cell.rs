//! A queue together with the work its commands left to do outside the lock.
//!
//! Every command appends its events and effects to the cell's backlog while
//! still holding the lock, so the backlog is in mutation order. Exactly one
//! caller at a time drains it. A command issued while someone else (or the
//! same thread, from inside an observer or transport callback) is draining
//! only appends; the active drainer picks the new steps up. Transports and
//! observers therefore see each queue's work in the order it happened.

use std::collections::VecDeque;

use dlq_core::QueueEvent;

use crate::queue::{DownloadQueue, Effect, Outcome};

/// One unit of post-command work.
pub(super) enum Step {
    Notify(QueueEvent),
    Apply(Effect),
}

pub(super) struct QueueCell<M> {
    pub(super) queue: DownloadQueue<M>,
    backlog: VecDeque<Step>,
    draining: bool,
}

impl<M> QueueCell<M> {
    pub(super) const fn new(queue: DownloadQueue<M>) -> Self {
        Self {
            queue,
            backlog: VecDeque::new(),
            draining: false,
        }
    }

    /// Append an outcome. Returns `true` if the caller became the drainer.
    pub(super) fn push(&mut self, outcome: Outcome) -> bool {
        if outcome.is_empty() {
            return false;
        }
        let Outcome { events, effects } = outcome;
        self.backlog.extend(events.into_iter().map(Step::Notify));
        self.backlog.extend(effects.into_iter().map(Step::Apply));

        if self.draining {
            return false;
        }
        self.draining = true;
        true
    }

    /// Take the next step. Returning `None` also gives up the drainer role.
    pub(super) fn next_step(&mut self) -> Option<Step> {
        let step = self.backlog.pop_front();
        if step.is_none() {
            self.draining = false;
        }
        step
    }

    /// Give up the drainer role without finishing, e.g. when unwinding.
    pub(super) const fn release(&mut self) {
        self.draining = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlq_core::ItemId;

    fn outcome(events: usize) -> Outcome {
        Outcome {
            events: (0..events)
                .map(|i| QueueEvent::started("q", ItemId::generate(), i))
                .collect(),
            effects: Vec::new(),
        }
    }

    #[test]
    fn test_first_push_becomes_drainer() {
        let mut cell = QueueCell::new(DownloadQueue::<()>::new("q", 1).unwrap());
        assert!(cell.push(outcome(1)));
        // Pushing while draining only appends.
        assert!(!cell.push(outcome(2)));

        let mut drained = 0;
        while cell.next_step().is_some() {
            drained += 1;
        }
        assert_eq!(drained, 3);
        // The role was released, so the next push drains again.
        assert!(cell.push(outcome(1)));
    }

    #[test]
    fn test_empty_outcome_never_drains() {
        let mut cell = QueueCell::new(DownloadQueue::<()>::new("q", 1).unwrap());
        assert!(!cell.push(Outcome::default()));
    }

    #[test]
    fn test_steps_keep_push_order() {
        let mut cell = QueueCell::new(DownloadQueue::<()>::new("q", 1).unwrap());
        let first = outcome(1);
        let first_item = first.events[0].item();
        cell.push(first);
        cell.push(outcome(1));

        match cell.next_step() {
            Some(Step::Notify(event)) => assert_eq!(event.item(), first_item),
            _ => panic!("expected the first event"),
        }
    }

    #[test]
    fn test_release_allows_new_drainer() {
        let mut cell = QueueCell::new(DownloadQueue::<()>::new("q", 1).unwrap());
        assert!(cell.push(outcome(1)));
        cell.release();
        assert!(cell.push(outcome(1)));
    }
}
