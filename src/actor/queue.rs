//! Batch state queue
//!
//! Actors that work through ordered jobs (walk here, then here, then jump)
//! enqueue batches of opaque state values and execute them one at a time.
//! Batches run in strict FIFO order and elements in strict index order; an
//! interrupt replaces everything pending but always lets the in-flight
//! state finish first.
//!
//! The queue never runs on its own. The owner starts states when asked,
//! reports completion, and the queue advances; "waiting" is whatever the
//! owner does between the two (typically a tick-clock callback).

use std::collections::VecDeque;

/// Outcome of starting a state.
///
/// A state that does all its work inside `enter_state` returns `Completed`
/// and the queue moves straight on; one that takes time returns
/// `InProgress` and later reports through [`StateQueue::state_exited`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFlow {
    /// The state is running; completion will be signaled later.
    InProgress,
    /// The state finished within the `enter_state` call.
    Completed,
}

/// Behavior an owner plugs into a [`StateQueue`].
pub trait StateActor<S> {
    /// Begin acting on `state`.
    fn enter_state(&mut self, state: S) -> StateFlow;

    /// Called when the active batch and the pending queue are both empty.
    ///
    /// Returning a non-empty batch enqueues it and keeps executing, which
    /// is how idle behaviors (wandering, returning to a post) feed
    /// themselves. The refill runs immediately, so an owner that always
    /// refills with synchronously completing states never yields control.
    fn on_states_exhausted(&mut self) -> Option<Vec<S>> {
        None
    }
}

/// FIFO of state batches with one-at-a-time execution and interrupt
/// override.
///
/// The queue holds no owner reference; every operation that may start a
/// state takes the owner explicitly, which keeps owner and queue in one
/// struct without aliasing trouble.
#[derive(Debug, Clone)]
pub struct StateQueue<S> {
    pending: VecDeque<Vec<S>>,
    /// Batch currently being worked through; empty when idle.
    current: Vec<S>,
    cursor: usize,
    executing: bool,
    /// Discard the rest of `current` at the next completion boundary.
    interrupt: bool,
}

impl<S: Clone> StateQueue<S> {
    /// Create an idle queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            current: Vec::new(),
            cursor: 0,
            executing: false,
            interrupt: false,
        }
    }

    /// Push a batch to the back of the queue. If the owner is idle the
    /// batch starts immediately. Empty batches are ignored.
    pub fn enqueue(&mut self, owner: &mut impl StateActor<S>, batch: Vec<S>) {
        if batch.is_empty() {
            return;
        }
        self.pending.push_back(batch);
        self.advance(owner);
    }

    /// Replace all pending work with `batch`, to run as soon as the active
    /// state (if any) finishes; the remainder of the active batch is
    /// skipped. An empty batch cancels pending work without adding any.
    pub fn enqueue_interrupt(&mut self, owner: &mut impl StateActor<S>, batch: Vec<S>) {
        log::trace!(
            "interrupt: dropping {} pending batches",
            self.pending.len()
        );
        self.pending.clear();
        if !batch.is_empty() {
            self.pending.push_back(batch);
        }
        self.interrupt = true;
        self.advance(owner);
    }

    /// Drop every pending batch. The active state is untouched and still
    /// completes normally.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Report that the active state finished its work, advancing to the
    /// next element, batch, or idle.
    pub fn state_exited(&mut self, owner: &mut impl StateActor<S>) {
        self.executing = false;
        self.advance(owner);
    }

    /// Whether a state is currently between enter and completion.
    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.executing
    }

    /// The state value currently being acted on, if any.
    #[must_use]
    pub fn active(&self) -> Option<&S> {
        if self.executing {
            self.current.get(self.cursor)
        } else {
            None
        }
    }

    /// Number of batches waiting behind the active one.
    #[must_use]
    pub fn pending_batches(&self) -> usize {
        self.pending.len()
    }

    /// Feed the owner the next state, looping over synchronously completed
    /// ones. Runs only when nothing is executing; the flag goes up before
    /// `enter_state` so the bookkeeping is settled while the owner runs.
    fn advance(&mut self, owner: &mut impl StateActor<S>) {
        if self.executing {
            return;
        }
        loop {
            self.cursor += 1;
            let next = if self.cursor < self.current.len() && !self.interrupt {
                Some(self.current[self.cursor].clone())
            } else {
                self.interrupt = false;
                self.cursor = 0;
                match self.pending.pop_front() {
                    Some(batch) => {
                        self.current = batch;
                        Some(self.current[0].clone())
                    }
                    None => {
                        self.current = Vec::new();
                        None
                    }
                }
            };
            match next {
                Some(state) => {
                    self.executing = true;
                    match owner.enter_state(state) {
                        StateFlow::InProgress => break,
                        StateFlow::Completed => self.executing = false,
                    }
                }
                None => match owner.on_states_exhausted() {
                    Some(batch) if !batch.is_empty() => self.pending.push_back(batch),
                    _ => break,
                },
            }
        }
    }
}

impl<S: Clone> Default for StateQueue<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A state is a label plus whether it completes inside `enter_state`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Step {
        label: char,
        instant: bool,
    }

    fn wait(label: char) -> Step {
        Step {
            label,
            instant: false,
        }
    }

    fn instant(label: char) -> Step {
        Step {
            label,
            instant: true,
        }
    }

    /// Journals every state entry and idle callback.
    #[derive(Default)]
    struct ScriptActor {
        journal: Vec<String>,
        refill: Option<Vec<Step>>,
    }

    impl StateActor<Step> for ScriptActor {
        fn enter_state(&mut self, state: Step) -> StateFlow {
            self.journal.push(state.label.to_string());
            if state.instant {
                StateFlow::Completed
            } else {
                StateFlow::InProgress
            }
        }

        fn on_states_exhausted(&mut self) -> Option<Vec<Step>> {
            self.journal.push("idle".into());
            self.refill.take()
        }
    }

    #[test]
    fn test_batches_run_fifo_elements_in_index_order() {
        let mut actor = ScriptActor::default();
        let mut queue = StateQueue::new();

        queue.enqueue(&mut actor, vec![wait('a'), wait('b')]);
        queue.enqueue(&mut actor, vec![wait('c')]);
        assert_eq!(actor.journal, vec!["a"]);
        assert!(queue.is_executing());

        queue.state_exited(&mut actor);
        assert_eq!(actor.journal, vec!["a", "b"]);

        queue.state_exited(&mut actor);
        assert_eq!(actor.journal, vec!["a", "b", "c"]);

        queue.state_exited(&mut actor);
        assert_eq!(actor.journal, vec!["a", "b", "c", "idle"]);
        assert!(!queue.is_executing());
    }

    #[test]
    fn test_enqueue_on_idle_starts_immediately() {
        let mut actor = ScriptActor::default();
        let mut queue = StateQueue::new();

        queue.enqueue(&mut actor, vec![wait('a')]);
        assert_eq!(queue.active(), Some(&wait('a')));
        assert_eq!(actor.journal, vec!["a"]);
    }

    #[test]
    fn test_synchronous_states_chain_without_signals() {
        let mut actor = ScriptActor::default();
        let mut queue = StateQueue::new();

        queue.enqueue(&mut actor, vec![instant('a'), instant('b'), instant('c')]);
        assert_eq!(actor.journal, vec!["a", "b", "c", "idle"]);
        assert!(!queue.is_executing());

        queue.enqueue(&mut actor, vec![instant('d')]);
        assert_eq!(actor.journal, vec!["a", "b", "c", "idle", "d", "idle"]);
    }

    #[test]
    fn test_interrupt_skips_rest_of_batch_and_pending() {
        let mut actor = ScriptActor::default();
        let mut queue = StateQueue::new();

        queue.enqueue(&mut actor, vec![wait('a'), wait('b')]);
        queue.enqueue(&mut actor, vec![wait('x')]);

        queue.enqueue_interrupt(&mut actor, vec![wait('c')]);
        // The in-flight state is never aborted.
        assert_eq!(actor.journal, vec!["a"]);
        assert_eq!(queue.active(), Some(&wait('a')));

        queue.state_exited(&mut actor);
        assert_eq!(actor.journal, vec!["a", "c"], "b and x are discarded");
    }

    #[test]
    fn test_interrupt_on_idle_runs_at_once() {
        let mut actor = ScriptActor::default();
        let mut queue = StateQueue::new();

        queue.enqueue_interrupt(&mut actor, vec![wait('a')]);
        assert_eq!(actor.journal, vec!["a"]);
    }

    #[test]
    fn test_interrupt_with_empty_batch_cancels_everything() {
        let mut actor = ScriptActor::default();
        let mut queue = StateQueue::new();

        queue.enqueue(&mut actor, vec![wait('a'), wait('b')]);
        queue.enqueue(&mut actor, vec![wait('x')]);
        queue.enqueue_interrupt(&mut actor, Vec::new());

        queue.state_exited(&mut actor);
        assert_eq!(actor.journal, vec!["a", "idle"]);
        assert!(!queue.is_executing());
    }

    #[test]
    fn test_clear_spares_the_active_batch() {
        let mut actor = ScriptActor::default();
        let mut queue = StateQueue::new();

        queue.enqueue(&mut actor, vec![wait('a'), wait('b')]);
        queue.enqueue(&mut actor, vec![wait('x')]);
        queue.clear();

        queue.state_exited(&mut actor);
        assert_eq!(actor.journal, vec!["a", "b"], "active batch still runs out");

        queue.state_exited(&mut actor);
        assert_eq!(actor.journal, vec!["a", "b", "idle"], "x was cleared");
    }

    #[test]
    fn test_exhausted_refill_keeps_executing() {
        let mut actor = ScriptActor {
            refill: Some(vec![instant('r')]),
            ..Default::default()
        };
        let mut queue = StateQueue::new();

        queue.enqueue(&mut actor, vec![instant('a')]);
        assert_eq!(actor.journal, vec!["a", "idle", "r", "idle"]);
    }

    #[test]
    fn test_empty_batch_is_ignored() {
        let mut actor = ScriptActor::default();
        let mut queue = StateQueue::new();

        queue.enqueue(&mut actor, Vec::new());
        assert!(actor.journal.is_empty());
        assert!(!queue.is_executing());
    }

    #[test]
    fn test_active_is_none_between_states() {
        let mut actor = ScriptActor::default();
        let mut queue = StateQueue::new();
        assert_eq!(queue.active(), None);

        queue.enqueue(&mut actor, vec![wait('a')]);
        queue.state_exited(&mut actor);
        assert_eq!(queue.active(), None);
    }
}
