//! Keyed finite state machine
//!
//! A table of state handlers addressed by key, with a single current key, a
//! default key for at-rest behavior, and a state-changed broadcast. Coarse
//! actor modes (patrolling, chasing, blocking) live here; fine-grained
//! waypoint work belongs to the state queue instead.
//!
//! Handlers never reach back into the machine while it is mid-transition;
//! a per-tick handler requests a transition by returning the target key,
//! and the machine applies it after the handler returns.

use std::fmt;
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::event::{Subscribers, Subscription};

/// A handler occupying one key of a [`StateMachine`].
///
/// All hooks default to doing nothing, so a handler implements only the
/// lifecycle points it cares about.
pub trait MachineState<K> {
    /// Called when the machine transitions into this state.
    fn entered(&mut self) {}

    /// Called when the machine transitions out of this state.
    fn exited(&mut self) {}

    /// Per-tick work while this state is current. Returning a key requests
    /// a transition, applied by the machine once this call returns.
    fn tick(&mut self, _delta_time: f32) -> Option<K> {
        None
    }
}

impl<K, T: MachineState<K> + ?Sized> MachineState<K> for Box<T> {
    fn entered(&mut self) {
        (**self).entered();
    }

    fn exited(&mut self) {
        (**self).exited();
    }

    fn tick(&mut self, delta_time: f32) -> Option<K> {
        (**self).tick(delta_time)
    }
}

/// A finite state machine over a keyed handler table.
///
/// Exactly one key is current at any time. Construction performs no entry;
/// the first transition into the default key is the owner's explicit act.
///
/// Looking up a key with no table entry is a construction bug and panics.
///
/// # Type Parameters
///
/// - `K`: state key, typically a small enum
/// - `S`: handler type; defaults to boxed trait objects for heterogeneous
///   tables, but a machine may use any one concrete handler type and get
///   typed access back through [`StateMachine::handler_mut`]
pub struct StateMachine<K, S = Box<dyn MachineState<K>>>
where
    K: Copy + Eq + Hash + fmt::Debug + 'static,
{
    states: FxHashMap<K, S>,
    current: K,
    default: K,
    changed: Subscribers<dyn FnMut(K)>,
}

impl<K, S> StateMachine<K, S>
where
    K: Copy + Eq + Hash + fmt::Debug + 'static,
    S: MachineState<K>,
{
    /// Create a machine from `(key, handler)` pairs and a default key.
    ///
    /// No `entered()` fires here.
    ///
    /// # Panics
    ///
    /// Panics if `default_key` has no entry in the table.
    pub fn new(states: impl IntoIterator<Item = (K, S)>, default_key: K) -> Self {
        let states: FxHashMap<K, S> = states.into_iter().collect();
        assert!(
            states.contains_key(&default_key),
            "default key {default_key:?} has no entry in the state table"
        );
        Self {
            states,
            current: default_key,
            default: default_key,
            changed: Subscribers::new(),
        }
    }

    /// The key the machine is currently in.
    #[must_use]
    pub fn current(&self) -> K {
        self.current
    }

    /// The at-rest key.
    #[must_use]
    pub fn default_key(&self) -> K {
        self.default
    }

    /// Transition to `key`.
    ///
    /// Setting the key already current does nothing at all. Otherwise the
    /// old handler's `exited()` runs, the key updates, the new handler's
    /// `entered()` runs, and subscribers are notified with the new key, in
    /// that order.
    pub fn set_current(&mut self, key: K) {
        if key == self.current {
            return;
        }
        let previous = self.current;
        self.handler_entry(previous).exited();
        self.current = key;
        self.handler_entry(key).entered();
        log::trace!("state changed {previous:?} -> {key:?}");
        for callback in self.changed.callbacks_mut() {
            callback(key);
        }
    }

    /// Replace the at-rest key.
    ///
    /// When the machine is resting in the old default, the old default's
    /// handler exits and the new key's handler enters directly; the stored
    /// current key keeps its old value and subscribers hear nothing. A
    /// machine resting elsewhere just records the new default.
    pub fn set_default_key(&mut self, key: K) {
        if key == self.default {
            return;
        }
        if self.current == self.default {
            self.handler_entry(self.current).exited();
            self.handler_entry(key).entered();
        }
        self.default = key;
    }

    /// Shared access to the handler at `key`.
    ///
    /// # Panics
    ///
    /// Panics if `key` has no entry in the table.
    #[must_use]
    pub fn handler(&self, key: K) -> &S {
        self.states
            .get(&key)
            .unwrap_or_else(|| panic!("state key {key:?} has no entry in the state table"))
    }

    /// Exclusive access to the handler at `key`, for owners that configure
    /// their own states directly.
    ///
    /// # Panics
    ///
    /// Panics if `key` has no entry in the table.
    #[must_use]
    pub fn handler_mut(&mut self, key: K) -> &mut S {
        self.handler_entry(key)
    }

    /// Advance the current handler by `delta_time`, applying any
    /// transition it requests.
    pub fn tick(&mut self, delta_time: f32) {
        if let Some(key) = self.handler_entry(self.current).tick(delta_time) {
            self.set_current(key);
        }
    }

    /// Register a callback invoked with the new key after every
    /// transition.
    pub fn subscribe(&mut self, callback: impl FnMut(K) + 'static) -> Subscription {
        self.changed.subscribe(Box::new(callback))
    }

    /// Remove a state-changed callback.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.changed.unsubscribe(subscription)
    }

    fn handler_entry(&mut self, key: K) -> &mut S {
        self.states
            .get_mut(&key)
            .unwrap_or_else(|| panic!("state key {key:?} has no entry in the state table"))
    }
}

impl<K, S> fmt::Debug for StateMachine<K, S>
where
    K: Copy + Eq + Hash + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("current", &self.current)
            .field("default", &self.default)
            .field("states", &self.states.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Mode {
        Rest,
        Scan,
        Chase,
    }

    /// Handler that journals its lifecycle and can request a transition.
    struct Recorder {
        label: &'static str,
        journal: Rc<RefCell<Vec<String>>>,
        next: Option<Mode>,
    }

    impl Recorder {
        fn new(label: &'static str, journal: &Rc<RefCell<Vec<String>>>) -> Self {
            Self {
                label,
                journal: journal.clone(),
                next: None,
            }
        }
    }

    impl MachineState<Mode> for Recorder {
        fn entered(&mut self) {
            self.journal.borrow_mut().push(format!("enter {}", self.label));
        }

        fn exited(&mut self) {
            self.journal.borrow_mut().push(format!("exit {}", self.label));
        }

        fn tick(&mut self, _delta_time: f32) -> Option<Mode> {
            self.next.take()
        }
    }

    fn recorder_machine(
        journal: &Rc<RefCell<Vec<String>>>,
    ) -> StateMachine<Mode, Recorder> {
        StateMachine::new(
            [
                (Mode::Rest, Recorder::new("rest", journal)),
                (Mode::Scan, Recorder::new("scan", journal)),
                (Mode::Chase, Recorder::new("chase", journal)),
            ],
            Mode::Rest,
        )
    }

    #[test]
    fn test_construction_enters_nothing() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let machine = recorder_machine(&journal);
        assert_eq!(machine.current(), Mode::Rest);
        assert_eq!(machine.default_key(), Mode::Rest);
        assert!(journal.borrow().is_empty());
    }

    #[test]
    fn test_same_key_set_is_a_noop() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let mut machine = recorder_machine(&journal);
        let notified = journal.clone();
        machine.subscribe(move |key| notified.borrow_mut().push(format!("notify {key:?}")));

        machine.set_current(Mode::Rest);
        assert!(journal.borrow().is_empty());
    }

    #[test]
    fn test_transition_runs_exit_enter_notify_in_order() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let mut machine = recorder_machine(&journal);
        let notified = journal.clone();
        machine.subscribe(move |key| notified.borrow_mut().push(format!("notify {key:?}")));

        machine.set_current(Mode::Scan);
        assert_eq!(machine.current(), Mode::Scan);
        assert_eq!(
            *journal.borrow(),
            vec!["exit rest", "enter scan", "notify Scan"]
        );
    }

    #[test]
    fn test_default_swap_while_resting_skips_key_and_notification() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let mut machine = recorder_machine(&journal);
        let notified = journal.clone();
        machine.subscribe(move |key| notified.borrow_mut().push(format!("notify {key:?}")));

        machine.set_default_key(Mode::Scan);
        assert_eq!(*journal.borrow(), vec!["exit rest", "enter scan"]);
        assert_eq!(machine.current(), Mode::Rest, "current key keeps its old value");
        assert_eq!(machine.default_key(), Mode::Scan);
    }

    #[test]
    fn test_default_swap_away_from_rest_touches_no_handler() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let mut machine = recorder_machine(&journal);
        machine.set_current(Mode::Chase);
        journal.borrow_mut().clear();

        machine.set_default_key(Mode::Scan);
        assert!(journal.borrow().is_empty());
        assert_eq!(machine.default_key(), Mode::Scan);
    }

    #[test]
    fn test_tick_applies_requested_transition() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let mut machine = recorder_machine(&journal);
        machine.handler_mut(Mode::Rest).next = Some(Mode::Chase);

        machine.tick(0.1);
        assert_eq!(machine.current(), Mode::Chase);
        assert_eq!(*journal.borrow(), vec!["exit rest", "enter chase"]);

        // The request was consumed; further ticks stay put.
        machine.tick(0.1);
        assert_eq!(machine.current(), Mode::Chase);
    }

    #[test]
    #[should_panic(expected = "no entry in the state table")]
    fn test_missing_key_fails_fast() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let mut machine = StateMachine::new(
            [(Mode::Rest, Recorder::new("rest", &journal))],
            Mode::Rest,
        );
        machine.set_current(Mode::Chase);
    }

    #[test]
    fn test_boxed_handler_table() {
        struct Quiet;
        impl MachineState<Mode> for Quiet {}

        let mut machine: StateMachine<Mode> = StateMachine::new(
            [
                (Mode::Rest, Box::new(Quiet) as Box<dyn MachineState<Mode>>),
                (Mode::Scan, Box::new(Quiet)),
            ],
            Mode::Rest,
        );
        machine.set_current(Mode::Scan);
        assert_eq!(machine.current(), Mode::Scan);
    }

    #[test]
    fn test_cross_machine_reaction() {
        // A blocker machine mirrors a guard machine's transitions through
        // the state-changed broadcast.
        struct Quiet;
        impl MachineState<Mode> for Quiet {}

        let journal = Rc::new(RefCell::new(Vec::new()));
        let mut guard = recorder_machine(&journal);
        let blocker: Rc<RefCell<StateMachine<Mode>>> = Rc::new(RefCell::new(StateMachine::new(
            [
                (Mode::Rest, Box::new(Quiet) as Box<dyn MachineState<Mode>>),
                (Mode::Chase, Box::new(Quiet)),
            ],
            Mode::Rest,
        )));

        let reacting = blocker.clone();
        guard.subscribe(move |key| {
            if key == Mode::Chase {
                reacting.borrow_mut().set_current(Mode::Chase);
            }
        });

        guard.set_current(Mode::Chase);
        assert_eq!(blocker.borrow().current(), Mode::Chase);
    }
}
