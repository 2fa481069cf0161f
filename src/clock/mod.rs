//! Cooperative tick clock
//!
//! A single-threaded dispatcher with two cadences: a variable `draw` step
//! and a `fixed` step. Time-bounded behaviors (a travel countdown, an
//! arrival watcher) register a callback on one cadence and drop themselves
//! by returning [`TickFlow::Stop`] when their work is done. Nothing here
//! blocks; the composition root pumps both cadences.
//!
//! The clock is a clonable handle, so a callback can hold its own clone
//! and register follow-up work mid-round. Subscriptions and removals made
//! while a round is running take effect when the round ends; a callback
//! already picked up for the round still runs.

use std::cell::RefCell;
use std::rc::Rc;

use crate::event::Subscription;

/// Whether a callback stays registered after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFlow {
    /// Keep receiving ticks.
    Continue,
    /// Drop this callback after the current call.
    Stop,
}

type TickCallback = Box<dyn FnMut(f32) -> TickFlow>;

#[derive(Default)]
struct Cadence {
    callbacks: Vec<(Subscription, TickCallback)>,
    /// Registered while this cadence was mid-round; joins at round end.
    added: Vec<(Subscription, TickCallback)>,
    /// Removal requests deferred to round end.
    removed: Vec<Subscription>,
    dispatching: bool,
}

impl Cadence {
    fn subscribe(&mut self, id: Subscription, callback: TickCallback) {
        if self.dispatching {
            self.added.push((id, callback));
        } else {
            self.callbacks.push((id, callback));
        }
    }

    fn unsubscribe(&mut self, subscription: Subscription) {
        if self.dispatching {
            self.removed.push(subscription);
        } else {
            self.callbacks.retain(|(id, _)| *id != subscription);
            self.added.retain(|(id, _)| *id != subscription);
        }
    }

    fn len(&self) -> usize {
        self.callbacks.len() + self.added.len()
    }
}

#[derive(Default)]
struct ClockInner {
    draw: Cadence,
    fixed: Cadence,
    next_id: u64,
}

/// Which of the clock's two cadences an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CadenceKind {
    Draw,
    Fixed,
}

/// Clonable handle to a two-cadence tick dispatcher.
///
/// Clones share one dispatcher. Callbacks run in subscription order and
/// receive the elapsed seconds passed to the tick call.
#[derive(Clone, Default)]
pub struct TickClock {
    inner: Rc<RefCell<ClockInner>>,
}

impl TickClock {
    /// Create a clock with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback on the draw cadence.
    pub fn subscribe_draw(
        &self,
        callback: impl FnMut(f32) -> TickFlow + 'static,
    ) -> Subscription {
        self.subscribe(CadenceKind::Draw, Box::new(callback))
    }

    /// Register a callback on the fixed-step cadence.
    pub fn subscribe_fixed(
        &self,
        callback: impl FnMut(f32) -> TickFlow + 'static,
    ) -> Subscription {
        self.subscribe(CadenceKind::Fixed, Box::new(callback))
    }

    /// Remove a callback from whichever cadence holds it. Mid-round the
    /// removal lands at the round's end.
    pub fn unsubscribe(&self, subscription: Subscription) {
        let mut inner = self.inner.borrow_mut();
        inner.draw.unsubscribe(subscription);
        inner.fixed.unsubscribe(subscription);
    }

    /// Run one draw round, passing `delta_time` seconds to every draw
    /// callback.
    pub fn tick_draw(&self, delta_time: f32) {
        self.dispatch(CadenceKind::Draw, delta_time);
    }

    /// Run one fixed-step round, passing `delta_time` seconds to every
    /// fixed callback.
    pub fn tick_fixed(&self, delta_time: f32) {
        self.dispatch(CadenceKind::Fixed, delta_time);
    }

    /// Subscriber count on the draw cadence.
    #[must_use]
    pub fn draw_subscribers(&self) -> usize {
        self.inner.borrow().draw.len()
    }

    /// Subscriber count on the fixed cadence.
    #[must_use]
    pub fn fixed_subscribers(&self) -> usize {
        self.inner.borrow().fixed.len()
    }

    fn subscribe(&self, kind: CadenceKind, callback: TickCallback) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let id = Subscription(inner.next_id);
        inner.next_id += 1;
        Self::cadence_mut(&mut inner, kind).subscribe(id, callback);
        id
    }

    fn dispatch(&self, kind: CadenceKind, delta_time: f32) {
        // Pull the round's callbacks out so the inner cell is free while
        // they run; callbacks reach the clock through handle clones.
        let mut running = {
            let mut inner = self.inner.borrow_mut();
            let cadence = Self::cadence_mut(&mut inner, kind);
            if cadence.dispatching {
                log::warn!("tick round re-entered; ignoring the nested call");
                return;
            }
            cadence.dispatching = true;
            std::mem::take(&mut cadence.callbacks)
        };

        running.retain_mut(|(_, callback)| matches!(callback(delta_time), TickFlow::Continue));

        let mut inner = self.inner.borrow_mut();
        let cadence = Self::cadence_mut(&mut inner, kind);
        cadence.dispatching = false;
        running.append(&mut cadence.added);
        let removed = std::mem::take(&mut cadence.removed);
        running.retain(|(id, _)| !removed.contains(id));
        cadence.callbacks = running;
    }

    fn cadence_mut(inner: &mut ClockInner, kind: CadenceKind) -> &mut Cadence {
        match kind {
            CadenceKind::Draw => &mut inner.draw,
            CadenceKind::Fixed => &mut inner.fixed,
        }
    }
}
