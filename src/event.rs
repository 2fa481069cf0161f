//! Subscriber bookkeeping for notifying components
//!
//! Components that broadcast (the spatial graph, state machines, the tick
//! clock) own an explicit list of callbacks rather than a hidden event
//! field. Subscribers are addressed by an opaque [`Subscription`] id so an
//! owner can detach at teardown.

/// Identifies one registered subscriber.
///
/// Returned by a component's subscribe method and accepted by the matching
/// unsubscribe method. Ids are unique per issuing component, not globally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(pub(crate) u64);

/// Ordered list of boxed callbacks with id-based removal.
///
/// Emission order is subscription order. `F` is the unsized callback type,
/// e.g. `dyn FnMut(K)`.
pub(crate) struct Subscribers<F: ?Sized> {
    entries: Vec<(Subscription, Box<F>)>,
    next_id: u64,
}

impl<F: ?Sized> Subscribers<F> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a callback and return its id.
    pub fn subscribe(&mut self, callback: Box<F>) -> Subscription {
        let id = Subscription(self.next_id);
        self.next_id += 1;
        self.entries.push((id, callback));
        id
    }

    /// Remove a callback. Returns false if the id was never registered
    /// or was already removed.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(id, _)| *id != subscription);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate the callbacks in subscription order.
    pub fn callbacks_mut(&mut self) -> impl Iterator<Item = &mut F> {
        self.entries.iter_mut().map(|(_, f)| f.as_mut())
    }
}

impl<F: ?Sized> Default for Subscribers<F> {
    fn default() -> Self {
        Self::new()
    }
}
