//! Position-aware graph with lockable joints
//!
//! The concrete graph the demo scenes route over: node values expose a
//! world position, joints carry a shared lock plus their endpoint
//! positions, and the search policy derives everything from those. Locks
//! are toggled from outside the graph (a gate object flips its own latch);
//! owners then call [`SpatialGraph::notify_changed`] so route followers can
//! replan.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use glam::Vec3;

use super::jointed::{GraphError, JointedGraph};
use super::policy::SearchPolicy;
use crate::event::{Subscribers, Subscription};

/// Read access to a world position.
///
/// Node values implement this so heuristics and nearest-node queries can
/// see where they are without the graph owning any spatial state.
pub trait Locatable {
    /// World position of this value.
    fn position(&self) -> Vec3;
}

impl Locatable for Vec3 {
    fn position(&self) -> Vec3 {
        *self
    }
}

/// Shared open/closed latch for a joint.
///
/// Clones observe the same flag, so one handle can back both directions of
/// a gate and whoever owns the gate toggles traversal for all of them
/// without touching the graph.
#[derive(Debug, Clone, Default)]
pub struct LockHandle(Rc<Cell<bool>>);

impl LockHandle {
    /// Create a handle in the given lock state.
    #[must_use]
    pub fn new(locked: bool) -> Self {
        Self(Rc::new(Cell::new(locked)))
    }

    /// Current lock state.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.0.get()
    }

    /// Set the lock state.
    pub fn set_locked(&self, locked: bool) {
        self.0.set(locked);
    }

    /// Flip the lock state.
    pub fn toggle(&self) {
        self.0.set(!self.0.get());
    }
}

/// Joint payload between two located nodes.
#[derive(Debug, Clone)]
pub struct SpatialJoint {
    lock: LockHandle,
    start: Vec3,
    end: Vec3,
}

impl SpatialJoint {
    /// Create a joint spanning `start` to `end`, gated by `lock`.
    #[must_use]
    pub fn new(start: Vec3, end: Vec3, lock: LockHandle) -> Self {
        Self { lock, start, end }
    }

    /// The latch gating this joint.
    #[must_use]
    pub fn lock(&self) -> &LockHandle {
        &self.lock
    }

    /// Whether the joint is currently closed.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    /// Squared distance between the joint's endpoints.
    #[must_use]
    pub fn length_squared(&self) -> f32 {
        (self.end - self.start).length_squared()
    }
}

/// Search policy over located nodes and lockable joints: Manhattan-distance
/// heuristic, locked joints closed, squared endpoint distance as cost.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpatialPolicy;

impl<V: Locatable> SearchPolicy<V, SpatialJoint> for SpatialPolicy {
    fn heuristic(&self, node: &V, goal: &V) -> f32 {
        let delta = node.position() - goal.position();
        delta.x.abs() + delta.y.abs() + delta.z.abs()
    }

    fn is_open(&self, joint: &SpatialJoint) -> bool {
        !joint.is_locked()
    }

    fn travel_cost(&self, joint: &SpatialJoint) -> f32 {
        joint.length_squared()
    }
}

/// A [`JointedGraph`] of located values routed with [`SpatialPolicy`],
/// plus a change broadcast for route followers.
pub struct SpatialGraph<V: Locatable + 'static> {
    graph: JointedGraph<V, SpatialJoint>,
    changed: Subscribers<dyn FnMut(&SpatialGraph<V>)>,
}

impl<V: Locatable + 'static> SpatialGraph<V> {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: JointedGraph::new(),
            changed: Subscribers::new(),
        }
    }

    /// Append a node and return its index.
    pub fn add_node(&mut self, value: V) -> usize {
        self.graph.add_node(value)
    }

    /// Number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// The value at `index`.
    pub fn value(&self, index: usize) -> Result<&V, GraphError> {
        self.graph.value(index)
    }

    /// Iterate node values in index order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.graph.values()
    }

    /// Add a directed joint from `a` to `b` gated by a clone of `lock`,
    /// capturing both endpoint positions for the cost function.
    pub fn link(&mut self, a: usize, b: usize, lock: &LockHandle) -> Result<(), GraphError> {
        let start = self.graph.value(a)?.position();
        let end = self.graph.value(b)?.position();
        self.graph.link(a, b, SpatialJoint::new(start, end, lock.clone()))
    }

    /// Link `a` and `b` in both directions, sharing one latch.
    pub fn link_two_way(&mut self, a: usize, b: usize, lock: &LockHandle) -> Result<(), GraphError> {
        self.link(a, b, lock)?;
        self.link(b, a, lock)
    }

    /// Remove every joint from `a` to `b`.
    pub fn unlink(&mut self, a: usize, b: usize) -> Result<(), GraphError> {
        self.graph.unlink(a, b)
    }

    /// Iterate the joints leaving `index` as `(payload, target)` pairs.
    pub fn joints(
        &self,
        index: usize,
    ) -> Result<impl Iterator<Item = (&SpatialJoint, usize)>, GraphError> {
        self.graph.joints(index)
    }

    /// The node whose value lies closest to `position`, or `None` on an
    /// empty graph. Compared by squared distance.
    #[must_use]
    pub fn nearest_node(&self, position: Vec3) -> Option<usize> {
        let mut nearest = None;
        let mut nearest_distance = f32::INFINITY;
        for (index, value) in self.values().enumerate() {
            let distance = (value.position() - position).length_squared();
            if distance < nearest_distance {
                nearest_distance = distance;
                nearest = Some(index);
            }
        }
        nearest
    }

    /// Register a callback for topology or traversability changes.
    pub fn subscribe_changed(
        &mut self,
        callback: impl FnMut(&SpatialGraph<V>) + 'static,
    ) -> Subscription {
        self.changed.subscribe(Box::new(callback))
    }

    /// Remove a change callback.
    pub fn unsubscribe_changed(&mut self, subscription: Subscription) -> bool {
        self.changed.unsubscribe(subscription)
    }

    /// Broadcast that routing through this graph may have changed.
    ///
    /// Called by whoever mutated a latch or the topology; the graph cannot
    /// see latch flips on its own. Callbacks receive the graph by shared
    /// reference and may search it, but not mutate it.
    pub fn notify_changed(&mut self) {
        let mut changed = std::mem::take(&mut self.changed);
        log::trace!("graph changed; notifying {} observers", changed.len());
        for callback in changed.callbacks_mut() {
            callback(self);
        }
        self.changed = changed;
    }
}

impl<V: Locatable + Clone + 'static> SpatialGraph<V> {
    /// Find a best open route from `start` to `end` under [`SpatialPolicy`].
    ///
    /// Same contract as [`JointedGraph::find_path`]: the returned values
    /// exclude `start`, and `Ok(None)` is the ordinary no-route outcome.
    pub fn find_path(&self, start: usize, end: usize) -> Result<Option<Vec<V>>, GraphError> {
        self.graph.find_path(start, end, &SpatialPolicy)
    }
}

impl<V: Locatable + 'static> Default for SpatialGraph<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Locatable + fmt::Debug + 'static> fmt::Debug for SpatialGraph<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialGraph")
            .field("graph", &self.graph)
            .field("observers", &self.changed.len())
            .finish()
    }
}
