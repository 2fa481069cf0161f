//! Navigation and actor-behavior primitives for game AI
//!
//! This crate provides:
//! - A jointed directed graph with policy-driven A* pathfinding
//! - A keyed finite state machine with default-state semantics
//! - A batch state queue for ordered, interruptible actor jobs
//! - A cooperative two-cadence tick clock and uniform parameter samplers

pub mod actor;
pub mod clock;
pub mod event;
pub mod graph;
pub mod sample;

// Re-exports for convenience
pub use glam;
pub use rand;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::actor::{MachineState, StateActor, StateFlow, StateMachine, StateQueue};
    pub use crate::clock::{TickClock, TickFlow};
    pub use crate::event::Subscription;
    pub use crate::graph::{
        GraphError, JointedGraph, Locatable, LockHandle, SearchPolicy, SpatialGraph,
        SpatialJoint, SpatialPolicy, UniformPolicy,
    };
    pub use crate::sample::{FloatDistribution, IntDistribution};
    pub use glam::Vec3;
}
