//! Graph engine
//!
//! A directed, jointed graph with stable node indices and an A*-style
//! best-path search driven by injectable policies, plus the lockable
//! spatial specialization the demo scenes route over.

mod jointed;
mod policy;
mod spatial;

pub use jointed::{GraphError, JointedGraph};
pub use policy::{SearchPolicy, UniformPolicy};
pub use spatial::{Locatable, LockHandle, SpatialGraph, SpatialJoint, SpatialPolicy};
