//! Actor behavior primitives
//!
//! Two ways to structure an actor's behavior: a keyed finite state machine
//! for coarse modes, and a batch state queue for ordered jobs fed in from
//! outside (waypoints, errands).

mod fsm;
mod queue;

pub use fsm::{MachineState, StateMachine};
pub use queue::{StateActor, StateFlow, StateQueue};
