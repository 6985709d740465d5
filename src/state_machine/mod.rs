// Work item state machine for the execution plan
//
// States, events and the pure transition table. The plan applies transitions
// while holding its coordination lock and mirrors the result into per-item
// atomics so diagnostics can read states without locking.

pub mod errors;
pub mod events;
pub mod node_state_machine;
pub mod states;

// Re-export main types for convenient access
pub use errors::{StateMachineError, StateMachineResult};
pub use events::NodeEvent;
pub use node_state_machine::NodeStateMachine;
pub use states::NodeState;
