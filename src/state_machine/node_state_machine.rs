use super::{
    errors::{StateMachineError, StateMachineResult},
    events::NodeEvent,
    states::NodeState,
};

/// Transition table for a single work item.
///
/// The plan owns the current state of every item; this type only decides
/// whether an event is legal from a given state and where it leads.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeStateMachine;

impl NodeStateMachine {
    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        current_state: NodeState,
        event: NodeEvent,
    ) -> StateMachineResult<NodeState> {
        let target = match (current_state, event) {
            (NodeState::NotScheduled, NodeEvent::Schedule) => NodeState::Queued,

            (NodeState::Queued, NodeEvent::DependenciesSatisfied) => NodeState::MaybeReady,

            // Claim
            (NodeState::MaybeReady, NodeEvent::Select) => NodeState::Selected,
            (NodeState::Selected, NodeEvent::Start) => NodeState::Executing,

            // Outcome reported by the worker
            (NodeState::Selected | NodeState::Executing, NodeEvent::Succeed) => {
                NodeState::Succeeded
            }
            (NodeState::Selected | NodeState::Executing, NodeEvent::Fail) => NodeState::Failed,

            // Forced skip
            (from_state, NodeEvent::Skip) if !from_state.is_terminal() => NodeState::Skipped,

            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: Some(from_state.to_string()),
                    to: format!("{event:?}"),
                })
            }
        };

        Ok(target)
    }

    /// Check whether an event is legal from the given state
    pub fn can_transition(current_state: NodeState, event: NodeEvent) -> bool {
        Self::determine_target_state(current_state, event).is_ok()
    }
}
