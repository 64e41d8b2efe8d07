// Step state machine for process steps
//
// A process step only ever leaves TODO once. Retries are modelled as new
// steps, so every non-TODO status is terminal.

pub mod events;
pub mod step_state_machine;

pub use events::StepEvent;
pub use step_state_machine::{determine_target_status, StepStateMachine};
