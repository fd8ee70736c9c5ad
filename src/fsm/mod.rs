pub mod descent_states;
pub mod state_machine;

pub use descent_states::DescentState;
pub use state_machine::DescentStateMachine;
