pub mod motor;
pub mod pid;
pub mod state_machine;

pub use motor::{Actuator, MotorControl, MotorLimits};
pub use pid::{PidController, PidState};
pub use state_machine::{MotorDirective, SafetyLimits, StateMachine};
