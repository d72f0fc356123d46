//! Run orchestration: the controller state machine, request pacing, and the
//! manual-login gate. Decoupled from any presentation layer — front-ends
//! observe the run through the progress channel and stop it through the
//! cancellation token.

pub mod controller;
pub mod gate;
pub mod pacer;

pub use controller::{RunController, RunReport};
pub use gate::StdinGate;
