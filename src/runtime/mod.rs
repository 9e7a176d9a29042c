//! Runtime helpers that drive the controller with concurrent tokio tasks.

pub mod simulation;

pub use simulation::{demo_jobs, run_simulation, GrantedWork, SimEvent, SimJob, SimPhase, SleepWork};
