mod context;
mod events;
mod runner;
mod state;
mod suite;

pub use context::SessionContext;
pub use events::EngineEvent;
pub use runner::run_scenario;
pub use state::{ExecutionResult, ScenarioRuntime, StepRuntimeState, StepStatus};
pub use suite::SuiteRunner;
