pub mod cli;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod feature;
pub mod pattern;
pub mod registry;
pub mod report;
pub mod scenario;
pub mod steps;

pub use config::RunnerConfig;
pub use engine::{EngineEvent, ExecutionResult, SessionContext, SuiteRunner, run_scenario};
pub use error::{StepError, SuiteError};
pub use pattern::{StepArg, StepArgs, StepPattern};
pub use registry::{RegistryOptions, StepRegistry};
pub use scenario::{Scenario, ScenarioStep, SourcePosition, StepKeyword};
