use crate::error::StepError;
use crate::registry::{RegistryOptions, StepRegistry};

pub mod common;
pub mod homepage;

/// 기본 제공 Step을 모두 등록한다.
pub fn register_all(registry: &mut StepRegistry) -> Result<(), StepError> {
    homepage::register(registry)?;
    common::register(registry)?;
    Ok(())
}

/// 기본 제공 Step이 등록된 레지스트리를 만든다.
pub fn default_registry(options: RegistryOptions) -> Result<StepRegistry, StepError> {
    let mut registry = StepRegistry::with_options(options);
    register_all(&mut registry)?;
    Ok(registry)
}
