use super::context::SessionContext;
use super::events::EngineEvent;
use super::state::{ExecutionResult, ScenarioRuntime, StepStatus};
use crate::pattern::StepArgs;
use crate::registry::{StepBinding, StepRegistry};
use crate::scenario::{Scenario, ScenarioStep};
use futures::FutureExt;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Scenario의 Step을 원문 순서대로 실행하고 이벤트를 송신한다.
///
/// 첫 실패(해석 실패 포함)에서 멈추고 남은 Step은 실행하지 않는다. 러너는 재시도하지 않으며
/// 대기가 필요한 검증은 Step 동작 안에서 처리한다.
///
/// # 매개변수
/// - `step_timeout`: Step 하나에 허용하는 최대 시간. `None`이면 제한하지 않는다.
/// - `cancel`: 취소되면 진행 중인 Step을 중단하고 그 Step의 실패로 보고한다.
pub async fn run_scenario(
    scenario: &Scenario,
    registry: &StepRegistry,
    ctx: &mut SessionContext,
    step_timeout: Option<Duration>,
    sender: &UnboundedSender<EngineEvent>,
    cancel: &CancellationToken,
) -> ScenarioRuntime {
    let mut runtime = ScenarioRuntime::new(scenario);
    let name = scenario.name.clone();
    tracing::info!(scenario = %name, steps = scenario.len(), "시나리오 시작");
    let _ = sender.send(EngineEvent::ScenarioStarted {
        scenario: name.clone(),
    });

    let mut result = ExecutionResult::Passed;
    for (index, step) in scenario.steps.iter().enumerate() {
        mark_step_started(&mut runtime, index, &name, step, sender);
        let outcome = execute_step(step, registry, ctx, step_timeout, cancel).await;
        let state = &mut runtime.steps[index];
        state.finished_at = Some(Instant::now());
        match outcome {
            Ok(()) => {
                state.status = StepStatus::Passed;
                let _ = sender.send(EngineEvent::StepFinished {
                    scenario: name.clone(),
                    position: step.position.clone(),
                    success: true,
                });
            }
            Err(err) => {
                let cause = format!("{err:#}");
                tracing::warn!(
                    scenario = %name,
                    position = %step.position,
                    "Step 실패: {cause}"
                );
                state.status = StepStatus::Failed(cause.clone());
                let _ = sender.send(EngineEvent::StepLog {
                    scenario: name.clone(),
                    line: cause.clone(),
                });
                let _ = sender.send(EngineEvent::StepFinished {
                    scenario: name.clone(),
                    position: step.position.clone(),
                    success: false,
                });
                let skipped = runtime.skip_from(index + 1);
                for rest in &scenario.steps[index + 1..] {
                    let _ = sender.send(EngineEvent::StepSkipped {
                        scenario: name.clone(),
                        position: rest.position.clone(),
                    });
                }
                result = ExecutionResult::Failed {
                    phrase: step.phrase.clone(),
                    position: step.position.clone(),
                    cause,
                    skipped,
                };
                break;
            }
        }
    }

    tracing::info!(scenario = %name, passed = result.is_passed(), "시나리오 종료");
    runtime.result = Some(result.clone());
    let _ = sender.send(EngineEvent::ScenarioFinished {
        scenario: name,
        result,
    });
    runtime
}

/// Step이 시작될 때 상태와 이벤트를 갱신한다.
fn mark_step_started(
    runtime: &mut ScenarioRuntime,
    index: usize,
    scenario: &str,
    step: &ScenarioStep,
    sender: &UnboundedSender<EngineEvent>,
) {
    if let Some(state) = runtime.steps.get_mut(index) {
        state.status = StepStatus::Running;
        state.started_at = Some(Instant::now());
    }
    let _ = sender.send(EngineEvent::StepStarted {
        scenario: scenario.to_string(),
        position: step.position.clone(),
        phrase: step.phrase.clone(),
    });
}

/// Step을 해석하고 동작을 호출한다.
async fn execute_step(
    step: &ScenarioStep,
    registry: &StepRegistry,
    ctx: &mut SessionContext,
    step_timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    if cancel.is_cancelled() {
        anyhow::bail!("사용자에 의해 실행이 중단되었습니다.");
    }
    let resolved = registry.resolve(step)?;
    tracing::debug!(
        position = %step.position,
        binding = %resolved.binding,
        args = resolved.args.len(),
        "Step 해석 완료"
    );
    invoke_binding(resolved.binding, resolved.args, ctx, step_timeout, cancel).await
}

async fn invoke_binding(
    binding: &StepBinding,
    args: StepArgs,
    ctx: &mut SessionContext,
    step_timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    // 동작의 패닉은 이 Step의 실패로 바꾼다.
    let action = match panic::catch_unwind(AssertUnwindSafe(move || binding.invoke(ctx, args))) {
        Ok(action) => action,
        Err(payload) => anyhow::bail!("Step 동작 패닉: {}", panic_message(payload.as_ref())),
    };
    let action = AssertUnwindSafe(action)
        .catch_unwind()
        .map(|caught| match caught {
            Ok(result) => result,
            Err(payload) => Err(anyhow::anyhow!(
                "Step 동작 패닉: {}",
                panic_message(payload.as_ref())
            )),
        });
    let guarded = async move {
        match step_timeout {
            Some(limit) => match tokio::time::timeout(limit, action).await {
                Ok(result) => result,
                Err(_) => anyhow::bail!("Step 실행 시간 초과({}ms)", limit.as_millis()),
            },
            None => action.await,
        }
    };
    tokio::select! {
        _ = cancel.cancelled() => anyhow::bail!("사용자에 의해 실행이 중단되었습니다."),
        result = guarded => result,
    }
}

/// 패닉 값에서 사람이 읽을 메시지를 꺼낸다.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "알 수 없는 패닉".to_string()
    }
}
