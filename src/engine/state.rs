use crate::scenario::{Scenario, ScenarioStep, SourcePosition};
use std::fmt;
use std::time::{Duration, Instant};

/// Step의 런타임 상태를 표현한다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// 아직 실행 대기 상태.
    Pending,
    /// 실행 중.
    Running,
    /// 정상 종료.
    Passed,
    /// 실패와 함께 오류 메시지를 포함한다.
    Failed(String),
    /// 앞선 Step 실패로 실행하지 않았다.
    Skipped,
}

/// 시나리오 하나의 최종 결과이다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// 모든 Step이 실패 없이 끝났다.
    Passed,
    /// 첫 실패 Step에서 중단되었다.
    Failed {
        /// 실패한 Step 문장.
        phrase: String,
        /// 실패한 Step 위치.
        position: SourcePosition,
        /// 근본 원인 메시지.
        cause: String,
        /// 실행하지 않고 건너뛴 Step 수.
        skipped: usize,
    },
}

impl ExecutionResult {
    pub fn is_passed(&self) -> bool {
        matches!(self, ExecutionResult::Passed)
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionResult::Passed => f.write_str("통과"),
            ExecutionResult::Failed {
                phrase,
                position,
                cause,
                skipped,
            } => write!(
                f,
                "실패: \"{phrase}\" ({position}): {cause} [건너뜀 {skipped}]"
            ),
        }
    }
}

/// Step의 시간 및 상태 정보를 담는다.
#[derive(Debug, Clone)]
pub struct StepRuntimeState {
    /// 원본 Step.
    pub step: ScenarioStep,
    /// 현재 상태 값.
    pub status: StepStatus,
    /// 시작 시각.
    pub started_at: Option<Instant>,
    /// 종료 시각.
    pub finished_at: Option<Instant>,
}

impl StepRuntimeState {
    /// 초기 상태를 생성한다.
    pub fn new(step: ScenarioStep) -> Self {
        Self {
            step,
            status: StepStatus::Pending,
            started_at: None,
            finished_at: None,
        }
    }

    /// 실행에 걸린 시간. 끝나지 않았으면 `None`이다.
    pub fn elapsed(&self) -> Option<Duration> {
        Some(self.finished_at?.duration_since(self.started_at?))
    }
}

/// Scenario 실행 중 Step 상태 목록과 최종 결과를 관리한다.
#[derive(Debug, Clone)]
pub struct ScenarioRuntime {
    /// 시나리오 이름.
    pub name: String,
    /// 원문 순서대로의 Step 상태.
    pub steps: Vec<StepRuntimeState>,
    /// 종료 후 결정되는 결과.
    pub result: Option<ExecutionResult>,
}

impl ScenarioRuntime {
    /// Scenario를 받아 초기 상태를 생성한다.
    pub fn new(scenario: &Scenario) -> Self {
        Self {
            name: scenario.name.clone(),
            steps: scenario
                .steps
                .iter()
                .cloned()
                .map(StepRuntimeState::new)
                .collect(),
            result: None,
        }
    }

    /// 지정한 위치부터 끝까지의 Step을 건너뜀으로 표시하고 그 수를 반환한다.
    pub(super) fn skip_from(&mut self, index: usize) -> usize {
        let mut skipped = 0;
        for state in self.steps.iter_mut().skip(index) {
            state.status = StepStatus::Skipped;
            skipped += 1;
        }
        skipped
    }

    /// 상태별 Step 수를 센다.
    pub fn count(&self, status: &StepStatus) -> usize {
        self.steps.iter().filter(|s| &s.status == status).count()
    }
}
