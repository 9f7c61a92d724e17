use super::state::ExecutionResult;
use crate::scenario::SourcePosition;

/// 엔진에서 보고 채널로 전달되는 주요 이벤트 모델이다.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// 시나리오 시작 알림.
    ScenarioStarted { scenario: String },
    /// Step 시작 알림.
    StepStarted {
        scenario: String,
        position: SourcePosition,
        phrase: String,
    },
    /// Step 동작이 남긴 로그 라인.
    StepLog { scenario: String, line: String },
    /// Step 종료 알림.
    StepFinished {
        scenario: String,
        position: SourcePosition,
        success: bool,
    },
    /// 앞선 실패로 실행하지 않은 Step.
    StepSkipped {
        scenario: String,
        position: SourcePosition,
    },
    /// 시나리오 종료와 최종 결과.
    ScenarioFinished {
        scenario: String,
        result: ExecutionResult,
    },
}
