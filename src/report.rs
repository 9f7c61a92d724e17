use crate::engine::{EngineEvent, ExecutionResult, ScenarioRuntime};
use std::fmt;
use tokio::sync::mpsc::UnboundedReceiver;

/// 시나리오 하나의 최종 결과 요약이다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioSummary {
    pub name: String,
    pub result: ExecutionResult,
}

/// 실행한 시나리오 결과를 모은 보고서이다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteReport {
    /// 완료 순서대로의 시나리오 결과.
    pub scenarios: Vec<ScenarioSummary>,
}

impl SuiteReport {
    /// 러너가 돌려준 런타임 목록으로 보고서를 만든다.
    pub fn from_runtimes(runtimes: &[ScenarioRuntime]) -> Self {
        Self {
            scenarios: runtimes
                .iter()
                .filter_map(|runtime| {
                    runtime.result.clone().map(|result| ScenarioSummary {
                        name: runtime.name.clone(),
                        result,
                    })
                })
                .collect(),
        }
    }

    pub fn passed(&self) -> usize {
        self.scenarios.iter().filter(|s| s.result.is_passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.scenarios.len() - self.passed()
    }

    /// 실패한 시나리오가 없으면 참이다.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for summary in &self.scenarios {
            match &summary.result {
                ExecutionResult::Passed => writeln!(f, "  ✔ {}", summary.name)?,
                ExecutionResult::Failed {
                    phrase,
                    position,
                    cause,
                    skipped,
                } => {
                    writeln!(f, "  ✘ {}", summary.name)?;
                    writeln!(f, "      실패 Step: \"{phrase}\" ({position})")?;
                    writeln!(f, "      원인: {cause}")?;
                    if *skipped > 0 {
                        writeln!(f, "      건너뛴 Step: {skipped}")?;
                    }
                }
            }
        }
        write!(
            f,
            "시나리오 {}개: 통과 {}, 실패 {}",
            self.scenarios.len(),
            self.passed(),
            self.failed()
        )
    }
}

/// 채널이 닫힐 때까지 이벤트를 받아 시나리오 종료 결과를 모은다.
pub async fn collect_report(mut receiver: UnboundedReceiver<EngineEvent>) -> SuiteReport {
    let mut report = SuiteReport::default();
    while let Some(event) = receiver.recv().await {
        if let EngineEvent::ScenarioFinished { scenario, result } = event {
            report.scenarios.push(ScenarioSummary {
                name: scenario,
                result,
            });
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::SourcePosition;

    fn failed() -> ExecutionResult {
        ExecutionResult::Failed {
            phrase: "I am welcomed".into(),
            position: SourcePosition::in_file("home.feature", 9),
            cause: "시간 초과(4000ms)".into(),
            skipped: 0,
        }
    }

    #[tokio::test]
    async fn collects_only_finished_scenarios() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tx.send(EngineEvent::ScenarioStarted {
            scenario: "a".into(),
        })
        .unwrap();
        tx.send(EngineEvent::ScenarioFinished {
            scenario: "a".into(),
            result: ExecutionResult::Passed,
        })
        .unwrap();
        tx.send(EngineEvent::ScenarioFinished {
            scenario: "b".into(),
            result: failed(),
        })
        .unwrap();
        drop(tx);

        let report = collect_report(rx).await;
        assert_eq!(report.scenarios.len(), 2);
        assert_eq!((report.passed(), report.failed()), (1, 1));
        assert!(!report.is_success());
    }

    #[test]
    fn render_lists_failure_details() {
        let report = SuiteReport {
            scenarios: vec![ScenarioSummary {
                name: "Visitor is welcomed".into(),
                result: failed(),
            }],
        };
        let text = report.to_string();
        assert!(text.contains("home.feature:9"));
        assert!(text.contains("시간 초과(4000ms)"));
        assert!(text.ends_with("시나리오 1개: 통과 0, 실패 1"));
    }
}
