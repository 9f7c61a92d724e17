use crate::scenario::{SourcePosition, StepKeyword};
use std::path::PathBuf;

/// Step 등록과 해석 중 발생하는 구성 오류를 표현한다.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StepError {
    /// 같은 키워드 범주에 동등한 패턴이 이미 등록된 경우이다.
    #[error("중복된 Step 패턴입니다: {keyword} \"{pattern}\"")]
    DuplicatePattern { keyword: StepKeyword, pattern: String },
    /// 플레이스홀더 문법이 잘못된 패턴이다.
    #[error("잘못된 Step 패턴입니다: \"{pattern}\" ({reason})")]
    InvalidPattern { pattern: String, reason: String },
    /// 둘 이상의 패턴이 같은 문장에 매칭된 경우이다.
    #[error(
        "모호한 Step입니다: \"{phrase}\" ({position}), 매칭된 패턴: {}",
        .patterns.join(" | ")
    )]
    AmbiguousStep {
        phrase: String,
        position: SourcePosition,
        patterns: Vec<String>,
    },
    /// 매칭되는 패턴이 없는 경우이다.
    #[error("정의되지 않은 Step입니다: \"{phrase}\" ({position})")]
    UndefinedStep {
        phrase: String,
        position: SourcePosition,
    },
}

/// 시나리오 파일 해석 중 발생하는 오류를 표현한다.
#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    /// 파일을 읽지 못한 경우이다.
    #[error("feature 파일을 읽을 수 없습니다: {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// `Feature:` 선언이 없는 경우이다.
    #[error("Feature 선언이 없습니다: {0}")]
    MissingFeature(SourcePosition),
    /// Scenario 블록 밖에 Step이 있는 경우이다.
    #[error("Scenario 밖에 Step이 있습니다: {0}")]
    StepOutsideScenario(SourcePosition),
    /// 지원하지 않는 Gherkin 구문이다.
    #[error("지원하지 않는 구문입니다: {construct} ({position})")]
    Unsupported {
        construct: String,
        position: SourcePosition,
    },
    /// glob 패턴이 잘못된 경우이다.
    #[error("glob 패턴 파싱 실패: {0}")]
    Pattern(#[from] glob::PatternError),
    /// 디렉터리 탐색 중 오류가 난 경우이다.
    #[error("feature 파일 탐색 실패: {0}")]
    Glob(#[from] glob::GlobError),
}

/// 실행 설정 파일을 읽는 중 발생하는 오류이다.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 파일 입출력 오류.
    #[error("설정 파일을 읽을 수 없습니다: {0}")]
    Read(#[from] std::io::Error),
    /// YAML 구문 오류.
    #[error("설정 YAML 파싱 실패: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// 시나리오 묶음을 실행하기 전에 감지된 오류이다.
#[derive(Debug, thiserror::Error)]
pub enum SuiteError {
    /// 하나 이상의 Step을 해석할 수 없어 실행을 시작하지 않았다.
    #[error(
        "Step 구성 오류 {}건으로 실행을 중단합니다:\n{}",
        .0.len(),
        render_step_errors(.0)
    )]
    Configuration(Vec<StepError>),
}

fn render_step_errors(errors: &[StepError]) -> String {
    errors
        .iter()
        .map(|err| format!("  - {err}"))
        .collect::<Vec<_>>()
        .join("\n")
}
