use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Step 문장이 선언된 키워드 범주를 표현한다.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StepKeyword {
    /// 사전 조건(Given).
    Given,
    /// 동작(When).
    When,
    /// 결과 검증(Then).
    Then,
    /// 키워드에 묶이지 않는 범용 Step.
    Step,
}

impl StepKeyword {
    /// Gherkin 키워드 문자열로 변환한다.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKeyword::Given => "Given",
            StepKeyword::When => "When",
            StepKeyword::Then => "Then",
            StepKeyword::Step => "Step",
        }
    }
}

impl fmt::Display for StepKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 시나리오 원문에서 Step이 위치한 곳이다.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourcePosition {
    /// 원본 파일 경로. 메모리에서 만든 시나리오는 `None`이다.
    pub file: Option<PathBuf>,
    /// 1 기반 라인 번호.
    pub line: usize,
}

impl SourcePosition {
    /// 파일 정보 없이 라인 번호만으로 위치를 만든다.
    pub fn line(line: usize) -> Self {
        Self { file: None, line }
    }

    /// 파일 경로와 라인 번호로 위치를 만든다.
    pub fn in_file(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: Some(file.into()),
            line,
        }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}", file.display(), self.line),
            None => write!(f, "line {}", self.line),
        }
    }
}

/// ScenarioStep은 시나리오 원문의 한 줄을 표현한다.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScenarioStep {
    /// Step 키워드 범주.
    pub keyword: StepKeyword,
    /// 키워드를 제외한 문장.
    pub phrase: String,
    /// 원문 위치.
    pub position: SourcePosition,
}

impl ScenarioStep {
    /// 새 Step을 생성한다.
    pub fn new(keyword: StepKeyword, phrase: impl Into<String>, position: SourcePosition) -> Self {
        Self {
            keyword,
            phrase: phrase.into(),
            position,
        }
    }
}

impl fmt::Display for ScenarioStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.keyword, self.phrase)
    }
}

/// Scenario는 순서가 있는 Step 목록으로 구성된 하나의 테스트 케이스다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// 시나리오의 표시 이름.
    pub name: String,
    /// 시나리오에 붙은 태그 목록(`@` 제외).
    #[serde(default)]
    pub tags: Vec<String>,
    /// Step 목록.
    pub steps: Vec<ScenarioStep>,
}

impl Scenario {
    /// 이름만 가진 빈 시나리오를 생성한다.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Step을 추가한다. 위치는 추가 순서를 라인 번호로 사용한다.
    pub fn with_step(mut self, keyword: StepKeyword, phrase: impl Into<String>) -> Self {
        let line = self.steps.len() + 1;
        self.steps
            .push(ScenarioStep::new(keyword, phrase, SourcePosition::line(line)));
        self
    }

    /// 전체 Step 수를 반환한다.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Step 수가 비었는지 여부를 확인한다.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// 지정한 태그를 가지고 있는지 확인한다.
    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.trim_start_matches('@');
        self.tags.iter().any(|t| t == tag)
    }
}
