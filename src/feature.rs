use crate::error::FeatureError;
use crate::scenario::{Scenario, ScenarioStep, SourcePosition, StepKeyword};
use glob::glob;
use std::path::{Path, PathBuf};

/// Feature 파일 하나를 해석한 결과이다.
#[derive(Debug, Clone)]
pub struct Feature {
    /// Feature 이름.
    pub name: String,
    /// 원본 파일 경로.
    pub path: Option<PathBuf>,
    /// Feature 수준 태그.
    pub tags: Vec<String>,
    /// 선언 순서대로의 시나리오 목록. Background Step이 앞에 붙어 있다.
    pub scenarios: Vec<Scenario>,
}

/// 현재 읽고 있는 블록의 종류이다.
enum Section {
    /// Feature 설명 영역.
    Header,
    Background,
    Scenario,
}

/// Gherkin 문서를 해석해 Feature를 만든다.
///
/// # 매개변수
/// - `source`: feature 파일 원문.
/// - `path`: 오류 위치 표시에 사용할 파일 경로.
pub fn parse_feature(source: &str, path: Option<&Path>) -> Result<Feature, FeatureError> {
    let position = |line: usize| SourcePosition {
        file: path.map(Path::to_path_buf),
        line,
    };
    let mut feature: Option<Feature> = None;
    let mut section = Section::Header;
    let mut background: Vec<ScenarioStep> = Vec::new();
    let mut pending_tags: Vec<String> = Vec::new();
    let mut last_keyword: Option<StepKeyword> = None;
    let mut steps_started = false;

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('@') {
            pending_tags.extend(
                line.split_whitespace()
                    .map(|tag| tag.trim_start_matches('@').to_string()),
            );
            continue;
        }
        if let Some(name) = line.strip_prefix("Feature:") {
            if feature.is_some() {
                return Err(unsupported("두 번째 Feature 선언", position(line_no)));
            }
            feature = Some(Feature {
                name: name.trim().to_string(),
                path: path.map(Path::to_path_buf),
                tags: std::mem::take(&mut pending_tags),
                scenarios: Vec::new(),
            });
            continue;
        }
        if let Some(construct) = unsupported_header(line) {
            return Err(unsupported(construct, position(line_no)));
        }
        if line.starts_with("Background:") {
            if feature.is_none() {
                return Err(FeatureError::MissingFeature(position(line_no)));
            }
            if !pending_tags.is_empty() {
                return Err(unsupported("Background 태그", position(line_no)));
            }
            section = Section::Background;
            last_keyword = None;
            steps_started = false;
            continue;
        }
        if let Some(name) = scenario_header(line) {
            let Some(current) = feature.as_mut() else {
                return Err(FeatureError::MissingFeature(position(line_no)));
            };
            let mut tags = current.tags.clone();
            tags.append(&mut pending_tags);
            current.scenarios.push(Scenario {
                name: name.trim().to_string(),
                tags,
                steps: background.clone(),
            });
            section = Section::Scenario;
            last_keyword = None;
            steps_started = false;
            continue;
        }
        if line.starts_with("\"\"\"") || line.starts_with("```") {
            return Err(unsupported("Doc String", position(line_no)));
        }
        if line.starts_with('|') {
            return Err(unsupported("Data Table", position(line_no)));
        }
        if let Some((keyword, phrase)) = split_step(line, last_keyword) {
            let step = ScenarioStep::new(keyword, phrase, position(line_no));
            match section {
                Section::Header => return Err(FeatureError::StepOutsideScenario(step.position)),
                Section::Background => background.push(step),
                Section::Scenario => {
                    if let Some(scenario) = feature.as_mut().and_then(|f| f.scenarios.last_mut()) {
                        scenario.steps.push(step);
                    }
                }
            }
            last_keyword = Some(keyword);
            steps_started = true;
            continue;
        }
        // 블록 제목 아래 설명 문장은 허용하지만 Step 사이의 알 수 없는 줄은 오타로 본다.
        if steps_started {
            return Err(unsupported(line, position(line_no)));
        }
    }

    feature.ok_or_else(|| FeatureError::MissingFeature(position(1)))
}

fn unsupported(construct: &str, position: SourcePosition) -> FeatureError {
    FeatureError::Unsupported {
        construct: construct.to_string(),
        position,
    }
}

fn unsupported_header(line: &str) -> Option<&'static str> {
    [
        ("Scenario Outline:", "Scenario Outline"),
        ("Scenario Template:", "Scenario Outline"),
        ("Examples:", "Examples"),
        ("Scenarios:", "Examples"),
        ("Rule:", "Rule"),
    ]
    .into_iter()
    .find(|(prefix, _)| line.starts_with(prefix))
    .map(|(_, name)| name)
}

fn scenario_header(line: &str) -> Option<&str> {
    line.strip_prefix("Scenario:")
        .or_else(|| line.strip_prefix("Example:"))
}

/// Step 줄을 키워드와 문장으로 나눈다. `And`/`But`/`*`는 직전 키워드를 따른다.
fn split_step(line: &str, last: Option<StepKeyword>) -> Option<(StepKeyword, &str)> {
    let inherited = last.unwrap_or(StepKeyword::Step);
    let table = [
        ("Given ", StepKeyword::Given),
        ("When ", StepKeyword::When),
        ("Then ", StepKeyword::Then),
        ("And ", inherited),
        ("But ", inherited),
        ("* ", inherited),
    ];
    table.into_iter().find_map(|(prefix, keyword)| {
        line.strip_prefix(prefix)
            .map(|phrase| (keyword, phrase.trim()))
    })
}

/// feature 파일 하나를 읽어 해석한다.
pub fn load_feature_from_file(path: &Path) -> Result<Feature, FeatureError> {
    let source = std::fs::read_to_string(path).map_err(|source| FeatureError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_feature(&source, Some(path))
}

/// 디렉터리 아래의 모든 `.feature` 파일을 경로 순으로 읽는다.
pub fn load_features_from_dir(dir: &Path) -> Result<Vec<Feature>, FeatureError> {
    let pattern = format!("{}/**/*.feature", dir.display());
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in glob(&pattern)? {
        paths.push(entry?);
    }
    paths.sort();
    paths.iter().map(|path| load_feature_from_file(path)).collect()
}
