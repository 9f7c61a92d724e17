use crate::error::StepError;
use regex::Regex;
use std::fmt;

/// 플레이스홀더가 받아들이는 값의 종류이다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// `{int}`: 부호 있는 정수.
    Int,
    /// `{float}`: 소수.
    Float,
    /// `{string}`: 큰따옴표 또는 작은따옴표로 감싼 문자열.
    Str,
    /// `{word}`: 공백 없는 단어 하나.
    Word,
    /// `{}`: 임의의 문자열.
    Any,
}

impl ParamKind {
    /// 플레이스홀더 이름으로 종류를 찾는다.
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" => Some(ParamKind::Int),
            "float" => Some(ParamKind::Float),
            "string" => Some(ParamKind::Str),
            "word" => Some(ParamKind::Word),
            "" => Some(ParamKind::Any),
            _ => None,
        }
    }

    /// 패턴 원문에 쓰이는 표기이다.
    pub fn placeholder(&self) -> &'static str {
        match self {
            ParamKind::Int => "{int}",
            ParamKind::Float => "{float}",
            ParamKind::Str => "{string}",
            ParamKind::Word => "{word}",
            ParamKind::Any => "{}",
        }
    }

    fn regex_fragment(&self) -> &'static str {
        match self {
            ParamKind::Int => r"(-?\d+)",
            ParamKind::Float => r"(-?\d*\.?\d+)",
            ParamKind::Str => r#"(?:"([^"]*)"|'([^']*)')"#,
            ParamKind::Word => r"(\S+)",
            ParamKind::Any => r"(.*)",
        }
    }

    /// 정규식에서 차지하는 캡처 그룹 수.
    fn group_count(&self) -> usize {
        match self {
            ParamKind::Str => 2,
            _ => 1,
        }
    }

    /// 캡처된 원문을 타입이 있는 값으로 변환한다. 범위를 벗어나면 `None`이다.
    fn convert(&self, raw: &str) -> Option<StepArg> {
        match self {
            ParamKind::Int => raw.parse().ok().map(StepArg::Int),
            ParamKind::Float => raw.parse().ok().map(StepArg::Float),
            ParamKind::Str | ParamKind::Word | ParamKind::Any => {
                Some(StepArg::Text(raw.to_string()))
            }
        }
    }
}

/// 문장에서 추출한 값 하나이다.
#[derive(Debug, Clone, PartialEq)]
pub enum StepArg {
    /// 정수 값.
    Int(i64),
    /// 소수 값.
    Float(f64),
    /// 문자열 값.
    Text(String),
}

impl fmt::Display for StepArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepArg::Int(v) => write!(f, "{v}"),
            StepArg::Float(v) => write!(f, "{v}"),
            StepArg::Text(v) => write!(f, "{v:?}"),
        }
    }
}

/// 템플릿 순서대로 추출한 값 목록이다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepArgs(Vec<StepArg>);

impl StepArgs {
    /// 값 목록으로 생성한다.
    pub fn new(values: Vec<StepArg>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&StepArg> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepArg> {
        self.0.iter()
    }

    /// `index` 위치의 정수 값을 반환한다.
    pub fn int(&self, index: usize) -> anyhow::Result<i64> {
        match self.0.get(index) {
            Some(StepArg::Int(v)) => Ok(*v),
            other => anyhow::bail!("{index}번째 인자는 정수가 아닙니다: {other:?}"),
        }
    }

    /// `index` 위치의 숫자 값을 소수로 반환한다. 정수도 허용한다.
    pub fn float(&self, index: usize) -> anyhow::Result<f64> {
        match self.0.get(index) {
            Some(StepArg::Float(v)) => Ok(*v),
            Some(StepArg::Int(v)) => Ok(*v as f64),
            other => anyhow::bail!("{index}번째 인자는 숫자가 아닙니다: {other:?}"),
        }
    }

    /// `index` 위치의 문자열 값을 반환한다.
    pub fn text(&self, index: usize) -> anyhow::Result<&str> {
        match self.0.get(index) {
            Some(StepArg::Text(v)) => Ok(v.as_str()),
            other => anyhow::bail!("{index}번째 인자는 문자열이 아닙니다: {other:?}"),
        }
    }
}

/// 템플릿을 구성하는 조각이다.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Param(ParamKind),
}

/// 문장 매칭 방식을 표현한다.
#[derive(Debug, Clone)]
enum StepMatcher {
    /// 플레이스홀더가 없는 패턴. 문장 전체가 같아야 한다.
    Literal(String),
    /// 타입이 있는 플레이스홀더를 포함한 패턴.
    Template {
        params: Vec<ParamKind>,
        regex: Regex,
    },
}

/// StepPattern은 등록 시점에 컴파일된 불변 문장 템플릿이다.
#[derive(Debug, Clone)]
pub struct StepPattern {
    /// 등록된 원문.
    source: String,
    /// 플레이스홀더 표기를 정규화한 비교 키.
    canonical: String,
    matcher: StepMatcher,
}

impl StepPattern {
    /// 패턴 원문을 해석한다.
    ///
    /// # 반환값
    /// 플레이스홀더 이름을 알 수 없거나 중괄호 짝이 맞지 않으면 `InvalidPattern`을 반환한다.
    pub fn parse(source: &str) -> Result<Self, StepError> {
        let segments = parse_segments(source)?;
        let canonical = canonical_form(&segments);
        let params: Vec<ParamKind> = segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Param(kind) => Some(*kind),
                Segment::Text(_) => None,
            })
            .collect();
        let matcher = if params.is_empty() {
            let text = segments
                .into_iter()
                .map(|segment| match segment {
                    Segment::Text(text) => text,
                    Segment::Param(_) => String::new(),
                })
                .collect();
            StepMatcher::Literal(text)
        } else {
            let mut expr = String::from("^");
            for segment in &segments {
                match segment {
                    Segment::Text(text) => expr.push_str(&regex::escape(text)),
                    Segment::Param(kind) => expr.push_str(kind.regex_fragment()),
                }
            }
            expr.push('$');
            let regex = Regex::new(&expr).map_err(|err| StepError::InvalidPattern {
                pattern: source.to_string(),
                reason: err.to_string(),
            })?;
            StepMatcher::Template { params, regex }
        };
        Ok(Self {
            source: source.to_string(),
            canonical,
            matcher,
        })
    }

    /// 등록된 원문을 반환한다.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// 플레이스홀더가 없는 패턴인지 확인한다.
    pub fn is_literal(&self) -> bool {
        matches!(self.matcher, StepMatcher::Literal(_))
    }

    /// 템플릿 순서대로 플레이스홀더 종류를 반환한다.
    pub fn params(&self) -> &[ParamKind] {
        match &self.matcher {
            StepMatcher::Literal(_) => &[],
            StepMatcher::Template { params, .. } => params,
        }
    }

    /// 두 패턴이 같은 문장 집합을 나타내는지 확인한다.
    pub fn is_equivalent(&self, other: &StepPattern) -> bool {
        self.canonical == other.canonical
    }

    /// 문장이 패턴에 맞으면 추출한 값을 반환한다.
    pub fn matches(&self, phrase: &str) -> Option<StepArgs> {
        match &self.matcher {
            StepMatcher::Literal(text) => (text == phrase).then(StepArgs::default),
            StepMatcher::Template { params, regex } => {
                let caps = regex.captures(phrase)?;
                let mut values = Vec::with_capacity(params.len());
                let mut group = 1;
                for kind in params {
                    let raw = (group..group + kind.group_count())
                        .find_map(|idx| caps.get(idx))
                        .map(|m| m.as_str())
                        .unwrap_or_default();
                    values.push(kind.convert(raw)?);
                    group += kind.group_count();
                }
                Some(StepArgs::new(values))
            }
        }
    }
}

impl fmt::Display for StepPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_segments(source: &str) -> Result<Vec<Segment>, StepError> {
    let invalid = |reason: String| StepError::InvalidPattern {
        pattern: source.to_string(),
        reason,
    };
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut chars = source.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                text.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                text.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    name.push(inner);
                }
                if !closed {
                    return Err(invalid("닫히지 않은 '{'".to_string()));
                }
                let kind = ParamKind::from_name(name.trim())
                    .ok_or_else(|| invalid(format!("알 수 없는 플레이스홀더 타입: {{{name}}}")))?;
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Param(kind));
            }
            '}' => return Err(invalid("짝이 맞지 않는 '}'".to_string())),
            other => text.push(other),
        }
    }
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

fn canonical_form(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Text(text) => out.push_str(&text.replace('{', "{{").replace('}', "}}")),
            Segment::Param(kind) => out.push_str(kind.placeholder()),
        }
    }
    out
}
