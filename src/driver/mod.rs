use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub mod assertions;
pub mod static_site;

pub use assertions::{WaitOptions, expect_absent, expect_visible};
pub use static_site::{SiteDefinition, StaticSiteDriver, StaticSiteFactory, load_site_from_file};

/// BrowserDriver는 시나리오 하나가 사용하는 브라우저 세션을 추상화한다.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// 기준 URL에 대한 상대 경로로 이동한다.
    async fn visit(&mut self, path: &str) -> anyhow::Result<()>;

    /// 접근성 역할과 이름으로 현재 페이지의 요소를 조회한다.
    async fn find_by_role(&self, query: &RoleQuery) -> anyhow::Result<Vec<ElementInfo>>;

    /// 현재 페이지 경로. 아직 방문하지 않았으면 `None`이다.
    fn current_path(&self) -> Option<String>;
}

/// 시나리오마다 새 브라우저 세션을 만들어 주는 팩토리이다.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    /// 다른 세션과 상태를 공유하지 않는 세션을 연다.
    async fn open_session(&self) -> anyhow::Result<Box<dyn BrowserDriver>>;
}

/// DriverFactory를 공유하기 위한 Arc 타입 별칭이다.
pub type SharedDriverFactory = Arc<dyn DriverFactory>;

/// 조회 결과로 돌려주는 요소 정보이다.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ElementInfo {
    /// ARIA 역할.
    pub role: String,
    /// 접근 가능한 이름.
    pub name: String,
    /// 화면에 보이는지 여부.
    pub visible: bool,
}

/// 접근 가능한 이름을 비교하는 방식이다.
#[derive(Debug, Clone)]
pub enum NameMatcher {
    /// 이름과 무관하게 매칭한다.
    Any,
    /// 공백을 정리한 이름이 정확히 같아야 한다.
    Exact(String),
    /// 정규식으로 검색한다.
    Pattern(Regex),
}

impl NameMatcher {
    /// `/pattern/flags` 형식이면 정규식으로, 아니면 정확 일치로 해석한다.
    ///
    /// 지원하는 플래그는 `i`(대소문자 무시)뿐이다.
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let Some(body) = raw.strip_prefix('/') else {
            return Ok(NameMatcher::Exact(raw.trim().to_string()));
        };
        let Some(end) = body.rfind('/') else {
            return Ok(NameMatcher::Exact(raw.trim().to_string()));
        };
        let (expr, flags) = (&body[..end], &body[end + 1..]);
        let mut builder = RegexBuilder::new(expr);
        for flag in flags.chars() {
            match flag {
                'i' => {
                    builder.case_insensitive(true);
                }
                other => anyhow::bail!("지원하지 않는 정규식 플래그: {other}"),
            }
        }
        let regex = builder
            .build()
            .map_err(|err| anyhow::anyhow!("이름 정규식 컴파일 실패 ({raw}): {err}"))?;
        Ok(NameMatcher::Pattern(regex))
    }

    /// 요소 이름이 조건에 맞는지 확인한다.
    pub fn is_match(&self, name: &str) -> bool {
        match self {
            NameMatcher::Any => true,
            NameMatcher::Exact(expected) => normalize_whitespace(name) == *expected,
            NameMatcher::Pattern(regex) => regex.is_match(name),
        }
    }
}

impl fmt::Display for NameMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameMatcher::Any => f.write_str("*"),
            NameMatcher::Exact(name) => write!(f, "{name:?}"),
            NameMatcher::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

/// 역할과 이름으로 요소를 찾는 조회 조건이다.
#[derive(Debug, Clone)]
pub struct RoleQuery {
    /// ARIA 역할 (예: `heading`, `button`).
    pub role: String,
    /// 이름 조건.
    pub name: NameMatcher,
}

impl RoleQuery {
    /// 이름 조건 없이 역할만으로 조회 조건을 만든다.
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            name: NameMatcher::Any,
        }
    }

    /// 이름 조건을 지정한다.
    pub fn named(mut self, name: NameMatcher) -> Self {
        self.name = name;
        self
    }

    /// 요소가 조건에 맞는지 확인한다.
    pub fn is_match(&self, role: &str, name: &str) -> bool {
        self.role.eq_ignore_ascii_case(role) && self.name.is_match(name)
    }
}

impl fmt::Display for RoleQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "role={} name={}", self.role, self.name)
    }
}

fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
