use super::{BrowserDriver, DriverFactory, ElementInfo, RoleQuery};
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// 메모리에 정의된 사이트 전체이다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteDefinition {
    /// 경로별 페이지 정의.
    #[serde(default)]
    pub pages: HashMap<String, PageDefinition>,
}

impl SiteDefinition {
    /// 페이지를 추가한다. 경로는 정규화되어 저장된다.
    pub fn with_page(mut self, path: &str, page: PageDefinition) -> Self {
        self.pages.insert(normalize_path(path), page);
        self
    }

    fn page(&self, path: &str) -> Option<&PageDefinition> {
        let wanted = normalize_path(path);
        self.pages
            .iter()
            .find(|(key, _)| normalize_path(key) == wanted)
            .map(|(_, page)| page)
    }
}

/// 한 페이지의 접근성 트리를 단순화한 정의이다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageDefinition {
    /// 문서 제목.
    #[serde(default)]
    pub title: Option<String>,
    /// 페이지에 렌더링되는 요소 목록.
    #[serde(default)]
    pub elements: Vec<ElementSpec>,
}

impl PageDefinition {
    /// 요소를 추가한다.
    pub fn with_element(mut self, element: ElementSpec) -> Self {
        self.elements.push(element);
        self
    }
}

/// 페이지 안의 요소 하나이다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementSpec {
    /// ARIA 역할.
    pub role: String,
    /// 접근 가능한 이름.
    pub name: String,
    /// 숨김 처리 여부. 기본값은 보임이다.
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// 페이지 방문 후 요소가 렌더링되기까지의 지연(밀리초).
    #[serde(default)]
    pub appear_after_ms: u64,
}

impl ElementSpec {
    /// 즉시 보이는 요소를 만든다.
    pub fn new(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            name: name.into(),
            visible: true,
            appear_after_ms: 0,
        }
    }

    /// 숨김 요소로 만든다.
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// 렌더링 지연을 지정한다.
    pub fn appearing_after(mut self, delay: Duration) -> Self {
        self.appear_after_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

fn default_visible() -> bool {
    true
}

/// StaticSiteDriver는 SiteDefinition을 브라우저처럼 탐색하는 세션이다.
#[derive(Debug)]
pub struct StaticSiteDriver {
    site: Arc<SiteDefinition>,
    /// 현재 경로와 방문 시각.
    current: Option<(String, Instant)>,
}

impl StaticSiteDriver {
    /// 사이트 정의를 공유하는 새 세션을 만든다.
    pub fn new(site: Arc<SiteDefinition>) -> Self {
        Self {
            site,
            current: None,
        }
    }
}

#[async_trait]
impl BrowserDriver for StaticSiteDriver {
    async fn visit(&mut self, path: &str) -> anyhow::Result<()> {
        let normalized = normalize_path(path);
        if self.site.page(&normalized).is_none() {
            anyhow::bail!("페이지를 찾을 수 없습니다 (404): {normalized}");
        }
        tracing::debug!(path = %normalized, "정적 사이트 방문");
        self.current = Some((normalized, Instant::now()));
        Ok(())
    }

    async fn find_by_role(&self, query: &RoleQuery) -> anyhow::Result<Vec<ElementInfo>> {
        let (path, visited_at) = self
            .current
            .as_ref()
            .context("아직 페이지를 방문하지 않았습니다.")?;
        let page = self
            .site
            .page(path)
            .with_context(|| format!("페이지 정의가 사라졌습니다: {path}"))?;
        let elapsed = visited_at.elapsed();
        Ok(page
            .elements
            .iter()
            .filter(|spec| Duration::from_millis(spec.appear_after_ms) <= elapsed)
            .filter(|spec| query.is_match(&spec.role, &spec.name))
            .map(|spec| ElementInfo {
                role: spec.role.clone(),
                name: spec.name.clone(),
                visible: spec.visible,
            })
            .collect())
    }

    fn current_path(&self) -> Option<String> {
        self.current.as_ref().map(|(path, _)| path.clone())
    }
}

/// 같은 사이트 정의로 독립된 세션을 계속 만들어 주는 팩토리이다.
#[derive(Debug, Clone)]
pub struct StaticSiteFactory {
    site: Arc<SiteDefinition>,
}

impl StaticSiteFactory {
    pub fn new(site: SiteDefinition) -> Self {
        Self {
            site: Arc::new(site),
        }
    }
}

#[async_trait]
impl DriverFactory for StaticSiteFactory {
    async fn open_session(&self) -> anyhow::Result<Box<dyn BrowserDriver>> {
        Ok(Box::new(StaticSiteDriver::new(self.site.clone())))
    }
}

/// 경로를 `/`로 시작하고 끝 `/`가 없는 형태로 맞춘다. 빈 문자열은 루트이다.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    format!("/{trimmed}")
}

/// YAML 파일을 읽어 SiteDefinition으로 역직렬화한다.
pub fn load_site_from_file(path: &Path) -> anyhow::Result<SiteDefinition> {
    let mut file = File::open(path)
        .with_context(|| format!("사이트 정의 파일 열기 실패: {}", path.display()))?;
    load_site_from_reader(&mut file)
}

/// Reader에서 YAML을 읽어 SiteDefinition으로 파싱한다.
pub fn load_site_from_reader<R: Read>(reader: &mut R) -> anyhow::Result<SiteDefinition> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    let site: SiteDefinition = serde_yaml::from_str(&buf).context("사이트 정의 YAML 파싱 실패")?;
    Ok(site)
}
