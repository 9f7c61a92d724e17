use super::events::EngineEvent;
use crate::driver::{
    BrowserDriver, ElementInfo, RoleQuery, WaitOptions, expect_absent, expect_visible,
};
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::mpsc::UnboundedSender;

/// 시나리오 하나의 Step들이 공유하는 세션 상태이다.
///
/// 시나리오 시작 시 만들어지고 종료와 함께 버려진다. 동시에 실행되는 시나리오끼리는
/// 절대 공유하지 않는다.
pub struct SessionContext {
    /// 시나리오 이름.
    scenario: String,
    /// 브라우저 세션.
    driver: Box<dyn BrowserDriver>,
    /// Step 사이에 전달되는 문자열 값 저장소이다.
    vars: HashMap<String, String>,
    /// 검증 Step의 대기 설정.
    wait: WaitOptions,
    /// Step 로그를 보낼 채널.
    events: Option<UnboundedSender<EngineEvent>>,
}

impl SessionContext {
    /// 새 세션 컨텍스트를 생성한다.
    pub fn new(
        scenario: impl Into<String>,
        driver: Box<dyn BrowserDriver>,
        wait: WaitOptions,
    ) -> Self {
        Self {
            scenario: scenario.into(),
            driver,
            vars: HashMap::new(),
            wait,
            events: None,
        }
    }

    /// Step 로그를 보낼 채널을 연결한다.
    pub fn attach_events(&mut self, sender: UnboundedSender<EngineEvent>) {
        self.events = Some(sender);
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn driver(&self) -> &dyn BrowserDriver {
        self.driver.as_ref()
    }

    pub fn driver_mut(&mut self) -> &mut dyn BrowserDriver {
        self.driver.as_mut()
    }

    pub fn wait_options(&self) -> WaitOptions {
        self.wait
    }

    /// 컨텍스트 변수 값을 설정한다.
    ///
    /// # 매개변수
    /// - `key`: 저장할 변수명.
    /// - `value`: 저장할 문자열 값.
    pub fn set_var(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// 변수 값을 조회한다.
    ///
    /// # 반환값
    /// 존재하면 문자열 슬라이스를 반환하고 없으면 `None`을 반환한다.
    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|s| s.as_str())
    }

    /// 컨텍스트 또는 환경 변수에서 값을 조회한다.
    pub fn get_or_env(&self, key: &str) -> Option<String> {
        if let Some(value) = self.get_var(key) {
            return Some(value.to_string());
        }
        std::env::var(key).ok()
    }

    /// `${VAR}` 패턴을 컨텍스트 값이나 환경 변수로 치환한다.
    ///
    /// # 반환값
    /// 치환하지 못한 플레이스홀더가 남으면 오류를 반환한다.
    pub fn expand_placeholders(&self, template: &str) -> anyhow::Result<String> {
        static PLACEHOLDER: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"\$\{([A-Za-z0-9_]+)\}").expect("정규식 컴파일 실패"));
        let result = PLACEHOLDER.replace_all(template, |caps: &regex::Captures| {
            let key = &caps[1];
            self.get_or_env(key)
                .unwrap_or_else(|| format!("${{{key}}}"))
        });
        let result = result.to_string();
        if PLACEHOLDER.is_match(&result) {
            anyhow::bail!("플레이스홀더 치환 실패: {result}");
        }
        Ok(result)
    }

    /// Step 로그를 남긴다.
    pub fn log(&self, line: impl Into<String>) {
        let line = line.into();
        tracing::debug!(scenario = %self.scenario, "{line}");
        if let Some(sender) = &self.events {
            let _ = sender.send(EngineEvent::StepLog {
                scenario: self.scenario.clone(),
                line,
            });
        }
    }

    /// 플레이스홀더를 치환한 경로로 이동한다.
    pub async fn visit(&mut self, path: &str) -> anyhow::Result<()> {
        let target = self
            .expand_placeholders(path)
            .with_context(|| format!("방문 경로를 만들 수 없습니다: {path}"))?;
        self.log(format!("visit {target:?}"));
        self.driver.visit(&target).await
    }

    /// 조건에 맞는 요소가 보일 때까지 기다린다.
    pub async fn expect_visible(&self, query: &RoleQuery) -> anyhow::Result<ElementInfo> {
        expect_visible(self.driver(), query, self.wait).await
    }

    /// 조건에 맞는 요소가 보이지 않을 때까지 기다린다.
    pub async fn expect_absent(&self, query: &RoleQuery) -> anyhow::Result<()> {
        expect_absent(self.driver(), query, self.wait).await
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("scenario", &self.scenario)
            .field("current_path", &self.driver.current_path())
            .field("vars", &self.vars)
            .field("wait", &self.wait)
            .finish()
    }
}
