use crate::driver::WaitOptions;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// 시나리오 실행 전반에 적용되는 설정이다.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunnerConfig {
    /// 검증 Step이 조건을 기다리는 최대 시간(밀리초).
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    /// 검증 조건 재조회 간격(밀리초).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Step 하나의 실행 제한 시간(초). 지정하지 않으면 제한이 없다.
    #[serde(default)]
    pub step_timeout_sec: Option<u64>,
    /// 동시에 실행할 시나리오 수.
    #[serde(default = "default_max_concurrent_scenarios")]
    pub max_concurrent_scenarios: usize,
    /// Step 키워드(Given/When/Then)를 구분해서 해석할지 여부.
    #[serde(default)]
    pub strict_keywords: bool,
}

impl RunnerConfig {
    /// 검증 Step의 대기 설정을 반환한다.
    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions::from_millis(self.command_timeout_ms, self.poll_interval_ms)
    }

    /// Step 실행 제한 시간을 반환한다.
    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_sec
            .map(|secs| Duration::from_secs(secs.max(1)))
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: default_command_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            step_timeout_sec: None,
            max_concurrent_scenarios: default_max_concurrent_scenarios(),
            strict_keywords: false,
        }
    }
}

fn default_command_timeout_ms() -> u64 {
    4000
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_max_concurrent_scenarios() -> usize {
    1
}

/// YAML 파일을 읽어 RunnerConfig로 역직렬화한다.
pub fn load_config_from_file(path: &Path) -> Result<RunnerConfig, ConfigError> {
    let mut file = File::open(path)?;
    load_config_from_reader(&mut file)
}

/// Reader에서 YAML을 읽어 RunnerConfig로 파싱한다. 빈 문서는 기본값이다.
pub fn load_config_from_reader<R: Read>(reader: &mut R) -> Result<RunnerConfig, ConfigError> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    if buf.trim().is_empty() {
        return Ok(RunnerConfig::default());
    }
    let config: RunnerConfig = serde_yaml::from_str(&buf)?;
    Ok(config)
}
