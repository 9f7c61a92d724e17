use crate::config::{RunnerConfig, load_config_from_file};
use crate::driver::{StaticSiteFactory, load_site_from_file};
use crate::engine::SuiteRunner;
use crate::feature::load_features_from_dir;
use crate::registry::RegistryOptions;
use crate::report::collect_report;
use crate::scenario::Scenario;
use crate::steps::default_registry;
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// feature 파일을 정적 사이트 정의에 대해 실행한다.
#[derive(Debug, Clone, Parser)]
#[command(name = "step-binder", version, about)]
pub struct Cli {
    /// `.feature` 파일을 찾을 디렉터리.
    #[arg(long, default_value = "features")]
    pub features: PathBuf,
    /// 정적 사이트 정의 YAML.
    #[arg(long)]
    pub site: PathBuf,
    /// 실행 설정 YAML.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// 지정한 태그가 붙은 시나리오만 실행한다.
    #[arg(long)]
    pub tag: Option<String>,
}

/// 실행 한 번의 최종 판정이다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// 모든 시나리오가 통과했다.
    Passed,
    /// 하나 이상의 시나리오가 실패했다.
    Failed,
    /// 설정, 사이트, feature 또는 Step 구성 오류로 실행하지 못했다.
    Misconfigured,
}

impl RunOutcome {
    /// 프로세스 종료 코드 값.
    pub fn code(self) -> u8 {
        match self {
            RunOutcome::Passed => 0,
            RunOutcome::Failed => 1,
            RunOutcome::Misconfigured => 2,
        }
    }

    pub fn exit_code(self) -> ExitCode {
        ExitCode::from(self.code())
    }
}

/// 설정과 입력을 읽고 실행할 러너와 시나리오를 준비한다.
fn prepare(cli: &Cli) -> anyhow::Result<(SuiteRunner, Vec<Scenario>)> {
    let config = match &cli.config {
        Some(path) => load_config_from_file(path)
            .with_context(|| format!("설정 파일 로드 실패: {}", path.display()))?,
        None => RunnerConfig::default(),
    };
    let site = load_site_from_file(&cli.site)?;
    let features = load_features_from_dir(&cli.features)
        .with_context(|| format!("feature 로드 실패: {}", cli.features.display()))?;
    let scenarios: Vec<Scenario> = features
        .into_iter()
        .flat_map(|feature| feature.scenarios)
        .filter(|scenario| cli.tag.as_deref().is_none_or(|tag| scenario.has_tag(tag)))
        .collect();

    let registry = default_registry(RegistryOptions {
        strict_keywords: config.strict_keywords,
    })
    .context("기본 Step 등록 실패")?;
    let runner = SuiteRunner::new(
        Arc::new(registry),
        Arc::new(StaticSiteFactory::new(site)),
        config,
    );
    Ok((runner, scenarios))
}

/// 명령행 인자대로 스위트를 실행하고 보고서를 출력한다.
///
/// 입력을 준비하지 못했거나 Step 구성 오류가 있으면 `Misconfigured`를 반환한다.
pub async fn run(cli: &Cli, cancel: CancellationToken) -> RunOutcome {
    let (runner, scenarios) = match prepare(cli) {
        Ok(prepared) => prepared,
        Err(err) => {
            tracing::error!("실행 준비 실패: {err:#}");
            eprintln!("{err:#}");
            return RunOutcome::Misconfigured;
        }
    };

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let collector = tokio::spawn(collect_report(rx));
    if let Err(err) = runner.run(scenarios, tx, cancel).await {
        eprintln!("{err}");
        return RunOutcome::Misconfigured;
    }
    let report = match collector.await {
        Ok(report) => report,
        Err(err) => {
            tracing::error!("보고서 수집 작업 실패: {err}");
            return RunOutcome::Failed;
        }
    };
    println!("{report}");
    if report.is_success() {
        RunOutcome::Passed
    } else {
        RunOutcome::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_codes_separate_failures_from_misconfiguration() {
        assert_eq!(RunOutcome::Passed.code(), 0);
        assert_eq!(RunOutcome::Failed.code(), 1);
        assert_eq!(RunOutcome::Misconfigured.code(), 2);
    }

    #[test]
    fn features_directory_defaults_to_features() {
        let cli = Cli::try_parse_from(["step-binder", "--site", "site.yaml"]).unwrap();
        assert_eq!(cli.features, PathBuf::from("features"));
        assert!(cli.config.is_none() && cli.tag.is_none());
    }
}
