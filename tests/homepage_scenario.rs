use std::sync::Arc;
use step_binder::driver::static_site::{ElementSpec, PageDefinition};
use step_binder::driver::{SiteDefinition, StaticSiteFactory};
use step_binder::feature::parse_feature;
use step_binder::report::collect_report;
use step_binder::steps::default_registry;
use step_binder::{
    ExecutionResult, RegistryOptions, RunnerConfig, Scenario, StepKeyword, SuiteError, SuiteRunner,
};
use tokio_util::sync::CancellationToken;

const HOMEPAGE_FEATURE: &str = "\
Feature: Homepage

  Scenario: Visitor is welcomed
    Given I am on the root page
    When I am welcomed
";

fn welcoming_site() -> SiteDefinition {
    SiteDefinition::default().with_page(
        "/",
        PageDefinition::default().with_element(ElementSpec::new("heading", "Welcome to Rinks")),
    )
}

fn silent_site() -> SiteDefinition {
    SiteDefinition::default().with_page(
        "/",
        PageDefinition::default().with_element(ElementSpec::new("heading", "Rinks")),
    )
}

fn runner(site: SiteDefinition) -> SuiteRunner {
    let config = RunnerConfig {
        command_timeout_ms: 100,
        poll_interval_ms: 10,
        ..RunnerConfig::default()
    };
    let registry = default_registry(RegistryOptions::default()).unwrap();
    SuiteRunner::new(Arc::new(registry), Arc::new(StaticSiteFactory::new(site)), config)
}

fn homepage_scenarios() -> Vec<Scenario> {
    parse_feature(HOMEPAGE_FEATURE, None).unwrap().scenarios
}

/// 환영 제목이 있는 루트 페이지에서는 시나리오가 통과한다.
#[tokio::test]
async fn visitor_is_welcomed_on_root_page() {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let collector = tokio::spawn(collect_report(rx));

    let runtimes = runner(welcoming_site())
        .run(homepage_scenarios(), tx, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(runtimes.len(), 1);
    assert_eq!(runtimes[0].result, Some(ExecutionResult::Passed));
    let report = collector.await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.passed(), 1);
}

/// 환영 제목이 없으면 두 번째 Step에서 시간 초과로 실패한다.
#[tokio::test]
async fn missing_welcome_heading_fails_second_step() {
    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();

    let runtimes = runner(silent_site())
        .run(homepage_scenarios(), tx, CancellationToken::new())
        .await
        .unwrap();

    match &runtimes[0].result {
        Some(ExecutionResult::Failed {
            phrase,
            position,
            cause,
            skipped,
        }) => {
            assert_eq!(phrase, "I am welcomed");
            assert_eq!(position.line, 5);
            assert!(cause.contains("시간 초과"), "{cause}");
            assert_eq!(*skipped, 0);
        }
        other => panic!("실패해야 합니다: {other:?}"),
    }
}

/// 정의되지 않은 Step이 섞여 있으면 스위트 전체가 실행되지 않는다.
#[tokio::test]
async fn undefined_step_aborts_the_suite() {
    let mut scenarios = homepage_scenarios();
    scenarios.push(
        Scenario::new("Visitor signs up")
            .with_step(StepKeyword::Given, "I am on the root page")
            .with_step(StepKeyword::When, "I sign up"),
    );
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let err = runner(welcoming_site())
        .run(scenarios, tx, CancellationToken::new())
        .await
        .unwrap_err();

    let SuiteError::Configuration(errors) = &err;
    assert_eq!(errors.len(), 1);
    assert!(err.to_string().contains("I sign up"), "{err}");
    assert!(rx.recv().await.is_none());
}

/// 키워드를 구분하지 않으면 Then으로 적어도 같은 Step에 연결된다.
#[tokio::test]
async fn keywords_are_interchangeable_by_default() {
    let scenario = Scenario::new("Loose keywords")
        .with_step(StepKeyword::When, "I am on the root page")
        .with_step(StepKeyword::Then, "I am welcomed");
    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();

    let runtimes = runner(welcoming_site())
        .run(vec![scenario], tx, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(runtimes[0].result, Some(ExecutionResult::Passed));
}
