use super::context::SessionContext;
use super::events::EngineEvent;
use super::runner::run_scenario;
use super::state::{ExecutionResult, ScenarioRuntime};
use crate::config::RunnerConfig;
use crate::driver::SharedDriverFactory;
use crate::error::SuiteError;
use crate::registry::StepRegistry;
use crate::scenario::Scenario;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// 여러 시나리오를 독립된 세션에서 실행하는 러너이다.
///
/// 레지스트리는 읽기 전용으로 공유하고, 시나리오마다 새 드라이버 세션과
/// SessionContext를 만든다.
#[derive(Clone)]
pub struct SuiteRunner {
    registry: Arc<StepRegistry>,
    factory: SharedDriverFactory,
    config: RunnerConfig,
}

impl SuiteRunner {
    pub fn new(
        registry: Arc<StepRegistry>,
        factory: SharedDriverFactory,
        config: RunnerConfig,
    ) -> Self {
        Self {
            registry,
            factory,
            config,
        }
    }

    /// 실행 전에 모든 Step을 해석해 구성 오류를 찾는다.
    pub fn preflight(&self, scenarios: &[Scenario]) -> Result<(), SuiteError> {
        let errors = self
            .registry
            .check(scenarios.iter().flat_map(|scenario| scenario.steps.iter()));
        if errors.is_empty() {
            Ok(())
        } else {
            Err(SuiteError::Configuration(errors))
        }
    }

    /// 시나리오 목록을 실행하고 입력 순서대로 결과를 돌려준다.
    ///
    /// 구성 오류가 하나라도 있으면 어떤 시나리오도 실행하지 않는다. 동작 실패는 해당
    /// 시나리오에만 영향을 준다.
    pub async fn run(
        &self,
        scenarios: Vec<Scenario>,
        sender: UnboundedSender<EngineEvent>,
        cancel: CancellationToken,
    ) -> Result<Vec<ScenarioRuntime>, SuiteError> {
        self.preflight(&scenarios)?;
        let limit = self.config.max_concurrent_scenarios.max(1);
        tracing::info!(scenarios = scenarios.len(), limit, "시나리오 실행 시작");

        let total = scenarios.len();
        let mut queue = scenarios.into_iter().enumerate();
        let mut running = FuturesUnordered::new();
        let mut finished: Vec<Option<ScenarioRuntime>> = vec![None; total];
        loop {
            while running.len() < limit {
                let Some((index, scenario)) = queue.next() else {
                    break;
                };
                let this = self.clone();
                let tx = sender.clone();
                let token = cancel.clone();
                let fallback = scenario.clone();
                let handle =
                    tokio::spawn(async move { this.run_one(&scenario, tx, token).await });
                running.push(async move { (index, fallback, handle.await) });
            }
            let Some((index, scenario, joined)) = running.next().await else {
                break;
            };
            let runtime = match joined {
                Ok(runtime) => runtime,
                Err(err) => {
                    let cause = format!("시나리오 작업 실패: {err}");
                    abandon_scenario(&scenario, cause, &sender)
                }
            };
            finished[index] = Some(runtime);
        }
        Ok(finished.into_iter().flatten().collect())
    }

    /// 시나리오 하나를 새 세션에서 실행한다.
    async fn run_one(
        &self,
        scenario: &Scenario,
        sender: UnboundedSender<EngineEvent>,
        cancel: CancellationToken,
    ) -> ScenarioRuntime {
        let driver = match self.factory.open_session().await {
            Ok(driver) => driver,
            Err(err) => {
                let cause = format!("브라우저 세션 생성 실패: {err:#}");
                return abandon_scenario(scenario, cause, &sender);
            }
        };
        let mut ctx = SessionContext::new(&scenario.name, driver, self.config.wait_options());
        ctx.attach_events(sender.clone());
        run_scenario(
            scenario,
            &self.registry,
            &mut ctx,
            self.config.step_timeout(),
            &sender,
            &cancel,
        )
        .await
    }
}

/// 실행하지 못한 시나리오를 첫 Step 위치의 실패로 기록하고 종료 이벤트를 보낸다.
fn abandon_scenario(
    scenario: &Scenario,
    cause: String,
    sender: &UnboundedSender<EngineEvent>,
) -> ScenarioRuntime {
    let mut runtime = ScenarioRuntime::new(scenario);
    let (phrase, position) = scenario
        .steps
        .first()
        .map(|step| (step.phrase.clone(), step.position.clone()))
        .unwrap_or_default();
    let skipped = runtime.skip_from(0);
    let result = ExecutionResult::Failed {
        phrase,
        position,
        cause,
        skipped,
    };
    tracing::warn!(scenario = %scenario.name, "{result}");
    runtime.result = Some(result.clone());
    let _ = sender.send(EngineEvent::ScenarioFinished {
        scenario: scenario.name.clone(),
        result,
    });
    runtime
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::static_site::{ElementSpec, PageDefinition};
    use crate::driver::{BrowserDriver, DriverFactory, SiteDefinition, StaticSiteFactory};
    use crate::report::collect_report;
    use crate::scenario::StepKeyword;
    use async_trait::async_trait;
    use std::time::Duration;

    fn site() -> SiteDefinition {
        SiteDefinition::default()
            .with_page("/", PageDefinition::default())
            .with_page(
                "/a",
                PageDefinition::default().with_element(ElementSpec::new("heading", "Page A")),
            )
            .with_page(
                "/b",
                PageDefinition::default().with_element(ElementSpec::new("heading", "Page B")),
            )
    }

    /// 세션 상태 누수를 확인하는 Step을 등록한다.
    fn isolation_registry() -> StepRegistry {
        let mut registry = StepRegistry::new();
        registry
            .given("I remember {word}", |ctx, args| {
                Box::pin(async move {
                    if let Some(previous) = ctx.get_var("REMEMBERED") {
                        anyhow::bail!("다른 시나리오의 값이 보입니다: {previous}");
                    }
                    let value = args.text(0)?.to_string();
                    ctx.set_var("REMEMBERED", value);
                    anyhow::Ok(())
                })
            })
            .unwrap();
        registry
            .when("I open {string}", |ctx, args| {
                Box::pin(async move {
                    let path = args.text(0)?.to_string();
                    // 다른 시나리오와 실행이 겹치도록 잠시 양보한다.
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    ctx.visit(&path).await
                })
            })
            .unwrap();
        registry
            .then("I still remember {word} on {string}", |ctx, args| {
                Box::pin(async move {
                    let expected = args.text(0)?;
                    let path = args.text(1)?;
                    anyhow::ensure!(
                        ctx.get_var("REMEMBERED") == Some(expected),
                        "기억한 값이 다릅니다: {:?}",
                        ctx.get_var("REMEMBERED")
                    );
                    anyhow::ensure!(
                        ctx.driver().current_path().as_deref() == Some(path),
                        "현재 경로가 다릅니다: {:?}",
                        ctx.driver().current_path()
                    );
                    anyhow::Ok(())
                })
            })
            .unwrap();
        registry
    }

    fn isolation_scenario(name: &str, value: &str, path: &str) -> Scenario {
        Scenario::new(name)
            .with_step(StepKeyword::Given, format!("I remember {value}"))
            .with_step(StepKeyword::When, format!("I open \"{path}\""))
            .with_step(
                StepKeyword::Then,
                format!("I still remember {value} on \"{path}\""),
            )
    }

    /// 동시에 실행되는 시나리오끼리 세션 상태를 공유하지 않는다.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_scenarios_do_not_share_sessions() {
        let config = RunnerConfig {
            max_concurrent_scenarios: 4,
            ..RunnerConfig::default()
        };
        let runner = SuiteRunner::new(
            Arc::new(isolation_registry()),
            Arc::new(StaticSiteFactory::new(site())),
            config,
        );
        let scenarios = vec![
            isolation_scenario("first", "alpha", "/a"),
            isolation_scenario("second", "beta", "/b"),
            isolation_scenario("third", "gamma", "/a"),
            isolation_scenario("fourth", "delta", "/b"),
        ];
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();

        let runtimes = runner
            .run(scenarios, tx, CancellationToken::new())
            .await
            .unwrap();

        let names: Vec<&str> = runtimes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third", "fourth"]);
        for runtime in &runtimes {
            assert_eq!(runtime.result, Some(ExecutionResult::Passed), "{}", runtime.name);
        }
    }

    /// 정의되지 않은 Step이 있으면 어떤 시나리오도 실행하지 않는다.
    #[tokio::test]
    async fn configuration_errors_abort_before_execution() {
        let runner = SuiteRunner::new(
            Arc::new(isolation_registry()),
            Arc::new(StaticSiteFactory::new(site())),
            RunnerConfig::default(),
        );
        let scenarios = vec![
            isolation_scenario("valid", "alpha", "/a"),
            Scenario::new("broken").with_step(StepKeyword::Given, "I do something unknown"),
        ];
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let err = runner
            .run(scenarios, tx, CancellationToken::new())
            .await
            .unwrap_err();

        let SuiteError::Configuration(errors) = err;
        assert_eq!(errors.len(), 1);
        assert!(rx.recv().await.is_none(), "실행 이벤트가 없어야 합니다.");
    }

    /// 한 시나리오의 동작 실패는 다른 시나리오에 영향을 주지 않는다.
    #[tokio::test]
    async fn action_failure_is_scoped_to_its_scenario() {
        let runner = SuiteRunner::new(
            Arc::new(isolation_registry()),
            Arc::new(StaticSiteFactory::new(site())),
            RunnerConfig::default(),
        );
        let scenarios = vec![
            isolation_scenario("missing page", "alpha", "/nowhere"),
            isolation_scenario("fine", "beta", "/b"),
        ];
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();

        let runtimes = runner
            .run(scenarios, tx, CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(
            &runtimes[0].result,
            Some(ExecutionResult::Failed { position, .. }) if position.line == 2
        ));
        assert_eq!(runtimes[1].result, Some(ExecutionResult::Passed));
    }

    struct BrokenFactory;

    #[async_trait]
    impl DriverFactory for BrokenFactory {
        async fn open_session(&self) -> anyhow::Result<Box<dyn BrowserDriver>> {
            anyhow::bail!("브라우저를 시작할 수 없습니다.")
        }
    }

    #[tokio::test]
    async fn session_failure_fails_the_scenario() {
        let runner = SuiteRunner::new(
            Arc::new(isolation_registry()),
            Arc::new(BrokenFactory),
            RunnerConfig::default(),
        );
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let runtimes = runner
            .run(
                vec![isolation_scenario("no browser", "alpha", "/a")],
                tx,
                CancellationToken::new(),
            )
            .await
            .unwrap();
        match &runtimes[0].result {
            Some(ExecutionResult::Failed { cause, skipped, .. }) => {
                assert!(cause.contains("브라우저 세션 생성 실패"), "{cause}");
                assert_eq!(*skipped, 3);
            }
            other => panic!("실패해야 합니다: {other:?}"),
        }
    }

    /// 동작이 패닉한 시나리오도 이름과 실패 위치를 가진 결과로 보고된다.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn panicking_scenario_is_reported_with_its_position() {
        let mut registry = isolation_registry();
        registry
            .when("the ice cracks", |_ctx, _args| {
                Box::pin(async {
                    if true {
                        panic!("얼음이 갈라졌습니다");
                    }
                    anyhow::Ok(())
                })
            })
            .unwrap();
        let config = RunnerConfig {
            max_concurrent_scenarios: 2,
            ..RunnerConfig::default()
        };
        let runner = SuiteRunner::new(
            Arc::new(registry),
            Arc::new(StaticSiteFactory::new(site())),
            config,
        );
        let scenarios = vec![
            isolation_scenario("steady", "alpha", "/a"),
            Scenario::new("cracked")
                .with_step(StepKeyword::Given, "I remember beta")
                .with_step(StepKeyword::When, "the ice cracks")
                .with_step(StepKeyword::Then, "I still remember beta on \"/b\""),
        ];
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let collector = tokio::spawn(collect_report(rx));

        let runtimes = runner
            .run(scenarios, tx, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(runtimes[0].result, Some(ExecutionResult::Passed));
        assert_eq!(runtimes[1].name, "cracked");
        match &runtimes[1].result {
            Some(ExecutionResult::Failed {
                phrase,
                position,
                cause,
                skipped,
            }) => {
                assert_eq!(phrase, "the ice cracks");
                assert_eq!(position.line, 2);
                assert!(cause.contains("얼음이 갈라졌습니다"), "{cause}");
                assert_eq!(*skipped, 1);
            }
            other => panic!("실패해야 합니다: {other:?}"),
        }

        let report = collector.await.unwrap();
        assert_eq!(report.scenarios.len(), 2);
        assert_eq!((report.passed(), report.failed()), (1, 1));
        assert!(!report.is_success());
    }
}
