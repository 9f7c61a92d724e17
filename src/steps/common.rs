use crate::driver::static_site::normalize_path;
use crate::driver::{NameMatcher, RoleQuery};
use crate::engine::SessionContext;
use crate::error::StepError;
use crate::pattern::StepArgs;
use crate::registry::StepRegistry;

/// 여러 페이지에서 재사용하는 탐색·검증 Step을 등록한다.
///
/// 이름 인자에 `/pattern/i` 형식을 쓰면 정규식으로 비교한다.
pub fn register(registry: &mut StepRegistry) -> Result<(), StepError> {
    registry
        .given("I visit {string}", |ctx, args| Box::pin(visit(ctx, args)))?
        .then("I see a {word} named {string}", |ctx, args| {
            Box::pin(see_element(ctx, args))
        })?
        .then("I do not see a {word} named {string}", |ctx, args| {
            Box::pin(not_see_element(ctx, args))
        })?
        .then("I am on {string}", |ctx, args| Box::pin(assert_path(ctx, args)))?
        .when("I remember the current path as {word}", |ctx, args| {
            Box::pin(remember_path(ctx, args))
        })?;
    Ok(())
}

async fn visit(ctx: &mut SessionContext, args: StepArgs) -> anyhow::Result<()> {
    ctx.visit(args.text(0)?).await
}

fn role_query(args: &StepArgs) -> anyhow::Result<RoleQuery> {
    Ok(RoleQuery::new(args.text(0)?).named(NameMatcher::parse(args.text(1)?)?))
}

async fn see_element(ctx: &mut SessionContext, args: StepArgs) -> anyhow::Result<()> {
    let query = role_query(&args)?;
    let element = ctx.expect_visible(&query).await?;
    ctx.log(format!("found {} {:?}", element.role, element.name));
    Ok(())
}

async fn not_see_element(ctx: &mut SessionContext, args: StepArgs) -> anyhow::Result<()> {
    let query = role_query(&args)?;
    ctx.expect_absent(&query).await
}

/// 현재 경로가 기대 경로와 같은지 확인한다. `${VAR}` 치환을 지원한다.
async fn assert_path(ctx: &mut SessionContext, args: StepArgs) -> anyhow::Result<()> {
    let expected = normalize_path(&ctx.expand_placeholders(args.text(0)?)?);
    let actual = ctx.driver().current_path();
    anyhow::ensure!(
        actual.as_deref() == Some(expected.as_str()),
        "현재 경로가 {expected}이어야 하지만 {}입니다.",
        actual.as_deref().unwrap_or("(방문 전)")
    );
    Ok(())
}

async fn remember_path(ctx: &mut SessionContext, args: StepArgs) -> anyhow::Result<()> {
    let name = args.text(0)?.to_string();
    let path = ctx
        .driver()
        .current_path()
        .ok_or_else(|| anyhow::anyhow!("아직 페이지를 방문하지 않았습니다."))?;
    ctx.set_var(name, path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::static_site::{ElementSpec, PageDefinition};
    use crate::driver::{SiteDefinition, StaticSiteDriver, WaitOptions};
    use crate::engine::{ExecutionResult, run_scenario};
    use crate::scenario::{Scenario, StepKeyword};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn site() -> SiteDefinition {
        SiteDefinition::default()
            .with_page(
                "/",
                PageDefinition::default()
                    .with_element(ElementSpec::new("heading", "Rinks"))
                    .with_element(ElementSpec::new("button", "Log out").hidden()),
            )
            .with_page(
                "/login",
                PageDefinition::default().with_element(ElementSpec::new("button", "Log in")),
            )
    }

    async fn run(scenario: Scenario) -> ExecutionResult {
        let mut registry = StepRegistry::new();
        register(&mut registry).unwrap();
        let mut ctx = SessionContext::new(
            &scenario.name,
            Box::new(StaticSiteDriver::new(Arc::new(site()))),
            WaitOptions::from_millis(30, 5),
        );
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        run_scenario(&scenario, &registry, &mut ctx, None, &tx, &CancellationToken::new())
            .await
            .result
            .unwrap()
    }

    /// 공용 Step으로 방문, 요소 확인, 경로 확인, 경로 기억을 조합한다.
    #[tokio::test]
    async fn common_steps_drive_a_static_site() {
        let scenario = Scenario::new("common")
            .with_step(StepKeyword::Given, "I visit \"/\"")
            .with_step(StepKeyword::Then, "I see a heading named \"Rinks\"")
            .with_step(StepKeyword::Then, "I do not see a button named \"Log out\"")
            .with_step(StepKeyword::When, "I remember the current path as ROOT_PATH")
            .with_step(StepKeyword::Given, "I visit \"/login\"")
            .with_step(StepKeyword::Then, "I see a button named \"/log in/i\"")
            .with_step(StepKeyword::Given, "I visit \"${ROOT_PATH}\"")
            .with_step(StepKeyword::Then, "I am on \"/\"");
        assert_eq!(run(scenario).await, ExecutionResult::Passed);
    }

    #[tokio::test]
    async fn wrong_path_reports_expected_and_actual() {
        let scenario = Scenario::new("path")
            .with_step(StepKeyword::Given, "I visit \"/login\"")
            .with_step(StepKeyword::Then, "I am on \"/\"");
        match run(scenario).await {
            ExecutionResult::Failed { cause, position, .. } => {
                assert_eq!(position.line, 2);
                assert!(cause.contains("/login"), "{cause}");
            }
            other => panic!("실패해야 합니다: {other:?}"),
        }
    }
}
