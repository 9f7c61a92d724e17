use crate::driver::{NameMatcher, RoleQuery};
use crate::engine::SessionContext;
use crate::error::StepError;
use crate::pattern::StepArgs;
use crate::registry::StepRegistry;

/// 홈페이지 시나리오용 Step을 등록한다.
pub fn register(registry: &mut StepRegistry) -> Result<(), StepError> {
    registry
        .given("I am on the root page", |ctx, args| {
            Box::pin(navigate_to_root(ctx, args))
        })?
        .when("I am welcomed", |ctx, args| Box::pin(assert_welcomed(ctx, args)))?;
    Ok(())
}

/// 루트 URL로 이동한다.
async fn navigate_to_root(ctx: &mut SessionContext, _args: StepArgs) -> anyhow::Result<()> {
    ctx.visit("").await
}

/// 사용자를 환영하는 제목이 보이는지 확인한다.
async fn assert_welcomed(ctx: &mut SessionContext, _args: StepArgs) -> anyhow::Result<()> {
    let query = RoleQuery::new("heading").named(NameMatcher::parse("/welcome/i")?);
    ctx.expect_visible(&query).await?;
    Ok(())
}
