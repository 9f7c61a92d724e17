use crate::engine::SessionContext;
use crate::error::StepError;
use crate::pattern::{StepArgs, StepPattern};
use crate::scenario::{ScenarioStep, StepKeyword};
use futures::future::BoxFuture;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Step 동작이 돌려주는 Future 타입이다.
pub type StepFuture<'a> = BoxFuture<'a, anyhow::Result<()>>;

/// 세션 컨텍스트와 추출 값을 받아 브라우저 동작이나 검증을 수행하는 함수이다.
pub type StepAction =
    Arc<dyn for<'a> Fn(&'a mut SessionContext, StepArgs) -> StepFuture<'a> + Send + Sync>;

/// 레지스트리 동작 옵션이다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryOptions {
    /// 참이면 Step 키워드와 같은 키워드(또는 범용 Step)로 등록된 바인딩만 찾는다.
    pub strict_keywords: bool,
}

/// 패턴과 동작을 묶은 등록 단위이다.
#[derive(Clone)]
pub struct StepBinding {
    keyword: StepKeyword,
    pattern: StepPattern,
    action: StepAction,
    /// `register`를 호출한 소스 위치.
    location: &'static Location<'static>,
}

impl StepBinding {
    pub fn keyword(&self) -> StepKeyword {
        self.keyword
    }

    pub fn pattern(&self) -> &StepPattern {
        &self.pattern
    }

    /// 바인딩이 등록된 소스 위치를 반환한다.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// 동작을 호출한다.
    pub fn invoke<'a>(&self, ctx: &'a mut SessionContext, args: StepArgs) -> StepFuture<'a> {
        (self.action)(ctx, args)
    }

    fn accepts(&self, keyword: StepKeyword, strict: bool) -> bool {
        !strict
            || self.keyword == StepKeyword::Step
            || keyword == StepKeyword::Step
            || self.keyword == keyword
    }
}

impl fmt::Debug for StepBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepBinding")
            .field("keyword", &self.keyword)
            .field("pattern", &self.pattern.as_str())
            .field("location", &self.location.to_string())
            .finish()
    }
}

impl fmt::Display for StepBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.keyword, self.pattern)
    }
}

/// 해석된 Step. 바인딩과 추출 값을 함께 담는다.
#[derive(Debug)]
pub struct ResolvedStep<'r> {
    pub binding: &'r StepBinding,
    pub args: StepArgs,
}

/// StepRegistry는 문장 패턴과 동작의 바인딩을 소유하고 Step을 정확히 하나의 바인딩으로 해석한다.
///
/// 모든 등록은 실행 전에 끝나야 하며, 이후에는 `Arc`로 감싸 읽기 전용으로 공유한다.
#[derive(Debug, Default)]
pub struct StepRegistry {
    bindings: Vec<StepBinding>,
    options: RegistryOptions,
}

impl StepRegistry {
    /// 기본 옵션으로 빈 레지스트리를 만든다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 옵션을 지정해 빈 레지스트리를 만든다.
    pub fn with_options(options: RegistryOptions) -> Self {
        Self {
            bindings: Vec::new(),
            options,
        }
    }

    pub fn options(&self) -> RegistryOptions {
        self.options
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// 등록 순서대로 바인딩을 순회한다.
    pub fn bindings(&self) -> impl Iterator<Item = &StepBinding> {
        self.bindings.iter()
    }

    /// 패턴과 동작을 등록한다.
    ///
    /// # 반환값
    /// 같은 키워드에 동등한 패턴이 있으면 `DuplicatePattern`, 패턴 문법이 잘못되면
    /// `InvalidPattern`을 반환한다.
    #[track_caller]
    pub fn register<F>(
        &mut self,
        keyword: StepKeyword,
        pattern: &str,
        action: F,
    ) -> Result<&mut Self, StepError>
    where
        F: for<'a> Fn(&'a mut SessionContext, StepArgs) -> StepFuture<'a> + Send + Sync + 'static,
    {
        let location = Location::caller();
        let pattern = StepPattern::parse(pattern)?;
        if self
            .bindings
            .iter()
            .any(|b| b.keyword == keyword && b.pattern.is_equivalent(&pattern))
        {
            return Err(StepError::DuplicatePattern {
                keyword,
                pattern: pattern.as_str().to_string(),
            });
        }
        tracing::debug!(%keyword, pattern = pattern.as_str(), %location, "Step 바인딩 등록");
        self.bindings.push(StepBinding {
            keyword,
            pattern,
            action: Arc::new(action),
            location,
        });
        Ok(self)
    }

    #[track_caller]
    pub fn given<F>(&mut self, pattern: &str, action: F) -> Result<&mut Self, StepError>
    where
        F: for<'a> Fn(&'a mut SessionContext, StepArgs) -> StepFuture<'a> + Send + Sync + 'static,
    {
        self.register(StepKeyword::Given, pattern, action)
    }

    #[track_caller]
    pub fn when<F>(&mut self, pattern: &str, action: F) -> Result<&mut Self, StepError>
    where
        F: for<'a> Fn(&'a mut SessionContext, StepArgs) -> StepFuture<'a> + Send + Sync + 'static,
    {
        self.register(StepKeyword::When, pattern, action)
    }

    #[track_caller]
    pub fn then<F>(&mut self, pattern: &str, action: F) -> Result<&mut Self, StepError>
    where
        F: for<'a> Fn(&'a mut SessionContext, StepArgs) -> StepFuture<'a> + Send + Sync + 'static,
    {
        self.register(StepKeyword::Then, pattern, action)
    }

    /// 키워드와 무관한 범용 Step을 등록한다.
    #[track_caller]
    pub fn step<F>(&mut self, pattern: &str, action: F) -> Result<&mut Self, StepError>
    where
        F: for<'a> Fn(&'a mut SessionContext, StepArgs) -> StepFuture<'a> + Send + Sync + 'static,
    {
        self.register(StepKeyword::Step, pattern, action)
    }

    /// Step 문장을 정확히 하나의 바인딩으로 해석한다.
    ///
    /// # 반환값
    /// 매칭되는 바인딩이 없으면 `UndefinedStep`, 둘 이상이면 등록 순서대로 패턴을 나열한
    /// `AmbiguousStep`을 반환한다. 우선순위로 하나를 고르지 않는다.
    pub fn resolve(&self, step: &ScenarioStep) -> Result<ResolvedStep<'_>, StepError> {
        let mut matched: Vec<ResolvedStep<'_>> = self
            .bindings
            .iter()
            .filter(|binding| binding.accepts(step.keyword, self.options.strict_keywords))
            .filter_map(|binding| {
                binding
                    .pattern
                    .matches(&step.phrase)
                    .map(|args| ResolvedStep { binding, args })
            })
            .collect();
        match matched.len() {
            0 => Err(StepError::UndefinedStep {
                phrase: step.phrase.clone(),
                position: step.position.clone(),
            }),
            1 => Ok(matched.remove(0)),
            _ => Err(StepError::AmbiguousStep {
                phrase: step.phrase.clone(),
                position: step.position.clone(),
                patterns: matched.iter().map(|m| m.binding.to_string()).collect(),
            }),
        }
    }

    /// 실행 없이 모든 Step을 해석해 보고 구성 오류를 모은다.
    pub fn check<'s>(&self, steps: impl IntoIterator<Item = &'s ScenarioStep>) -> Vec<StepError> {
        steps
            .into_iter()
            .filter_map(|step| self.resolve(step).err())
            .collect()
    }
}
