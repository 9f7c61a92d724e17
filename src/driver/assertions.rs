use super::{BrowserDriver, ElementInfo, RoleQuery};
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// 조건이 충족될 때까지 재시도하는 대기 설정이다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// 최대 대기 시간.
    pub timeout: Duration,
    /// 재조회 간격.
    pub poll_interval: Duration,
}

impl WaitOptions {
    /// 밀리초 단위 값으로 대기 설정을 만든다.
    pub fn from_millis(timeout_ms: u64, poll_interval_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
            poll_interval: Duration::from_millis(poll_interval_ms.max(1)),
        }
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::from_millis(4000, 50)
    }
}

/// 조건에 맞는 요소 하나가 보일 때까지 기다린다.
///
/// # 반환값
/// 제한 시간 안에 정확히 하나의 보이는 요소를 찾으면 그 요소를 반환하고,
/// 그렇지 않으면 마지막 관찰 결과를 담은 시간 초과 오류를 반환한다.
pub async fn expect_visible(
    driver: &dyn BrowserDriver,
    query: &RoleQuery,
    wait: WaitOptions,
) -> anyhow::Result<ElementInfo> {
    let started = Instant::now();
    loop {
        let mut visible: Vec<ElementInfo> = driver
            .find_by_role(query)
            .await?
            .into_iter()
            .filter(|element| element.visible)
            .collect();
        if visible.len() == 1 {
            return Ok(visible.remove(0));
        }
        if started.elapsed() >= wait.timeout {
            if visible.is_empty() {
                anyhow::bail!(
                    "시간 초과({}ms): {query} 조건의 보이는 요소를 찾지 못했습니다.",
                    wait.timeout.as_millis()
                );
            }
            anyhow::bail!(
                "시간 초과({}ms): {query} 조건의 보이는 요소가 {}개 있어 하나로 특정할 수 없습니다.",
                wait.timeout.as_millis(),
                visible.len()
            );
        }
        sleep(wait.poll_interval).await;
    }
}

/// 조건에 맞는 보이는 요소가 사라질 때까지 기다린다.
pub async fn expect_absent(
    driver: &dyn BrowserDriver,
    query: &RoleQuery,
    wait: WaitOptions,
) -> anyhow::Result<()> {
    let started = Instant::now();
    loop {
        let count = driver
            .find_by_role(query)
            .await?
            .iter()
            .filter(|element| element.visible)
            .count();
        if count == 0 {
            return Ok(());
        }
        if started.elapsed() >= wait.timeout {
            anyhow::bail!(
                "시간 초과({}ms): {query} 조건의 요소가 아직 보입니다.",
                wait.timeout.as_millis()
            );
        }
        sleep(wait.poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::NameMatcher;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 지정한 조회 횟수 이후부터 요소를 돌려주는 목업 드라이버이다.
    struct EventuallyVisible {
        /// 요소가 나타나기 전까지의 조회 횟수.
        appear_after: usize,
        /// 지금까지의 조회 횟수.
        calls: AtomicUsize,
    }

    #[async_trait]
    impl BrowserDriver for EventuallyVisible {
        async fn visit(&mut self, _path: &str) -> anyhow::Result<()> {
            Ok(())
        }

        async fn find_by_role(&self, _query: &RoleQuery) -> anyhow::Result<Vec<ElementInfo>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.appear_after {
                return Ok(Vec::new());
            }
            Ok(vec![ElementInfo {
                role: "heading".into(),
                name: "Welcome".into(),
                visible: true,
            }])
        }

        fn current_path(&self) -> Option<String> {
            Some("/".into())
        }
    }

    fn heading() -> RoleQuery {
        RoleQuery::new("heading").named(NameMatcher::parse("/welcome/i").unwrap())
    }

    /// 요소가 늦게 나타나도 제한 시간 안이면 성공한다.
    #[tokio::test]
    async fn expect_visible_polls_until_element_appears() {
        let driver = EventuallyVisible {
            appear_after: 3,
            calls: AtomicUsize::new(0),
        };
        let element = expect_visible(&driver, &heading(), WaitOptions::from_millis(1000, 5))
            .await
            .expect("요소를 찾아야 합니다.");
        assert_eq!(element.name, "Welcome");
        assert!(driver.calls.load(Ordering::SeqCst) >= 4);
    }

    /// 제한 시간을 넘기면 시간 초과 메시지로 실패한다.
    #[tokio::test]
    async fn expect_visible_times_out_with_message() {
        let driver = EventuallyVisible {
            appear_after: usize::MAX,
            calls: AtomicUsize::new(0),
        };
        let err = expect_visible(&driver, &heading(), WaitOptions::from_millis(30, 5))
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("시간 초과(30ms)"), "{message}");
        assert!(message.contains("role=heading"), "{message}");
    }

    #[tokio::test]
    async fn expect_absent_fails_while_element_is_visible() {
        let driver = EventuallyVisible {
            appear_after: 0,
            calls: AtomicUsize::new(0),
        };
        assert!(
            expect_absent(&driver, &heading(), WaitOptions::from_millis(20, 5))
                .await
                .is_err()
        );
    }
}
