//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"导航 / 执行 JS"的能力

use std::time::Duration;

use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::BrowserError;

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 goto() / eval() 能力
/// - 不认识 Quiz / Answer
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 导航到指定地址（等待 load 事件）
    pub async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.page
            .goto(url)
            .await
            .map_err(|source| BrowserError::NavigationFailed {
                url: url.to_string(),
                source,
            })?;
        Ok(())
    }

    /// 当前页面地址（跟随跳转之后）
    pub async fn current_url(&self) -> Option<String> {
        self.page.url().await.ok().flatten()
    }

    /// 轮询 `document.readyState` 直到 complete 或超过 `max_wait`
    ///
    /// 返回是否在时限内完成。
    pub async fn wait_until_ready(&self, max_wait: Duration) -> Result<bool, BrowserError> {
        let started = Instant::now();
        loop {
            let state: String = self.eval_as("document.readyState").await?;
            if state == "complete" {
                debug!("页面就绪，用时 {:?}", started.elapsed());
                return Ok(true);
            }
            if started.elapsed() >= max_wait {
                return Ok(false);
            }
            sleep(Duration::from_millis(100)).await;
        }
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue, BrowserError> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(
        &self,
        js_code: impl Into<String>,
    ) -> Result<T, BrowserError> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }
}
