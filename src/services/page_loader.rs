//! 页面加载服务 - 业务能力层
//!
//! 只负责"把页面渲染成文本"能力，不关心题目

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::browser::launch_headless_browser;
use crate::config::Config;
use crate::error::BrowserError;
use crate::infrastructure::JsExecutor;
use crate::models::RenderedPage;
use crate::utils::logging::truncate_text;

/// 页面加载能力
#[async_trait]
pub trait PageLoader: Send + Sync {
    /// 加载并渲染页面，整个过程不超过 `timeout`
    async fn load(&self, url: &str, timeout: Duration) -> Result<RenderedPage, BrowserError>;
}

/// 提取页面内容的脚本
///
/// 链接用 `a.href` 取，浏览器已解析为绝对地址。
const EXTRACT_SCRIPT: &str = r#"
(() => {
    const links = Array.from(document.querySelectorAll('a[href]'))
        .map(a => a.href)
        .filter(h => h && !h.startsWith('javascript:') && !h.startsWith('mailto:'));
    return {
        url: window.location.href,
        title: document.title || '',
        text: document.body ? document.body.innerText : '',
        html: document.documentElement ? document.documentElement.outerHTML : '',
        links: Array.from(new Set(links)),
    };
})()
"#;

#[derive(Debug, Deserialize)]
struct ExtractResult {
    url: String,
    title: String,
    text: String,
    html: String,
    links: Vec<String>,
}

/// 基于无头 Chromium 的页面加载器
///
/// 每次加载启动独立的浏览器进程，任务之间不共享页面状态。
pub struct BrowserPageLoader {
    chrome_executable: Option<PathBuf>,
    render_settle: Duration,
}

impl BrowserPageLoader {
    pub fn new(config: &Config) -> Self {
        Self {
            chrome_executable: config.chrome_executable.clone(),
            render_settle: config.render_settle,
        }
    }

    pub fn shared(config: &Config) -> Arc<dyn PageLoader> {
        Arc::new(Self::new(config))
    }

    async fn render(&self, url: &str, budget: Duration) -> Result<RenderedPage, BrowserError> {
        let session = launch_headless_browser(self.chrome_executable.as_deref(), budget).await?;

        let result = async {
            let page = session
                .browser
                .new_page("about:blank")
                .await
                .map_err(|source| BrowserError::NavigationFailed {
                    url: url.to_string(),
                    source,
                })?;
            let executor = JsExecutor::new(page);

            executor.goto(url).await?;
            if !executor.wait_until_ready(budget).await? {
                warn!("页面未在时限内就绪，继续提取已渲染内容: {}", url);
            }

            // 等待前端渲染
            sleep(self.render_settle).await;

            let extracted: ExtractResult = executor.eval_as(EXTRACT_SCRIPT).await?;
            let final_url = executor.current_url().await.unwrap_or(extracted.url);

            Ok::<_, BrowserError>(RenderedPage {
                url: final_url,
                title: extracted.title,
                text: extracted.text,
                html: extracted.html,
                links: extracted.links,
            })
        }
        .await;

        session.close().await;
        result
    }
}

#[async_trait]
impl PageLoader for BrowserPageLoader {
    async fn load(&self, url: &str, budget: Duration) -> Result<RenderedPage, BrowserError> {
        info!("🌐 加载页面: {}", url);

        let page = timeout(budget, self.render(url, budget))
            .await
            .map_err(|_| BrowserError::Timeout {
                url: url.to_string(),
                timeout_secs: budget.as_secs(),
            })??;

        info!(
            "✓ 页面加载完成: {} ({} 字符, {} 个链接)",
            page.url,
            page.text.chars().count(),
            page.links.len()
        );
        debug!("页面文本: {}", truncate_text(&page.text, 200));

        Ok(page)
    }
}
