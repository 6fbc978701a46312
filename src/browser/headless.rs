use std::path::Path;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::BrowserError;

/// 一次性的无头浏览器会话
///
/// 每次加载页面启动一个，用完调用 [`HeadlessSession::close`]。
pub struct HeadlessSession {
    pub browser: Browser,
    handler: JoinHandle<()>,
}

/// 启动无头浏览器
///
/// # 参数
/// - `chrome_executable`: 指定浏览器路径，None 时由 chromiumoxide 自动查找
/// - `request_timeout`: CDP 请求超时
pub async fn launch_headless_browser(
    chrome_executable: Option<&Path>,
    request_timeout: Duration,
) -> Result<HeadlessSession, BrowserError> {
    info!("🚀 启动无头浏览器...");

    // 配置无头浏览器
    let mut builder = BrowserConfig::builder()
        .new_headless_mode()
        .request_timeout(request_timeout)
        .args(vec![
            "--disable-gpu",
            "--no-sandbox",              // 容器内没有沙盒权限
            "--disable-dev-shm-usage",   // 防止共享内存不足
            "--disable-extensions",
            "--user-agent=Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36",
        ]);

    if let Some(path) = chrome_executable {
        debug!("使用指定浏览器: {}", path.display());
        builder = builder.chrome_executable(path);
    }

    let config = builder.build().map_err(|e| {
        error!("配置无头浏览器失败: {}", e);
        BrowserError::ConfigurationFailed(e)
    })?;

    // 启动浏览器
    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动无头浏览器失败: {}", e);
        BrowserError::LaunchFailed { source: e }
    })?;
    debug!("无头浏览器启动成功");

    // 在后台处理浏览器事件
    let handler = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    Ok(HeadlessSession { browser, handler })
}

impl HeadlessSession {
    /// 关闭浏览器并回收事件任务
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("关闭浏览器失败: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("等待浏览器进程退出失败: {}", e);
        }
        self.handler.abort();
    }
}
