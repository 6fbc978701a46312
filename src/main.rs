use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use quiz_solver::utils::logging;
use quiz_solver::{
    build_router, AppState, BrowserPageLoader, Config, JobDispatcher, LlmService, QuizFlow,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置，缺少必需变量时拒绝启动
    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            logging::init("info");
            error!("❌ 配置错误，程序退出: {}", e);
            std::process::exit(1);
        }
    };

    // 初始化日志
    logging::init(&config.rust_log);
    logging::log_startup(&config);

    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("创建 HTTP 客户端失败")?;

    let flow = Arc::new(QuizFlow::new(
        config.clone(),
        BrowserPageLoader::shared(&config),
        LlmService::shared(&config),
        http_client,
    ));

    let state = AppState {
        config: config.clone(),
        attempt_log: flow.attempt_log().cloned(),
        dispatcher: Arc::new(JobDispatcher::new(flow)),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("🌐 监听 {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
