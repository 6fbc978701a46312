//! HTTP 网关
//!
//! 校验请求 → 创建任务 → 立即确认；解题在后台完成。

pub mod auth;
pub mod error;
pub mod handlers;
pub mod state;

use std::any::Any;

use axum::{
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;

pub use error::GatewayError;
pub use state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::handle_health))
        .route("/quiz", post(handlers::handle_solve))
        .route("/api/v1/quiz/solve", post(handlers::handle_solve))
        .route("/api/v1/quiz/health", get(handlers::handle_health))
        .route("/api/v1/quiz/stats", get(handlers::handle_stats))
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

// 处理器 panic 时返回 500 JSON
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    GatewayError::Internal(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}
