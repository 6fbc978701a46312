use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use url::Url;

use crate::api::auth::secrets_match;
use crate::api::error::GatewayError;
use crate::api::state::AppState;
use crate::services::AttemptStats;
use crate::workflow::Job;

/// 解题请求体
#[derive(Debug, Deserialize)]
pub struct SolveRequest {
    pub email: String,
    pub secret: String,
    pub url: String,
}

/// POST /api/v1/quiz/solve（以及 POST /quiz）
///
/// 校验密钥后立即返回，解题在后台进行。
pub async fn handle_solve(
    State(state): State<AppState>,
    payload: Result<Json<SolveRequest>, JsonRejection>,
) -> Result<Json<Value>, GatewayError> {
    let Json(request) = payload.map_err(|e| {
        warn!("无效请求: {}", e.body_text());
        GatewayError::BadRequest(e.body_text())
    })?;

    if !secrets_match(&request.secret, &state.config.student_secret) {
        warn!("🚫 密钥错误，拒绝请求 (email: {})", request.email);
        return Err(GatewayError::InvalidSecret);
    }

    if request.email != state.config.student_email {
        warn!(
            "⚠️ 请求邮箱 {} 与配置邮箱 {} 不一致，继续处理",
            request.email, state.config.student_email
        );
    }

    match Url::parse(&request.url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => {
            return Err(GatewayError::BadRequest(format!(
                "Invalid quiz url: {}",
                request.url
            )))
        }
    }

    let job = Job::new(
        &request.url,
        &request.email,
        &request.secret,
        state.config.max_quiz_time,
    );
    info!("✓ 接受解题请求 {}: {}", job, request.url);

    state.dispatcher.dispatch(job)?;

    Ok(Json(json!({
        "status": "accepted",
        "message": "Quiz solving started",
        "url": request.url,
    })))
}

/// GET /api/v1/quiz/health（以及 GET /）
pub async fn handle_health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "running",
        "message": "LLM Analysis Quiz API",
        "email": state.config.student_email,
        "llm_provider": state.config.llm_provider_label(),
    }))
}

/// GET /api/v1/quiz/stats
///
/// 未启用答题记录时返回全 0。
pub async fn handle_stats(State(state): State<AppState>) -> Result<Json<AttemptStats>, GatewayError> {
    let stats = match &state.attempt_log {
        Some(log) => log.statistics().await?,
        None => AttemptStats::default(),
    };
    Ok(Json(stats))
}
