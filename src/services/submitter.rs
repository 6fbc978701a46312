//! 答案提交服务 - 业务能力层
//!
//! 只负责"把答案 POST 给题目网站"能力

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::SubmitError;
use crate::models::{SubmitOutcome, SubmitPayload};
use crate::utils::logging::truncate_text;

/// 提交体超过该大小时告警（题目网站通常限制 1MB）
pub const MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

/// 答案提交服务
#[derive(Clone)]
pub struct Submitter {
    client: reqwest::Client,
}

impl Submitter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// 提交答案
    ///
    /// # 参数
    /// - `submit_url`: 题目说明中的提交地址，None 时直接返回 [`SubmitError::MissingSubmitUrl`]
    /// - `payload`: 请求体
    /// - `timeout`: 请求超时
    pub async fn submit(
        &self,
        submit_url: Option<&str>,
        payload: &SubmitPayload,
        timeout: Duration,
    ) -> Result<SubmitOutcome, SubmitError> {
        let submit_url = submit_url.ok_or(SubmitError::MissingSubmitUrl)?;

        let size = serde_json::to_vec(payload).map(|b| b.len()).unwrap_or(0);
        if size > MAX_PAYLOAD_BYTES {
            warn!("⚠️ 提交体 {} 字节，超过 1MB，可能被拒绝", size);
        }

        info!(
            "📤 提交答案到 {} (类型: {}, {} 字节)",
            submit_url,
            payload.answer.type_name(),
            size
        );

        let response = self
            .client
            .post(submit_url)
            .timeout(timeout)
            .json(payload)
            .send()
            .await
            .map_err(|source| SubmitError::RequestFailed {
                url: submit_url.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| SubmitError::RequestFailed {
                url: submit_url.to_string(),
                source,
            })?;

        if !status.is_success() {
            return Err(SubmitError::Rejected {
                url: submit_url.to_string(),
                status: status.as_u16(),
                body: truncate_text(&body, 500),
            });
        }

        debug!("提交响应: {}", truncate_text(&body, 500));

        // 响应不是预期的 JSON 时视为未判定正确
        let outcome = serde_json::from_str::<SubmitOutcome>(&body).unwrap_or_else(|e| {
            warn!("⚠️ 无法解析提交响应 ({}): {}", e, truncate_text(&body, 200));
            SubmitOutcome::default()
        });

        Ok(outcome)
    }
}
