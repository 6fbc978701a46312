//! 任务上下文
//!
//! 封装"谁让我解哪道题、还剩多少时间"这一信息

use std::fmt::{self, Display};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::AppError;

/// 一个已通过校验的解题任务
///
/// 由网关创建，后台任务结束后丢弃。
#[derive(Clone)]
pub struct Job {
    pub id: Uuid,
    /// 起始题目地址
    pub url: String,
    pub email: String,
    pub secret: String,
    pub received_at: Instant,
    pub received_at_utc: DateTime<Utc>,
    pub deadline: Instant,
}

impl Job {
    /// 创建新任务，截止时间 = 收到请求的时刻 + `budget`
    pub fn new(
        url: impl Into<String>,
        email: impl Into<String>,
        secret: impl Into<String>,
        budget: Duration,
    ) -> Self {
        let received_at = Instant::now();
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            email: email.into(),
            secret: secret.into(),
            received_at,
            received_at_utc: Utc::now(),
            deadline: received_at + budget,
        }
    }

    /// 距截止时间的剩余时间，过期后为 0
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn elapsed(&self) -> Duration {
        self.received_at.elapsed()
    }

    /// 剩余时间不少于 `required` 时返回 Ok
    pub fn ensure_remaining(&self, required: Duration) -> Result<(), AppError> {
        let remaining = self.remaining();
        if remaining < required {
            return Err(AppError::DeadlineExceeded {
                remaining_secs: remaining.as_secs_f64(),
                required_secs: required.as_secs(),
            });
        }
        Ok(())
    }

    /// 把单步超时限制在剩余时间之内
    pub fn bounded(&self, step_timeout: Duration) -> Duration {
        step_timeout.min(self.remaining())
    }

    fn short_id(&self) -> String {
        self.id.simple().to_string().chars().take(8).collect()
    }
}

impl Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[任务 #{} 剩余 {:.1}s]",
            self.short_id(),
            self.remaining().as_secs_f64()
        )
    }
}

// 不输出密钥
impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("email", &self.email)
            .field("received_at_utc", &self.received_at_utc)
            .field("remaining", &self.remaining())
            .finish_non_exhaustive()
    }
}
