//! 任务分发器 - 编排层
//!
//! 网关确认请求后把任务交到这里，后台执行，结果只写日志。

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::time::timeout;
use tracing::{error, info};

use crate::workflow::{Job, QuizFlow};

/// 接收已通过校验的任务
///
/// 返回 Ok 只表示任务已交出，不代表处理成功。
pub trait JobSink: Send + Sync {
    fn dispatch(&self, job: Job) -> Result<()>;
}

/// 每个任务一个 tokio 任务，整条题目链受任务截止时间约束
pub struct JobDispatcher {
    flow: Arc<QuizFlow>,
}

impl JobDispatcher {
    pub fn new(flow: Arc<QuizFlow>) -> Self {
        Self { flow }
    }
}

impl JobSink for JobDispatcher {
    fn dispatch(&self, job: Job) -> Result<()> {
        let handle = tokio::runtime::Handle::try_current().context("当前没有可用的 tokio 运行时")?;
        let flow = self.flow.clone();

        info!("{} 📥 任务已分发: {}", job, job.url);

        handle.spawn(async move {
            let budget = job.remaining();
            match timeout(budget, flow.run_chain(&job)).await {
                Ok(report) => info!(
                    "{} ✓ 任务结束: {} 题, 正确 {}",
                    job,
                    report.results.len(),
                    report.correct()
                ),
                Err(_) => error!(
                    "{} ❌ 任务超出时间预算 {:.0}s，已中止",
                    job,
                    budget.as_secs_f64()
                ),
            }
        });

        Ok(())
    }
}
