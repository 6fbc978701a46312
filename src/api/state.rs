use std::sync::Arc;

use crate::config::Config;
use crate::orchestrator::JobSink;
use crate::services::AttemptLog;

/// 所有请求处理器共享的状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// 接收已通过校验的任务；测试中可替换
    pub dispatcher: Arc<dyn JobSink>,
    pub attempt_log: Option<AttemptLog>,
}
