//! 编排层（Orchestration Layer）
//!
//! ## 层次关系
//!
//! ```text
//! api (校验请求，创建 Job)
//!     ↓
//! orchestrator::JobDispatcher (后台执行，受时间预算约束)
//!     ↓
//! workflow::QuizFlow (处理题目链 / 单道题)
//!     ↓
//! services (能力层：页面 / LLM / 提交 / 记录)
//!     ↓
//! infrastructure (基础设施：JsExecutor)
//! ```

pub mod dispatcher;

pub use dispatcher::{JobDispatcher, JobSink};
