//! # Quiz Solver
//!
//! 接收题目地址，渲染页面、解析附件、调用 LLM 求解并提交答案的 Rust 服务
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `browser/` - 启动 / 关闭无头浏览器
//! - `infrastructure/` - `JsExecutor`，唯一的 page owner，提供 goto() / eval() 能力
//!
//! ### ② 业务能力层（Services / Assets）
//! - `PageLoader` - 页面渲染能力
//! - `assets/` - 附件下载、格式识别、内容提取
//! - `ChatModel` / `LlmService` - LLM 调用能力（AI Pipe → OpenAI）
//! - `Submitter` - 答案提交能力
//! - `AttemptLog` - 答题记录能力
//!
//! ### ③ 流程层（Workflow）
//! - `Job` - 任务上下文（地址 + 身份 + 截止时间）
//! - `QuizFlow` - 单道题 / 题目链流程
//!
//! ### ④ 编排层（Orchestration）
//! - `JobDispatcher` - 后台执行任务，受时间预算约束
//!
//! ### ⑤ 网关（API）
//! - `api/` - axum 路由：校验密钥、立即确认、分发任务

pub mod api;
pub mod assets;
pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use api::{build_router, AppState};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::JsExecutor;
pub use orchestrator::{JobDispatcher, JobSink};
pub use services::{BrowserPageLoader, ChatModel, LlmService, PageLoader};
pub use workflow::{Job, QuizFlow};
