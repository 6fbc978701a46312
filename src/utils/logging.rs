//! 日志工具模块
//!
//! 提供日志初始化和输出的辅助函数

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// 初始化全局日志
///
/// `RUST_LOG` 已设置时优先使用，否则使用 `default_level`。
/// 重复调用（如测试中）不会报错。
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{}={},tower_http={}",
            env!("CARGO_CRATE_NAME"),
            default_level,
            default_level
        ))
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - LLM 解题服务 v{}", env!("CARGO_PKG_VERSION"));
    info!("📧 学生邮箱: {}", config.student_email);
    info!("🤖 LLM 提供方: {} (模型: {})", config.llm_provider_label(), config.llm_model);
    info!(
        "⏱️ 时间预算: {}s, 最多 {} 题",
        config.max_quiz_time.as_secs(),
        config.max_chain_length
    );
    match &config.attempt_log_file {
        Some(path) => info!("📝 答题记录: {}", path.display()),
        None => info!("📝 答题记录: 未启用"),
    }
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
