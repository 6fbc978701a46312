//! 程序配置
//!
//! 进程启动时从环境变量加载一次，之后以 `Arc<Config>` 只读共享。

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// AI Pipe 默认接入点（OpenAI 兼容）
pub const DEFAULT_AIPIPE_BASE_URL: &str = "https://aipipe.org/openrouter/v1";
/// OpenAI 默认接入点
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- 身份 ---
    /// 学生邮箱（提交答案时使用）
    pub student_email: String,
    /// 共享密钥（校验请求 + 提交答案）
    pub student_secret: String,

    // --- LLM 配置 ---
    /// AI Pipe token（首选提供方）
    pub aipipe_token: Option<String>,
    pub aipipe_base_url: String,
    /// OpenAI key（备用提供方）
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    /// 模型名称，AI Pipe 格式（如 `openai/gpt-4o-mini`）
    pub llm_model: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,

    // --- 服务 ---
    /// 监听端口
    pub port: u16,
    /// 日志级别（RUST_LOG 未设置时使用）
    pub rust_log: String,

    // --- 时间预算 ---
    /// 单个任务（含整条题目链）的总时间预算
    pub max_quiz_time: Duration,
    pub page_load_timeout: Duration,
    /// 页面 load 完成后等待前端渲染的时间
    pub render_settle: Duration,
    pub http_timeout: Duration,
    pub llm_timeout: Duration,

    // --- 处理上限 ---
    pub max_chain_length: usize,
    /// 每道题最多处理的附件数量
    pub max_assets: usize,
    pub max_asset_bytes: usize,
    /// 单个附件写入提示词的最大字符数
    pub max_asset_chars: usize,
    /// 页面文本写入提示词的最大字符数
    pub max_page_chars: usize,

    // --- 浏览器 ---
    pub chrome_executable: Option<PathBuf>,

    /// 答题记录文件（JSON Lines），None 表示不记录
    pub attempt_log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            student_email: String::new(),
            student_secret: String::new(),
            aipipe_token: None,
            aipipe_base_url: DEFAULT_AIPIPE_BASE_URL.to_string(),
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            llm_model: "openai/gpt-4o-mini".to_string(),
            llm_temperature: 0.1,
            llm_max_tokens: 4096,
            port: 5000,
            rust_log: "info".to_string(),
            max_quiz_time: Duration::from_secs(180),
            page_load_timeout: Duration::from_secs(30),
            render_settle: Duration::from_millis(2000),
            http_timeout: Duration::from_secs(30),
            llm_timeout: Duration::from_secs(60),
            max_chain_length: 20,
            max_assets: 5,
            max_asset_bytes: 20 * 1024 * 1024,
            max_asset_chars: 5000,
            max_page_chars: 8000,
            chrome_executable: None,
            attempt_log_file: Some(PathBuf::from("logs/quiz_attempts.jsonl")),
        }
    }
}

impl Config {
    /// 从环境变量加载配置（会先读取 `.env`）
    ///
    /// 缺少必需变量或数值无法解析时返回错误，调用方应拒绝启动。
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 使用任意查找函数构建配置，便于测试
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let require = |key: &str| {
            get(key).ok_or_else(|| ConfigError::EnvVarNotFound {
                var_name: key.to_string(),
            })
        };

        let config = Self {
            student_email: require("STUDENT_EMAIL")?,
            student_secret: require("STUDENT_SECRET")?,
            aipipe_token: get("AIPIPE_TOKEN"),
            aipipe_base_url: get("AIPIPE_BASE_URL").unwrap_or(default.aipipe_base_url),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or(default.openai_base_url),
            llm_model: get("LLM_MODEL").unwrap_or(default.llm_model),
            llm_temperature: parse_or(&get, "LLM_TEMPERATURE", default.llm_temperature)?,
            llm_max_tokens: parse_or(&get, "LLM_MAX_TOKENS", default.llm_max_tokens)?,
            port: parse_or(&get, "PORT", default.port)?,
            rust_log: get("RUST_LOG").unwrap_or(default.rust_log),
            max_quiz_time: Duration::from_secs(parse_or(
                &get,
                "MAX_QUIZ_TIME_SECS",
                default.max_quiz_time.as_secs(),
            )?),
            page_load_timeout: Duration::from_secs(parse_or(
                &get,
                "PAGE_LOAD_TIMEOUT_SECS",
                default.page_load_timeout.as_secs(),
            )?),
            render_settle: Duration::from_millis(parse_or(
                &get,
                "RENDER_SETTLE_MS",
                default.render_settle.as_millis() as u64,
            )?),
            http_timeout: Duration::from_secs(parse_or(
                &get,
                "HTTP_TIMEOUT_SECS",
                default.http_timeout.as_secs(),
            )?),
            llm_timeout: Duration::from_secs(parse_or(
                &get,
                "LLM_TIMEOUT_SECS",
                default.llm_timeout.as_secs(),
            )?),
            max_chain_length: parse_or(&get, "MAX_CHAIN_LENGTH", default.max_chain_length)?,
            max_assets: parse_or(&get, "MAX_ASSETS", default.max_assets)?,
            max_asset_bytes: parse_or(&get, "MAX_ASSET_BYTES", default.max_asset_bytes)?,
            max_asset_chars: default.max_asset_chars,
            max_page_chars: default.max_page_chars,
            chrome_executable: get("CHROME_EXECUTABLE").map(PathBuf::from),
            // 显式设置为空字符串时关闭记录
            attempt_log_file: match lookup("ATTEMPT_LOG_FILE") {
                Some(v) if v.trim().is_empty() => None,
                Some(v) => Some(PathBuf::from(v)),
                None => default.attempt_log_file,
            },
        };

        if config.aipipe_token.is_none() && config.openai_api_key.is_none() {
            return Err(ConfigError::MissingLlmCredentials);
        }

        Ok(config)
    }

    /// 健康检查中展示的 LLM 提供方
    pub fn llm_provider_label(&self) -> String {
        match (&self.aipipe_token, &self.openai_api_key) {
            (Some(_), Some(_)) => "AI Pipe (fallback: OpenAI)".to_string(),
            (Some(_), None) => "AI Pipe".to_string(),
            (None, Some(_)) => "OpenAI".to_string(),
            (None, None) => "none".to_string(),
        }
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: key.to_string(),
                value: raw,
                expected_type: std::any::type_name::<T>().to_string(),
            }),
        None => Ok(default),
    }
}
