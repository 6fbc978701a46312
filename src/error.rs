use thiserror::Error;

/// 应用程序错误类型
///
/// 流水线中可恢复的错误都归到这里；出现时当前题目被放弃，只记录日志。
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 附件下载 / 解析错误
    #[error("附件错误: {0}")]
    Asset(#[from] AssetError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 答案提交错误
    #[error("提交错误: {0}")]
    Submit(#[from] SubmitError),
    /// 时间预算耗尽
    #[error("时间预算不足: 剩余 {remaining_secs:.1}s, 至少需要 {required_secs}s")]
    DeadlineExceeded { remaining_secs: f64, required_secs: u64 },
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 浏览器配置失败
    #[error("浏览器配置失败: {0}")]
    ConfigurationFailed(String),
    /// 启动浏览器失败
    #[error("启动无头浏览器失败: {source}")]
    LaunchFailed {
        #[source]
        source: chromiumoxide::error::CdpError,
    },
    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    NavigationFailed {
        url: String,
        #[source]
        source: chromiumoxide::error::CdpError,
    },
    /// 执行脚本失败
    #[error("执行脚本失败: {0}")]
    ScriptExecutionFailed(#[from] chromiumoxide::error::CdpError),
    /// 脚本返回值无法反序列化
    #[error("脚本返回值解析失败: {0}")]
    ScriptResultInvalid(#[from] serde_json::Error),
    /// 页面加载超时
    #[error("页面加载超时 ({url}, {timeout_secs}s)")]
    Timeout { url: String, timeout_secs: u64 },
}

/// 附件下载 / 解析错误
#[derive(Debug, Error)]
pub enum AssetError {
    /// 无法识别的格式
    #[error("不支持的附件格式: {0}")]
    UnsupportedFormat(String),
    /// 下载失败
    #[error("下载失败 ({url}): {source}")]
    DownloadFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// 服务器返回非 2xx
    #[error("下载失败 ({url}): HTTP {status}")]
    BadStatus { url: String, status: u16 },
    /// 附件过大
    #[error("附件过大 ({url}): {size} 字节, 上限 {limit} 字节")]
    TooLarge { url: String, size: usize, limit: usize },
    /// URL 无法解析
    #[error("无效的附件地址: {0}")]
    InvalidUrl(String),
    /// 解析器报错
    #[error("{format} 解析失败: {message}")]
    ExtractionFailed { format: String, message: String },
}

impl AssetError {
    pub fn extraction(format: impl Into<String>, message: impl ToString) -> Self {
        AssetError::ExtractionFailed {
            format: format.into(),
            message: message.to_string(),
        }
    }
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// 请求构建失败
    #[error("构建 LLM 请求失败: {0}")]
    RequestBuild(String),
    /// API 调用失败
    #[error("LLM API调用失败 (提供方: {provider}, 模型: {model}): {message}")]
    ApiCallFailed {
        provider: String,
        model: String,
        message: String,
    },
    /// 调用超时
    #[error("LLM 调用超时 (提供方: {provider}, {timeout_secs}s)")]
    Timeout { provider: String, timeout_secs: u64 },
    /// 返回内容为空
    #[error("LLM返回内容为空 (提供方: {provider})")]
    EmptyContent { provider: String },
    /// 没有可用的提供方
    #[error("未配置任何 LLM 提供方")]
    NoProvider,
    /// 所有提供方都失败
    #[error("所有 LLM 提供方均失败, 最后一个错误: {0}")]
    AllProvidersFailed(Box<LlmError>),
}

/// 答案提交错误
#[derive(Debug, Error)]
pub enum SubmitError {
    /// 题目页面中找不到提交地址
    #[error("未找到提交地址")]
    MissingSubmitUrl,
    /// 网络请求失败
    #[error("提交请求失败 ({url}): {source}")]
    RequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// 服务端拒绝
    #[error("提交被拒绝 ({url}): HTTP {status}: {body}")]
    Rejected { url: String, status: u16, body: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 环境变量不存在
    #[error("环境变量 {var_name} 不存在")]
    EnvVarNotFound { var_name: String },
    /// 没有任何 LLM 凭据
    #[error("必须设置 AIPIPE_TOKEN 或 OPENAI_API_KEY 之一")]
    MissingLlmCredentials,
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
