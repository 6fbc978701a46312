//! LLM 服务 - 业务能力层
//!
//! 只负责"调用模型拿到文本"能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 首选 AI Pipe（OpenAI 兼容代理），失败时回退到 OpenAI
//! - 每个提供方只调用一次，不重试

use std::sync::Arc;
use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, ImageDetail, ImageUrl,
    },
    Client,
};
use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::LlmError;
use crate::models::Prompt;

/// 对话模型能力
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// 发送一次对话请求，返回模型的文本回复
    ///
    /// `budget` 是本次调用（含所有回退）可用的最长时间。
    async fn complete(&self, prompt: &Prompt, budget: Duration) -> Result<String, LlmError>;
}

/// 一个 OpenAI 兼容的提供方
struct LlmProvider {
    name: &'static str,
    client: Client<OpenAIConfig>,
    model: String,
}

/// LLM 服务
///
/// 职责：
/// - 按顺序尝试已配置的提供方
/// - 把图片作为 Vision 内容附加到用户消息
/// - 不认识题目，不解析答案
pub struct LlmService {
    providers: Vec<LlmProvider>,
    temperature: f32,
    max_tokens: u32,
    call_timeout: Duration,
}

impl LlmService {
    /// 根据配置创建 LLM 服务
    ///
    /// 提供方顺序：AI Pipe → OpenAI。两者都没配置时服务仍可创建，调用时返回 [`LlmError::NoProvider`]。
    pub fn new(config: &Config) -> Self {
        let mut providers = Vec::new();

        if let Some(token) = &config.aipipe_token {
            providers.push(LlmProvider {
                name: "aipipe",
                client: Client::with_config(
                    OpenAIConfig::new()
                        .with_api_key(token)
                        .with_api_base(&config.aipipe_base_url),
                ),
                model: config.llm_model.clone(),
            });
        }

        if let Some(key) = &config.openai_api_key {
            providers.push(LlmProvider {
                name: "openai",
                client: Client::with_config(
                    OpenAIConfig::new()
                        .with_api_key(key)
                        .with_api_base(&config.openai_base_url),
                ),
                model: openai_model_name(&config.llm_model).to_string(),
            });
        }

        Self {
            providers,
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
            call_timeout: config.llm_timeout,
        }
    }

    pub fn shared(config: &Config) -> Arc<dyn ChatModel> {
        Arc::new(Self::new(config))
    }

    /// 已配置的提供方名称（按尝试顺序）
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name).collect()
    }

    /// 构建请求
    fn build_request(&self, prompt: &Prompt, model: &str) -> Result<CreateChatCompletionRequest, LlmError> {
        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(prompt.system.as_str())
            .build()
            .map_err(|e| LlmError::RequestBuild(e.to_string()))?;

        let user_msg = if prompt.images.is_empty() {
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.user.as_str())
                .build()
        } else {
            // Vision：文本在前，图片依次附加
            let mut parts = vec![ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartText {
                    text: prompt.user.clone(),
                },
            )];
            parts.extend(prompt.images.iter().map(|url| {
                ChatCompletionRequestUserMessageContentPart::ImageUrl(
                    ChatCompletionRequestMessageContentPartImage {
                        image_url: ImageUrl {
                            url: url.clone(),
                            detail: Some(ImageDetail::Auto),
                        },
                    },
                )
            }));
            debug!("使用 Vision API，包含 {} 张图片", prompt.images.len());

            ChatCompletionRequestUserMessageArgs::default()
                .content(ChatCompletionRequestUserMessageContent::Array(parts))
                .build()
        };
        let user_msg = user_msg.map_err(|e| LlmError::RequestBuild(e.to_string()))?;

        CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| LlmError::RequestBuild(e.to_string()))
    }

    /// 调用单个提供方
    async fn call_provider(
        &self,
        provider: &LlmProvider,
        prompt: &Prompt,
        budget: Duration,
    ) -> Result<String, LlmError> {
        let request = self.build_request(prompt, &provider.model)?;

        debug!(
            "调用 LLM API，提供方: {}, 模型: {}, 用户消息长度: {} 字符",
            provider.name,
            provider.model,
            prompt.user.len()
        );

        let response = timeout(budget, provider.client.chat().create(request))
            .await
            .map_err(|_| LlmError::Timeout {
                provider: provider.name.to_string(),
                timeout_secs: budget.as_secs(),
            })?
            .map_err(|e| LlmError::ApiCallFailed {
                provider: provider.name.to_string(),
                model: provider.model.clone(),
                message: e.to_string(),
            })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| LlmError::EmptyContent {
                provider: provider.name.to_string(),
            })?;

        Ok(content)
    }
}

#[async_trait]
impl ChatModel for LlmService {
    async fn complete(&self, prompt: &Prompt, budget: Duration) -> Result<String, LlmError> {
        if self.providers.is_empty() {
            return Err(LlmError::NoProvider);
        }

        let deadline = tokio::time::Instant::now() + budget;
        let mut last_error = None;

        for provider in &self.providers {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                break;
            }

            match self
                .call_provider(provider, prompt, remaining.min(self.call_timeout))
                .await
            {
                Ok(content) => {
                    info!("✓ LLM 调用成功 (提供方: {}, {} 字符)", provider.name, content.len());
                    return Ok(content);
                }
                Err(e) => {
                    warn!("⚠️ LLM 提供方 {} 失败: {}", provider.name, e);
                    last_error = Some(e);
                }
            }
        }

        let last = last_error.unwrap_or(LlmError::Timeout {
            provider: "all".to_string(),
            timeout_secs: budget.as_secs(),
        });
        Err(LlmError::AllProvidersFailed(Box::new(last)))
    }
}

/// OpenAI 直连时去掉 AI Pipe 的提供方前缀（`openai/gpt-4o-mini` → `gpt-4o-mini`）
fn openai_model_name(model: &str) -> &str {
    model.rsplit('/').next().unwrap_or(model)
}
