//! 集成测试共用的桩实现

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use quiz_solver::error::{BrowserError, LlmError};
use quiz_solver::models::{Prompt, RenderedPage};
use quiz_solver::services::prompts::PARSER_SYSTEM_PROMPT;
use quiz_solver::{ChatModel, Config, PageLoader};

pub fn test_config() -> Config {
    Config {
        student_email: "a@b.com".to_string(),
        student_secret: "S".to_string(),
        attempt_log_file: None,
        render_settle: Duration::ZERO,
        ..Config::default()
    }
}

/// 按地址返回预先准备好的页面，并记录调用次数
#[derive(Default)]
pub struct StubLoader {
    pages: HashMap<String, RenderedPage>,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: RenderedPage) -> Self {
        self.pages.insert(page.url.clone(), page);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageLoader for StubLoader {
    async fn load(&self, url: &str, timeout: Duration) -> Result<RenderedPage, BrowserError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| BrowserError::Timeout {
                url: url.to_string(),
                timeout_secs: timeout.as_secs(),
            })
    }
}

/// 读题时依次返回 `parse_replies`，求解时依次返回 `answers`
#[derive(Default)]
pub struct ScriptedLlm {
    parse_replies: Mutex<Vec<String>>,
    answers: Mutex<Vec<String>>,
    pub prompts: Mutex<Vec<Prompt>>,
    fail: bool,
}

impl ScriptedLlm {
    pub fn new(parse_replies: Vec<String>, answers: Vec<String>) -> Self {
        Self {
            parse_replies: Mutex::new(parse_replies),
            answers: Mutex::new(answers),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// 求解阶段收到的提示词
    pub fn solve_prompts(&self) -> Vec<Prompt> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.system != PARSER_SYSTEM_PROMPT)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ChatModel for ScriptedLlm {
    async fn complete(&self, prompt: &Prompt, _budget: Duration) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        if self.fail {
            return Err(LlmError::AllProvidersFailed(Box::new(LlmError::NoProvider)));
        }

        let queue = if prompt.system == PARSER_SYSTEM_PROMPT {
            &self.parse_replies
        } else {
            &self.answers
        };
        let mut queue = queue.lock().unwrap();
        if queue.is_empty() {
            return Err(LlmError::EmptyContent {
                provider: "scripted".to_string(),
            });
        }
        Ok(queue.remove(0))
    }
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
