//! 解题流程 - 流程层
//!
//! 核心职责：定义"一道题"以及"一条题目链"的完整处理流程
//!
//! 流程顺序：
//! 1. 渲染题目页面
//! 2. LLM 读题 → 题目说明
//! 3. 下载并解析附件（尽力而为）
//! 4. LLM 求解 → 解析答案
//! 5. 提交 → 记录 → 跟随下一题

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::assets::{
    AssetFetcher, AssetFormat, AssetProcessor, ExtractedAsset, ExtractedContent, Fetched,
};
use crate::config::Config;
use crate::error::AppResult;
use crate::models::{Answer, QuizInstructions, RenderedPage, SubmitOutcome, SubmitPayload};
use crate::services::prompts::{build_parse_prompt, build_solve_prompt, parse_instructions};
use crate::services::{parse_answer, AttemptLog, AttemptRecord, ChatModel, PageLoader, Submitter};
use crate::utils::logging::truncate_text;
use crate::workflow::job::Job;

/// 开始一道新题至少需要的剩余时间
pub const MIN_TIME_PER_QUIZ: Duration = Duration::from_secs(10);
/// 继续题目链至少需要的剩余时间
pub const MIN_TIME_TO_CONTINUE: Duration = Duration::from_secs(5);

/// 单道题的处理结果
#[derive(Debug, Clone)]
pub struct QuizResult {
    pub quiz_url: String,
    pub answer: Answer,
    pub outcome: SubmitOutcome,
    pub elapsed: Duration,
}

/// 题目链停止的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainStop {
    /// 提交响应没有给出下一题
    Completed,
    /// 达到最大题数
    LimitReached,
    /// 剩余时间不足
    OutOfTime,
    /// 某道题失败
    Failed(String),
}

/// 题目链处理报告
#[derive(Debug, Clone)]
pub struct ChainReport {
    pub results: Vec<QuizResult>,
    pub stop: ChainStop,
}

impl ChainReport {
    pub fn correct(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.correct).count()
    }
}

/// 解题流程
///
/// - 编排完整的解题流程
/// - 决定何时读题、何时下载、何时提交
/// - 不持有浏览器资源，只依赖业务能力（services）
pub struct QuizFlow {
    config: Arc<Config>,
    loader: Arc<dyn PageLoader>,
    llm: Arc<dyn ChatModel>,
    assets: AssetProcessor,
    submitter: Submitter,
    attempt_log: Option<AttemptLog>,
}

impl QuizFlow {
    /// 创建新的解题流程
    pub fn new(
        config: Arc<Config>,
        loader: Arc<dyn PageLoader>,
        llm: Arc<dyn ChatModel>,
        http_client: reqwest::Client,
    ) -> Self {
        let assets = AssetProcessor::new(AssetFetcher::new(
            http_client.clone(),
            config.max_asset_bytes,
        ));
        let attempt_log = config.attempt_log_file.clone().map(AttemptLog::new);

        Self {
            config,
            loader,
            llm,
            assets,
            submitter: Submitter::new(http_client),
            attempt_log,
        }
    }

    pub fn attempt_log(&self) -> Option<&AttemptLog> {
        self.attempt_log.as_ref()
    }

    /// 处理一条题目链
    ///
    /// 每道题的提交响应若给出下一题地址就继续，直到没有下一题、
    /// 达到最大题数、时间不足或某道题失败。
    pub async fn run_chain(&self, job: &Job) -> ChainReport {
        info!("{} 🚀 开始处理题目链: {}", job, job.url);

        let mut results = Vec::new();
        let mut current = Some(job.url.clone());

        let stop = loop {
            let Some(quiz_url) = current.take() else {
                break ChainStop::Completed;
            };
            if results.len() >= self.config.max_chain_length {
                warn!("{} ⚠️ 达到最大题数 {}，停止", job, self.config.max_chain_length);
                break ChainStop::LimitReached;
            }
            if job.remaining() < MIN_TIME_TO_CONTINUE {
                warn!("{} ⚠️ 剩余时间不足，停止", job);
                break ChainStop::OutOfTime;
            }

            info!("{} 第 {} 题", job, results.len() + 1);

            match self.solve_single(job, &quiz_url).await {
                Ok(result) => {
                    if result.outcome.correct {
                        info!("{} ✓ 回答正确: {}", job, quiz_url);
                    } else {
                        warn!(
                            "{} ✗ 回答错误: {} ({})",
                            job,
                            quiz_url,
                            result.outcome.reason.as_deref().unwrap_or("未给出原因")
                        );
                    }

                    current = result
                        .outcome
                        .url
                        .as_deref()
                        .and_then(|next| resolve_url(&quiz_url, next));
                    if let Some(next) = &current {
                        info!("{} ➡️ 下一题: {}", job, next);
                    }
                    results.push(result);
                }
                Err(e) => {
                    error!("{} ❌ 放弃题目 {}: {}", job, quiz_url, e);
                    break ChainStop::Failed(e.to_string());
                }
            }
        };

        let report = ChainReport { results, stop };
        info!(
            "{} 📊 题目链结束: 共 {} 题, 正确 {}, 原因: {:?}, 用时 {:.1}s",
            job,
            report.results.len(),
            report.correct(),
            report.stop,
            job.elapsed().as_secs_f64()
        );
        report
    }

    /// 处理单道题
    pub async fn solve_single(&self, job: &Job, quiz_url: &str) -> AppResult<QuizResult> {
        job.ensure_remaining(MIN_TIME_PER_QUIZ)?;
        let started = Instant::now();

        // 1. 渲染页面
        let page = self
            .loader
            .load(quiz_url, job.bounded(self.config.page_load_timeout))
            .await?;

        // 2. 读题
        let instructions = self.read_instructions(job, &page).await?;

        // 3. 附件
        let sources = self.collect_sources(&page, &instructions);
        let assets = self.process_assets(job, &sources).await;

        // 4. 求解
        let prompt = build_solve_prompt(
            &instructions,
            &page,
            &assets,
            self.config.max_page_chars,
            self.config.max_asset_chars,
        );
        let raw = self.llm.complete(&prompt, job.remaining()).await?;
        let answer = parse_answer(&raw, instructions.answer_format.as_deref());
        info!(
            "{} 💡 答案 ({}): {}",
            job,
            answer.type_name(),
            truncate_text(&answer.to_json().to_string(), 200)
        );

        // 5. 提交
        let submit_url = instructions
            .submit_url
            .as_deref()
            .and_then(|u| resolve_url(&page.url, u));
        let payload = SubmitPayload {
            email: job.email.clone(),
            secret: job.secret.clone(),
            url: quiz_url.to_string(),
            answer,
        };
        let outcome = self
            .submitter
            .submit(
                submit_url.as_deref(),
                &payload,
                job.bounded(self.config.http_timeout),
            )
            .await?;

        let result = QuizResult {
            quiz_url: quiz_url.to_string(),
            answer: payload.answer,
            outcome,
            elapsed: started.elapsed(),
        };
        self.record_attempt(&result).await;

        Ok(result)
    }

    /// 让 LLM 把页面读成题目说明
    async fn read_instructions(&self, job: &Job, page: &RenderedPage) -> AppResult<QuizInstructions> {
        let prompt = build_parse_prompt(page, self.config.max_page_chars);
        let raw = self.llm.complete(&prompt, job.remaining()).await?;
        let instructions = parse_instructions(&raw, page);

        info!(
            "{} 📋 题目: {}",
            job,
            truncate_text(&instructions.question, 120)
        );
        debug!(
            "数据来源: {:?}, 提交地址: {:?}, 答案格式: {:?}",
            instructions.data_sources, instructions.submit_url, instructions.answer_format
        );

        Ok(instructions)
    }

    /// 汇总要处理的附件地址
    ///
    /// 题目说明中的数据来源在前，页面中能识别格式的链接在后；去重并限制数量。
    fn collect_sources(&self, page: &RenderedPage, instructions: &QuizInstructions) -> Vec<String> {
        let submit_url = instructions
            .submit_url
            .as_deref()
            .and_then(|u| resolve_url(&page.url, u));

        let named = instructions
            .data_sources
            .iter()
            .filter_map(|s| resolve_url(&page.url, s));
        let linked = page
            .links
            .iter()
            .filter(|link| AssetFormat::from_url(link).is_some())
            .cloned();

        let mut sources: Vec<String> = Vec::new();
        for url in named.chain(linked) {
            if url == page.url || Some(&url) == submit_url.as_ref() || sources.contains(&url) {
                continue;
            }
            sources.push(url);
        }

        if sources.len() > self.config.max_assets {
            warn!(
                "附件数量 {} 超过上限 {}，只处理前 {} 个",
                sources.len(),
                self.config.max_assets,
                self.config.max_assets
            );
            sources.truncate(self.config.max_assets);
        }
        sources
    }

    /// 逐个处理附件，失败的跳过
    async fn process_assets(&self, job: &Job, sources: &[String]) -> Vec<ExtractedAsset> {
        let mut assets = Vec::new();

        for source in sources {
            if job.remaining() < MIN_TIME_TO_CONTINUE {
                warn!("{} ⚠️ 时间不足，跳过剩余附件", job);
                break;
            }

            match self.process_asset(job, source).await {
                Ok(asset) => assets.push(asset),
                Err(e) => warn!("{} ⚠️ 跳过附件 {}: {}", job, source, e),
            }
        }

        info!("{} 📎 成功处理 {}/{} 个附件", job, assets.len(), sources.len());
        assets
    }

    async fn process_asset(&self, job: &Job, source: &str) -> AppResult<ExtractedAsset> {
        match self
            .assets
            .process(source, job.bounded(self.config.http_timeout))
            .await?
        {
            Fetched::Asset(asset) => Ok(asset),
            Fetched::WebPage { url } => {
                // 数据来源是网页：交给浏览器渲染后当作文本
                let page = self
                    .loader
                    .load(&url, job.bounded(self.config.page_load_timeout))
                    .await?;
                Ok(ExtractedAsset {
                    source_url: page.url,
                    format: AssetFormat::Text,
                    content: ExtractedContent::Text { text: page.text },
                })
            }
        }
    }

    async fn record_attempt(&self, result: &QuizResult) {
        let Some(log) = &self.attempt_log else {
            return;
        };

        let record = AttemptRecord {
            timestamp: chrono::Utc::now(),
            quiz_url: result.quiz_url.clone(),
            answer: result.answer.to_json(),
            answer_type: result.answer.type_name().to_string(),
            correct: result.outcome.correct,
            reason: result.outcome.reason.clone(),
            elapsed_secs: result.elapsed.as_secs_f64(),
            next_url: result.outcome.url.clone(),
        };

        if let Err(e) = log.append(&record).await {
            warn!("⚠️ 写入答题记录失败 ({}): {}", log.path().display(), e);
        }
    }
}

/// 把可能是相对路径的地址解析为绝对地址
fn resolve_url(base: &str, candidate: &str) -> Option<String> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }
    if let Ok(url) = Url::parse(candidate) {
        return Some(url.to_string());
    }
    match Url::parse(base).and_then(|b| b.join(candidate)) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            debug!("无法解析地址 {} (基准 {}): {}", candidate, base, e);
            None
        }
    }
}
