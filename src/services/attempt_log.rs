//! 答题记录服务 - 业务能力层
//!
//! 只负责"追加 / 统计答题记录"能力，不关心流程

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// 一次提交的记录（JSON Lines 中的一行）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub timestamp: DateTime<Utc>,
    pub quiz_url: String,
    pub answer: JsonValue,
    pub answer_type: String,
    pub correct: bool,
    #[serde(default)]
    pub reason: Option<String>,
    pub elapsed_secs: f64,
    #[serde(default)]
    pub next_url: Option<String>,
}

/// 汇总统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttemptStats {
    pub total_attempts: usize,
    pub correct: usize,
    pub incorrect: usize,
    /// 正确率（百分比）
    pub success_rate: f64,
    /// 平均用时（秒）
    pub avg_time: f64,
}

/// 答题记录服务
///
/// 职责：
/// - 每次提交追加一行 JSON
/// - 读取全部记录计算统计
/// - 写入失败由调用方记录日志，不中断流程
#[derive(Debug, Clone)]
pub struct AttemptLog {
    path: PathBuf,
}

impl AttemptLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一条记录
    pub async fn append(&self, record: &AttemptRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!("写入答题记录: {} (正确: {})", record.quiz_url, record.correct);
        Ok(())
    }

    /// 读取全部记录，跳过无法解析的行
    pub async fn records(&self) -> Result<Vec<AttemptRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let records = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("跳过无法解析的答题记录: {}", e);
                    None
                }
            })
            .collect();

        Ok(records)
    }

    /// 统计全部记录
    pub async fn statistics(&self) -> Result<AttemptStats> {
        Ok(AttemptStats::from_records(&self.records().await?))
    }
}

impl AttemptStats {
    pub fn from_records(records: &[AttemptRecord]) -> Self {
        let total = records.len();
        if total == 0 {
            return Self::default();
        }

        let correct = records.iter().filter(|r| r.correct).count();
        let total_time: f64 = records.iter().map(|r| r.elapsed_secs).sum();

        Self {
            total_attempts: total,
            correct,
            incorrect: total - correct,
            success_rate: correct as f64 / total as f64 * 100.0,
            avg_time: total_time / total as f64,
        }
    }
}
