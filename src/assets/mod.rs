//! 附件处理
//!
//! 下载 → 识别格式 → 按格式提取 → 归一化内容。
//! 无法识别的格式返回 [`AssetError::UnsupportedFormat`]。

pub mod extract;
pub mod fetcher;
pub mod format;

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::AssetError;

pub use extract::{ExtractedContent, NumericStats, Table};
pub use fetcher::{AssetFetcher, Download};
pub use format::AssetFormat;

/// 一个已提取的附件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedAsset {
    pub source_url: String,
    #[serde(serialize_with = "serialize_format")]
    pub format: AssetFormat,
    pub content: ExtractedContent,
}

fn serialize_format<S: serde::Serializer>(format: &AssetFormat, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(format.name())
}

/// 附件下载结果：可以直接解析的文件，或需要浏览器渲染的网页
#[derive(Debug)]
pub enum Fetched {
    Asset(ExtractedAsset),
    WebPage { url: String },
}

/// 附件处理器
pub struct AssetProcessor {
    fetcher: AssetFetcher,
}

impl AssetProcessor {
    pub fn new(fetcher: AssetFetcher) -> Self {
        Self { fetcher }
    }

    /// 下载并提取一个附件
    ///
    /// 响应是 HTML 时返回 [`Fetched::WebPage`]，由调用方交给页面加载器渲染。
    pub async fn process(&self, url: &str, timeout: Duration) -> Result<Fetched, AssetError> {
        if format::has_page_extension(url) {
            debug!("{} 是网页，交给浏览器渲染", url);
            return Ok(Fetched::WebPage { url: url.to_string() });
        }

        let download = self.fetcher.fetch(url, timeout).await?;
        let content_type = download.content_type.as_deref();

        let format = match AssetFormat::detect(&download.url, content_type) {
            Some(format) => format,
            None if content_type.is_some_and(format::is_html_content_type) => {
                debug!("{} 是网页，交给浏览器渲染", url);
                return Ok(Fetched::WebPage {
                    url: download.url.clone(),
                });
            }
            None => {
                return Err(AssetError::UnsupportedFormat(format!(
                    "{} ({})",
                    download.file_name,
                    content_type.unwrap_or("unknown content-type")
                )));
            }
        };

        info!("📎 解析附件 {} [{}]", download.file_name, format);

        let content = extract_blocking(format, download.clone()).await?;

        Ok(Fetched::Asset(ExtractedAsset {
            source_url: download.url,
            format,
            content,
        }))
    }
}

/// 在阻塞线程池中提取
async fn extract_blocking(format: AssetFormat, download: Download) -> Result<ExtractedContent, AssetError> {
    run_extractor(format, move || {
        extract::extract(
            format,
            &download.bytes,
            &download.url,
            download.content_type.as_deref(),
        )
    })
    .await
}

/// 解析器 panic 时转为 [`AssetError::ExtractionFailed`]
async fn run_extractor<F>(format: AssetFormat, extractor: F) -> Result<ExtractedContent, AssetError>
where
    F: FnOnce() -> Result<ExtractedContent, AssetError> + Send + 'static,
{
    tokio::task::spawn_blocking(extractor)
        .await
        .map_err(|e| AssetError::extraction(format.name(), format!("解析线程异常: {}", e)))?
}
