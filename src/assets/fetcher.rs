//! 附件下载

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::Client;
use tracing::debug;

use crate::error::AssetError;

/// 已下载的原始附件
#[derive(Debug, Clone)]
pub struct Download {
    /// 实际请求的地址（跟随跳转之后）
    pub url: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// 附件下载器
///
/// 只负责"把字节拿回来"，不关心格式。
#[derive(Clone)]
pub struct AssetFetcher {
    client: Client,
    max_bytes: usize,
}

impl AssetFetcher {
    pub fn new(client: Client, max_bytes: usize) -> Self {
        Self { client, max_bytes }
    }

    /// 下载附件
    ///
    /// # 参数
    /// - `url`: 绝对地址
    /// - `timeout`: 本次下载的超时时间（已按任务剩余时间收紧）
    pub async fn fetch(&self, url: &str, timeout: Duration) -> Result<Download, AssetError> {
        debug!("下载附件: {} (超时 {:?})", url, timeout);

        match url::Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => return Err(AssetError::InvalidUrl(url.to_string())),
        }

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|source| AssetError::DownloadFailed {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(len) = response.content_length() {
            if len as usize > self.max_bytes {
                return Err(AssetError::TooLarge {
                    url: url.to_string(),
                    size: len as usize,
                    limit: self.max_bytes,
                });
            }
        }

        let final_url = response.url().to_string();
        let content_type = header_str(&response, CONTENT_TYPE);
        let file_name = header_str(&response, CONTENT_DISPOSITION)
            .and_then(|cd| file_name_from_disposition(&cd))
            .unwrap_or_else(|| file_name_from_url(&final_url));

        // 边读边计数，超过上限立即停止
        let mut buffer = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| AssetError::DownloadFailed {
                url: url.to_string(),
                source,
            })?;
            if buffer.len() + chunk.len() > self.max_bytes {
                return Err(AssetError::TooLarge {
                    url: url.to_string(),
                    size: buffer.len() + chunk.len(),
                    limit: self.max_bytes,
                });
            }
            buffer.extend_from_slice(&chunk);
        }
        let bytes = buffer.freeze();

        debug!("下载完成: {} ({} 字节, {:?})", file_name, bytes.len(), content_type);

        Ok(Download {
            url: final_url,
            file_name,
            content_type,
            bytes,
        })
    }
}

fn header_str(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// 从 `Content-Disposition` 取文件名
fn file_name_from_disposition(value: &str) -> Option<String> {
    value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .map(|name| sanitize_file_name(&name))
        .filter(|name| !name.is_empty())
}

/// 从地址路径最后一段取文件名
fn file_name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let name = sanitize_file_name(path.rsplit('/').next().unwrap_or_default());
    if name.is_empty() {
        "downloaded_file".to_string()
    } else {
        name
    }
}

/// 去掉路径分隔符和特殊字符
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    base.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | ' '))
        .collect()
}
