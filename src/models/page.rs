use serde::{Deserialize, Serialize};

/// 浏览器渲染后的题目页面
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderedPage {
    /// 最终地址（跟随跳转之后）
    pub url: String,
    #[serde(default)]
    pub title: String,
    /// `document.body.innerText`
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub html: String,
    /// 页面上所有链接（已是绝对地址）
    #[serde(default)]
    pub links: Vec<String>,
}

impl RenderedPage {
    /// 用纯文本构造页面（测试与数据源网页使用）
    pub fn from_text(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text: text.into(),
            ..Default::default()
        }
    }
}
