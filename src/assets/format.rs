//! 附件格式识别
//!
//! 先看扩展名，再看 Content-Type。

use phf::phf_map;
use std::fmt;

/// 支持的附件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetFormat {
    Pdf,
    Csv,
    Excel,
    Json,
    Xml,
    Text,
    Image,
}

static EXTENSION_FORMATS: phf::Map<&'static str, AssetFormat> = phf_map! {
    "pdf" => AssetFormat::Pdf,
    "csv" => AssetFormat::Csv,
    "tsv" => AssetFormat::Csv,
    "xls" => AssetFormat::Excel,
    "xlsx" => AssetFormat::Excel,
    "xlsm" => AssetFormat::Excel,
    "xlsb" => AssetFormat::Excel,
    "ods" => AssetFormat::Excel,
    "json" => AssetFormat::Json,
    "geojson" => AssetFormat::Json,
    "xml" => AssetFormat::Xml,
    "txt" => AssetFormat::Text,
    "md" => AssetFormat::Text,
    "log" => AssetFormat::Text,
    "png" => AssetFormat::Image,
    "jpg" => AssetFormat::Image,
    "jpeg" => AssetFormat::Image,
    "gif" => AssetFormat::Image,
    "webp" => AssetFormat::Image,
};

/// 网页扩展名（这些地址交给浏览器渲染，不作为附件解析）
static PAGE_EXTENSIONS: phf::Set<&'static str> = phf::phf_set! {
    "html", "htm", "php", "asp", "aspx", "jsp",
};

impl AssetFormat {
    /// 根据地址和 Content-Type 判断格式
    pub fn detect(url: &str, content_type: Option<&str>) -> Option<Self> {
        Self::from_url(url).or_else(|| content_type.and_then(Self::from_content_type))
    }

    /// 按扩展名判断
    pub fn from_url(url: &str) -> Option<Self> {
        extension_of(url).and_then(|ext| EXTENSION_FORMATS.get(ext.as_str()).copied())
    }

    /// 按 Content-Type 判断
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match mime.as_str() {
            "application/pdf" => Some(AssetFormat::Pdf),
            "text/csv" | "application/csv" | "text/tab-separated-values" => Some(AssetFormat::Csv),
            "application/vnd.ms-excel"
            | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            | "application/vnd.oasis.opendocument.spreadsheet" => Some(AssetFormat::Excel),
            "application/xml" | "text/xml" => Some(AssetFormat::Xml),
            "text/plain" | "text/markdown" => Some(AssetFormat::Text),
            m if m == "application/json" || m.ends_with("+json") => Some(AssetFormat::Json),
            m if m.starts_with("image/") => Some(AssetFormat::Image),
            _ => None,
        }
    }

    /// 图片的 MIME 类型（构造 data URI 用）
    pub fn image_mime(url: &str, content_type: Option<&str>) -> String {
        if let Some(ct) = content_type {
            let mime = ct.split(';').next().unwrap_or_default().trim();
            if mime.starts_with("image/") {
                return mime.to_string();
            }
        }
        match extension_of(url).as_deref() {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            _ => "image/png",
        }
        .to_string()
    }

    pub fn name(self) -> &'static str {
        match self {
            AssetFormat::Pdf => "pdf",
            AssetFormat::Csv => "csv",
            AssetFormat::Excel => "excel",
            AssetFormat::Json => "json",
            AssetFormat::Xml => "xml",
            AssetFormat::Text => "text",
            AssetFormat::Image => "image",
        }
    }
}

impl fmt::Display for AssetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 地址是否带网页扩展名（.html / .php ...）
pub fn has_page_extension(url: &str) -> bool {
    extension_of(url).is_some_and(|ext| PAGE_EXTENSIONS.contains(ext.as_str()))
}

/// Content-Type 是否为 HTML
pub fn is_html_content_type(content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    mime.eq_ignore_ascii_case("text/html") || mime.eq_ignore_ascii_case("application/xhtml+xml")
}

/// 取地址路径最后一段的扩展名（小写，忽略查询串和锚点）
fn extension_of(url: &str) -> Option<String> {
    // 绝对地址只看 path，避免把域名后缀当成扩展名
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    let last = path.rsplit('/').next().unwrap_or_default();
    let (stem, ext) = last.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
