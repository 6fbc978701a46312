//! 各格式的内容提取
//!
//! 统一入口是 [`extract`]，每种格式一个分支。

use std::collections::BTreeMap;
use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use calamine::Reader;
use quick_xml::events::Event;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::assets::AssetFormat;
use crate::error::AssetError;
use crate::utils::logging::truncate_text;

/// 表格最多保留的行数（统计值仍按全部行计算）
pub const MAX_TABLE_ROWS: usize = 1000;

/// 归一化后的附件内容
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtractedContent {
    Text { text: String },
    Table { table: Table },
    Workbook { sheets: Vec<Table> },
    Json { value: JsonValue },
    Image { data_uri: String },
}

/// 表格数据
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    /// 工作表名称（CSV 为空）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// 原始总行数（不含表头）
    pub total_rows: usize,
    /// 数值列统计
    pub numeric_stats: BTreeMap<String, NumericStats>,
}

/// 单列数值统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NumericStats {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// 按格式分发到对应的提取器
///
/// `source` 仅用于图片 MIME 推断与错误信息。
pub fn extract(
    format: AssetFormat,
    bytes: &[u8],
    source: &str,
    content_type: Option<&str>,
) -> Result<ExtractedContent, AssetError> {
    match format {
        AssetFormat::Pdf => extract_pdf(bytes),
        AssetFormat::Csv => extract_csv(bytes, source),
        AssetFormat::Excel => extract_excel(bytes),
        AssetFormat::Json => extract_json(bytes),
        AssetFormat::Xml => extract_xml(bytes),
        AssetFormat::Text => Ok(ExtractedContent::Text {
            text: String::from_utf8_lossy(bytes).into_owned(),
        }),
        AssetFormat::Image => {
            let mime = AssetFormat::image_mime(source, content_type);
            Ok(ExtractedContent::Image {
                data_uri: format!("data:{};base64,{}", mime, BASE64.encode(bytes)),
            })
        }
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<ExtractedContent, AssetError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| AssetError::extraction("pdf", e))?;
    Ok(ExtractedContent::Text { text })
}

fn extract_csv(bytes: &[u8], source: &str) -> Result<ExtractedContent, AssetError> {
    let delimiter = if source.to_ascii_lowercase().contains(".tsv") {
        b'\t'
    } else {
        b','
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| AssetError::extraction("csv", e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| AssetError::extraction("csv", e))?;
        rows.push(record.iter().map(|c| c.trim().to_string()).collect());
    }

    Ok(ExtractedContent::Table {
        table: Table::from_rows(None, columns, rows),
    })
}

fn extract_excel(bytes: &[u8]) -> Result<ExtractedContent, AssetError> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| AssetError::extraction("excel", e))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| AssetError::extraction("excel", e))?;

        let mut rows = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<_>>());
        let columns = rows.next().unwrap_or_default();
        let rows: Vec<Vec<String>> = rows.collect();

        sheets.push(Table::from_rows(Some(name), columns, rows));
    }

    Ok(ExtractedContent::Workbook { sheets })
}

fn extract_json(bytes: &[u8]) -> Result<ExtractedContent, AssetError> {
    let value = serde_json::from_slice(bytes).map_err(|e| AssetError::extraction("json", e))?;
    Ok(ExtractedContent::Json { value })
}

/// XML 展平为 `路径: 文本` 行
fn extract_xml(bytes: &[u8]) -> Result<ExtractedContent, AssetError> {
    let mut reader = quick_xml::Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut lines = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                path.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| AssetError::extraction("xml", e))?
                    .trim()
                    .to_string();
                if !text.is_empty() {
                    lines.push(format!("{}: {}", path.join("/"), text));
                }
            }
            Ok(Event::CData(c)) => {
                let text = String::from_utf8_lossy(&c.into_inner()).trim().to_string();
                if !text.is_empty() {
                    lines.push(format!("{}: {}", path.join("/"), text));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(AssetError::extraction("xml", e)),
        }
        buf.clear();
    }

    Ok(ExtractedContent::Text {
        text: lines.join("\n"),
    })
}

impl Table {
    /// 由表头和数据行构造，计算统计并截断到 [`MAX_TABLE_ROWS`]
    pub fn from_rows(name: Option<String>, columns: Vec<String>, mut rows: Vec<Vec<String>>) -> Self {
        let total_rows = rows.len();
        let numeric_stats = numeric_stats(&columns, &rows);
        rows.truncate(MAX_TABLE_ROWS);

        Self {
            name,
            columns,
            rows,
            total_rows,
            numeric_stats,
        }
    }

    /// 渲染为提示词中的文本
    fn render(&self) -> String {
        let mut out = String::new();
        if let Some(name) = &self.name {
            out.push_str(&format!("Sheet: {}\n", name));
        }
        out.push_str(&format!(
            "Rows: {} | Columns: {}\n",
            self.total_rows,
            self.columns.join(", ")
        ));

        for (column, stats) in &self.numeric_stats {
            out.push_str(&format!(
                "Stats[{}]: count={} sum={} mean={:.4} min={} max={}\n",
                column, stats.count, stats.sum, stats.mean, stats.min, stats.max
            ));
        }

        out.push_str(&self.columns.join(","));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&row.join(","));
            out.push('\n');
        }
        out
    }
}

// 只有所有非空单元格都能解析为数字的列才计入统计
fn numeric_stats(columns: &[String], rows: &[Vec<String>]) -> BTreeMap<String, NumericStats> {
    let mut stats = BTreeMap::new();

    for (idx, column) in columns.iter().enumerate() {
        let mut values = Vec::new();
        let mut numeric = true;

        for row in rows {
            let Some(cell) = row.get(idx) else { continue };
            if cell.is_empty() {
                continue;
            }
            match cell.replace(',', "").parse::<f64>() {
                Ok(v) if v.is_finite() => values.push(v),
                _ => {
                    numeric = false;
                    break;
                }
            }
        }

        if !numeric || values.is_empty() {
            continue;
        }

        let sum: f64 = values.iter().sum();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        stats.insert(
            column.clone(),
            NumericStats {
                count: values.len(),
                sum,
                mean: sum / values.len() as f64,
                min,
                max,
            },
        );
    }

    stats
}

impl ExtractedContent {
    /// 渲染为提示词文本，最多 `max_chars` 个字符；图片不产生文本
    pub fn render(&self, max_chars: usize) -> String {
        let text = match self {
            ExtractedContent::Text { text } => text.clone(),
            ExtractedContent::Table { table } => table.render(),
            ExtractedContent::Workbook { sheets } => sheets
                .iter()
                .map(Table::render)
                .collect::<Vec<_>>()
                .join("\n"),
            ExtractedContent::Json { value } => {
                serde_json::to_string_pretty(value).unwrap_or_default()
            }
            ExtractedContent::Image { .. } => "(image attached)".to_string(),
        };
        truncate_text(&text, max_chars)
    }

    pub fn image_data_uri(&self) -> Option<&str> {
        match self {
            ExtractedContent::Image { data_uri } => Some(data_uri),
            _ => None,
        }
    }
}
