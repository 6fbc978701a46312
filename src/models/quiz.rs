use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// LLM 对题目页面的结构化理解
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizInstructions {
    /// 题目主体
    #[serde(default)]
    pub question: String,
    /// 需要下载或抓取的数据来源
    #[serde(
        default,
        alias = "data_source",
        deserialize_with = "deserialize_sources"
    )]
    pub data_sources: Vec<String>,
    /// 提交答案的地址
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub submit_url: Option<String>,
    /// 期望的答案格式（number / string / boolean / object ...）
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub answer_format: Option<String>,
    /// 解题步骤说明
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub instructions: Option<String>,
}

/// 提交给题目网站的答案
///
/// 序列化时不带标签，`NoAnswer` 序列化为 `null`。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Answer {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Structured(JsonValue),
    NoAnswer,
}

impl Answer {
    /// 答案类型名称（写入答题记录）
    pub fn type_name(&self) -> &'static str {
        match self {
            Answer::Boolean(_) => "boolean",
            Answer::Integer(_) => "integer",
            Answer::Float(_) => "float",
            Answer::Text(s) if s.starts_with("data:") => "base64_uri",
            Answer::Text(_) => "string",
            Answer::Structured(JsonValue::Array(_)) => "array",
            Answer::Structured(_) => "object",
            Answer::NoAnswer => "none",
        }
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

/// 提交请求体
#[derive(Debug, Clone, Serialize)]
pub struct SubmitPayload {
    pub email: String,
    pub secret: String,
    pub url: String,
    pub answer: Answer,
}

/// 提交响应
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SubmitOutcome {
    #[serde(default)]
    pub correct: bool,
    #[serde(default)]
    pub reason: Option<String>,
    /// 下一道题的地址
    #[serde(default)]
    pub url: Option<String>,
}

// 数据来源既可能是字符串，也可能是字符串数组或 null
fn deserialize_sources<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = JsonValue::deserialize(deserializer)?;
    let sources = match value {
        JsonValue::String(s) => vec![s],
        JsonValue::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                JsonValue::String(s) => Some(s),
                JsonValue::Object(map) => map
                    .get("url")
                    .and_then(|u| u.as_str())
                    .map(str::to_string),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    Ok(sources
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && !is_null_word(s))
        .collect())
}

// 模型常把缺失字段写成 "null" / "none" / 数字等
fn deserialize_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = JsonValue::deserialize(deserializer)?;
    Ok(match value {
        JsonValue::Null => None,
        JsonValue::String(s) => {
            let s = s.trim();
            if s.is_empty() || is_null_word(s) {
                None
            } else {
                Some(s.to_string())
            }
        }
        other => Some(other.to_string()),
    })
}

fn is_null_word(s: &str) -> bool {
    matches!(s.to_ascii_lowercase().as_str(), "null" | "none" | "n/a")
}
