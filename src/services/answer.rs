//! 答案解析
//!
//! 把模型的文本回复转换成带类型的 [`Answer`]，永不失败。

use regex::Regex;
use serde_json::Value as JsonValue;

use crate::models::Answer;

/// 解析模型回复
///
/// # 规则
/// 1. 去掉代码块标记、`Answer:` 前缀和首尾空白
/// 2. 空回复 → `NoAnswer`
/// 3. JSON 对象或数组 → `Structured`
/// 4. 答案格式提示恰好为 string / text → 原样作为 `Text`
/// 5. 未加引号的 `true` / `false` → `Boolean`
/// 6. 未加引号的整数 → `Integer`，有限浮点数 → `Float`
/// 7. 其余 → `Text`（去掉包裹的引号）
pub fn parse_answer(raw: &str, format_hint: Option<&str>) -> Answer {
    let cleaned = strip_answer_prefix(strip_fences(raw.trim()));
    if cleaned.is_empty() {
        return Answer::NoAnswer;
    }

    if cleaned.starts_with('{') || cleaned.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<JsonValue>(cleaned) {
            return Answer::Structured(value);
        }
    }

    if hint_forces_text(format_hint) {
        return Answer::Text(unquote(cleaned).to_string());
    }

    let unquoted = unquote(cleaned);

    // 只有未加引号的布尔值和数字才按类型处理
    if unquoted.len() == cleaned.len() {
        match unquoted.to_lowercase().as_str() {
            "true" => return Answer::Boolean(true),
            "false" => return Answer::Boolean(false),
            _ => {}
        }
        if let Some(number) = parse_number(unquoted) {
            return number;
        }
    }

    if unquoted.is_empty() {
        return Answer::NoAnswer;
    }
    Answer::Text(unquoted.to_string())
}

fn hint_forces_text(format_hint: Option<&str>) -> bool {
    format_hint
        .map(|h| h.to_lowercase())
        .is_some_and(|h| matches!(h.trim(), "string" | "text"))
}

const FENCE_LANGUAGES: [&str; 4] = ["json", "text", "txt", "plaintext"];

fn strip_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let body = match rest.find('\n') {
        // 跳过语言标记所在的第一行
        Some(newline) => &rest[newline + 1..],
        // 单行代码块：只去掉已知的语言标记
        None => strip_fence_language(rest),
    };
    body.trim_end().trim_end_matches("```").trim()
}

fn strip_fence_language(rest: &str) -> &str {
    for lang in FENCE_LANGUAGES {
        if let Some(head) = rest.get(..lang.len()) {
            let tail = &rest[lang.len()..];
            if head.eq_ignore_ascii_case(lang) && tail.starts_with(char::is_whitespace) {
                return tail;
            }
        }
    }
    rest
}

fn strip_answer_prefix(text: &str) -> &str {
    const PREFIX: &str = "answer:";
    match text.get(..PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(PREFIX) => text[PREFIX.len()..].trim(),
        _ => text,
    }
}

fn unquote(text: &str) -> &str {
    for quote in ['"', '\'', '`'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return text[1..text.len() - 1].trim();
        }
    }
    text
}

fn parse_number(text: &str) -> Option<Answer> {
    let normalized = if is_grouped_number(text) {
        text.replace(',', "")
    } else {
        text.to_string()
    };

    if let Ok(value) = normalized.parse::<i64>() {
        return Some(Answer::Integer(value));
    }
    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(Answer::Float(value)),
        _ => None,
    }
}

// 形如 1,234,567 或 -1,234.5 的千分位数字
fn is_grouped_number(text: &str) -> bool {
    Regex::new(r"^-?\d{1,3}(,\d{3})+(\.\d+)?$")
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}
