use std::collections::HashSet;

use crate::platform::{classify, Platform};

/// 规整去重后的批量链接
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedBatch {
    /// 按首次出现顺序保留的去重链接
    pub links: Vec<String>,
    /// 因与已有规整结果相同而丢弃的条数
    pub duplicate_count: i64,
    /// 保留下来但无法识别平台且不具备URL形态的条数
    pub invalid_format_count: i64,
}

impl NormalizedBatch {
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// 规整单条输入：去除首尾空白，缺少scheme时补全https://
pub fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let lower = trimmed.to_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Some(trimmed.to_string())
    } else {
        Some(format!("https://{trimmed}"))
    }
}

/// 基础URL形态检查：host段须含'.'且无空白
fn has_url_shape(link: &str) -> bool {
    let rest = link
        .strip_prefix("https://")
        .or_else(|| link.strip_prefix("http://"))
        .unwrap_or(link);

    let host = rest.split(['/', '?', '#']).next().unwrap_or("");
    host.contains('.') && !host.is_empty() && !host.chars().any(char::is_whitespace)
}

/// 解析多行文本为去重后的链接批次
///
/// 处理步骤：按行拆分、裁剪、丢弃空行、补全scheme、
/// 按首次出现顺序去重。重复条数与无法识别的条数只计数，不影响保留结果。
pub fn parse_batch(text: &str) -> NormalizedBatch {
    let mut seen = HashSet::new();
    let mut links = Vec::new();
    let mut duplicate_count = 0i64;
    let mut invalid_format_count = 0i64;

    for line in text.lines() {
        let Some(normalized) = normalize(line) else {
            continue;
        };

        if !seen.insert(normalized.clone()) {
            duplicate_count += 1;
            continue;
        }

        if classify(&normalized) == Platform::Unknown && !has_url_shape(&normalized) {
            invalid_format_count += 1;
        }
        links.push(normalized);
    }

    NormalizedBatch {
        links,
        duplicate_count,
        invalid_format_count,
    }
}
