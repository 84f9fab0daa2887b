use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use pancheck_core::PanCheckError;

/// 网盘平台标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Quark,
    Uc,
    Baidu,
    Tianyi,
    Pan123,
    Pan115,
    Aliyun,
    Xunlei,
    Cmcc,
    Unknown,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Quark => "quark",
            Platform::Uc => "uc",
            Platform::Baidu => "baidu",
            Platform::Tianyi => "tianyi",
            Platform::Pan123 => "pan123",
            Platform::Pan115 => "pan115",
            Platform::Aliyun => "aliyun",
            Platform::Xunlei => "xunlei",
            Platform::Cmcc => "cmcc",
            Platform::Unknown => "unknown",
        }
    }

    /// 平台的中文展示名
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Quark => "夸克网盘",
            Platform::Uc => "UC网盘",
            Platform::Baidu => "百度网盘",
            Platform::Tianyi => "天翼云盘",
            Platform::Pan123 => "123云盘",
            Platform::Pan115 => "115网盘",
            Platform::Aliyun => "阿里云盘",
            Platform::Xunlei => "迅雷云盘",
            Platform::Cmcc => "移动云盘",
            Platform::Unknown => "未知平台",
        }
    }

    /// 所有可识别的平台，不含unknown
    pub fn supported() -> &'static [Platform] {
        &[
            Platform::Quark,
            Platform::Uc,
            Platform::Baidu,
            Platform::Tianyi,
            Platform::Pan123,
            Platform::Pan115,
            Platform::Aliyun,
            Platform::Xunlei,
            Platform::Cmcc,
        ]
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = PanCheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quark" => Ok(Platform::Quark),
            "uc" => Ok(Platform::Uc),
            "baidu" => Ok(Platform::Baidu),
            "tianyi" => Ok(Platform::Tianyi),
            "pan123" | "123" => Ok(Platform::Pan123),
            "pan115" | "115" => Ok(Platform::Pan115),
            "aliyun" => Ok(Platform::Aliyun),
            "xunlei" => Ok(Platform::Xunlei),
            "cmcc" => Ok(Platform::Cmcc),
            "unknown" => Ok(Platform::Unknown),
            _ => Err(PanCheckError::validation(format!("不支持的平台: {s}"))),
        }
    }
}

/// 识别规则表，顺序固定，先命中先归类
static PLATFORM_PATTERNS: Lazy<Vec<(Platform, Regex)>> = Lazy::new(|| {
    let patterns: &[(Platform, &str)] = &[
        (
            Platform::Quark,
            r"(?i)(?:https?://)?(?:pan\.quark\.cn|quark\.cn|pan\.qoark\.cn)/s/[a-zA-Z0-9]+",
        ),
        (
            Platform::Uc,
            r"(?i)(?:https?://)?(?:drive\.uc\.cn|fast\.uc\.cn)/s/[a-zA-Z0-9]+",
        ),
        (
            Platform::Baidu,
            r"(?i)(?:https?://)?pan\.baidu\.com/s/[a-zA-Z0-9_\-]+",
        ),
        (
            Platform::Tianyi,
            r"(?i)(?:https?://)?(?:h5\.)?cloud\.189\.cn/(?:t/[a-zA-Z0-9]+|web/share\?code=[a-zA-Z0-9]+|share\.html#/t/[a-zA-Z0-9]+)",
        ),
        (
            Platform::Pan123,
            r"(?i)(?:https?://)?(?:www\.)?(?:123pan\.com|123pan\.cn|123684\.com|123685\.com|123912\.com|123592\.com|123865\.com)/s/[a-zA-Z0-9\-]+",
        ),
        (
            Platform::Pan115,
            r"(?i)(?:https?://)?(?:115\.com|115cdn\.com|anxia\.com)/s/[a-zA-Z0-9]+",
        ),
        (
            Platform::Aliyun,
            r"(?i)(?:https?://)?(?:www\.)?(?:aliyundrive\.com|alipan\.com)/s/[a-zA-Z0-9]+",
        ),
        (
            Platform::Xunlei,
            r"(?i)(?:https?://)?pan\.xunlei\.com/s/[a-zA-Z0-9_\-]+",
        ),
        (
            Platform::Cmcc,
            r"(?i)(?:https?://)?(?:yun\.139\.com/shareweb/#/w/i/[a-zA-Z0-9]+|caiyun\.139\.com/m/i\?[a-zA-Z0-9]+)",
        ),
    ];

    patterns
        .iter()
        .map(|(platform, pattern)| {
            // 规则表是常量，解析失败属于编程错误
            (*platform, Regex::new(pattern).expect("平台识别正则无效"))
        })
        .collect()
});

/// 识别单条链接所属的平台，无法识别时返回unknown
pub fn classify(link: &str) -> Platform {
    for (platform, pattern) in PLATFORM_PATTERNS.iter() {
        if pattern.is_match(link) {
            return *platform;
        }
    }
    Platform::Unknown
}
