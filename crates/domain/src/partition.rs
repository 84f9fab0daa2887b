use serde::{Deserialize, Serialize};

use crate::platform::{classify, Platform};

/// 归类后的链接
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedLink {
    pub url: String,
    pub platform: Platform,
}

/// 一次提交按检测时机切分的结果
#[derive(Debug, Clone, Default)]
pub struct SubmissionPartition {
    /// 立即送检的链接
    pub instant: Vec<ClassifiedLink>,
    /// 留待定时任务处理的链接
    pub deferred: Vec<ClassifiedLink>,
}

/// 批量归类，保持输入顺序
pub fn classify_batch(links: &[String]) -> Vec<ClassifiedLink> {
    links
        .iter()
        .map(|url| ClassifiedLink {
            url: url.clone(),
            platform: classify(url),
        })
        .collect()
}

/// 按用户选择的平台切分链接
///
/// 选择为空表示未做筛选，全部立即送检；
/// 非空时只有命中选择的平台立即送检，其余(含unknown)延后。
pub fn partition(links: Vec<ClassifiedLink>, selection: &[Platform]) -> SubmissionPartition {
    if selection.is_empty() {
        return SubmissionPartition {
            instant: links,
            deferred: Vec::new(),
        };
    }

    let mut result = SubmissionPartition::default();
    for link in links {
        if link.platform != Platform::Unknown && selection.contains(&link.platform) {
            result.instant.push(link);
        } else {
            result.deferred.push(link);
        }
    }
    result
}
