use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use pancheck_core::config::{CacheConfig, CheckerConfig};
use pancheck_core::{PanCheckError, PanCheckResult};
use pancheck_domain::partition::ClassifiedLink;
use pancheck_domain::platform::Platform;
use pancheck_domain::ports::{BatchOutcome, LinkValidator, LinkVerdict, SourceFetcher};

#[derive(Debug, Serialize)]
struct CheckRequestLink<'a> {
    url: &'a str,
    platform: Platform,
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    valid: Vec<String>,
    invalid: Vec<LinkVerdict>,
    #[serde(default)]
    total_duration_ms: i64,
}

/// 调用外部检测服务的HTTP客户端
///
/// 平台限速、反爬和重试都由检测服务自行处理，这里整批提交一次，
/// 并把每个平台生效的限速配置和缓存层配置原样带上。
pub struct HttpLinkValidator {
    checker: CheckerConfig,
    cache: CacheConfig,
    http_client: reqwest::Client,
}

impl HttpLinkValidator {
    pub fn new(checker: CheckerConfig, cache: CacheConfig) -> Self {
        Self {
            checker,
            cache,
            http_client: reqwest::Client::new(),
        }
    }

    /// 组装检测请求体：链接、出现平台的生效限速、缓存层配置
    fn build_payload(&self, links: &[ClassifiedLink]) -> PanCheckResult<serde_json::Value> {
        let payload: Vec<CheckRequestLink<'_>> = links
            .iter()
            .map(|l| CheckRequestLink {
                url: &l.url,
                platform: l.platform,
            })
            .collect();

        let mut rates = serde_json::Map::new();
        for link in links {
            let key = link.platform.as_str();
            if !rates.contains_key(key) {
                let rate = serde_json::to_value(self.checker.rate_for(key))?;
                rates.insert(key.to_string(), rate);
            }
        }

        Ok(json!({
            "links": payload,
            "rates": rates,
            "cache": self.cache,
        }))
    }
}

#[async_trait]
impl LinkValidator for HttpLinkValidator {
    async fn check_batch(
        &self,
        links: &[ClassifiedLink],
        timeout: Duration,
    ) -> PanCheckResult<BatchOutcome> {
        let payload = self.build_payload(links)?;

        debug!(
            "提交 {} 条链接到检测服务 {}",
            links.len(),
            self.checker.endpoint
        );

        let response = self
            .http_client
            .post(&self.checker.endpoint)
            .timeout(timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PanCheckError::Timeout(format!("检测服务调用超时: {e}"))
                } else {
                    PanCheckError::upstream(format!("检测服务连接失败: {e}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("检测服务返回错误: HTTP {} - {}", status, body);
            return Err(PanCheckError::upstream(format!(
                "检测服务返回错误: HTTP {status}"
            )));
        }

        let result: CheckResponse = response
            .json()
            .await
            .map_err(|e| PanCheckError::upstream(format!("检测服务响应解析失败: {e}")))?;

        Ok(BatchOutcome {
            valid: result.valid,
            invalid: result.invalid,
            total_duration_ms: result.total_duration_ms,
        })
    }
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    content: String,
}

/// 调用外部取数服务的HTTP客户端，fetch与transform规格原样透传
pub struct HttpSourceFetcher {
    endpoint: String,
    http_client: reqwest::Client,
}

impl HttpSourceFetcher {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SourceFetcher for HttpSourceFetcher {
    async fn fetch_links(
        &self,
        fetch_command: &str,
        transform_script: Option<&str>,
    ) -> PanCheckResult<String> {
        debug!("调用取数服务 {}", self.endpoint);

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&json!({
                "fetch_command": fetch_command,
                "transform_script": transform_script,
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PanCheckError::Timeout(format!("取数服务调用超时: {e}"))
                } else {
                    PanCheckError::upstream(format!("取数服务连接失败: {e}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("取数服务返回错误: HTTP {} - {}", status, body);
            return Err(PanCheckError::upstream(format!(
                "取数服务返回错误: HTTP {status}"
            )));
        }

        let result: FetchResponse = response
            .json()
            .await
            .map_err(|e| PanCheckError::upstream(format!("取数服务响应解析失败: {e}")))?;

        Ok(result.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pancheck_core::config::PlatformRateConfig;

    fn validator_with_rates() -> HttpLinkValidator {
        let mut checker = CheckerConfig {
            endpoint: "http://127.0.0.1:9000/check".to_string(),
            fetch_endpoint: "http://127.0.0.1:9000/fetch".to_string(),
            check_timeout_seconds: 30,
            scheduled_timeout_extra_seconds: 270,
            invalid_link_ttl_hours: 24,
            default_rate: PlatformRateConfig::default(),
            platform_rates: Default::default(),
        };
        checker.platform_rates.insert(
            "baidu".to_string(),
            PlatformRateConfig {
                concurrency: 1,
                request_delay_ms: 2000,
                max_requests_per_second: 1,
                cache_ttl_hours: 48,
            },
        );

        let cache = CacheConfig {
            enabled: true,
            host: "cache.internal".to_string(),
            port: 6380,
            username: String::new(),
            password: "secret".to_string(),
            invalid_ttl_hours: 72,
        };

        HttpLinkValidator::new(checker, cache)
    }

    fn links() -> Vec<ClassifiedLink> {
        vec![
            ClassifiedLink {
                url: "https://pan.baidu.com/s/abc".to_string(),
                platform: Platform::Baidu,
            },
            ClassifiedLink {
                url: "https://pan.quark.cn/s/def".to_string(),
                platform: Platform::Quark,
            },
        ]
    }

    #[test]
    fn test_payload_carries_effective_rates() {
        let validator = validator_with_rates();
        let payload = validator.build_payload(&links()).unwrap();

        assert_eq!(payload["links"].as_array().unwrap().len(), 2);
        // baidu命中覆盖配置，quark回落到默认值
        assert_eq!(payload["rates"]["baidu"]["concurrency"], 1);
        assert_eq!(payload["rates"]["baidu"]["cache_ttl_hours"], 48);
        assert_eq!(
            payload["rates"]["quark"]["concurrency"],
            PlatformRateConfig::default().concurrency
        );
    }

    #[test]
    fn test_payload_carries_cache_config() {
        let validator = validator_with_rates();
        let payload = validator.build_payload(&links()).unwrap();

        assert_eq!(payload["cache"]["enabled"], true);
        assert_eq!(payload["cache"]["host"], "cache.internal");
        assert_eq!(payload["cache"]["port"], 6380);
        assert_eq!(payload["cache"]["invalid_ttl_hours"], 72);
    }

    #[test]
    fn test_payload_rates_deduplicated_per_platform() {
        let validator = validator_with_rates();
        let mut batch = links();
        batch.push(ClassifiedLink {
            url: "https://pan.baidu.com/s/xyz".to_string(),
            platform: Platform::Baidu,
        });

        let payload = validator.build_payload(&batch).unwrap();
        assert_eq!(payload["rates"].as_object().unwrap().len(), 2);
    }
}
