use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// HTTP服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub cors_enabled: bool,
    pub cors_origins: Vec<String>,
    pub request_timeout_seconds: u64,
}

impl ServerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_address.is_empty() {
            return Err(anyhow::anyhow!("监听地址不能为空"));
        }
        if !self.bind_address.contains(':') {
            return Err(anyhow::anyhow!("监听地址必须包含端口: {}", self.bind_address));
        }
        if self.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("请求超时时间必须大于0"));
        }
        Ok(())
    }
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
}

impl DatabaseConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.url.is_empty() {
            return Err(anyhow::anyhow!("数据库URL不能为空"));
        }
        if !self.url.starts_with("sqlite:") {
            return Err(anyhow::anyhow!("数据库URL必须是SQLite格式"));
        }
        if self.max_connections == 0 {
            return Err(anyhow::anyhow!("最大连接数必须大于0"));
        }
        if self.min_connections > self.max_connections {
            return Err(anyhow::anyhow!("最小连接数不能大于最大连接数"));
        }
        if self.connection_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("连接超时时间必须大于0"));
        }
        Ok(())
    }
}

/// 单个网盘平台的限速配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformRateConfig {
    pub concurrency: u32,
    pub request_delay_ms: u64,
    pub max_requests_per_second: u32,
    pub cache_ttl_hours: u64,
}

impl Default for PlatformRateConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            request_delay_ms: 500,
            max_requests_per_second: 4,
            cache_ttl_hours: 24,
        }
    }
}

impl PlatformRateConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.concurrency == 0 {
            return Err(anyhow::anyhow!("并发数必须大于0"));
        }
        if self.max_requests_per_second == 0 {
            return Err(anyhow::anyhow!("每秒请求上限必须大于0"));
        }
        Ok(())
    }
}

/// 链接检测配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckerConfig {
    /// 检测服务地址
    pub endpoint: String,
    /// 取数管道服务地址
    pub fetch_endpoint: String,
    /// 单批检测的基础超时
    pub check_timeout_seconds: u64,
    /// 定时任务检测在基础超时上追加的余量
    pub scheduled_timeout_extra_seconds: u64,
    /// 无效链接登记的保留时长
    pub invalid_link_ttl_hours: u64,
    /// 平台默认限速
    pub default_rate: PlatformRateConfig,
    /// 按平台覆盖的限速，键为平台标识
    pub platform_rates: HashMap<String, PlatformRateConfig>,
}

impl CheckerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.endpoint.is_empty() {
            return Err(anyhow::anyhow!("检测服务地址不能为空"));
        }
        if self.check_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("检测超时时间必须大于0"));
        }
        if self.invalid_link_ttl_hours == 0 {
            return Err(anyhow::anyhow!("无效链接保留时长必须大于0"));
        }
        self.default_rate.validate()?;
        for (platform, rate) in &self.platform_rates {
            rate.validate()
                .map_err(|e| anyhow::anyhow!("平台 {platform} 限速配置无效: {e}"))?;
        }
        Ok(())
    }

    /// 取指定平台的限速配置，没有覆盖时回落到默认值
    pub fn rate_for(&self, platform: &str) -> &PlatformRateConfig {
        self.platform_rates.get(platform).unwrap_or(&self.default_rate)
    }
}

/// 检测结果缓存层配置
///
/// 本服务不直接连缓存，整段配置随检测请求透传给检测服务。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    /// 留空则只使用密码
    pub username: String,
    pub password: String,
    /// 缓存中无效链接的统一过期时间
    pub invalid_ttl_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "localhost".to_string(),
            port: 6379,
            username: String::new(),
            password: String::new(),
            invalid_ttl_hours: 168,
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.host.is_empty() {
            return Err(anyhow::anyhow!("缓存地址不能为空"));
        }
        if self.port == 0 {
            return Err(anyhow::anyhow!("缓存端口必须大于0"));
        }
        if self.invalid_ttl_hours == 0 {
            return Err(anyhow::anyhow!("缓存无效链接过期时间必须大于0"));
        }
        Ok(())
    }
}

/// 定时任务巡检配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// 过期任务巡检间隔
    pub expire_check_interval_seconds: u64,
}

impl SchedulerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.expire_check_interval_seconds == 0 {
            return Err(anyhow::anyhow!("过期巡检间隔必须大于0"));
        }
        Ok(())
    }
}
