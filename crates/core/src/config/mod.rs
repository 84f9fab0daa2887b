use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

mod models;

pub use models::{
    CacheConfig, CheckerConfig, DatabaseConfig, PlatformRateConfig, SchedulerConfig, ServerConfig,
};

/// 系统配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub checker: CheckerConfig,
    pub cache: CacheConfig,
    pub scheduler: SchedulerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: "0.0.0.0:8080".to_string(),
                cors_enabled: true,
                cors_origins: vec!["*".to_string()],
                request_timeout_seconds: 30,
            },
            database: DatabaseConfig {
                url: "sqlite:data/pancheck.db".to_string(),
                max_connections: 10,
                min_connections: 1,
                connection_timeout_seconds: 30,
                idle_timeout_seconds: 600,
            },
            checker: CheckerConfig {
                endpoint: "http://127.0.0.1:9000/check".to_string(),
                fetch_endpoint: "http://127.0.0.1:9000/fetch".to_string(),
                check_timeout_seconds: 30,
                scheduled_timeout_extra_seconds: 270,
                invalid_link_ttl_hours: 24,
                default_rate: PlatformRateConfig::default(),
                platform_rates: HashMap::new(),
            },
            cache: CacheConfig::default(),
            scheduler: SchedulerConfig {
                expire_check_interval_seconds: 60,
            },
        }
    }
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序:
    /// 1. 默认配置
    /// 2. 配置文件 (TOML格式)
    /// 3. 环境变量覆盖 (前缀: PANCHECK_)
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let defaults = AppConfig::default();
        let default_toml = toml::to_string(&defaults).context("序列化默认配置失败")?;

        let mut builder = ConfigBuilder::builder()
            .add_source(File::from_str(&default_toml, FileFormat::Toml));

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else {
            let default_paths = ["config/pancheck.toml", "pancheck.toml", "/etc/pancheck/config.toml"];
            for path in &default_paths {
                if Path::new(path).exists() {
                    builder = builder.add_source(File::new(path, FileFormat::Toml));
                    break;
                }
            }
        }

        // 环境变量覆盖，优先级最高
        builder = builder.add_source(
            Environment::with_prefix("PANCHECK")
                .separator("_")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;
        Ok(config)
    }

    /// 从TOML字符串加载配置
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;
        config.validate()?;
        Ok(config)
    }

    /// 序列化为TOML字符串
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }

    /// 校验配置有效性
    pub fn validate(&self) -> Result<()> {
        self.server.validate().context("服务配置验证失败")?;
        self.database.validate().context("数据库配置验证失败")?;
        self.checker.validate().context("检测配置验证失败")?;
        self.cache.validate().context("缓存配置验证失败")?;
        self.scheduler.validate().context("巡检配置验证失败")?;
        Ok(())
    }
}
