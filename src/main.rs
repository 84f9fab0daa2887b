use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Arg, Command};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pancheck_api::{create_app, AppState};
use pancheck_core::AppConfig;
use pancheck_domain::services::{
    ExecutionRecorder, ScheduledTaskService, StatisticsService, SubmissionService, TaskRunner,
};
use pancheck_infrastructure::database::sqlite::{
    SqliteInvalidLinkRepository, SqliteScheduledTaskRepository, SqliteStatisticsRepository,
    SqliteSubmissionRepository, SqliteTaskExecutionRepository,
};
use pancheck_infrastructure::{Database, HttpLinkValidator, HttpSourceFetcher};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("pancheck")
        .version(env!("CARGO_PKG_VERSION"))
        .about("网盘分享链接检测系统")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .default_value("info"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式")
                .value_parser(["json", "pretty"])
                .default_value("pretty"),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config");
    let log_level = matches.get_one::<String>("log-level").unwrap();
    let log_format = matches.get_one::<String>("log-format").unwrap();

    init_logging(log_level, log_format)?;

    info!("启动网盘链接检测系统");
    if let Some(path) = config_path {
        info!("配置文件: {path}");
    }

    let config = AppConfig::load(config_path.map(String::as_str)).context("加载配置失败")?;

    let database = Database::connect(&config.database)
        .await
        .context("连接数据库失败")?;
    let pool = database.pool().clone();

    // 仓储和服务装配
    let submission_repo = Arc::new(SqliteSubmissionRepository::new(pool.clone()));
    let invalid_link_repo = Arc::new(SqliteInvalidLinkRepository::new(pool.clone()));
    let task_repo = Arc::new(SqliteScheduledTaskRepository::new(pool.clone()));
    let execution_repo = Arc::new(SqliteTaskExecutionRepository::new(pool.clone()));

    let validator = Arc::new(HttpLinkValidator::new(
        config.checker.clone(),
        config.cache.clone(),
    ));
    let fetcher = Arc::new(HttpSourceFetcher::new(config.checker.fetch_endpoint.clone()));

    let submissions = Arc::new(SubmissionService::new(
        submission_repo,
        invalid_link_repo.clone(),
        validator,
        Duration::from_secs(config.checker.check_timeout_seconds),
        Duration::from_secs(config.checker.scheduled_timeout_extra_seconds),
    ));
    let tasks = Arc::new(ScheduledTaskService::new(task_repo.clone()));
    let recorder = Arc::new(ExecutionRecorder::new(execution_repo));
    let runner = Arc::new(TaskRunner::new(
        task_repo,
        fetcher,
        submissions.clone(),
        recorder.clone(),
    ));
    let statistics = Arc::new(StatisticsService::new(Arc::new(
        SqliteStatisticsRepository::new(pool.clone()),
    )));

    // 后台巡检：任务过期标记 + 无效登记的保留时长清理
    let sweeper = tokio::spawn(expiry_sweeper(
        tasks.clone(),
        invalid_link_repo,
        config.scheduler.expire_check_interval_seconds,
        config.checker.invalid_link_ttl_hours,
    ));

    let app = create_app(AppState {
        submissions,
        tasks,
        runner,
        recorder,
        statistics,
    });

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("监听地址失败: {}", config.server.bind_address))?;
    info!("HTTP服务已启动: {}", config.server.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .context("HTTP服务异常退出")?;

    sweeper.abort();
    info!("网盘链接检测系统已退出");
    Ok(())
}

/// 初始化日志系统
fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        "pretty" => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
        _ => {
            return Err(anyhow::anyhow!("不支持的日志格式: {log_format}"));
        }
    }

    Ok(())
}

/// 周期巡检：到达自毁时间的active任务标记过期，过期的无效登记清除
async fn expiry_sweeper(
    tasks: Arc<ScheduledTaskService>,
    invalid_links: Arc<SqliteInvalidLinkRepository>,
    interval_seconds: u64,
    invalid_link_ttl_hours: u64,
) {
    use pancheck_domain::repositories::InvalidLinkRepository;

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_seconds));
    loop {
        ticker.tick().await;

        match tasks.check_expired(Utc::now()).await {
            Ok(count) if count > 0 => info!(count, "巡检标记过期任务"),
            Ok(_) => {}
            Err(e) => error!(error = %e, "过期任务巡检失败"),
        }

        let cutoff = Utc::now() - chrono::Duration::hours(invalid_link_ttl_hours as i64);
        match invalid_links.delete_older_than(cutoff).await {
            Ok(removed) if removed > 0 => info!(removed, "清理过期的无效链接登记"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "无效链接登记清理失败"),
        }
    }
}

/// 等待关闭信号
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("安装Ctrl+C信号处理器失败");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("安装SIGTERM信号处理器失败")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到Ctrl+C信号");
        },
        _ = terminate => {
            info!("收到SIGTERM信号");
        },
    }
}
