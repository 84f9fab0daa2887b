pub mod sqlite;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;

use pancheck_core::config::DatabaseConfig;
use pancheck_core::PanCheckResult;

/// SQLite数据库连接，持有连接池并负责建表
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// 按配置建立连接池，启用外键约束和WAL模式
    pub async fn connect(config: &DatabaseConfig) -> PanCheckResult<Self> {
        debug!("连接数据库: {}", config.url);

        let connect_options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect_with(connect_options)
            .await?;

        Self::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// 内存库，供测试使用；单连接保证所有操作看到同一个库
    pub async fn connect_in_memory() -> PanCheckResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_migrations(pool: &SqlitePool) -> PanCheckResult<()> {
        debug!("执行数据库建表");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS submission_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source TEXT NOT NULL,
                client_ip TEXT,
                selected_platforms TEXT NOT NULL DEFAULT '[]',
                links TEXT NOT NULL DEFAULT '[]',
                duplicate_count INTEGER NOT NULL DEFAULT 0,
                invalid_format_count INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'PENDING',
                total_duration_ms INTEGER,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scheduled_tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                tags TEXT NOT NULL DEFAULT '[]',
                fetch_command TEXT NOT NULL,
                transform_script TEXT,
                cron_expression TEXT NOT NULL,
                selected_platforms TEXT NOT NULL DEFAULT '[]',
                auto_destroy_at DATETIME,
                status TEXT NOT NULL DEFAULT 'STOPPED',
                last_run_at DATETIME,
                next_run_at DATETIME,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        // 不挂外键：任务删除后执行记录保留作审计
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS task_executions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'RUNNING',
                links_count INTEGER NOT NULL DEFAULT 0,
                checked_count INTEGER NOT NULL DEFAULT 0,
                valid_count INTEGER NOT NULL DEFAULT 0,
                invalid_count INTEGER NOT NULL DEFAULT 0,
                error_message TEXT,
                duration_ms INTEGER,
                started_at DATETIME NOT NULL,
                finished_at DATETIME,
                created_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS invalid_links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL UNIQUE,
                platform TEXT NOT NULL,
                failure_reason TEXT NOT NULL,
                is_rate_limited INTEGER NOT NULL DEFAULT 0,
                check_duration_ms INTEGER,
                submission_id INTEGER,
                created_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        let indexes = [
            "CREATE INDEX IF NOT EXISTS idx_submission_records_status ON submission_records(status)",
            "CREATE INDEX IF NOT EXISTS idx_submission_records_created_at ON submission_records(created_at)",
            "CREATE INDEX IF NOT EXISTS idx_scheduled_tasks_status ON scheduled_tasks(status)",
            "CREATE INDEX IF NOT EXISTS idx_scheduled_tasks_next_run_at ON scheduled_tasks(next_run_at)",
            "CREATE INDEX IF NOT EXISTS idx_task_executions_task_id ON task_executions(task_id)",
            "CREATE INDEX IF NOT EXISTS idx_task_executions_status ON task_executions(status)",
            "CREATE INDEX IF NOT EXISTS idx_invalid_links_rate_limited ON invalid_links(is_rate_limited)",
            "CREATE INDEX IF NOT EXISTS idx_invalid_links_created_at ON invalid_links(created_at)",
        ];
        for index_sql in indexes {
            sqlx::query(index_sql).execute(pool).await?;
        }

        debug!("数据库建表完成");
        Ok(())
    }
}
