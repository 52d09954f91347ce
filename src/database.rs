//! # 数据库模块
//!
//! 数据库连接和迁移管理

use std::path::Path;
use std::time::Duration;

use sea_orm::sqlx::sqlite::SqliteJournalMode;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;

use crate::config::DatabaseConfig;
use crate::error::{AuthError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lerror, linfo};

/// SQLite 等待写锁的最长时间
const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// 是否为 SQLite 内存库
fn is_memory_sqlite(url: &str) -> bool {
    url.starts_with("sqlite:") && url.contains(":memory:")
}

/// SQLite 文件路径，内存库和非 SQLite 返回 `None`
fn sqlite_file_path(url: &str) -> Option<&Path> {
    if !url.starts_with("sqlite:") || is_memory_sqlite(url) {
        return None;
    }
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or(path);
    (!path.is_empty()).then(|| Path::new(path))
}

/// 日志中隐藏连接串里的密码
pub(crate) fn redact_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => match parsed.set_password(Some("***")) {
            Ok(()) => parsed.to_string(),
            Err(()) => "***".to_string(),
        },
        _ => url.to_string(),
    }
}

/// 确保 SQLite 数据库文件所在目录存在
fn ensure_sqlite_dir(url: &str) -> Result<()> {
    let Some(parent_dir) = sqlite_file_path(url).and_then(Path::parent) else {
        return Ok(());
    };
    if parent_dir.as_os_str().is_empty() || parent_dir.exists() {
        return Ok(());
    }

    std::fs::create_dir_all(parent_dir).map_err(|e| {
        AuthError::persistence_with_source(
            format!("无法创建数据库目录 {}", parent_dir.display()),
            e,
        )
    })?;
    ldebug!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "create_db_dir",
        "数据库目录创建成功",
        path = %parent_dir.display()
    );
    Ok(())
}

/// 初始化数据库连接
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "db_connect",
        "正在连接数据库",
        url = %redact_url(&config.url)
    );

    ensure_sqlite_dir(&config.url)?;

    let mut options = ConnectOptions::new(config.url.clone());
    // 内存库每个连接都是独立的数据库；文件库同一时刻只允许一个写事务，
    // 多连接时延迟事务的读锁升级会直接返回 SQLITE_BUSY，因此 SQLite 一律单连接
    let max_connections = if config.url.starts_with("sqlite:") {
        1
    } else {
        config.max_connections
    };
    options
        .max_connections(max_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    if sqlite_file_path(&config.url).is_some() {
        options.map_sqlx_sqlite_opts(|opts| {
            opts.journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(SQLITE_BUSY_TIMEOUT)
        });
    }

    let db = Database::connect(options)
        .await
        .map_err(|e| AuthError::persistence_with_source("数据库连接失败", e))?;

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "db_connected",
        "数据库连接成功",
        max_connections = max_connections
    );
    Ok(db)
}

/// 运行数据库迁移
pub async fn run_migrations(db: &DatabaseConnection) -> Result<()> {
    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "run_migrations",
        "开始运行数据库迁移"
    );

    let pending = pending_migrations(db)
        .await
        .map_err(|e| AuthError::persistence_with_source("读取迁移状态失败", e))?;
    if pending == 0 {
        ldebug!(
            "system",
            LogStage::Startup,
            LogComponent::Database,
            "migrations_up_to_date",
            "没有待应用的迁移"
        );
        return Ok(());
    }

    match ::migration::Migrator::up(db, None).await {
        Ok(()) => {
            linfo!(
                "system",
                LogStage::Startup,
                LogComponent::Database,
                "migrations_done",
                "数据库迁移完成",
                applied = pending
            );
            Ok(())
        }
        Err(e) => {
            lerror!(
                "system",
                LogStage::Startup,
                LogComponent::Database,
                "migrations_failed",
                "数据库迁移失败",
                error = %e
            );
            Err(AuthError::persistence_with_source("数据库迁移失败", e))
        }
    }
}

/// 待应用的迁移数量
pub async fn pending_migrations(db: &DatabaseConnection) -> std::result::Result<usize, DbErr> {
    Ok(::migration::Migrator::get_pending_migrations(db)
        .await?
        .len())
}
