use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, RuntimeErr};
use url::Url;

use crate::config::DatabaseConfig;

// ==================== 数据库连接管理 ====================

/// 解析连接字符串：优先使用配置中的 URL，否则使用默认数据目录下的 SQLite 文件
async fn resolve_database_url(config: &DatabaseConfig) -> Result<String, DbErr> {
    if let Some(url) = config.url.as_deref().filter(|u| !u.trim().is_empty()) {
        return Ok(url.to_string());
    }

    let db_path =
        agora_path::get_db_path().map_err(|e| DbErr::Conn(RuntimeErr::Internal(e)))?;

    let mode = if agora_path::is_custom_data_dir() {
        "自定义"
    } else {
        "标准"
    };

    // 如果数据库不存在，创建目录
    if !db_path.exists() {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                DbErr::Conn(RuntimeErr::Internal(format!("无法创建数据库目录: {}", e)))
            })?;
        }
        log::info!("首次启动，创建{}目录数据库: {}", mode, db_path.display());
    } else {
        log::info!("使用{}目录数据库: {}", mode, db_path.display());
    }

    // 使用 `url` crate 安全地构建连接字符串
    let db_url = Url::from_file_path(&db_path).map_err(|_| {
        DbErr::Conn(RuntimeErr::Internal(format!(
            "Invalid database path: {}",
            db_path.display()
        )))
    })?;

    Ok(format!("sqlite:{}?mode=rwc", db_url.path()))
}

/// Establish a SeaORM database connection.
pub async fn establish_connection(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let connection_string = resolve_database_url(config).await?;

    let mut options = ConnectOptions::new(connection_string);
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .connect_timeout(config.connect_timeout())
        .sqlx_logging(config.sqlx_logging);

    log::debug!("connecting to {}", options.get_url());
    let conn = Database::connect(options).await?;
    log::info!("数据库连接已建立");
    Ok(conn)
}

/// 关闭数据库连接
pub async fn close_connection(conn: DatabaseConnection) -> Result<(), DbErr> {
    conn.close().await?;
    log::info!("数据库连接已关闭");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn configured_url_wins_over_default_path() {
        let config = DatabaseConfig {
            url: Some("sqlite::memory:".to_string()),
            ..DatabaseConfig::default()
        };
        assert_eq!(
            resolve_database_url(&config).await.unwrap(),
            "sqlite::memory:"
        );
    }

    #[tokio::test]
    async fn in_memory_connection_can_be_closed() {
        let config = DatabaseConfig {
            url: Some("sqlite::memory:".to_string()),
            max_connections: 1,
            ..DatabaseConfig::default()
        };
        let conn = establish_connection(&config).await.unwrap();
        close_connection(conn).await.unwrap();
    }
}
