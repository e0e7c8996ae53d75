pub mod auth;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod utils;

use migration::MigratorTrait;
use sea_orm::DatabaseConnection;

pub use config::AppConfig;
pub use database::dto::{ItemFilter, Page, Pagination};
pub use database::repository::{
    items_repository::ItemsRepository, players_repository::PlayersRepository,
};
pub use database::service::{ItemView, Profile, Service};
pub use error::{ErrorKind, RepoError, RepoResult};

/// 应用日志级别、建立数据库连接并执行迁移
pub async fn init(config: &AppConfig) -> RepoResult<DatabaseConnection> {
    if let Err(e) = utils::logs::set_log_level(&config.log_level) {
        log::warn!("忽略配置中的日志级别: {}", e);
    }

    let conn = database::db::establish_connection(&config.database).await?;
    log::info!("数据库连接建立成功");

    log::info!("开始执行数据库迁移...");
    if let Err(e) = migration::Migrator::up(&conn, None).await {
        log::error!("数据库迁移失败: {}", e);
        return Err(e.into());
    }
    log::info!("数据库迁移完成");

    Ok(conn)
}

/// 完成 [`init`] 并用配置中的密钥构造 [`Service`]
pub async fn start(config: &AppConfig) -> RepoResult<Service> {
    let tokens = auth::TokenIssuer::new(&config.auth)?;
    let conn = init(config).await?;
    Ok(Service::new(conn, tokens))
}
