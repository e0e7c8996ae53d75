//! 基线迁移：创建玩家、条目、标签、评论以及三张关联表
//!
//! 唯一性约束只针对未软删除的行（SQLite 部分索引），
//! 因此被删除条目的 slug 可以被新条目重新使用。

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ConnectionTrait, DatabaseBackend, Statement, TransactionTrait};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        // 开启事务，保证建表的原子性
        let txn = conn.begin().await?;

        create_entity_tables(&txn).await?;
        create_link_tables(&txn).await?;
        create_indexes(&txn).await?;

        txn.commit().await?;

        log::info!("[MIGRATION] baseline schema created");
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();
        let txn = conn.begin().await?;

        // 先删关联表，再删实体表
        for table in [
            "favorites",
            "item_tags",
            "follows",
            "comments",
            "tags",
            "items",
            "players",
        ] {
            txn.execute(Statement::from_string(
                DatabaseBackend::Sqlite,
                format!(r#"DROP TABLE IF EXISTS "{}""#, table),
            ))
            .await?;
        }

        txn.commit().await?;
        Ok(())
    }
}

/// 创建带审计列的实体表
async fn create_entity_tables<C>(conn: &C) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    // 1. 玩家表
    conn.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"CREATE TABLE "players" (
            "id" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
            "username" TEXT NOT NULL,
            "email" TEXT NOT NULL,
            "password" TEXT NOT NULL,
            "bio" TEXT,
            "image" TEXT,
            "created_at" INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            "updated_at" INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            "deleted_at" INTEGER
        )"#,
    ))
    .await?;

    // 2. 条目表，作者创建后不可变
    conn.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"CREATE TABLE "items" (
            "id" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
            "slug" TEXT NOT NULL,
            "title" TEXT NOT NULL,
            "description" TEXT NOT NULL DEFAULT '',
            "body" TEXT NOT NULL DEFAULT '',
            "author_id" INTEGER NOT NULL,
            "created_at" INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            "updated_at" INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            "deleted_at" INTEGER,
            FOREIGN KEY("author_id") REFERENCES "players"("id")
        )"#,
    ))
    .await?;

    // 3. 标签表，标签名全局唯一
    conn.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"CREATE TABLE "tags" (
            "id" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
            "tag" TEXT NOT NULL UNIQUE,
            "created_at" INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            "updated_at" INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            "deleted_at" INTEGER
        )"#,
    ))
    .await?;

    // 4. 评论表
    conn.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"CREATE TABLE "comments" (
            "id" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
            "item_id" INTEGER NOT NULL,
            "player_id" INTEGER NOT NULL,
            "body" TEXT NOT NULL,
            "created_at" INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            "updated_at" INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            "deleted_at" INTEGER,
            FOREIGN KEY("item_id") REFERENCES "items"("id") ON DELETE CASCADE,
            FOREIGN KEY("player_id") REFERENCES "players"("id") ON DELETE CASCADE
        )"#,
    ))
    .await?;

    Ok(())
}

/// 创建三张多对多关联表（复合主键保证每对最多一条边）
async fn create_link_tables<C>(conn: &C) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    conn.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"CREATE TABLE "follows" (
            "follower_id" INTEGER NOT NULL,
            "following_id" INTEGER NOT NULL,
            "created_at" INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            PRIMARY KEY("follower_id", "following_id"),
            FOREIGN KEY("follower_id") REFERENCES "players"("id") ON DELETE CASCADE,
            FOREIGN KEY("following_id") REFERENCES "players"("id") ON DELETE CASCADE
        )"#,
    ))
    .await?;

    conn.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"CREATE TABLE "item_tags" (
            "item_id" INTEGER NOT NULL,
            "tag_id" INTEGER NOT NULL,
            PRIMARY KEY("item_id", "tag_id"),
            FOREIGN KEY("item_id") REFERENCES "items"("id") ON DELETE CASCADE,
            FOREIGN KEY("tag_id") REFERENCES "tags"("id") ON DELETE CASCADE
        )"#,
    ))
    .await?;

    conn.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"CREATE TABLE "favorites" (
            "player_id" INTEGER NOT NULL,
            "item_id" INTEGER NOT NULL,
            "created_at" INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            PRIMARY KEY("player_id", "item_id"),
            FOREIGN KEY("player_id") REFERENCES "players"("id") ON DELETE CASCADE,
            FOREIGN KEY("item_id") REFERENCES "items"("id") ON DELETE CASCADE
        )"#,
    ))
    .await?;

    Ok(())
}

/// 创建唯一索引与查询索引
async fn create_indexes<C>(conn: &C) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    let statements = [
        // 唯一性仅约束存活行
        r#"CREATE UNIQUE INDEX "idx_players_username" ON "players"("username") WHERE "deleted_at" IS NULL"#,
        r#"CREATE UNIQUE INDEX "idx_players_email" ON "players"("email") WHERE "deleted_at" IS NULL"#,
        r#"CREATE UNIQUE INDEX "idx_items_slug" ON "items"("slug") WHERE "deleted_at" IS NULL"#,
        // 列表与 feed 查询
        r#"CREATE INDEX "idx_items_author_created" ON "items"("author_id", "created_at")"#,
        r#"CREATE INDEX "idx_items_created" ON "items"("created_at")"#,
        r#"CREATE INDEX "idx_comments_item" ON "comments"("item_id")"#,
        r#"CREATE INDEX "idx_follows_following" ON "follows"("following_id")"#,
        r#"CREATE INDEX "idx_item_tags_tag" ON "item_tags"("tag_id")"#,
        r#"CREATE INDEX "idx_favorites_item" ON "favorites"("item_id")"#,
    ];

    for sql in statements {
        conn.execute(Statement::from_string(DatabaseBackend::Sqlite, sql))
            .await?;
    }

    Ok(())
}
