//! 玩家数据仓库
//!
//! 玩家 CRUD 以及关注关系维护。关注边的增删都是幂等的。

use crate::database::dto::{NewPlayer, PlayerWithFollowers, UpdatePlayer};
use crate::database::repository::query::{live_players, load_followers, now};
use crate::entity::prelude::*;
use crate::entity::{follows, players};
use crate::error::{RepoError, RepoResult};
use sea_orm::*;

/// 玩家数据仓库
pub struct PlayersRepository;

impl PlayersRepository {
    // ==================== 查询操作 ====================

    /// 根据 ID 查询玩家
    pub async fn find_by_id(
        db: &DatabaseConnection,
        id: i32,
    ) -> RepoResult<Option<players::Model>> {
        Ok(live_players()
            .filter(players::Column::Id.eq(id))
            .one(db)
            .await?)
    }

    /// 根据邮箱查询玩家
    pub async fn find_by_email(
        db: &DatabaseConnection,
        email: &str,
    ) -> RepoResult<Option<players::Model>> {
        Ok(live_players()
            .filter(players::Column::Email.eq(email))
            .one(db)
            .await?)
    }

    /// 根据用户名查询玩家，并预加载入向关注边
    pub async fn find_by_username(
        db: &DatabaseConnection,
        username: &str,
    ) -> RepoResult<Option<PlayerWithFollowers>> {
        let Some(player) = live_players()
            .filter(players::Column::Username.eq(username))
            .one(db)
            .await?
        else {
            return Ok(None);
        };

        let followers = load_followers(db, &[player.id])
            .await?
            .remove(&player.id)
            .unwrap_or_default();

        Ok(Some(PlayerWithFollowers { player, followers }))
    }

    // ==================== 玩家 CRUD 操作 ====================

    /// 创建玩家，用户名或邮箱冲突时返回校验错误
    pub async fn create(db: &DatabaseConnection, player: NewPlayer) -> RepoResult<players::Model> {
        if player.username.trim().is_empty() {
            return Err(RepoError::Validation("username is required".to_string()));
        }
        if player.email.trim().is_empty() {
            return Err(RepoError::Validation("email is required".to_string()));
        }
        if player.password_hash.is_empty() {
            return Err(RepoError::Validation("password is required".to_string()));
        }

        let txn = db.begin().await?;

        Self::ensure_unique(&txn, None, Some(&player.username), Some(&player.email)).await?;

        let now = now();
        let active = players::ActiveModel {
            id: NotSet,
            username: Set(player.username),
            email: Set(player.email),
            password: Set(player.password_hash),
            bio: Set(player.bio),
            image: Set(player.image),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };
        let created = active.insert(&txn).await?;

        txn.commit().await?;

        log::debug!("created player {} ({})", created.id, created.username);
        Ok(created)
    }

    /// 更新玩家
    ///
    /// 支持部分更新，未提供的字段保持不变
    pub async fn update(
        db: &DatabaseConnection,
        id: i32,
        updates: UpdatePlayer,
    ) -> RepoResult<players::Model> {
        let txn = db.begin().await?;

        let existing = live_players()
            .filter(players::Column::Id.eq(id))
            .one(&txn)
            .await?
            .ok_or_else(|| RepoError::not_found("player", id))?;

        // 只有真正变化的字段才需要唯一性检查
        let new_username = updates
            .username
            .as_deref()
            .filter(|u| *u != existing.username);
        let new_email = updates.email.as_deref().filter(|e| *e != existing.email);
        if new_username.is_some_and(|u| u.trim().is_empty()) {
            return Err(RepoError::Validation("username is required".to_string()));
        }
        if new_email.is_some_and(|e| e.trim().is_empty()) {
            return Err(RepoError::Validation("email is required".to_string()));
        }
        Self::ensure_unique(&txn, Some(id), new_username, new_email).await?;

        let mut active: players::ActiveModel = existing.into();

        if let Some(username) = updates.username {
            active.username = Set(username);
        }
        if let Some(email) = updates.email {
            active.email = Set(email);
        }
        if let Some(password) = updates.password_hash {
            active.password = Set(password);
        }
        if let Some(bio) = updates.bio {
            active.bio = Set(bio);
        }
        if let Some(image) = updates.image {
            active.image = Set(image);
        }
        active.updated_at = Set(now());

        let updated = active.update(&txn).await?;
        txn.commit().await?;

        log::debug!("updated player {}", updated.id);
        Ok(updated)
    }

    // ==================== 关注关系 ====================

    /// 添加关注边：`follower_id` 关注 `player_id`，已存在时为空操作
    pub async fn add_follower(
        db: &DatabaseConnection,
        player_id: i32,
        follower_id: i32,
    ) -> RepoResult<()> {
        let txn = db.begin().await?;

        for id in [player_id, follower_id] {
            if live_players()
                .filter(players::Column::Id.eq(id))
                .count(&txn)
                .await?
                == 0
            {
                return Err(RepoError::not_found("player", id));
            }
        }

        if Self::edge_exists(&txn, player_id, follower_id).await? {
            return Ok(());
        }

        let edge = follows::ActiveModel {
            follower_id: Set(follower_id),
            following_id: Set(player_id),
            created_at: Set(now()),
        };
        Follows::insert(edge).exec_without_returning(&txn).await?;

        txn.commit().await?;

        log::debug!("player {} now follows {}", follower_id, player_id);
        Ok(())
    }

    /// 删除关注边，边不存在时为空操作
    pub async fn remove_follower(
        db: &DatabaseConnection,
        player_id: i32,
        follower_id: i32,
    ) -> RepoResult<()> {
        let result = Follows::delete_many()
            .filter(
                follows::Column::FollowerId
                    .eq(follower_id)
                    .and(follows::Column::FollowingId.eq(player_id)),
            )
            .exec(db)
            .await?;

        log::debug!(
            "player {} unfollowed {} ({} rows)",
            follower_id,
            player_id,
            result.rows_affected
        );
        Ok(())
    }

    /// `follower_id` 是否关注了 `player_id`
    pub async fn is_follower(
        db: &DatabaseConnection,
        player_id: i32,
        follower_id: i32,
    ) -> RepoResult<bool> {
        Ok(Self::edge_exists(db, player_id, follower_id).await?)
    }

    // ==================== 私有方法 ====================

    async fn edge_exists<C>(db: &C, player_id: i32, follower_id: i32) -> Result<bool, DbErr>
    where
        C: ConnectionTrait,
    {
        let count = Follows::find()
            .filter(
                follows::Column::FollowerId
                    .eq(follower_id)
                    .and(follows::Column::FollowingId.eq(player_id)),
            )
            .count(db)
            .await?;

        Ok(count > 0)
    }

    /// 检查用户名和邮箱在存活玩家中是否已被占用（排除 `except_id` 自身）
    async fn ensure_unique<C>(
        db: &C,
        except_id: Option<i32>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> RepoResult<()>
    where
        C: ConnectionTrait,
    {
        let scoped = || {
            let query = live_players();
            match except_id {
                Some(id) => query.filter(players::Column::Id.ne(id)),
                None => query,
            }
        };

        if let Some(username) = username {
            let taken = scoped()
                .filter(players::Column::Username.eq(username))
                .count(db)
                .await?;
            if taken > 0 {
                return Err(RepoError::Validation(format!(
                    "username '{}' has already been taken",
                    username
                )));
            }
        }

        if let Some(email) = email {
            let taken = scoped()
                .filter(players::Column::Email.eq(email))
                .count(db)
                .await?;
            if taken > 0 {
                return Err(RepoError::Validation(format!(
                    "email '{}' has already been taken",
                    email
                )));
            }
        }

        Ok(())
    }
}
