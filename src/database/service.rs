//! 面向适配层的用例
//!
//! 适配层解析请求后调用这里的方法；所有权校验、密码哈希与令牌签发都在此完成，
//! 仓库只负责数据读写。返回值不含任何传输层细节。

use sea_orm::DatabaseConnection;
use serde::Serialize;

use crate::auth::{hash_password, verify_password, TokenIssuer};
use crate::database::dto::{
    CommentWithAuthor, ItemFilter, ItemWithRelations, NewItem, NewPlayer, NewPlayerInput, Page,
    Pagination, UpdateItem, UpdatePlayer, UpdatePlayerInput,
};
use crate::database::repository::{
    items_repository::ItemsRepository, players_repository::PlayersRepository,
};
use crate::entity::{items, players};
use crate::error::{RepoError, RepoResult};

// ==================== 视图类型 ====================

/// 以某个观察者视角呈现的玩家资料
#[derive(Clone, Debug, Serialize)]
pub struct Profile {
    pub player: players::Model,
    pub following: bool,
}

/// 以某个观察者视角呈现的条目
#[derive(Clone, Debug, Serialize)]
pub struct ItemView {
    pub item: ItemWithRelations,
    pub favorited: bool,
    pub favorites_count: usize,
    /// 观察者是否关注了作者
    pub following: bool,
}

impl ItemView {
    pub fn for_viewer(item: ItemWithRelations, viewer: Option<i32>) -> Self {
        let favorited = viewer.is_some_and(|id| item.favorited_by_player(id));
        let following = viewer.is_some_and(|id| item.author.followed_by(id));
        let favorites_count = item.favorites_count();
        Self {
            item,
            favorited,
            favorites_count,
            following,
        }
    }
}

/// 用例入口，持有数据库连接与令牌签发器
#[derive(Clone, Debug)]
pub struct Service {
    db: DatabaseConnection,
    tokens: TokenIssuer,
}

impl Service {
    pub fn new(db: DatabaseConnection, tokens: TokenIssuer) -> Self {
        Self { db, tokens }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    // ==================== 玩家相关 ====================

    /// 注册：哈希密码、创建玩家并签发令牌
    pub async fn sign_up(&self, input: NewPlayerInput) -> RepoResult<(players::Model, String)> {
        let password_hash = hash_password(&input.password)?;
        let player = PlayersRepository::create(
            &self.db,
            NewPlayer {
                username: input.username,
                email: input.email,
                password_hash,
                bio: input.bio,
                image: input.image,
            },
        )
        .await?;

        log::info!("player {} signed up", player.id);
        let token = self.tokens.issue(player.id);
        Ok((player, token))
    }

    /// 登录：邮箱不存在与密码错误返回同一种错误
    pub async fn login(&self, email: &str, password: &str) -> RepoResult<(players::Model, String)> {
        let player = PlayersRepository::find_by_email(&self.db, email)
            .await?
            .filter(|p| verify_password(&p.password, password))
            .ok_or_else(|| {
                log::warn!("rejected login for {}", email);
                RepoError::unauthorized("player", email)
            })?;

        let token = self.tokens.issue(player.id);
        Ok((player, token))
    }

    /// 根据令牌获取当前玩家
    pub async fn current_player(&self, token: &str) -> RepoResult<players::Model> {
        let player_id = self.tokens.verify(token)?;
        PlayersRepository::find_by_id(&self.db, player_id)
            .await?
            .ok_or_else(|| RepoError::unauthorized("player", player_id))
    }

    /// 更新当前玩家；提供了新密码时重新哈希
    pub async fn update_player(
        &self,
        player_id: i32,
        input: UpdatePlayerInput,
    ) -> RepoResult<players::Model> {
        let password_hash = match input.password {
            Some(plain) => Some(hash_password(&plain)?),
            None => None,
        };

        PlayersRepository::update(
            &self.db,
            player_id,
            UpdatePlayer {
                username: input.username,
                email: input.email,
                password_hash,
                bio: input.bio,
                image: input.image,
            },
        )
        .await
    }

    /// 查看玩家资料
    pub async fn profile(&self, viewer: Option<i32>, username: &str) -> RepoResult<Profile> {
        let target = PlayersRepository::find_by_username(&self.db, username)
            .await?
            .ok_or_else(|| RepoError::not_found("player", username))?;

        let following = viewer.is_some_and(|id| target.followed_by(id));
        Ok(Profile {
            player: target.player,
            following,
        })
    }

    pub async fn follow(&self, viewer: i32, username: &str) -> RepoResult<Profile> {
        let target = self.player_id_by_username(username).await?;
        if target == viewer {
            return Err(RepoError::Validation("cannot follow yourself".to_string()));
        }

        PlayersRepository::add_follower(&self.db, target, viewer).await?;
        self.profile(Some(viewer), username).await
    }

    pub async fn unfollow(&self, viewer: i32, username: &str) -> RepoResult<Profile> {
        let target = self.player_id_by_username(username).await?;
        PlayersRepository::remove_follower(&self.db, target, viewer).await?;
        self.profile(Some(viewer), username).await
    }

    // ==================== 条目相关 ====================

    pub async fn create_item(&self, author_id: i32, item: NewItem) -> RepoResult<ItemView> {
        let created = ItemsRepository::create(&self.db, author_id, item).await?;
        Ok(ItemView::for_viewer(created, Some(author_id)))
    }

    /// 更新自己的条目
    ///
    /// `tags` 为 `None` 时保留现有标签
    pub async fn update_item(
        &self,
        author_id: i32,
        slug: &str,
        updates: UpdateItem,
        tags: Option<Vec<String>>,
    ) -> RepoResult<ItemView> {
        let owned = self.owned_item(author_id, slug).await?;

        let tag_labels = match tags {
            Some(labels) => labels,
            None => ItemsRepository::find_by_slug(&self.db, slug)
                .await?
                .map(|current| current.tag_list())
                .unwrap_or_default(),
        };

        let updated = ItemsRepository::update(&self.db, &owned, updates, tag_labels).await?;
        Ok(ItemView::for_viewer(updated, Some(author_id)))
    }

    pub async fn delete_item(&self, author_id: i32, slug: &str) -> RepoResult<()> {
        let owned = self.owned_item(author_id, slug).await?;
        ItemsRepository::delete(&self.db, &owned).await
    }

    pub async fn get_item(&self, viewer: Option<i32>, slug: &str) -> RepoResult<ItemView> {
        let item = self.item_by_slug(slug).await?;
        Ok(ItemView::for_viewer(item, viewer))
    }

    pub async fn list_items(
        &self,
        viewer: Option<i32>,
        filter: &ItemFilter,
        page: Pagination,
    ) -> RepoResult<Page<ItemView>> {
        let found = ItemsRepository::list_filtered(&self.db, filter, page).await?;
        Ok(found.map(|item| ItemView::for_viewer(item, viewer)))
    }

    pub async fn feed(&self, player_id: i32, page: Pagination) -> RepoResult<Page<ItemView>> {
        let found = ItemsRepository::list_feed(&self.db, player_id, page).await?;
        Ok(found.map(|item| ItemView::for_viewer(item, Some(player_id))))
    }

    // ==================== 评论相关 ====================

    pub async fn add_comment(
        &self,
        author_id: i32,
        slug: &str,
        body: String,
    ) -> RepoResult<CommentWithAuthor> {
        let item = self.item_by_slug(slug).await?;
        ItemsRepository::add_comment(&self.db, &item.item, author_id, body).await
    }

    /// 删除自己的评论；评论不属于该条目时视为不存在
    pub async fn delete_comment(
        &self,
        player_id: i32,
        slug: &str,
        comment_id: i32,
    ) -> RepoResult<()> {
        let item = self.item_by_slug(slug).await?;

        let comment = ItemsRepository::find_comment_by_id(&self.db, comment_id)
            .await?
            .filter(|c| c.item_id == item.item.id)
            .ok_or_else(|| RepoError::not_found("comment", comment_id))?;

        if comment.player_id != player_id {
            return Err(RepoError::unauthorized("comment", comment_id));
        }

        ItemsRepository::delete_comment(&self.db, &comment).await
    }

    pub async fn comments(&self, slug: &str) -> RepoResult<Vec<CommentWithAuthor>> {
        ItemsRepository::find_comments_by_slug(&self.db, slug).await
    }

    // ==================== 收藏与标签 ====================

    pub async fn favorite(&self, player_id: i32, slug: &str) -> RepoResult<ItemView> {
        let item = self.item_by_slug(slug).await?;
        ItemsRepository::add_favorite(&self.db, &item.item, player_id).await?;
        self.get_item(Some(player_id), slug).await
    }

    pub async fn unfavorite(&self, player_id: i32, slug: &str) -> RepoResult<ItemView> {
        let item = self.item_by_slug(slug).await?;
        ItemsRepository::remove_favorite(&self.db, &item.item, player_id).await?;
        self.get_item(Some(player_id), slug).await
    }

    pub async fn tags(&self) -> RepoResult<Vec<String>> {
        Ok(ItemsRepository::list_tags(&self.db)
            .await?
            .into_iter()
            .map(|t| t.tag)
            .collect())
    }

    // ==================== 私有方法 ====================

    async fn player_id_by_username(&self, username: &str) -> RepoResult<i32> {
        PlayersRepository::find_by_username(&self.db, username)
            .await?
            .map(|p| p.player.id)
            .ok_or_else(|| RepoError::not_found("player", username))
    }

    async fn item_by_slug(&self, slug: &str) -> RepoResult<ItemWithRelations> {
        ItemsRepository::find_by_slug(&self.db, slug)
            .await?
            .ok_or_else(|| RepoError::not_found("item", slug))
    }

    /// 所有权校验：条目存在但属于他人时返回 Unauthorized
    async fn owned_item(&self, author_id: i32, slug: &str) -> RepoResult<items::Model> {
        if let Some(item) = ItemsRepository::find_authored_by_slug(&self.db, author_id, slug).await?
        {
            return Ok(item);
        }

        match ItemsRepository::find_by_slug(&self.db, slug).await? {
            Some(_) => Err(RepoError::unauthorized("item", slug)),
            None => Err(RepoError::not_found("item", slug)),
        }
    }
}
