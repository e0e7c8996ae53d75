//! 条目数据仓库
//!
//! 条目 CRUD、标签关联维护、评论、收藏以及四种列表查询。
//! 多步写操作都在单个事务内完成，任一步失败整体回滚。

use std::collections::HashSet;

use crate::database::dto::{
    CommentWithAuthor, ItemFilter, ItemWithRelations, NewItem, Page, Pagination, UpdateItem,
};
use crate::database::repository::query::{
    attach_comment_authors, attach_relations, fetch_item_page, live_comments, live_items,
    live_players, live_tags, now,
};
use crate::entity::prelude::*;
use crate::entity::{comments, favorites, follows, item_tags, items, players, tags};
use crate::error::{RepoError, RepoResult};
use crate::utils::slug::slugify;
use sea_orm::sea_query::Expr;
use sea_orm::*;

/// 条目数据仓库
pub struct ItemsRepository;

impl ItemsRepository {
    // ==================== 查询操作 ====================

    /// 根据 slug 查询条目，预加载作者、标签与收藏者
    pub async fn find_by_slug(
        db: &DatabaseConnection,
        slug: &str,
    ) -> RepoResult<Option<ItemWithRelations>> {
        let Some(item) = live_items()
            .filter(items::Column::Slug.eq(slug))
            .one(db)
            .await?
        else {
            return Ok(None);
        };

        Ok(attach_relations(db, vec![item]).await?.pop())
    }

    /// 查询指定作者的条目，不加载关联（仅用于所有权校验）
    pub async fn find_authored_by_slug(
        db: &DatabaseConnection,
        author_id: i32,
        slug: &str,
    ) -> RepoResult<Option<items::Model>> {
        Ok(live_items()
            .filter(items::Column::Slug.eq(slug))
            .filter(items::Column::AuthorId.eq(author_id))
            .one(db)
            .await?)
    }

    // ==================== 条目 CRUD 操作 ====================

    /// 创建条目
    ///
    /// 事务内：插入条目 -> 逐个查找或创建标签并关联 -> 重新读取完整条目
    pub async fn create(
        db: &DatabaseConnection,
        author_id: i32,
        item: NewItem,
    ) -> RepoResult<ItemWithRelations> {
        if item.title.trim().is_empty() {
            return Err(RepoError::Validation("title is required".to_string()));
        }

        let txn = db.begin().await?;
        match Self::create_in(&txn, author_id, item).await {
            Ok(created) => {
                txn.commit().await?;
                log::debug!("created item {} ({})", created.item.id, created.item.slug);
                Ok(created)
            }
            Err(e) => {
                log::warn!("create item rolled back: {}", e);
                txn.rollback().await?;
                Err(e)
            }
        }
    }

    async fn create_in(
        txn: &DatabaseTransaction,
        author_id: i32,
        item: NewItem,
    ) -> RepoResult<ItemWithRelations> {
        if live_players()
            .filter(players::Column::Id.eq(author_id))
            .count(txn)
            .await?
            == 0
        {
            return Err(RepoError::not_found("player", author_id));
        }

        let slug = slugify(&item.title);
        Self::ensure_slug_free(txn, &slug, None).await?;

        let now = now();
        let active = items::ActiveModel {
            id: NotSet,
            slug: Set(slug),
            title: Set(item.title),
            description: Set(item.description),
            body: Set(item.body),
            author_id: Set(author_id),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };
        let inserted = active.insert(txn).await?;

        let resolved = Self::resolve_tags(txn, &item.tags).await?;
        Self::replace_item_tags(txn, inserted.id, &resolved).await?;

        Self::reload(txn, inserted.id).await
    }

    /// 更新条目
    ///
    /// 字段部分覆盖（标题变化时重算 slug），标签集合整体替换为 `tag_labels`
    pub async fn update(
        db: &DatabaseConnection,
        item: &items::Model,
        updates: UpdateItem,
        tag_labels: Vec<String>,
    ) -> RepoResult<ItemWithRelations> {
        let txn = db.begin().await?;
        match Self::update_in(&txn, item, updates, tag_labels).await {
            Ok(updated) => {
                txn.commit().await?;
                log::debug!("updated item {} ({})", updated.item.id, updated.item.slug);
                Ok(updated)
            }
            Err(e) => {
                log::warn!("update item {} rolled back: {}", item.id, e);
                txn.rollback().await?;
                Err(e)
            }
        }
    }

    async fn update_in(
        txn: &DatabaseTransaction,
        item: &items::Model,
        updates: UpdateItem,
        tag_labels: Vec<String>,
    ) -> RepoResult<ItemWithRelations> {
        let existing = live_items()
            .filter(items::Column::Id.eq(item.id))
            .one(txn)
            .await?
            .ok_or_else(|| RepoError::not_found("item", &item.slug))?;

        let mut active: items::ActiveModel = existing.clone().into();

        if let Some(title) = updates.title {
            if title.trim().is_empty() {
                return Err(RepoError::Validation("title is required".to_string()));
            }
            if title != existing.title {
                let slug = slugify(&title);
                Self::ensure_slug_free(txn, &slug, Some(existing.id)).await?;
                active.slug = Set(slug);
            }
            active.title = Set(title);
        }
        if let Some(description) = updates.description {
            active.description = Set(description);
        }
        if let Some(body) = updates.body {
            active.body = Set(body);
        }
        active.updated_at = Set(now());
        active.update(txn).await?;

        let resolved = Self::resolve_tags(txn, &tag_labels).await?;
        Self::replace_item_tags(txn, existing.id, &resolved).await?;

        Self::reload(txn, existing.id).await
    }

    /// 删除条目（软删除），同时移除其评论、标签关联与收藏关联
    ///
    /// 标签行本身保留
    pub async fn delete(db: &DatabaseConnection, item: &items::Model) -> RepoResult<()> {
        let txn = db.begin().await?;

        Comments::delete_many()
            .filter(comments::Column::ItemId.eq(item.id))
            .exec(&txn)
            .await?;
        ItemTags::delete_many()
            .filter(item_tags::Column::ItemId.eq(item.id))
            .exec(&txn)
            .await?;
        Favorites::delete_many()
            .filter(favorites::Column::ItemId.eq(item.id))
            .exec(&txn)
            .await?;

        let now = now();
        let result = Items::update_many()
            .col_expr(items::Column::DeletedAt, Expr::value(now))
            .col_expr(items::Column::UpdatedAt, Expr::value(now))
            .filter(items::Column::Id.eq(item.id))
            .filter(items::Column::DeletedAt.is_null())
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(RepoError::not_found("item", &item.slug));
        }

        txn.commit().await?;

        log::debug!("deleted item {} ({})", item.id, item.slug);
        Ok(())
    }

    // ==================== 列表查询 ====================

    /// 所有存活条目，新的在前
    pub async fn list(
        db: &DatabaseConnection,
        page: Pagination,
    ) -> RepoResult<Page<ItemWithRelations>> {
        Ok(fetch_item_page(db, live_items(), page).await?)
    }

    /// 带有指定标签的条目，标签不存在时返回 NotFound
    pub async fn list_by_tag(
        db: &DatabaseConnection,
        tag: &str,
        page: Pagination,
    ) -> RepoResult<Page<ItemWithRelations>> {
        let tag = live_tags()
            .filter(tags::Column::Tag.eq(tag))
            .one(db)
            .await?
            .ok_or_else(|| RepoError::not_found("tag", tag))?;

        let tagged = ItemTags::find()
            .select_only()
            .column(item_tags::Column::ItemId)
            .filter(item_tags::Column::TagId.eq(tag.id))
            .into_query();
        let select = live_items().filter(items::Column::Id.in_subquery(tagged));

        Ok(fetch_item_page(db, select, page).await?)
    }

    /// 指定作者的条目，用户名不存在时返回 NotFound
    pub async fn list_by_author(
        db: &DatabaseConnection,
        username: &str,
        page: Pagination,
    ) -> RepoResult<Page<ItemWithRelations>> {
        let author = Self::player_by_username(db, username).await?;
        let select = live_items().filter(items::Column::AuthorId.eq(author.id));

        Ok(fetch_item_page(db, select, page).await?)
    }

    /// 指定玩家收藏的条目，用户名不存在时返回 NotFound
    pub async fn list_by_who_favorited(
        db: &DatabaseConnection,
        username: &str,
        page: Pagination,
    ) -> RepoResult<Page<ItemWithRelations>> {
        let fan = Self::player_by_username(db, username).await?;

        let favorited = Favorites::find()
            .select_only()
            .column(favorites::Column::ItemId)
            .filter(favorites::Column::PlayerId.eq(fan.id))
            .into_query();
        let select = live_items().filter(items::Column::Id.in_subquery(favorited));

        Ok(fetch_item_page(db, select, page).await?)
    }

    /// 个人 feed：该玩家所关注的作者的条目
    ///
    /// 计数针对被关注作者的条目集合，而非玩家本人的条目
    pub async fn list_feed(
        db: &DatabaseConnection,
        player_id: i32,
        page: Pagination,
    ) -> RepoResult<Page<ItemWithRelations>> {
        if live_players()
            .filter(players::Column::Id.eq(player_id))
            .count(db)
            .await?
            == 0
        {
            return Err(RepoError::not_found("player", player_id));
        }

        let followed = Follows::find()
            .select_only()
            .column(follows::Column::FollowingId)
            .filter(follows::Column::FollowerId.eq(player_id))
            .into_query();
        let select = live_items().filter(items::Column::AuthorId.in_subquery(followed));

        Ok(fetch_item_page(db, select, page).await?)
    }

    /// 按筛选条件分派到对应的列表查询，每次只应用一种筛选
    pub async fn list_filtered(
        db: &DatabaseConnection,
        filter: &ItemFilter,
        page: Pagination,
    ) -> RepoResult<Page<ItemWithRelations>> {
        match filter {
            ItemFilter::All => Self::list(db, page).await,
            ItemFilter::ByTag(tag) => Self::list_by_tag(db, tag, page).await,
            ItemFilter::ByAuthor(username) => Self::list_by_author(db, username, page).await,
            ItemFilter::ByFavoriter(username) => {
                Self::list_by_who_favorited(db, username, page).await
            }
        }
    }

    // ==================== 评论相关操作 ====================

    /// 为条目添加评论，返回带作者的评论
    pub async fn add_comment(
        db: &DatabaseConnection,
        item: &items::Model,
        player_id: i32,
        body: String,
    ) -> RepoResult<CommentWithAuthor> {
        if body.trim().is_empty() {
            return Err(RepoError::Validation("comment body is required".to_string()));
        }

        let txn = db.begin().await?;

        if live_items()
            .filter(items::Column::Id.eq(item.id))
            .count(&txn)
            .await?
            == 0
        {
            return Err(RepoError::not_found("item", &item.slug));
        }

        let now = now();
        let comment = comments::ActiveModel {
            id: NotSet,
            item_id: Set(item.id),
            player_id: Set(player_id),
            body: Set(body),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };
        let inserted = comment.insert(&txn).await?;
        let mut loaded = attach_comment_authors(&txn, vec![inserted]).await?;

        txn.commit().await?;

        loaded
            .pop()
            .ok_or_else(|| RepoError::not_found("comment", item.id))
    }

    /// 获取条目的所有评论（按创建时间排序），条目不存在时返回空列表
    pub async fn find_comments_by_slug(
        db: &DatabaseConnection,
        slug: &str,
    ) -> RepoResult<Vec<CommentWithAuthor>> {
        let Some(item) = live_items()
            .filter(items::Column::Slug.eq(slug))
            .one(db)
            .await?
        else {
            return Ok(Vec::new());
        };

        let rows = live_comments()
            .filter(comments::Column::ItemId.eq(item.id))
            .order_by_asc(comments::Column::CreatedAt)
            .order_by_asc(comments::Column::Id)
            .all(db)
            .await?;

        Ok(attach_comment_authors(db, rows).await?)
    }

    /// 根据 ID 获取评论
    pub async fn find_comment_by_id(
        db: &DatabaseConnection,
        id: i32,
    ) -> RepoResult<Option<comments::Model>> {
        Ok(live_comments()
            .filter(comments::Column::Id.eq(id))
            .one(db)
            .await?)
    }

    /// 删除单条评论
    pub async fn delete_comment(
        db: &DatabaseConnection,
        comment: &comments::Model,
    ) -> RepoResult<()> {
        Comments::delete_by_id(comment.id).exec(db).await?;
        log::debug!("deleted comment {} of item {}", comment.id, comment.item_id);
        Ok(())
    }

    // ==================== 收藏相关操作 ====================

    /// 收藏条目，已收藏时为空操作
    pub async fn add_favorite(
        db: &DatabaseConnection,
        item: &items::Model,
        player_id: i32,
    ) -> RepoResult<()> {
        let txn = db.begin().await?;

        if live_items()
            .filter(items::Column::Id.eq(item.id))
            .count(&txn)
            .await?
            == 0
        {
            return Err(RepoError::not_found("item", &item.slug));
        }
        if live_players()
            .filter(players::Column::Id.eq(player_id))
            .count(&txn)
            .await?
            == 0
        {
            return Err(RepoError::not_found("player", player_id));
        }

        let exists = Favorites::find()
            .filter(
                favorites::Column::PlayerId
                    .eq(player_id)
                    .and(favorites::Column::ItemId.eq(item.id)),
            )
            .count(&txn)
            .await?
            > 0;

        if !exists {
            let edge = favorites::ActiveModel {
                player_id: Set(player_id),
                item_id: Set(item.id),
                created_at: Set(now()),
            };
            Favorites::insert(edge).exec_without_returning(&txn).await?;
        }

        txn.commit().await?;
        Ok(())
    }

    /// 取消收藏，未收藏时为空操作
    pub async fn remove_favorite(
        db: &DatabaseConnection,
        item: &items::Model,
        player_id: i32,
    ) -> RepoResult<()> {
        Favorites::delete_many()
            .filter(
                favorites::Column::PlayerId
                    .eq(player_id)
                    .and(favorites::Column::ItemId.eq(item.id)),
            )
            .exec(db)
            .await?;
        Ok(())
    }

    // ==================== 标签相关操作 ====================

    /// 获取所有标签
    pub async fn list_tags(db: &DatabaseConnection) -> RepoResult<Vec<tags::Model>> {
        Ok(live_tags().order_by_asc(tags::Column::Id).all(db).await?)
    }

    // ==================== 私有方法 ====================

    async fn reload(txn: &DatabaseTransaction, item_id: i32) -> RepoResult<ItemWithRelations> {
        let row = live_items()
            .filter(items::Column::Id.eq(item_id))
            .one(txn)
            .await?
            .ok_or_else(|| RepoError::not_found("item", item_id))?;

        attach_relations(txn, vec![row])
            .await?
            .pop()
            .ok_or_else(|| RepoError::not_found("item", item_id))
    }

    async fn player_by_username(
        db: &DatabaseConnection,
        username: &str,
    ) -> RepoResult<players::Model> {
        live_players()
            .filter(players::Column::Username.eq(username))
            .one(db)
            .await?
            .ok_or_else(|| RepoError::not_found("player", username))
    }

    async fn ensure_slug_free(
        txn: &DatabaseTransaction,
        slug: &str,
        except_id: Option<i32>,
    ) -> RepoResult<()> {
        let mut query = live_items().filter(items::Column::Slug.eq(slug));
        if let Some(id) = except_id {
            query = query.filter(items::Column::Id.ne(id));
        }

        if query.count(txn).await? > 0 {
            return Err(RepoError::Validation(format!(
                "slug '{}' has already been taken",
                slug
            )));
        }
        Ok(())
    }

    /// 将标签名解析为标签行：已存在则复用，否则创建（绝不重复）
    ///
    /// 去除首尾空白、跳过空标签，并按首次出现的顺序去重
    async fn resolve_tags(
        txn: &DatabaseTransaction,
        labels: &[String],
    ) -> RepoResult<Vec<tags::Model>> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();

        for label in labels.iter().map(|l| l.trim()) {
            if label.is_empty() || !seen.insert(label) {
                continue;
            }

            let existing = Tags::find()
                .filter(tags::Column::Tag.eq(label))
                .one(txn)
                .await?;

            let tag = match existing {
                Some(tag) => tag,
                None => {
                    let now = now();
                    tags::ActiveModel {
                        id: NotSet,
                        tag: Set(label.to_string()),
                        created_at: Set(now),
                        updated_at: Set(now),
                        deleted_at: Set(None),
                    }
                    .insert(txn)
                    .await?
                }
            };
            resolved.push(tag);
        }

        Ok(resolved)
    }

    /// 将条目的标签关联整体替换为 `resolved`
    ///
    /// 只删除不再引用的关联、只插入新增的关联；标签行本身不删除
    async fn replace_item_tags(
        txn: &DatabaseTransaction,
        item_id: i32,
        resolved: &[tags::Model],
    ) -> RepoResult<()> {
        let new_ids: HashSet<i32> = resolved.iter().map(|t| t.id).collect();

        let current: HashSet<i32> = ItemTags::find()
            .filter(item_tags::Column::ItemId.eq(item_id))
            .all(txn)
            .await?
            .into_iter()
            .map(|link| link.tag_id)
            .collect();

        let to_delete: Vec<i32> = current.difference(&new_ids).copied().collect();
        if !to_delete.is_empty() {
            ItemTags::delete_many()
                .filter(item_tags::Column::ItemId.eq(item_id))
                .filter(item_tags::Column::TagId.is_in(to_delete))
                .exec(txn)
                .await?;
        }

        let to_insert: Vec<item_tags::ActiveModel> = resolved
            .iter()
            .filter(|t| !current.contains(&t.id))
            .map(|t| item_tags::ActiveModel {
                item_id: Set(item_id),
                tag_id: Set(t.id),
            })
            .collect();
        if !to_insert.is_empty() {
            ItemTags::insert_many(to_insert)
                .exec_without_returning(txn)
                .await?;
        }

        Ok(())
    }
}
