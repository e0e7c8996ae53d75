//! 查询组合约定
//!
//! 两个仓库共享的软删除过滤、排序、分页以及关联批量加载。
//! 每个关联只发一次查询，避免 N+1。

use std::collections::HashMap;

use crate::database::dto::{
    CommentWithAuthor, ItemWithRelations, Page, Pagination, PlayerWithFollowers,
};
use crate::entity::prelude::*;
use crate::entity::{comments, favorites, follows, item_tags, items, players, tags};
use sea_orm::*;

/// 当前 unix 时间戳（秒）
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

// ==================== 软删除过滤 ====================

pub fn live_players() -> Select<Players> {
    Players::find().filter(players::Column::DeletedAt.is_null())
}

pub fn live_items() -> Select<Items> {
    Items::find().filter(items::Column::DeletedAt.is_null())
}

pub fn live_comments() -> Select<Comments> {
    Comments::find().filter(comments::Column::DeletedAt.is_null())
}

pub fn live_tags() -> Select<Tags> {
    Tags::find().filter(tags::Column::DeletedAt.is_null())
}

// ==================== 排序与分页 ====================

/// 新的在前；同一秒内创建的按 id 倒序
pub fn newest_first(select: Select<Items>) -> Select<Items> {
    select
        .order_by_desc(items::Column::CreatedAt)
        .order_by_desc(items::Column::Id)
}

/// 计数忽略分页，列表按 `newest_first` 排序后应用 OFFSET / LIMIT
pub async fn fetch_item_page<C>(
    db: &C,
    select: Select<Items>,
    page: Pagination,
) -> Result<Page<ItemWithRelations>, DbErr>
where
    C: ConnectionTrait,
{
    // SQLite 以 i64 绑定 OFFSET / LIMIT，超出部分截断到 i64::MAX
    let offset = page.offset.min(i64::MAX as u64);
    let limit = page.limit.min(i64::MAX as u64);

    let count = select.clone().count(db).await?;
    let rows = newest_first(select)
        .offset(offset)
        .limit(limit)
        .all(db)
        .await?;
    let items = attach_relations(db, rows).await?;

    Ok(Page { items, count })
}

// ==================== 关联加载 ====================

/// 批量加载玩家的入向关注边：following_id -> 边列表
pub async fn load_followers<C>(
    db: &C,
    player_ids: &[i32],
) -> Result<HashMap<i32, Vec<follows::Model>>, DbErr>
where
    C: ConnectionTrait,
{
    let mut result: HashMap<i32, Vec<follows::Model>> = HashMap::new();
    if player_ids.is_empty() {
        return Ok(result);
    }

    let edges = Follows::find()
        .filter(follows::Column::FollowingId.is_in(player_ids.iter().copied()))
        .order_by_asc(follows::Column::CreatedAt)
        .all(db)
        .await?;

    for edge in edges {
        result.entry(edge.following_id).or_default().push(edge);
    }
    Ok(result)
}

/// 批量加载玩家并附带入向关注边
async fn load_players_with_followers<C>(
    db: &C,
    player_ids: &[i32],
) -> Result<HashMap<i32, PlayerWithFollowers>, DbErr>
where
    C: ConnectionTrait,
{
    if player_ids.is_empty() {
        return Ok(HashMap::new());
    }

    // 作者即使被软删除也需要展示，这里不过滤 deleted_at
    let players = Players::find()
        .filter(players::Column::Id.is_in(player_ids.iter().copied()))
        .all(db)
        .await?;
    let mut followers = load_followers(db, player_ids).await?;

    Ok(players
        .into_iter()
        .map(|player| {
            let edges = followers.remove(&player.id).unwrap_or_default();
            (
                player.id,
                PlayerWithFollowers {
                    player,
                    followers: edges,
                },
            )
        })
        .collect())
}

fn distinct_ids(ids: impl Iterator<Item = i32>) -> Vec<i32> {
    let mut ids: Vec<i32> = ids.collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// 为条目附加作者、标签与收藏者
pub async fn attach_relations<C>(
    db: &C,
    rows: Vec<items::Model>,
) -> Result<Vec<ItemWithRelations>, DbErr>
where
    C: ConnectionTrait,
{
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let item_ids: Vec<i32> = rows.iter().map(|i| i.id).collect();
    let author_ids = distinct_ids(rows.iter().map(|i| i.author_id));

    // 1. 作者
    let authors = load_players_with_followers(db, &author_ids).await?;

    // 2. 标签（按标签 id 排序，即首次创建顺序）
    let tag_links = ItemTags::find()
        .filter(item_tags::Column::ItemId.is_in(item_ids.iter().copied()))
        .all(db)
        .await?;
    let tag_ids = distinct_ids(tag_links.iter().map(|l| l.tag_id));
    let tags_by_id: HashMap<i32, tags::Model> = if tag_ids.is_empty() {
        HashMap::new()
    } else {
        Tags::find()
            .filter(tags::Column::Id.is_in(tag_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect()
    };
    let mut tags_by_item: HashMap<i32, Vec<tags::Model>> = HashMap::new();
    for link in &tag_links {
        if let Some(tag) = tags_by_id.get(&link.tag_id) {
            tags_by_item
                .entry(link.item_id)
                .or_default()
                .push(tag.clone());
        }
    }
    for list in tags_by_item.values_mut() {
        list.sort_by_key(|t| t.id);
    }

    // 3. 收藏者（仅存活玩家）
    let favorite_links = Favorites::find()
        .filter(favorites::Column::ItemId.is_in(item_ids.iter().copied()))
        .order_by_asc(favorites::Column::CreatedAt)
        .all(db)
        .await?;
    let fan_ids = distinct_ids(favorite_links.iter().map(|f| f.player_id));
    let fans_by_id: HashMap<i32, players::Model> = if fan_ids.is_empty() {
        HashMap::new()
    } else {
        live_players()
            .filter(players::Column::Id.is_in(fan_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect()
    };
    let mut fans_by_item: HashMap<i32, Vec<players::Model>> = HashMap::new();
    for link in &favorite_links {
        if let Some(fan) = fans_by_id.get(&link.player_id) {
            fans_by_item
                .entry(link.item_id)
                .or_default()
                .push(fan.clone());
        }
    }

    let mut result = Vec::with_capacity(rows.len());
    for item in rows {
        // 同一作者可能对应多个条目，这里按需克隆
        let author = authors.get(&item.author_id).cloned().ok_or_else(|| {
            DbErr::RecordNotFound(format!(
                "author {} of item {} not found",
                item.author_id, item.id
            ))
        })?;
        let tag_list = tags_by_item.remove(&item.id).unwrap_or_default();
        let favorited_by = fans_by_item.remove(&item.id).unwrap_or_default();
        result.push(ItemWithRelations {
            item,
            author,
            tags: tag_list,
            favorited_by,
        });
    }

    Ok(result)
}

/// 为评论附加作者
pub async fn attach_comment_authors<C>(
    db: &C,
    rows: Vec<comments::Model>,
) -> Result<Vec<CommentWithAuthor>, DbErr>
where
    C: ConnectionTrait,
{
    let author_ids = distinct_ids(rows.iter().map(|c| c.player_id));
    let authors = load_players_with_followers(db, &author_ids).await?;

    rows.into_iter()
        .map(|comment| {
            let author = authors.get(&comment.player_id).cloned().ok_or_else(|| {
                DbErr::RecordNotFound(format!(
                    "author {} of comment {} not found",
                    comment.player_id, comment.id
                ))
            })?;
            Ok(CommentWithAuthor { comment, author })
        })
        .collect()
}
