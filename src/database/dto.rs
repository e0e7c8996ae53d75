//! 数据传输对象 (DTO)
//!
//! 适配层解析请求后传入仓库的参数结构，以及仓库返回的组合视图。

use serde::{Deserialize, Deserializer, Serialize};

use crate::entity::{comments, follows, items, players, tags};

/// 辅助函数：支持 Option<Option<T>> 的反序列化
/// 用于区分"未提供字段"和"显式设为 null"
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

// ==================== 玩家 ====================

/// 创建玩家（密码已由调用方哈希）
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewPlayer {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub bio: Option<String>,
    pub image: Option<String>,
}

/// 更新玩家：未提供的字段保持不变
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdatePlayer {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub image: Option<Option<String>>,
}

/// 注册请求（明文密码，由服务层哈希）
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewPlayerInput {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// 玩家更新请求；提供了 `password` 时由服务层重新哈希
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdatePlayerInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub image: Option<Option<String>>,
}

/// 带有入向关注边的玩家，用于无额外查询地判断 "X 是否关注此人"
#[derive(Clone, Debug, Serialize)]
pub struct PlayerWithFollowers {
    pub player: players::Model,
    pub followers: Vec<follows::Model>,
}

impl PlayerWithFollowers {
    /// `candidate_id` 是否关注了该玩家
    pub fn followed_by(&self, candidate_id: i32) -> bool {
        self.followers
            .iter()
            .any(|f| f.follower_id == candidate_id)
    }
}

// ==================== 条目 ====================

/// 创建条目
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewItem {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// 更新条目字段；标签集合单独传入并整体替换
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdateItem {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
}

/// 条目及其预加载的关联
#[derive(Clone, Debug, Serialize)]
pub struct ItemWithRelations {
    pub item: items::Model,
    pub author: PlayerWithFollowers,
    pub tags: Vec<tags::Model>,
    pub favorited_by: Vec<players::Model>,
}

impl ItemWithRelations {
    pub fn tag_list(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.tag.clone()).collect()
    }

    pub fn favorites_count(&self) -> usize {
        self.favorited_by.len()
    }

    pub fn favorited_by_player(&self, player_id: i32) -> bool {
        self.favorited_by.iter().any(|p| p.id == player_id)
    }
}

/// 评论及其作者
#[derive(Clone, Debug, Serialize)]
pub struct CommentWithAuthor {
    pub comment: comments::Model,
    pub author: PlayerWithFollowers,
}

// ==================== 查询组合 ====================

/// 分页参数：原样传给 OFFSET / LIMIT
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 20,
        }
    }
}

impl Pagination {
    pub fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }
}

/// 列表筛选条件，每次只应用一种
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "by", content = "value")]
pub enum ItemFilter {
    #[default]
    All,
    ByTag(String),
    ByAuthor(String),
    ByFavoriter(String),
}

/// 一页结果；`count` 为忽略分页后的总数
#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub count: u64,
}

impl<T> Page<T> {
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            count: self.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_player_distinguishes_null_from_absent() {
        let absent: UpdatePlayer = serde_json::from_str(r#"{"username": "x"}"#).unwrap();
        assert_eq!(absent.username.as_deref(), Some("x"));
        assert_eq!(absent.bio, None);

        let cleared: UpdatePlayer = serde_json::from_str(r#"{"bio": null}"#).unwrap();
        assert_eq!(cleared.bio, Some(None));
    }

    #[test]
    fn followed_by_checks_incoming_edges() {
        let player = players::Model {
            id: 2,
            username: "player2".into(),
            email: "player2@example.com".into(),
            password: String::new(),
            bio: None,
            image: None,
            created_at: 0,
            updated_at: 0,
            deleted_at: None,
        };
        let view = PlayerWithFollowers {
            player,
            followers: vec![follows::Model {
                follower_id: 1,
                following_id: 2,
                created_at: 0,
            }],
        };
        assert!(view.followed_by(1));
        assert!(!view.followed_by(3));
    }

    #[test]
    fn filter_deserializes_from_tagged_form() {
        let filter: ItemFilter =
            serde_json::from_str(r#"{"by": "by_tag", "value": "rust"}"#).unwrap();
        assert_eq!(filter, ItemFilter::ByTag("rust".into()));
        assert_eq!(Pagination::default(), Pagination::new(0, 20));
    }
}
