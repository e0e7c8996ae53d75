//! 预导入模块
//!
//! 提供常用类型的快捷导入。

// === SeaORM 实体 ===
pub use super::comments::Entity as Comments;
pub use super::favorites::Entity as Favorites;
pub use super::follows::Entity as Follows;
pub use super::item_tags::Entity as ItemTags;
pub use super::items::Entity as Items;
pub use super::players::Entity as Players;
pub use super::tags::Entity as Tags;
