//! 数据实体模块
//!
//! 包含所有 SeaORM 实体定义。

pub mod prelude;

// === 实体表 ===
pub mod comments;
pub mod items;
pub mod players;
pub mod tags;

// === 关联表 ===
pub mod favorites;
pub mod follows;
pub mod item_tags;
