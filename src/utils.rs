pub mod logs;
pub mod slug;
