pub mod items_repository;
pub mod players_repository;
pub mod query;
