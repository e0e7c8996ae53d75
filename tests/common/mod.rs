//! Shared fixtures for integration tests.
//!
//! Every test gets its own in-memory SQLite database with the schema migrated
//! and a small social graph loaded.

#![allow(dead_code)]

use agora::config::DatabaseConfig;
use agora::database::db::establish_connection;
use agora::database::dto::{ItemWithRelations, NewItem, NewPlayer};
use agora::entity::players;
use agora::{ItemsRepository, PlayersRepository};
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;

/// Placeholder hash; fixture players never log in.
pub const FIXTURE_HASH: &str = "fixture-password-hash";

pub struct Fixture {
    pub db: DatabaseConnection,
    pub player1: players::Model,
    pub player2: players::Model,
    pub item1: ItemWithRelations,
    pub item2: ItemWithRelations,
}

pub async fn connect() -> DatabaseConnection {
    // A single connection keeps every query on the same in-memory database.
    let config = DatabaseConfig {
        url: Some("sqlite::memory:".to_string()),
        max_connections: 1,
        min_connections: 1,
        ..DatabaseConfig::default()
    };
    let db = establish_connection(&config)
        .await
        .expect("failed to open in-memory database");
    Migrator::up(&db, None).await.expect("migration failed");
    db
}

pub fn new_player(name: &str) -> NewPlayer {
    NewPlayer {
        username: name.to_string(),
        email: format!("{}@example.com", name),
        password_hash: FIXTURE_HASH.to_string(),
        bio: None,
        image: None,
    }
}

pub fn new_item(title: &str, tags: &[&str]) -> NewItem {
    NewItem {
        title: title.to_string(),
        description: format!("{} description", title),
        body: format!("{} body", title),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

/// player1 follows player2.
/// item1 ("item1 title", tag1 + tag2) by player1, commented by player2.
/// item2 ("item2 title", tag1) by player2, favorited and commented by player1.
pub async fn setup() -> Fixture {
    let db = connect().await;

    let player1 = PlayersRepository::create(&db, new_player("player1"))
        .await
        .expect("create player1");
    let player2 = PlayersRepository::create(&db, new_player("player2"))
        .await
        .expect("create player2");

    PlayersRepository::add_follower(&db, player2.id, player1.id)
        .await
        .expect("player1 follows player2");

    let item1 = ItemsRepository::create(&db, player1.id, new_item("item1 title", &["tag1", "tag2"]))
        .await
        .expect("create item1");
    ItemsRepository::add_comment(&db, &item1.item, player2.id, "comment on item1".to_string())
        .await
        .expect("comment on item1");

    let item2 = ItemsRepository::create(&db, player2.id, new_item("item2 title", &["tag1"]))
        .await
        .expect("create item2");
    ItemsRepository::add_favorite(&db, &item2.item, player1.id)
        .await
        .expect("player1 favorites item2");
    ItemsRepository::add_comment(&db, &item2.item, player1.id, "comment on item2".to_string())
        .await
        .expect("comment on item2");

    Fixture {
        db,
        player1,
        player2,
        item1,
        item2,
    }
}
