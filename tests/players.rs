mod common;

use agora::database::dto::UpdatePlayer;
use agora::entity::{follows, prelude::Follows};
use agora::{ErrorKind, PlayersRepository};
use common::{new_player, setup};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

async fn follow_edges(db: &sea_orm::DatabaseConnection, follower: i32, following: i32) -> u64 {
    Follows::find()
        .filter(follows::Column::FollowerId.eq(follower))
        .filter(follows::Column::FollowingId.eq(following))
        .count(db)
        .await
        .unwrap()
}

#[tokio::test]
async fn lookups_distinguish_absence_from_errors() {
    let fx = setup().await;

    let by_id = PlayersRepository::find_by_id(&fx.db, fx.player1.id).await.unwrap();
    assert_eq!(by_id.map(|p| p.username).as_deref(), Some("player1"));

    let by_email = PlayersRepository::find_by_email(&fx.db, "player2@example.com")
        .await
        .unwrap();
    assert_eq!(by_email.map(|p| p.id), Some(fx.player2.id));

    assert!(PlayersRepository::find_by_id(&fx.db, 9999).await.unwrap().is_none());
    assert!(PlayersRepository::find_by_email(&fx.db, "nobody@example.com")
        .await
        .unwrap()
        .is_none());
    assert!(PlayersRepository::find_by_username(&fx.db, "nobody")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn find_by_username_loads_incoming_follows() {
    let fx = setup().await;

    let player2 = PlayersRepository::find_by_username(&fx.db, "player2")
        .await
        .unwrap()
        .unwrap();
    assert!(player2.followed_by(fx.player1.id));
    assert!(!player2.followed_by(fx.player2.id));

    let player1 = PlayersRepository::find_by_username(&fx.db, "player1")
        .await
        .unwrap()
        .unwrap();
    assert!(player1.followers.is_empty());
}

#[tokio::test]
async fn duplicate_username_or_email_is_a_validation_error() {
    let fx = setup().await;

    let err = PlayersRepository::create(&fx.db, new_player("player1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut same_email = new_player("player3");
    same_email.email = "player2@example.com".to_string();
    let err = PlayersRepository::create(&fx.db, same_email).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut empty_name = new_player("player4");
    empty_name.username = "  ".to_string();
    let err = PlayersRepository::create(&fx.db, empty_name).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn update_overlays_only_supplied_fields() {
    let fx = setup().await;

    let updated = PlayersRepository::update(
        &fx.db,
        fx.player1.id,
        UpdatePlayer {
            bio: Some(Some("hello".to_string())),
            ..UpdatePlayer::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.bio.as_deref(), Some("hello"));
    assert_eq!(updated.username, "player1");
    assert_eq!(updated.email, "player1@example.com");

    // Explicit null clears, absent keeps.
    let cleared = PlayersRepository::update(
        &fx.db,
        fx.player1.id,
        UpdatePlayer {
            bio: Some(None),
            image: None,
            ..UpdatePlayer::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(cleared.bio, None);

    // Re-submitting the current username is not a conflict.
    let same = PlayersRepository::update(
        &fx.db,
        fx.player1.id,
        UpdatePlayer {
            username: Some("player1".to_string()),
            ..UpdatePlayer::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(same.username, "player1");
}

#[tokio::test]
async fn update_rejects_taken_username_and_missing_player() {
    let fx = setup().await;

    let err = PlayersRepository::update(
        &fx.db,
        fx.player1.id,
        UpdatePlayer {
            username: Some("player2".to_string()),
            ..UpdatePlayer::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = PlayersRepository::update(&fx.db, 9999, UpdatePlayer::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn following_twice_keeps_one_edge() {
    let fx = setup().await;

    PlayersRepository::add_follower(&fx.db, fx.player1.id, fx.player2.id)
        .await
        .unwrap();
    assert!(PlayersRepository::is_follower(&fx.db, fx.player1.id, fx.player2.id)
        .await
        .unwrap());

    PlayersRepository::add_follower(&fx.db, fx.player1.id, fx.player2.id)
        .await
        .unwrap();
    assert!(PlayersRepository::is_follower(&fx.db, fx.player1.id, fx.player2.id)
        .await
        .unwrap());
    assert_eq!(follow_edges(&fx.db, fx.player2.id, fx.player1.id).await, 1);
}

#[tokio::test]
async fn unfollow_removes_edge_and_is_idempotent() {
    let fx = setup().await;

    // player2 does not follow player1, so this is a no-op.
    PlayersRepository::remove_follower(&fx.db, fx.player1.id, fx.player2.id)
        .await
        .unwrap();

    PlayersRepository::remove_follower(&fx.db, fx.player2.id, fx.player1.id)
        .await
        .unwrap();
    assert!(!PlayersRepository::is_follower(&fx.db, fx.player2.id, fx.player1.id)
        .await
        .unwrap());
    assert_eq!(follow_edges(&fx.db, fx.player1.id, fx.player2.id).await, 0);

    PlayersRepository::remove_follower(&fx.db, fx.player2.id, fx.player1.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn following_an_unknown_player_is_not_found() {
    let fx = setup().await;

    let err = PlayersRepository::add_follower(&fx.db, 9999, fx.player1.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
