/// Integration tests for login sessions
mod common;
use serial_test::serial;

use chrono::Duration;
use common::{database::*, fixtures::*};
use dashmap::DashMap;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, PaginatorTrait};
use ticketdesk::orm::sessions;
use ticketdesk::session::{
    authenticate_by_uuid, expire_sessions, new_session, remove_session, remove_user_sessions,
};
use uuid::Uuid;

#[actix_rt::test]
#[serial]
async fn test_new_session_is_cached_and_stored() {
    let db = setup_test_database().await.unwrap();
    let user = create_test_user(&db, "sessionuser").await.unwrap();
    let map = DashMap::new();

    let uuid = new_session(&db, &map, user.id).await.unwrap();
    assert!(map.contains_key(&uuid));

    let row = sessions::Entity::find_by_id(uuid.to_string())
        .one(&db)
        .await
        .unwrap()
        .expect("session row missing");
    assert_eq!(row.user_id, user.id);
    assert!(row.expires_at > row.created_at);

    let session = authenticate_by_uuid(&db, &map, uuid).await.unwrap();
    assert_eq!(session.user_id, user.id);
}

#[actix_rt::test]
#[serial]
async fn test_session_loads_from_database_when_not_cached() {
    let db = setup_test_database().await.unwrap();
    let user = create_test_user(&db, "coldcache").await.unwrap();
    let warm = DashMap::new();
    let uuid = new_session(&db, &warm, user.id).await.unwrap();

    let cold = DashMap::new();
    let session = authenticate_by_uuid(&db, &cold, uuid).await.unwrap();
    assert_eq!(session.user_id, user.id);
    assert!(cold.contains_key(&uuid));

    assert!(authenticate_by_uuid(&db, &cold, Uuid::new_v4()).await.is_none());
}

#[actix_rt::test]
#[serial]
async fn test_remove_sessions() {
    let db = setup_test_database().await.unwrap();
    let user = create_test_user(&db, "logout").await.unwrap();
    let map = DashMap::new();

    let first = new_session(&db, &map, user.id).await.unwrap();
    let second = new_session(&db, &map, user.id).await.unwrap();

    remove_session(&db, &map, first).await.unwrap();
    assert!(authenticate_by_uuid(&db, &map, first).await.is_none());
    assert!(authenticate_by_uuid(&db, &map, second).await.is_some());

    remove_user_sessions(&db, &map, user.id).await.unwrap();
    assert!(map.is_empty());
    assert_eq!(sessions::Entity::find().count(&db).await.unwrap(), 0);
}

#[actix_rt::test]
#[serial]
async fn test_expired_sessions_are_purged() {
    let db = setup_test_database().await.unwrap();
    let user = create_test_user(&db, "expiring").await.unwrap();
    let map = DashMap::new();
    let live = new_session(&db, &map, user.id).await.unwrap();

    let now = ticketdesk::audit::now();
    let stale = Uuid::new_v4();
    sessions::ActiveModel {
        id: Set(stale.to_string()),
        user_id: Set(user.id),
        created_at: Set(now - Duration::days(2)),
        expires_at: Set(now - Duration::days(1)),
    }
    .insert(&db)
    .await
    .unwrap();

    assert!(authenticate_by_uuid(&db, &map, stale).await.is_none());

    let purged = expire_sessions(&db, &map).await.unwrap();
    assert_eq!(purged, 1);
    assert!(authenticate_by_uuid(&db, &map, live).await.is_some());
    assert_eq!(sessions::Entity::find().count(&db).await.unwrap(), 1);
}
