/// Integration tests for the audit columns shared by every table
mod common;
use serial_test::serial;

use common::{database::*, fixtures::*};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait};
use ticketdesk::audit::{AuditTrail, RecordStatus};
use ticketdesk::orm::{groups, lookups};

#[actix_rt::test]
#[serial]
async fn test_insert_stamps_audit_columns() {
    let db = setup_test_database().await.unwrap();
    let before = ticketdesk::audit::now();

    let lookup = lookups::ActiveModel {
        name: Set("Male".to_owned()),
        category: Set(Some(lookups::LookUpCategory::Gender)),
        ..Default::default()
    }
    .insert(&db)
    .await
    .expect("insert should stamp the audit columns");

    assert_eq!(lookup.record_status, RecordStatus::Active);
    assert!(lookup.created_on >= before);
    assert!(lookup.changed_on >= lookup.created_on);
    assert_eq!(lookup.created_by, None);
    assert_eq!(lookup.changed_by, None);
}

#[actix_rt::test]
#[serial]
async fn test_update_advances_changed_on_only() {
    let db = setup_test_database().await.unwrap();
    let user = create_test_user(&db, "auditor").await.unwrap();
    let group = create_test_group(&db, "Audited", Some(user.id)).await;

    assert_eq!(group.created_by, Some(user.id));
    assert_eq!(group.changed_by, Some(user.id));

    actix_rt::time::sleep(std::time::Duration::from_millis(5)).await;

    let mut active: groups::ActiveModel = group.clone().into();
    active.description = Set("Now with a description".to_owned());
    active.set_actor(None, false);
    let updated = active.update(&db).await.unwrap();

    assert_eq!(updated.created_on, group.created_on);
    assert_eq!(updated.created_by, Some(user.id));
    assert!(updated.changed_on > group.changed_on);
    assert_eq!(updated.changed_by, None);
}

#[actix_rt::test]
#[serial]
async fn test_explicit_values_survive_insert() {
    let db = setup_test_database().await.unwrap();
    let created_on = chrono::NaiveDate::from_ymd_opt(2020, 1, 2)
        .and_then(|d| d.and_hms_opt(3, 4, 5))
        .unwrap();

    let lookup = lookups::ActiveModel {
        name: Set("Archived".to_owned()),
        category: Set(None),
        created_on: Set(created_on),
        record_status: Set(RecordStatus::ActiveLocked),
        ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap();

    assert_eq!(lookup.created_on, created_on);
    assert_eq!(lookup.record_status, RecordStatus::ActiveLocked);
    assert!(lookup.changed_on > created_on);

    let stored = lookups::Entity::find_by_id(lookup.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.record_status, RecordStatus::ActiveLocked);
}

#[actix_rt::test]
#[serial]
async fn test_membership_audit_user_cannot_be_removed() {
    use ticketdesk::orm::{group_members, users};

    let db = setup_test_database().await.unwrap();
    let admin = create_test_admin(&db, "enroller").await.unwrap();
    let member = create_test_user(&db, "enrolled").await.unwrap();
    let group = create_test_group(&db, "Enrolment", None).await;

    let mut membership = group_members::ActiveModel {
        group_id: Set(group.id),
        user_id: Set(member.id),
        ..Default::default()
    };
    membership.set_actor(Some(admin.id), true);
    membership.insert(&db).await.unwrap();

    // The user who recorded the membership is restricted, not cascaded.
    assert!(users::Entity::delete_by_id(admin.id).exec(&db).await.is_err());
    assert!(group_members::Entity::find_by_id((group.id, member.id))
        .one(&db)
        .await
        .unwrap()
        .is_some());

    // The member themselves cascades.
    users::Entity::delete_by_id(member.id).exec(&db).await.unwrap();
    assert!(group_members::Entity::find_by_id((group.id, member.id))
        .one(&db)
        .await
        .unwrap()
        .is_none());
}
