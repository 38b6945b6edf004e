/// Integration tests for the account manager
mod common;
use serial_test::serial;

use common::{database::*, fixtures::*};
use sea_orm::{EntityTrait, PaginatorTrait};
use ticketdesk::accounts::{
    authenticate, create_superuser, create_user, delete_user, find_by_username, list_users,
    set_password, AccountError, AuthFailure, NewUser,
};
use ticketdesk::audit::RecordStatus;
use ticketdesk::orm::users;

fn details<'a>(
    first_name: &'a str,
    email: &'a str,
    username: &'a str,
    phone_number: &'a str,
) -> NewUser<'a> {
    NewUser::new(first_name, email, username, phone_number, Some(TEST_PASSWORD))
}

#[actix_rt::test]
#[serial]
async fn test_create_user_requires_every_field() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    let cases = [
        (details("", "a@b.com", "ann", "555"), "User must have a first name"),
        (details("Ann", "", "ann", "555"), "User must have an email address"),
        (details("Ann", "a@b.com", "", "555"), "User must have a username"),
        (details("Ann", "a@b.com", "ann", ""), "User must have a phone number"),
        (details("Ann", "a@b.com", "ann", "   "), "User must have a phone number"),
    ];

    for (new_user, message) in cases.iter() {
        let err = create_user(&db, new_user)
            .await
            .expect_err("creation should fail");
        assert!(err.is_user_error());
        assert_eq!(err.to_string(), *message);
    }

    // Nothing was persisted by the failed attempts.
    let count = users::Entity::find().count(&db).await.unwrap();
    assert_eq!(count, 0);
}

#[actix_rt::test]
#[serial]
async fn test_create_user_persists() {
    let db = setup_test_database().await.unwrap();

    let user = create_user(&db, &details("Ann", "Ann.Lee@Example.COM", "annlee", "555-0101"))
        .await
        .expect("Failed to create user");

    assert_eq!(user.username, "annlee");
    assert_eq!(user.first_name.as_deref(), Some("Ann"));
    assert_eq!(user.email.as_deref(), Some("Ann.Lee@example.com"));
    assert_eq!(user.phone_number.as_deref(), Some("555-0101"));
    assert!(user.is_active);
    assert!(!user.is_admin);
    assert!(!user.is_staff);
    assert!(!user.is_superuser);
    assert_eq!(user.record_status, RecordStatus::Active);
    assert!(user.password.starts_with("$argon2"));

    let stored = users::Entity::find_by_id(user.id)
        .one(&db)
        .await
        .unwrap()
        .expect("user row missing");
    assert_eq!(stored, user);
}

#[actix_rt::test]
#[serial]
async fn test_create_user_without_password_cannot_log_in() {
    let db = setup_test_database().await.unwrap();

    let new_user = NewUser::new("Bo", "bo@example.com", "bo", "555-0102", None);
    let user = create_user(&db, &new_user).await.unwrap();
    assert!(user.password.starts_with('!'));

    let result = authenticate(&db, "bo", "").await.unwrap();
    assert_eq!(result.unwrap_err(), AuthFailure::BadPassword);
}

#[actix_rt::test]
#[serial]
async fn test_duplicate_username_is_case_insensitive() {
    let db = setup_test_database().await.unwrap();

    create_test_user(&db, "CaseUser").await.unwrap();
    let err = create_test_user(&db, "caseuser").await.unwrap_err();
    assert!(matches!(err, AccountError::UsernameTaken));

    let found = find_by_username(&db, "CASEUSER").await.unwrap();
    assert_eq!(found.map(|u| u.username), Some("CaseUser".to_owned()));
}

#[actix_rt::test]
#[serial]
async fn test_create_superuser_sets_flags() {
    let db = setup_test_database().await.unwrap();

    let admin = create_superuser(&db, &details("Root", "root@example.com", "root", "555-0000"))
        .await
        .expect("Failed to create superuser");

    assert!(admin.is_admin);
    assert!(admin.is_staff);
    assert!(admin.is_superuser);
    assert!(admin.has_perm("anything"));

    let stored = users::Entity::find_by_id(admin.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_admin && stored.is_staff && stored.is_superuser);
}

#[actix_rt::test]
#[serial]
async fn test_create_superuser_validates_first() {
    let db = setup_test_database().await.unwrap();

    let err = create_superuser(&db, &details("Root", "root@example.com", "root", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::MissingPhoneNumber));
    assert_eq!(users::Entity::find().count(&db).await.unwrap(), 0);
}

#[actix_rt::test]
#[serial]
async fn test_authenticate() {
    let db = setup_test_database().await.unwrap();
    let user = create_test_user(&db, "loginuser").await.unwrap();
    assert!(user.last_login.is_none());

    let ok = authenticate(&db, "LoginUser", TEST_PASSWORD)
        .await
        .unwrap()
        .expect("login should succeed");
    assert_eq!(ok.id, user.id);
    assert!(ok.last_login.is_some());

    assert_eq!(
        authenticate(&db, "loginuser", "wrong").await.unwrap().unwrap_err(),
        AuthFailure::BadPassword
    );
    assert_eq!(
        authenticate(&db, "nobody", TEST_PASSWORD).await.unwrap().unwrap_err(),
        AuthFailure::BadName
    );
}

#[actix_rt::test]
#[serial]
async fn test_set_password() {
    let db = setup_test_database().await.unwrap();
    let user = create_test_user(&db, "resetme").await.unwrap();

    set_password(&db, user, Some("a new password")).await.unwrap();

    assert!(authenticate(&db, "resetme", "a new password")
        .await
        .unwrap()
        .is_ok());
    assert!(authenticate(&db, "resetme", TEST_PASSWORD)
        .await
        .unwrap()
        .is_err());
}

#[actix_rt::test]
#[serial]
async fn test_deleted_user_is_hidden_and_cannot_log_in() {
    let db = setup_test_database().await.unwrap();
    let admin = create_test_admin(&db, "admin").await.unwrap();
    let user = create_test_user(&db, "leaver").await.unwrap();

    let deleted = delete_user(&db, user.id, Some(admin.id)).await.unwrap();
    assert_eq!(deleted.record_status, RecordStatus::Deleted);
    assert!(!deleted.is_active);
    assert_eq!(deleted.changed_by, Some(admin.id));

    let remaining: Vec<String> = list_users(&db, 1, 50)
        .await
        .unwrap()
        .users
        .into_iter()
        .map(|u| u.username)
        .collect();
    assert_eq!(remaining, vec!["admin".to_owned()]);

    assert_eq!(
        authenticate(&db, "leaver", TEST_PASSWORD).await.unwrap().unwrap_err(),
        AuthFailure::BadName
    );
}

#[actix_rt::test]
#[serial]
async fn test_list_users_ordering() {
    let db = setup_test_database().await.unwrap();

    for (first, username) in [("Cleo", "c1"), ("Abe", "a2"), ("Abe", "a1")] {
        let email = format!("{}@example.com", username);
        create_user(&db, &details(first, &email, username, "555"))
            .await
            .unwrap();
    }

    let usernames: Vec<String> = list_users(&db, 1, 50)
        .await
        .unwrap()
        .users
        .into_iter()
        .map(|u| u.username)
        .collect();
    assert_eq!(usernames, vec!["a1", "a2", "c1"]);
}

#[actix_rt::test]
#[serial]
async fn test_list_users_pages() {
    let db = setup_test_database().await.unwrap();

    for (first, username) in [("Ada", "p1"), ("Bea", "p2"), ("Cy", "p3")] {
        let email = format!("{}@example.com", username);
        create_user(&db, &details(first, &email, username, "555"))
            .await
            .unwrap();
    }

    let first = list_users(&db, 1, 2).await.unwrap();
    assert_eq!(first.page, 1);
    assert_eq!(first.page_count, 2);
    assert_eq!(first.users.len(), 2);
    assert_eq!(first.users[0].username, "p1");

    let second = list_users(&db, 2, 2).await.unwrap();
    assert_eq!(second.users.len(), 1);
    assert_eq!(second.users[0].username, "p3");

    // Out of range pages land on the last one.
    let clamped = list_users(&db, 9, 2).await.unwrap();
    assert_eq!(clamped.page, 2);
    assert_eq!(clamped.users[0].username, "p3");
}
