//! Test fixtures for creating test data
#![allow(dead_code)]

use sea_orm::DatabaseConnection;
use ticketdesk::accounts::{self, AccountError, NewUser};
use ticketdesk::orm::{groups, tickets, users};
use ticketdesk::tickets::NewTicket;

pub const TEST_PASSWORD: &str = "password123";

/// Create a regular user with known credentials
pub async fn create_test_user(
    db: &DatabaseConnection,
    username: &str,
) -> Result<users::Model, AccountError> {
    let email = format!("{}@Example.COM", username);
    let new_user = NewUser::new(
        "Test",
        &email,
        username,
        "555-0100",
        Some(TEST_PASSWORD),
    );
    accounts::create_user(db, &new_user).await
}

/// Create a staff account holding every privilege flag
pub async fn create_test_admin(
    db: &DatabaseConnection,
    username: &str,
) -> Result<users::Model, AccountError> {
    let email = format!("{}@example.com", username);
    let new_user = NewUser::new("Admin", &email, username, "555-0199", Some(TEST_PASSWORD));
    accounts::create_superuser(db, &new_user).await
}

pub async fn create_test_ticket(
    db: &DatabaseConnection,
    summary: &str,
    group_id: Option<i32>,
    actor: Option<i32>,
) -> tickets::Model {
    let new_ticket = NewTicket {
        summary,
        description: "Something is broken.\n\nSee https://example.com/log for details.",
        author_name: "Tester",
        group_id,
    };
    ticketdesk::tickets::create_ticket(db, &new_ticket, actor)
        .await
        .expect("Failed to create ticket")
}

pub async fn create_test_group(
    db: &DatabaseConnection,
    name: &str,
    actor: Option<i32>,
) -> groups::Model {
    ticketdesk::groups::create_group(db, name, "", actor)
        .await
        .expect("Failed to create group")
}
