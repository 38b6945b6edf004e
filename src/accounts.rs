//! User accounts: creation, validation and password handling.
//!
//! Every account needs a first name, an email address, a username and a
//! phone number. `create_user` refuses to persist anything until all four
//! are present; `create_superuser` does the same and then raises the
//! admin, staff and superuser flags.

use crate::audit::{self, AuditTrail, RecordStatus};
use crate::error::ServiceError;
use crate::orm::users::{self, Gender};
use crate::session::get_argon2;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use derive_more::Display;
use rand::{distributions::Alphanumeric, Rng};
use sea_orm::{entity::*, query::*, sea_query::Expr, DatabaseConnection, DbErr, PaginatorTrait};

/// Prefix marking a password that can never be used to log in.
pub const UNUSABLE_PASSWORD_PREFIX: char = '!';
const UNUSABLE_PASSWORD_SUFFIX_LENGTH: usize = 40;

#[derive(Debug, Display)]
pub enum AccountError {
    #[display(fmt = "User must have a first name")]
    MissingFirstName,
    #[display(fmt = "User must have an email address")]
    MissingEmail,
    #[display(fmt = "User must have a username")]
    MissingUsername,
    #[display(fmt = "User must have a phone number")]
    MissingPhoneNumber,
    #[display(fmt = "A user with that username already exists")]
    UsernameTaken,
    #[display(fmt = "Failed to hash password: {}", _0)]
    Hash(String),
    #[display(fmt = "Database error: {}", _0)]
    Db(DbErr),
}

impl AccountError {
    /// True for errors caused by the submitted details rather than the server.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, AccountError::Hash(_) | AccountError::Db(_))
    }
}

impl std::error::Error for AccountError {}

impl From<DbErr> for AccountError {
    fn from(err: DbErr) -> Self {
        AccountError::Db(err)
    }
}

impl ResponseError for AccountError {
    fn status_code(&self) -> StatusCode {
        if self.is_user_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = if self.is_user_error() {
            self.to_string()
        } else {
            log::error!("account error: {}", self);
            "Failed to create user".to_owned()
        };
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(message)
    }
}

/// Details for a new account.
#[derive(Clone, Debug, Default)]
pub struct NewUser<'a> {
    pub first_name: &'a str,
    pub email: &'a str,
    pub username: &'a str,
    pub phone_number: &'a str,
    /// `None` creates an account that cannot log in with a password.
    pub password: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub gender: Option<Gender>,
}

impl<'a> NewUser<'a> {
    pub fn new(
        first_name: &'a str,
        email: &'a str,
        username: &'a str,
        phone_number: &'a str,
        password: Option<&'a str>,
    ) -> Self {
        Self {
            first_name,
            email,
            username,
            phone_number,
            password,
            ..Default::default()
        }
    }
}

/// Checks that every required detail is present, in a fixed order.
pub fn validate_user_details(
    email: &str,
    first_name: &str,
    username: &str,
    phone_number: &str,
) -> Result<(), AccountError> {
    if first_name.trim().is_empty() {
        return Err(AccountError::MissingFirstName);
    }
    if email.trim().is_empty() {
        return Err(AccountError::MissingEmail);
    }
    if username.trim().is_empty() {
        return Err(AccountError::MissingUsername);
    }
    if phone_number.trim().is_empty() {
        return Err(AccountError::MissingPhoneNumber);
    }
    Ok(())
}

/// Lowercases the domain part of an address. The local part is left as is.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_owned(),
    }
}

pub fn hash_password(password: &str) -> Result<String, AccountError> {
    get_argon2()
        .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))
        .map(|hash| hash.to_string())
        .map_err(|e| AccountError::Hash(e.to_string()))
}

/// A random marker that no password hashes to.
pub fn unusable_password() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(UNUSABLE_PASSWORD_SUFFIX_LENGTH)
        .map(char::from)
        .collect();
    format!("{}{}", UNUSABLE_PASSWORD_PREFIX, suffix)
}

pub fn has_usable_password(stored: &str) -> bool {
    !stored.starts_with(UNUSABLE_PASSWORD_PREFIX)
}

/// Verifies a plain password against the stored hash.
pub fn check_password(password: &str, stored: &str) -> bool {
    if !has_usable_password(stored) {
        return false;
    }
    match PasswordHash::new(stored) {
        Ok(parsed) => get_argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            log::error!("check_password: stored hash is malformed: {}", e);
            false
        }
    }
}

/// Finds a user by username, ignoring case.
pub async fn find_by_username(
    db: &DatabaseConnection,
    username: &str,
) -> Result<Option<users::Model>, DbErr> {
    users::Entity::find()
        .filter(Expr::cust_with_values(
            "LOWER(username) = ?",
            vec![username.trim().to_lowercase()],
        ))
        .one(db)
        .await
}

async fn insert_user(
    db: &DatabaseConnection,
    new_user: &NewUser<'_>,
) -> Result<users::Model, AccountError> {
    let username = new_user.username.trim();
    if find_by_username(db, username).await?.is_some() {
        return Err(AccountError::UsernameTaken);
    }

    let password = match new_user.password {
        Some(password) => hash_password(password)?,
        None => unusable_password(),
    };

    let user = users::ActiveModel {
        username: Set(username.to_owned()),
        password: Set(password),
        email: Set(Some(normalize_email(new_user.email))),
        first_name: Set(Some(new_user.first_name.trim().to_owned())),
        last_name: Set(new_user
            .last_name
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)),
        gender: Set(new_user.gender),
        phone_number: Set(Some(new_user.phone_number.trim().to_owned())),
        is_active: Set(true),
        is_admin: Set(false),
        is_staff: Set(false),
        is_superuser: Set(false),
        date_joined: Set(audit::now()),
        last_login: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(user)
}

/// Validates the details and persists a regular account.
pub async fn create_user(
    db: &DatabaseConnection,
    new_user: &NewUser<'_>,
) -> Result<users::Model, AccountError> {
    validate_user_details(
        new_user.email,
        new_user.first_name,
        new_user.username,
        new_user.phone_number,
    )?;

    let user = insert_user(db, new_user).await?;
    log::info!("New user created: {} (user_id: {})", user.username, user.id);
    Ok(user)
}

/// Creates an account holding every privilege flag.
pub async fn create_superuser(
    db: &DatabaseConnection,
    new_user: &NewUser<'_>,
) -> Result<users::Model, AccountError> {
    validate_user_details(
        new_user.email,
        new_user.first_name,
        new_user.username,
        new_user.phone_number,
    )?;

    let user = create_user(db, new_user).await?;
    let mut active: users::ActiveModel = user.into();
    active.is_admin = Set(true);
    active.is_staff = Set(true);
    active.is_superuser = Set(true);
    let user = active.update(db).await?;

    log::info!("Superuser created: {} (user_id: {})", user.username, user.id);
    Ok(user)
}

/// Replaces the password of an account.
pub async fn set_password(
    db: &DatabaseConnection,
    user: users::Model,
    password: Option<&str>,
) -> Result<users::Model, AccountError> {
    let hash = match password {
        Some(password) => hash_password(password)?,
        None => unusable_password(),
    };
    let user_id = user.id;
    let mut active: users::ActiveModel = user.into();
    active.password = Set(hash);
    active.set_actor(Some(user_id), false);
    Ok(active.update(db).await?)
}

/// Why a login was refused.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthFailure {
    BadName,
    BadPassword,
    Inactive,
}

/// Checks credentials and records the login time.
pub async fn authenticate(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<Result<users::Model, AuthFailure>, DbErr> {
    let user = match find_by_username(db, username).await? {
        Some(user) if user.record_status != RecordStatus::Deleted => user,
        _ => return Ok(Err(AuthFailure::BadName)),
    };

    if !check_password(password, &user.password) {
        return Ok(Err(AuthFailure::BadPassword));
    }

    if !user.is_active {
        return Ok(Err(AuthFailure::Inactive));
    }

    let mut active: users::ActiveModel = user.into();
    active.last_login = Set(Some(audit::now()));
    Ok(Ok(active.update(db).await?))
}

/// One page of users.
#[derive(Debug)]
pub struct UserPage {
    pub users: Vec<users::Model>,
    /// 1-based
    pub page: u64,
    pub page_count: u64,
}

/// Active users in display order, one page at a time.
pub async fn list_users(
    db: &DatabaseConnection,
    page: u64,
    per_page: u64,
) -> Result<UserPage, DbErr> {
    let paginator = users::Entity::find()
        .filter(users::Column::RecordStatus.ne(RecordStatus::Deleted))
        .order_by_asc(users::Column::FirstName)
        .order_by_asc(users::Column::LastName)
        .order_by_asc(users::Column::Username)
        .order_by_asc(users::Column::Email)
        .paginate(db, per_page.max(1) as usize);

    let page_count = (paginator.num_pages().await? as u64).max(1);
    let page = page.clamp(1, page_count);
    let users = paginator.fetch_page((page - 1) as usize).await?;

    Ok(UserPage {
        users,
        page,
        page_count,
    })
}

pub async fn get_user(db: &DatabaseConnection, id: i32) -> Result<users::Model, ServiceError> {
    users::Entity::find_by_id(id)
        .one(db)
        .await?
        .filter(|u| u.record_status.is_visible())
        .ok_or(ServiceError::NotFound)
}

/// Soft deletes an account and deactivates it.
pub async fn delete_user(
    db: &DatabaseConnection,
    id: i32,
    actor: Option<i32>,
) -> Result<users::Model, ServiceError> {
    let user = get_user(db, id).await?;
    audit::ensure_mutable(user.record_status)?;

    let mut active: users::ActiveModel = user.into();
    active.is_active = Set(false);
    active.set_record_status(RecordStatus::Deleted);
    active.set_actor(actor, false);
    let user = active.update(db).await?;

    log::info!("User soft deleted: user_id={} by {:?}", user.id, actor);
    Ok(user)
}
