//! Login sessions and password hashing.
//!
//! Sessions are rows in the `sessions` table keyed by a random UUID. The
//! UUID travels in the signed session cookie under `token`; an in-memory
//! map fronts the table so most requests never touch the database.

use crate::orm::sessions;
use crate::user::Profile;
use argon2::Argon2;
use chrono::{Duration, NaiveDateTime};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};
use uuid::Uuid;

/// Session cookie key holding the session UUID.
pub const TOKEN_KEY: &str = "token";
/// Session cookie key flagging a logged in browser.
pub const LOGGED_IN_KEY: &str = "logged_in";

static SALT: Lazy<String> = Lazy::new(|| std::env::var("SALT").unwrap_or_default());

static ARGON2: Lazy<Argon2<'static>> = Lazy::new(|| {
    let secret: &'static str = SALT.as_str();
    if secret.is_empty() {
        log::warn!("SALT is not set; password hashes are not peppered.");
        return Argon2::default();
    }
    Argon2::new_with_secret(
        secret.as_bytes(),
        argon2::Algorithm::default(),
        argon2::Version::default(),
        argon2::Params::default(),
    )
    .unwrap_or_else(|e| {
        log::error!("SALT rejected by Argon2 ({}); falling back to no secret.", e);
        Argon2::default()
    })
});

static SESSIONS: Lazy<DashMap<Uuid, Session>> = Lazy::new(DashMap::new);

/// A live login.
#[derive(Clone, Copy, Debug)]
pub struct Session {
    pub user_id: i32,
    pub expires_at: NaiveDateTime,
}

impl Session {
    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        self.expires_at <= now
    }
}

impl From<&sessions::Model> for Session {
    fn from(model: &sessions::Model) -> Self {
        Self {
            user_id: model.user_id,
            expires_at: model.expires_at,
        }
    }
}

/// Forces the lazily built globals so configuration problems surface at
/// start-up instead of on the first login.
pub fn init() {
    Lazy::force(&ARGON2);
    Lazy::force(&SESSIONS);
}

pub fn get_argon2() -> &'static Argon2<'static> {
    &ARGON2
}

pub fn get_sess() -> &'static DashMap<Uuid, Session> {
    &SESSIONS
}

fn session_lifetime() -> Duration {
    Duration::minutes(crate::app_config::security().session_timeout_minutes as i64)
}

/// Creates a session for the user and returns its UUID.
pub async fn new_session(
    db: &DatabaseConnection,
    ses_map: &DashMap<Uuid, Session>,
    user_id: i32,
) -> Result<Uuid, DbErr> {
    let uuid = Uuid::new_v4();
    let now = crate::audit::now();
    let session = Session {
        user_id,
        expires_at: now + session_lifetime(),
    };

    sessions::ActiveModel {
        id: Set(uuid.to_string()),
        user_id: Set(user_id),
        created_at: Set(now),
        expires_at: Set(session.expires_at),
    }
    .insert(db)
    .await?;

    ses_map.insert(uuid, session);
    Ok(uuid)
}

pub async fn remove_session(
    db: &DatabaseConnection,
    ses_map: &DashMap<Uuid, Session>,
    uuid: Uuid,
) -> Result<(), DbErr> {
    ses_map.remove(&uuid);
    sessions::Entity::delete_many()
        .filter(sessions::Column::Id.eq(uuid.to_string()))
        .exec(db)
        .await?;
    Ok(())
}

/// Drops every session belonging to a user, e.g. when the account is deleted.
pub async fn remove_user_sessions(
    db: &DatabaseConnection,
    ses_map: &DashMap<Uuid, Session>,
    user_id: i32,
) -> Result<(), DbErr> {
    ses_map.retain(|_, s| s.user_id != user_id);
    sessions::Entity::delete_many()
        .filter(sessions::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Resolves a session UUID, consulting the cache before the database.
pub async fn authenticate_by_uuid(
    db: &DatabaseConnection,
    ses_map: &DashMap<Uuid, Session>,
    uuid: Uuid,
) -> Option<Session> {
    let now = crate::audit::now();

    let cached = ses_map.get(&uuid).map(|s| *s);
    if let Some(session) = cached {
        if session.is_expired(now) {
            ses_map.remove(&uuid);
            return None;
        }
        return Some(session);
    }

    match sessions::Entity::find_by_id(uuid.to_string()).one(db).await {
        Ok(Some(model)) => {
            let session = Session::from(&model);
            if session.is_expired(now) {
                return None;
            }
            ses_map.insert(uuid, session);
            Some(session)
        }
        Ok(None) => None,
        Err(e) => {
            log::error!("authenticate_by_uuid: {}", e);
            None
        }
    }
}

/// Reads the session UUID from the cookie and resolves it.
pub async fn authenticate_by_cookie(cookies: &actix_session::Session) -> Option<(Uuid, Session)> {
    let token = match cookies.get::<String>(TOKEN_KEY) {
        Ok(Some(token)) => token,
        Ok(None) => return None,
        Err(e) => {
            log::debug!("authenticate_by_cookie: {}", e);
            return None;
        }
    };

    let uuid = match Uuid::parse_str(&token) {
        Ok(uuid) => uuid,
        Err(e) => {
            log::debug!("authenticate_by_cookie: bad token {}", e);
            return None;
        }
    };

    authenticate_by_uuid(crate::db::get_db_pool(), get_sess(), uuid)
        .await
        .map(|session| (uuid, session))
}

/// Resolves the cookie to the logged in user's profile, if any.
pub async fn authenticate_client_by_session(cookies: &actix_session::Session) -> Option<Profile> {
    let (_, session) = authenticate_by_cookie(cookies).await?;
    match Profile::get_by_id(crate::db::get_db_pool(), session.user_id).await {
        Ok(profile) => profile,
        Err(e) => {
            log::error!("authenticate_client_by_session: {}", e);
            None
        }
    }
}

/// Deletes expired sessions from the table and the cache.
pub async fn expire_sessions(
    db: &DatabaseConnection,
    ses_map: &DashMap<Uuid, Session>,
) -> Result<u64, DbErr> {
    let now = crate::audit::now();
    ses_map.retain(|_, s| !s.is_expired(now));
    let res = sessions::Entity::delete_many()
        .filter(sessions::Column::ExpiresAt.lte(now))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_expiry() {
        let now = crate::audit::now();
        let live = Session {
            user_id: 1,
            expires_at: now + Duration::minutes(5),
        };
        let dead = Session {
            user_id: 1,
            expires_at: now - Duration::minutes(5),
        };
        assert!(!live.is_expired(now));
        assert!(dead.is_expired(now));
    }

    #[test]
    fn test_argon2_round_trip() {
        use argon2::password_hash::{
            rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        };

        let hash = get_argon2()
            .hash_password(b"hunter22", &SaltString::generate(&mut OsRng))
            .unwrap()
            .to_string();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(get_argon2().verify_password(b"hunter22", &parsed).is_ok());
        assert!(get_argon2().verify_password(b"hunter23", &parsed).is_err());
    }
}
