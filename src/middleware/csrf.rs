//! CSRF tokens for HTML forms.
//!
//! One token is generated per browser session and kept in the signed
//! session cookie. Every template that posts a form renders it into a
//! hidden `csrf_token` field, and every POST handler checks it with
//! [`validate_csrf_token`] before touching the database.

use actix_web::{error, Error};
use rand::{distributions::Alphanumeric, Rng};

pub const CSRF_TOKEN_LENGTH: usize = 32;
const CSRF_SESSION_KEY: &str = "csrf_token";

/// Generate a new CSRF token
pub fn generate_csrf_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CSRF_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Returns the session's token, creating one on first use.
pub fn get_or_create_csrf_token(session: &actix_session::Session) -> Result<String, Error> {
    match session.get::<String>(CSRF_SESSION_KEY) {
        Ok(Some(token)) => Ok(token),
        _ => {
            let token = generate_csrf_token();
            session
                .insert(CSRF_SESSION_KEY, token.clone())
                .map_err(|_| error::ErrorInternalServerError("Failed to store CSRF token"))?;
            Ok(token)
        }
    }
}

/// Compares without short-circuiting on the first differing byte.
fn tokens_match(expected: &str, provided: &str) -> bool {
    if expected.len() != provided.len() {
        return false;
    }
    expected
        .bytes()
        .zip(provided.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Rejects the request with 403 unless the submitted token matches the session.
pub fn validate_csrf_token(
    session: &actix_session::Session,
    provided_token: &str,
) -> Result<(), Error> {
    let expected_token = session
        .get::<String>(CSRF_SESSION_KEY)
        .map_err(|_| error::ErrorInternalServerError("Failed to get CSRF token"))?
        .ok_or_else(|| error::ErrorForbidden("CSRF token not found in session"))?;

    if !tokens_match(&expected_token, provided_token) {
        log::warn!("CSRF token validation failed");
        return Err(error::ErrorForbidden("Invalid CSRF token"));
    }

    Ok(())
}
