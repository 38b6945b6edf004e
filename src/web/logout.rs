use crate::db::get_db_pool;
use crate::session::{get_sess, remove_session, LOGGED_IN_KEY, TOKEN_KEY};
use actix_web::{get, HttpResponse};
use uuid::Uuid;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_logout);
}

#[get("/logout/")]
pub async fn view_logout(cookies: actix_session::Session) -> HttpResponse {
    // Remove session from database and session cache
    match cookies.get::<String>(TOKEN_KEY) {
        Ok(Some(uuid)) => match Uuid::parse_str(&uuid) {
            Ok(uuid) => {
                if let Err(e) = remove_session(get_db_pool(), get_sess(), uuid).await {
                    log::error!("view_logout: remove_session() {}", e);
                }
            }
            Err(e) => {
                log::error!("view_logout: parse_str() {}", e);
            }
        },
        Ok(None) => {
            log::debug!("view_logout: missing token (already logged out?)");
        }
        Err(e) => {
            log::error!("view_logout: cookies.get() {}", e);
        }
    }

    cookies.remove(LOGGED_IN_KEY);
    cookies.remove(TOKEN_KEY);

    super::redirect("/")
}
