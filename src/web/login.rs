use crate::accounts::{authenticate, AuthFailure};
use crate::db::get_db_pool;
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::ClientCtx;
use crate::session::{self, get_sess, LOGGED_IN_KEY, TOKEN_KEY};
use actix_web::http::StatusCode;
use actix_web::{error, get, post, web, Error, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::{DatabaseConnection, DbErr};
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(post_login).service(view_login);
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate<'a> {
    pub client: ClientCtx,
    pub username: &'a str,
    pub error: &'a str,
}

#[derive(Deserialize)]
pub struct FormData {
    csrf_token: String,
    username: String,
    password: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum LoginResultStatus {
    Success,
    BadName,
    BadPassword,
    Inactive,
}

pub struct LoginResult {
    pub result: LoginResultStatus,
    pub user_id: Option<i32>,
}

impl LoginResult {
    fn success(user_id: i32) -> Self {
        Self {
            result: LoginResultStatus::Success,
            user_id: Some(user_id),
        }
    }
    fn fail(result: LoginResultStatus) -> Self {
        Self {
            result,
            user_id: None,
        }
    }
}

/// Checks a username and password pair.
pub async fn login(db: &DatabaseConnection, name: &str, pass: &str) -> Result<LoginResult, DbErr> {
    Ok(match authenticate(db, name.trim(), pass).await? {
        Ok(user) => LoginResult::success(user.id),
        Err(AuthFailure::BadName) => LoginResult::fail(LoginResultStatus::BadName),
        Err(AuthFailure::BadPassword) => LoginResult::fail(LoginResultStatus::BadPassword),
        Err(AuthFailure::Inactive) => LoginResult::fail(LoginResultStatus::Inactive),
    })
}

#[post("/login/")]
pub async fn post_login(
    client: ClientCtx,
    cookies: actix_session::Session,
    form: web::Form<FormData>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;

    let db = get_db_pool();
    let result = login(db, &form.username, &form.password)
        .await
        .map_err(|e| {
            log::error!("post_login: {}", e);
            error::ErrorInternalServerError("DB error")
        })?;

    let user_id = match (result.result, result.user_id) {
        (LoginResultStatus::Success, Some(user_id)) => user_id,
        (status, _) => {
            log::debug!("login failure: {:?} for {}", status, form.username);
            // Same message for every failure to avoid username enumeration.
            let mut res = LoginTemplate {
                client,
                username: form.username.trim(),
                error: "Invalid username or password.",
            }
            .to_response();
            *res.status_mut() = StatusCode::UNAUTHORIZED;
            return Ok(res);
        }
    };

    let uuid = session::new_session(db, get_sess(), user_id)
        .await
        .map_err(|e| {
            log::error!("post_login: new_session() {}", e);
            error::ErrorInternalServerError("DB error")
        })?
        .to_string();

    cookies.renew();
    cookies
        .insert(LOGGED_IN_KEY, true)
        .map_err(|_| error::ErrorInternalServerError("middleware error"))?;
    cookies
        .insert(TOKEN_KEY, uuid)
        .map_err(|_| error::ErrorInternalServerError("middleware error"))?;

    log::info!("User logged in: user_id={}", user_id);
    Ok(super::redirect("/"))
}

#[get("/login/")]
pub async fn view_login(client: ClientCtx) -> impl Responder {
    LoginTemplate {
        client,
        username: "",
        error: "",
    }
    .to_response()
}
