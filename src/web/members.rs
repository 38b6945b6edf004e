use super::db_error;
use crate::accounts;
use crate::audit::VIEW_EDIT_LABEL;
use crate::db::get_db_pool;
use crate::groups::groups_of_user;
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::ClientCtx;
use crate::orm::{groups, users};
use crate::session::{get_sess, remove_user_sessions};
use crate::template::Paginator;
use actix_web::{get, post, web, Error, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_members)
        .service(view_member)
        .service(post_delete_member);
}

#[derive(Deserialize)]
pub struct ListQuery {
    page: Option<u64>,
}

#[derive(Template)]
#[template(path = "members/list.html")]
struct MemberListTemplate<'a> {
    client: ClientCtx,
    users: &'a [users::Model],
    paginator: Paginator,
    view_edit_label: &'a str,
}

#[get("/members/")]
pub async fn view_members(
    client: ClientCtx,
    query: web::Query<ListQuery>,
) -> Result<impl Responder, Error> {
    let per_page = crate::app_config::limits().members_per_page as u64;
    let page = accounts::list_users(get_db_pool(), query.page.unwrap_or(1), per_page)
        .await
        .map_err(|e| db_error("view_members", e))?;

    Ok(MemberListTemplate {
        client,
        users: &page.users,
        paginator: Paginator {
            base_url: "/members/".to_owned(),
            this_page: page.page,
            page_count: page.page_count,
        },
        view_edit_label: VIEW_EDIT_LABEL,
    }
    .to_response())
}

#[derive(Template)]
#[template(path = "members/detail.html")]
struct MemberDetailTemplate<'a> {
    client: ClientCtx,
    user: &'a users::Model,
    groups: &'a [groups::Model],
    can_delete: bool,
}

#[get("/members/{user_id}/")]
pub async fn view_member(client: ClientCtx, path: web::Path<i32>) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let user = accounts::get_user(db, path.into_inner()).await?;
    let groups = groups_of_user(db, user.id)
        .await
        .map_err(|e| db_error("view_member", e))?;

    let can_delete = client.is_admin() && client.get_id() != Some(user.id);

    Ok(MemberDetailTemplate {
        client,
        user: &user,
        groups: &groups,
        can_delete,
    }
    .to_response())
}

#[derive(Deserialize)]
pub struct CsrfForm {
    csrf_token: String,
}

#[post("/members/{user_id}/delete/")]
pub async fn post_delete_member(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<i32>,
    form: web::Form<CsrfForm>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;
    let admin_id = client.require_admin()?;

    let user_id = path.into_inner();
    if user_id == admin_id {
        return Err(actix_web::error::ErrorBadRequest(
            "You cannot delete your own account",
        ));
    }

    let db = get_db_pool();
    let user = accounts::delete_user(db, user_id, Some(admin_id)).await?;
    if let Err(e) = remove_user_sessions(db, get_sess(), user.id).await {
        log::error!("post_delete_member: remove_user_sessions() {}", e);
    }

    Ok(super::redirect("/members/"))
}
