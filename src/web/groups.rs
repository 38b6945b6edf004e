use super::db_error;
use crate::audit::VIEW_EDIT_LABEL;
use crate::db::get_db_pool;
use crate::error::ServiceError;
use crate::groups::{self, GroupSummary};
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::ClientCtx;
use crate::orm::{groups as group_orm, tickets, users};
use crate::user::RESOURCE_URL;
use actix_web::http::StatusCode;
use actix_web::{get, post, web, Error, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use serde::Deserialize;

/// Tickets shown on a group page before linking to the filtered list.
const GROUP_TICKETS: u64 = 10;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // `/groups/create/` before `/groups/{slug}/`.
    conf.service(view_groups)
        .service(view_create_group)
        .service(post_create_group)
        .service(view_group)
        .service(post_delete_group)
        .service(post_join_group)
        .service(post_leave_group);
}

#[derive(Template)]
#[template(path = "groups/list.html")]
struct GroupListTemplate<'a> {
    client: ClientCtx,
    groups: &'a [GroupSummary],
    view_edit_label: &'a str,
}

#[get("/groups/")]
pub async fn view_groups(client: ClientCtx) -> Result<impl Responder, Error> {
    let groups = groups::list_groups(get_db_pool())
        .await
        .map_err(|e| db_error("view_groups", e))?;

    Ok(GroupListTemplate {
        client,
        groups: &groups,
        view_edit_label: VIEW_EDIT_LABEL,
    }
    .to_response())
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct GroupForm {
    csrf_token: String,
    name: String,
    description: String,
}

#[derive(Template)]
#[template(path = "groups/create.html")]
struct GroupCreateTemplate<'a> {
    client: ClientCtx,
    form: &'a GroupForm,
    error: String,
}

fn render_create_form(client: ClientCtx, form: &GroupForm, error: String) -> HttpResponse {
    let status = if error.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    let mut res = GroupCreateTemplate {
        client,
        form,
        error,
    }
    .to_response();
    *res.status_mut() = status;
    res
}

#[get("/groups/create/")]
pub async fn view_create_group(client: ClientCtx) -> Result<HttpResponse, Error> {
    client.require_login()?;
    Ok(render_create_form(client, &GroupForm::default(), String::new()))
}

#[post("/groups/create/")]
pub async fn post_create_group(
    client: ClientCtx,
    cookies: actix_session::Session,
    form: web::Form<GroupForm>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_login()?;

    match groups::create_group(get_db_pool(), &form.name, &form.description, Some(user_id)).await
    {
        Ok(group) => Ok(super::redirect(&format!("/groups/{}/", group.slug))),
        Err(ServiceError::Invalid(message)) => Ok(render_create_form(client, &form, message)),
        Err(e) => Err(e.into()),
    }
}

#[derive(Template)]
#[template(path = "groups/detail.html")]
struct GroupDetailTemplate<'a> {
    client: ClientCtx,
    group: &'a group_orm::Model,
    members: &'a [users::Model],
    tickets: &'a [tickets::Model],
    ticket_pages: u64,
    is_member: bool,
    can_modify: bool,
    member_url: &'a str,
}

#[get("/groups/{slug}/")]
pub async fn view_group(client: ClientCtx, path: web::Path<String>) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let group = groups::get_group_by_slug(db, &path).await?;

    let members = groups::members_of(db, group.id)
        .await
        .map_err(|e| db_error("view_group", e))?;
    let page = crate::tickets::list_tickets(db, Some(group.id), 1, GROUP_TICKETS)
        .await
        .map_err(|e| db_error("view_group", e))?;

    let is_member = match client.get_id() {
        Some(user_id) => members.iter().any(|m| m.id == user_id),
        None => false,
    };
    let can_modify = client.can_modify(group.created_by);

    Ok(GroupDetailTemplate {
        client,
        group: &group,
        members: &members,
        tickets: &page.tickets,
        ticket_pages: page.page_count,
        is_member,
        can_modify,
        member_url: RESOURCE_URL,
    }
    .to_response())
}

#[derive(Deserialize)]
pub struct CsrfForm {
    csrf_token: String,
}

#[post("/groups/{slug}/delete/")]
pub async fn post_delete_group(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<String>,
    form: web::Form<CsrfForm>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;

    let db = get_db_pool();
    let group = groups::get_group_by_slug(db, &path).await?;
    let user_id = client.require_modify(group.created_by)?;
    groups::delete_group(db, &group.slug, Some(user_id)).await?;

    Ok(super::redirect("/groups/"))
}

#[post("/groups/{slug}/join/")]
pub async fn post_join_group(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<String>,
    form: web::Form<CsrfForm>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_login()?;

    let db = get_db_pool();
    let group = groups::get_group_by_slug(db, &path).await?;
    groups::join_group(db, &group, user_id).await?;

    Ok(super::redirect(&format!("/groups/{}/", group.slug)))
}

#[post("/groups/{slug}/leave/")]
pub async fn post_leave_group(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<String>,
    form: web::Form<CsrfForm>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_login()?;

    let db = get_db_pool();
    let group = groups::get_group_by_slug(db, &path).await?;
    groups::leave_group(db, &group, user_id).await?;

    Ok(super::redirect(&format!("/groups/{}/", group.slug)))
}
