use super::db_error;
use crate::app_config::limits;
use crate::audit::{RecordStatus, VIEW_EDIT_LABEL};
use crate::db::get_db_pool;
use crate::error::ServiceError;
use crate::groups::{self, GroupSummary};
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::ClientCtx;
use crate::orm::tickets::TicketStatus;
use crate::orm::{comments, groups as group_orm, tickets};
use crate::template::Paginator;
use crate::tickets::{self as ticket_service, NewTicket};
use actix_web::http::StatusCode;
use actix_web::{error, get, post, web, Error, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::EntityTrait;
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // Literal paths before `/tickets/{id}/`.
    conf.service(view_ticket_list)
        .service(view_create_ticket)
        .service(post_create_ticket)
        .service(view_ticket)
        .service(post_delete_ticket)
        .service(post_ticket_status)
        .service(post_ticket_lock);
}

async fn live_groups() -> Result<Vec<GroupSummary>, Error> {
    groups::list_groups(get_db_pool())
        .await
        .map_err(|e| db_error("live_groups", e))
}

#[derive(Deserialize)]
pub struct ListQuery {
    page: Option<u64>,
    group: Option<i32>,
}

#[derive(Template)]
#[template(path = "tickets/list.html")]
struct TicketListTemplate<'a> {
    client: ClientCtx,
    tickets: &'a [tickets::Model],
    groups: &'a [GroupSummary],
    selected_group: Option<i32>,
    paginator: Paginator,
    view_edit_label: &'a str,
}

impl TicketListTemplate<'_> {
    fn group_name(&self, group_id: &Option<i32>) -> &str {
        group_id
            .and_then(|id| self.groups.iter().find(|g| g.group.id == id))
            .map_or("", |g| g.group.name.as_str())
    }

    fn is_selected(&self, group_id: &i32) -> bool {
        self.selected_group == Some(*group_id)
    }
}

#[get("/tickets/list/")]
pub async fn view_ticket_list(
    client: ClientCtx,
    query: web::Query<ListQuery>,
) -> Result<impl Responder, Error> {
    let per_page = u64::from(limits().tickets_per_page);
    let page = ticket_service::list_tickets(
        get_db_pool(),
        query.group,
        query.page.unwrap_or(1),
        per_page,
    )
    .await
    .map_err(|e| db_error("view_ticket_list", e))?;
    let groups = live_groups().await?;

    let base_url = match query.group {
        Some(group_id) => format!("/tickets/list/?group={}", group_id),
        None => "/tickets/list/".to_owned(),
    };

    Ok(TicketListTemplate {
        client,
        tickets: &page.tickets,
        groups: &groups,
        selected_group: query.group,
        paginator: Paginator {
            base_url,
            this_page: page.page,
            page_count: page.page_count,
        },
        view_edit_label: VIEW_EDIT_LABEL,
    }
    .to_response())
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct TicketForm {
    csrf_token: String,
    summary: String,
    description: String,
    author_name: String,
    group: String,
}

impl TicketForm {
    fn group_id(&self) -> Result<Option<i32>, String> {
        let group = self.group.trim();
        if group.is_empty() {
            return Ok(None);
        }
        group
            .parse()
            .map(Some)
            .map_err(|_| "Unknown group".to_owned())
    }
}

#[derive(Template)]
#[template(path = "tickets/create.html")]
struct TicketCreateTemplate<'a> {
    client: ClientCtx,
    form: &'a TicketForm,
    groups: &'a [GroupSummary],
    error: String,
}

impl TicketCreateTemplate<'_> {
    fn is_selected(&self, group_id: &i32) -> bool {
        self.form.group.trim() == group_id.to_string()
    }
}

async fn render_create_form(
    client: ClientCtx,
    form: &TicketForm,
    error: String,
) -> Result<HttpResponse, Error> {
    let groups = live_groups().await?;
    let status = if error.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    let mut res = TicketCreateTemplate {
        client,
        form,
        groups: &groups,
        error,
    }
    .to_response();
    *res.status_mut() = status;
    Ok(res)
}

#[get("/tickets/create/")]
pub async fn view_create_ticket(client: ClientCtx) -> Result<HttpResponse, Error> {
    let form = TicketForm {
        author_name: client
            .get_user()
            .map(|u| u.display_name().to_owned())
            .unwrap_or_default(),
        ..Default::default()
    };
    render_create_form(client, &form, String::new()).await
}

#[post("/tickets/create/")]
pub async fn post_create_ticket(
    client: ClientCtx,
    cookies: actix_session::Session,
    form: web::Form<TicketForm>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;

    let group_id = match form.group_id() {
        Ok(group_id) => group_id,
        Err(message) => return render_create_form(client, &form, message).await,
    };

    let new_ticket = NewTicket {
        summary: &form.summary,
        description: &form.description,
        author_name: &form.author_name,
        group_id,
    };

    match ticket_service::create_ticket(get_db_pool(), &new_ticket, client.get_id()).await {
        Ok(ticket) => Ok(super::redirect(&format!("/tickets/{}/", ticket.id))),
        Err(ServiceError::Invalid(message)) => {
            render_create_form(client, &form, message).await
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Template)]
#[template(path = "tickets/detail.html")]
struct TicketDetailTemplate<'a> {
    client: ClientCtx,
    ticket: &'a tickets::Model,
    group: Option<group_orm::Model>,
    comments: &'a [comments::Model],
    statuses: &'a [TicketStatus],
    is_locked: bool,
    can_modify: bool,
    comment_author: String,
}

impl TicketDetailTemplate<'_> {
    fn can_delete_comment(&self, comment: &comments::Model) -> bool {
        !self.is_locked && self.client.can_modify(comment.created_by)
    }

    fn is_current_status(&self, status: &TicketStatus) -> bool {
        self.ticket.status == *status
    }
}

#[get("/tickets/{ticket_id}/")]
pub async fn view_ticket(client: ClientCtx, path: web::Path<i32>) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let ticket = ticket_service::get_ticket(db, path.into_inner()).await?;

    let group = match ticket.group_id {
        Some(group_id) => group_orm::Entity::find_by_id(group_id)
            .one(db)
            .await
            .map_err(|e| db_error("view_ticket", e))?
            .filter(|g| g.record_status.is_visible()),
        None => None,
    };

    let comments = crate::comments::list_for_ticket(
        db,
        ticket.id,
        client.get_id(),
        client.is_moderator(),
    )
    .await
    .map_err(|e| db_error("view_ticket", e))?;

    let is_locked = ticket.record_status == RecordStatus::ActiveLocked;
    let can_modify = !is_locked && client.can_modify(ticket.created_by);
    let comment_author = client
        .get_user()
        .map(|u| u.display_name().to_owned())
        .unwrap_or_default();

    Ok(TicketDetailTemplate {
        client,
        ticket: &ticket,
        group,
        comments: &comments,
        statuses: &TicketStatus::ALL,
        is_locked,
        can_modify,
        comment_author,
    }
    .to_response())
}

#[derive(Deserialize)]
pub struct CsrfForm {
    csrf_token: String,
}

#[post("/tickets/{ticket_id}/delete/")]
pub async fn post_delete_ticket(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<i32>,
    form: web::Form<CsrfForm>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;

    let db = get_db_pool();
    let ticket = ticket_service::get_ticket(db, path.into_inner()).await?;
    let user_id = client.require_modify(ticket.created_by)?;
    ticket_service::delete_ticket(db, ticket.id, Some(user_id)).await?;

    Ok(super::redirect("/tickets/list/"))
}

#[derive(Deserialize)]
pub struct StatusForm {
    csrf_token: String,
    status: String,
}

#[post("/tickets/{ticket_id}/status/")]
pub async fn post_ticket_status(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<i32>,
    form: web::Form<StatusForm>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_moderator()?;

    let status = TicketStatus::from_form(&form.status)
        .ok_or_else(|| error::ErrorBadRequest("Unknown ticket status"))?;
    let ticket =
        ticket_service::set_status(get_db_pool(), path.into_inner(), status, Some(user_id)).await?;

    Ok(super::redirect(&format!("/tickets/{}/", ticket.id)))
}

#[derive(Deserialize)]
pub struct LockForm {
    csrf_token: String,
    locked: bool,
}

#[post("/tickets/{ticket_id}/lock/")]
pub async fn post_ticket_lock(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<i32>,
    form: web::Form<LockForm>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_moderator()?;

    let ticket =
        ticket_service::set_locked(get_db_pool(), path.into_inner(), form.locked, Some(user_id))
            .await?;

    Ok(super::redirect(&format!("/tickets/{}/", ticket.id)))
}
