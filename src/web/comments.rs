use crate::comments;
use crate::db::get_db_pool;
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::ClientCtx;
use crate::tickets::get_ticket;
use actix_web::{post, web, Error, HttpResponse};
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(post_comment)
        .service(post_approve_comment)
        .service(post_delete_comment);
}

#[derive(Deserialize)]
pub struct CommentForm {
    csrf_token: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
pub struct CsrfForm {
    csrf_token: String,
}

#[post("/tickets/{ticket_id}/comments/")]
pub async fn post_comment(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<i32>,
    form: web::Form<CommentForm>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;

    // Signed-in users always post under their own name.
    let author = match client.get_user() {
        Some(user) => user.display_name().to_owned(),
        None => form.author.clone(),
    };

    let comment = comments::create_comment(
        get_db_pool(),
        path.into_inner(),
        &author,
        &form.text,
        client.get_id(),
    )
    .await?;

    Ok(super::redirect(&format!(
        "/tickets/{}/#comment-{}",
        comment.ticket_id, comment.id
    )))
}

#[post("/comments/{comment_id}/approve/")]
pub async fn post_approve_comment(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<i32>,
    form: web::Form<CsrfForm>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_moderator()?;

    let comment = comments::approve(get_db_pool(), path.into_inner(), Some(user_id)).await?;

    Ok(super::redirect(&format!(
        "/tickets/{}/#comment-{}",
        comment.ticket_id, comment.id
    )))
}

#[post("/comments/{comment_id}/delete/")]
pub async fn post_delete_comment(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<i32>,
    form: web::Form<CsrfForm>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;

    let db = get_db_pool();
    let comment = comments::get_comment(db, path.into_inner()).await?;
    let user_id = client.require_modify(comment.created_by)?;

    // Comments on a locked ticket are frozen with it.
    let ticket = get_ticket(db, comment.ticket_id).await?;
    crate::audit::ensure_mutable(ticket.record_status)?;

    comments::delete_comment(db, comment.id, Some(user_id)).await?;

    Ok(super::redirect(&format!("/tickets/{}/", ticket.id)))
}
