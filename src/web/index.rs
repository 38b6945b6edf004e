use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::tickets;
use actix_web::{error, get, Error, Responder};
use askama_actix::{Template, TemplateToResponse};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_index);
}

const RECENT_TICKETS: u64 = 5;

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    client: ClientCtx,
    site_name: String,
    site_description: String,
    tickets: Vec<tickets::Model>,
}

#[get("/")]
async fn view_index(client: ClientCtx) -> Result<impl Responder, Error> {
    let site = crate::app_config::site();
    let page = crate::tickets::list_tickets(get_db_pool(), None, 1, RECENT_TICKETS)
        .await
        .map_err(|e| {
            log::error!("view_index: {}", e);
            error::ErrorInternalServerError("DB error")
        })?;

    Ok(IndexTemplate {
        client,
        site_name: site.name,
        site_description: site.description,
        tickets: page.tickets,
    }
    .to_response())
}
