use super::db_error;
use crate::db::get_db_pool;
use crate::error::ServiceError;
use crate::lookups;
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::ClientCtx;
use crate::orm::lookups::{self as lookup_orm, LookUpCategory};
use actix_web::http::StatusCode;
use actix_web::{error, get, post, web, Error, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use serde::{Deserialize, Serialize};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_lookups)
        .service(post_create_lookup)
        .service(post_delete_lookup)
        .service(api_lookups);
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct LookUpForm {
    csrf_token: String,
    name: String,
    category: String,
}

#[derive(Template)]
#[template(path = "lookups/list.html")]
struct LookUpListTemplate<'a> {
    client: ClientCtx,
    lookups: &'a [lookup_orm::Model],
    categories: &'a [LookUpCategory],
    form: &'a LookUpForm,
    error: String,
}

impl LookUpListTemplate<'_> {
    fn category_label(&self, category: &Option<LookUpCategory>) -> &'static str {
        category.as_ref().map_or("", |c| c.label())
    }

    fn is_selected(&self, category: &LookUpCategory) -> bool {
        LookUpCategory::from_form(&self.form.category).as_ref() == Some(category)
    }
}

async fn render_list(
    client: ClientCtx,
    form: &LookUpForm,
    error: String,
) -> Result<HttpResponse, Error> {
    let lookups = lookups::list_lookups(get_db_pool(), None)
        .await
        .map_err(|e| db_error("view_lookups", e))?;
    let status = if error.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };

    let mut res = LookUpListTemplate {
        client,
        lookups: &lookups,
        categories: &LookUpCategory::ALL,
        form,
        error,
    }
    .to_response();
    *res.status_mut() = status;
    Ok(res)
}

#[get("/lookups/")]
pub async fn view_lookups(client: ClientCtx) -> Result<HttpResponse, Error> {
    client.require_moderator()?;
    render_list(client, &LookUpForm::default(), String::new()).await
}

#[post("/lookups/")]
pub async fn post_create_lookup(
    client: ClientCtx,
    cookies: actix_session::Session,
    form: web::Form<LookUpForm>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_moderator()?;

    let category = if form.category.trim().is_empty() {
        None
    } else {
        match LookUpCategory::from_form(&form.category) {
            Some(category) => Some(category),
            None => return render_list(client, &form, "Unknown category".to_owned()).await,
        }
    };

    match lookups::create_lookup(get_db_pool(), &form.name, category, Some(user_id)).await {
        Ok(_) => Ok(super::redirect("/lookups/")),
        Err(ServiceError::Invalid(message)) => render_list(client, &form, message).await,
        Err(e) => Err(e.into()),
    }
}

#[derive(Deserialize)]
pub struct CsrfForm {
    csrf_token: String,
}

#[post("/lookups/{lookup_id}/delete/")]
pub async fn post_delete_lookup(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<i32>,
    form: web::Form<CsrfForm>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_moderator()?;

    lookups::delete_lookup(get_db_pool(), path.into_inner(), Some(user_id)).await?;

    Ok(super::redirect("/lookups/"))
}

/// One dropdown option.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LookUpOption {
    pub id: i32,
    pub name: String,
}

impl From<lookup_orm::Model> for LookUpOption {
    fn from(model: lookup_orm::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

#[get("/api/lookups/{category}")]
pub async fn api_lookups(path: web::Path<String>) -> Result<impl Responder, Error> {
    let category = LookUpCategory::from_form(&path)
        .ok_or_else(|| error::ErrorNotFound("Unknown category"))?;

    let options: Vec<LookUpOption> = lookups::list_lookups(get_db_pool(), Some(category))
        .await
        .map_err(|e| db_error("api_lookups", e))?
        .into_iter()
        .map(LookUpOption::from)
        .collect();

    Ok(web::Json(options))
}
