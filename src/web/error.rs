//! HTML bodies for error responses.
//!
//! Registered through `ErrorHandlers` so a plain-text error from any handler
//! reaches the browser as a full page. Pages a handler rendered itself, such
//! as a form shown again with its validation message, pass through as they are.

use crate::middleware::ClientCtx;
use actix_web::dev::ServiceResponse;
use actix_web::http::header;
use actix_web::middleware::ErrorHandlerResponse;
use actix_web::{HttpMessage, HttpResponse, Result};
use askama_actix::Template;

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate<'a> {
    client: ClientCtx,
    status: u16,
    title: &'a str,
    message: String,
}

/// True when a handler built the response body itself instead of failing.
fn is_rendered_page<B>(res: &ServiceResponse<B>) -> bool {
    res.response().error().is_none() && res.headers().contains_key(header::CONTENT_TYPE)
}

fn render_error<B>(res: ServiceResponse<B>, title: &str) -> Result<ErrorHandlerResponse<B>> {
    if is_rendered_page(&res) {
        return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
    }

    let (req, res) = res.into_parts();
    let status = res.status();
    // Server errors keep their details in the log only.
    let message = match res.error() {
        Some(e) if !status.is_server_error() => e.to_string(),
        _ => title.to_owned(),
    };
    let client = ClientCtx::get_or_default_from_extensions(&mut req.extensions_mut());

    let body = ErrorTemplate {
        client,
        status: status.as_u16(),
        title,
        message,
    }
    .render()
    .unwrap_or_else(|e| {
        log::error!("render_error: {}", e);
        title.to_owned()
    });

    let res = HttpResponse::build(status)
        .insert_header((header::CONTENT_TYPE, "text/html; charset=utf-8"))
        .body(body);

    Ok(ErrorHandlerResponse::Response(
        ServiceResponse::new(req, res).map_into_right_body(),
    ))
}

pub fn render_400<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    render_error(res, "Bad Request")
}

pub fn render_401<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    render_error(res, "Unauthorized")
}

pub fn render_403<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    render_error(res, "Forbidden")
}

pub fn render_404<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    render_error(res, "Not Found")
}

pub fn render_500<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    render_error(res, "Internal Server Error")
}
