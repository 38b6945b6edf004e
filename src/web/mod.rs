pub mod comments;
pub mod error;
pub mod groups;
pub mod index;
pub mod login;
pub mod logout;
pub mod lookups;
pub mod members;
pub mod register;
pub mod tickets;

use actix_web::http::header;
use actix_web::{Error, HttpResponse};

/// Configures the web app by adding services from each web file.
///
/// @see https://docs.rs/actix-web/4/actix_web/struct.App.html#method.configure
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // Descending order. Order is important.
    // Route resolution will stop at the first match.
    index::configure(conf);
    login::configure(conf);
    logout::configure(conf);
    register::configure(conf);
    tickets::configure(conf);
    comments::configure(conf);
    groups::configure(conf);
    members::configure(conf);
    lookups::configure(conf);
}

/// 303 redirect used after every successful form POST.
pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// Logs a database failure and hides it behind a plain 500.
pub fn db_error(context: &str, e: impl std::fmt::Display) -> Error {
    log::error!("{}: {}", context, e);
    actix_web::error::ErrorInternalServerError("DB error")
}
