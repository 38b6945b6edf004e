//! Helpers for driving the app through `actix_web::test`.
#![allow(dead_code)]

use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{header, StatusCode};
use actix_web::test;
use once_cell::sync::Lazy;
use regex::Regex;

/// Name of the actix-session cookie.
pub const SESSION_COOKIE: &str = "id";

pub static SESSION_KEY: Lazy<Key> = Lazy::new(Key::generate);

static CSRF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"name="csrf_token" value="([A-Za-z0-9]+)""#).unwrap());

/// Builds the application with the same middleware stack as the server.
#[macro_export]
macro_rules! test_app {
    () => {{
        use actix_session::{storage::CookieSessionStore, SessionMiddleware};
        use actix_web::http::StatusCode;
        use actix_web::middleware::ErrorHandlers;

        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(
                    ErrorHandlers::new()
                        .handler(StatusCode::BAD_REQUEST, ticketdesk::web::error::render_400)
                        .handler(StatusCode::UNAUTHORIZED, ticketdesk::web::error::render_401)
                        .handler(StatusCode::FORBIDDEN, ticketdesk::web::error::render_403)
                        .handler(StatusCode::NOT_FOUND, ticketdesk::web::error::render_404)
                        .handler(
                            StatusCode::INTERNAL_SERVER_ERROR,
                            ticketdesk::web::error::render_500,
                        ),
                )
                .wrap(ticketdesk::middleware::ClientCtx::default())
                .wrap(
                    SessionMiddleware::builder(
                        CookieSessionStore::default(),
                        $crate::common::web::SESSION_KEY.clone(),
                    )
                    .cookie_secure(false)
                    .build(),
                )
                .configure(ticketdesk::web::configure),
        )
        .await
    }};
}

/// Result of one request.
pub struct Page {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

impl Page {
    pub fn csrf_token(&self) -> String {
        CSRF_RE
            .captures(&self.body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_owned())
            .expect("page has no csrf_token field")
    }

    /// The page's token, or `fallback` when it renders no form.
    pub fn csrf_token_or(&self, fallback: String) -> String {
        CSRF_RE
            .captures(&self.body)
            .and_then(|c| c.get(1))
            .map_or(fallback, |m| m.as_str().to_owned())
    }
}

/// Carries the session cookie from one request to the next.
#[derive(Default)]
pub struct Browser {
    cookie: Option<Cookie<'static>>,
}

impl Browser {
    pub fn new() -> Self {
        Self::default()
    }

    async fn send<S, B>(&mut self, app: &S, req: test::TestRequest) -> Page
    where
        S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
        B: MessageBody,
    {
        let req = match &self.cookie {
            Some(cookie) => req.cookie(cookie.clone()),
            None => req,
        };
        let resp = test::call_service(app, req.to_request()).await;

        if let Some(cookie) = resp
            .response()
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE)
        {
            self.cookie = Some(cookie.into_owned());
        }

        let status = resp.status();
        let location = resp
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = test::read_body(resp).await;

        Page {
            status,
            location,
            body: String::from_utf8_lossy(&body).into_owned(),
        }
    }

    pub async fn get<S, B>(&mut self, app: &S, uri: &str) -> Page
    where
        S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
        B: MessageBody,
    {
        self.send(app, test::TestRequest::get().uri(uri)).await
    }

    /// Posts url-encoded form fields.
    pub async fn post<S, B>(&mut self, app: &S, uri: &str, form: &[(&str, &str)]) -> Page
    where
        S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
        B: MessageBody,
    {
        self.send(app, test::TestRequest::post().uri(uri).set_form(form))
            .await
    }

    pub fn has_session(&self) -> bool {
        self.cookie.is_some()
    }
}
