use crate::accounts::{self, NewUser};
use crate::app_config::security;
use crate::db::get_db_pool;
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::ClientCtx;
use crate::orm::users::Gender;
use actix_web::http::StatusCode;
use actix_web::{get, post, web, Error, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::Iterable;
use serde::Deserialize;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_register).service(post_register);
}

#[derive(Default, Deserialize, Validate)]
#[serde(default)]
pub struct FormData {
    csrf_token: String,
    #[validate(length(max = 255))]
    username: String,
    #[validate(length(max = 255))]
    first_name: String,
    #[validate(length(max = 255))]
    last_name: String,
    #[validate(email)]
    email: String,
    #[validate(length(max = 255))]
    phone_number: String,
    gender: String,
    #[validate(length(max = 1000), must_match = "password2")]
    password: String,
    password2: String,
}

impl FormData {
    /// First problem with the submission, in the order a user would fix it.
    fn check(&self) -> Result<(), String> {
        accounts::validate_user_details(
            &self.email,
            &self.first_name,
            &self.username,
            &self.phone_number,
        )
        .map_err(|e| e.to_string())?;

        if let Err(errors) = self.validate() {
            let fields = errors.field_errors();
            let message = if fields.contains_key("email") {
                "Enter a valid email address"
            } else if fields.contains_key("password") {
                "Passwords must match and be at most 1000 characters"
            } else {
                "One of the fields is too long"
            };
            return Err(message.to_owned());
        }

        let min = security().min_password_length as usize;
        if self.password.chars().count() < min {
            return Err(format!("Password must be at least {} characters", min));
        }

        if !self.gender.is_empty() && Gender::from_form(&self.gender).is_none() {
            return Err("Unknown gender".to_owned());
        }
        Ok(())
    }

    fn new_user(&self) -> NewUser<'_> {
        let last_name = self.last_name.trim();
        NewUser {
            last_name: (!last_name.is_empty()).then(|| last_name),
            gender: Gender::from_form(&self.gender),
            ..NewUser::new(
                self.first_name.trim(),
                &self.email,
                self.username.trim(),
                self.phone_number.trim(),
                Some(&self.password),
            )
        }
    }
}

#[derive(Template)]
#[template(path = "register.html")]
struct RegisterTemplate<'a> {
    client: ClientCtx,
    form: &'a FormData,
    genders: Vec<Gender>,
    error: String,
}

impl RegisterTemplate<'_> {
    fn is_selected(&self, gender: &Gender) -> bool {
        Gender::from_form(&self.form.gender).as_ref() == Some(gender)
    }
}

fn render_form(client: ClientCtx, form: &FormData, error: String) -> HttpResponse {
    let status = if error.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    let mut res = RegisterTemplate {
        client,
        form,
        genders: Gender::iter().collect(),
        error,
    }
    .to_response();
    *res.status_mut() = status;
    res
}

#[get("/register/")]
pub async fn view_register(client: ClientCtx) -> impl Responder {
    render_form(client, &FormData::default(), String::new())
}

#[post("/register/")]
pub async fn post_register(
    client: ClientCtx,
    cookies: actix_session::Session,
    form: web::Form<FormData>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;

    if let Err(message) = form.check() {
        return Ok(render_form(client, &form, message));
    }

    match accounts::create_user(get_db_pool(), &form.new_user()).await {
        Ok(_) => Ok(super::redirect("/login/")),
        Err(e) if e.is_user_error() => Ok(render_form(client, &form, e.to_string())),
        Err(e) => Err(e.into()),
    }
}
