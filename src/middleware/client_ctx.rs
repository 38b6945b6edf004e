use crate::user::Profile;
use actix_session::{Session, SessionExt};
use actix_web::dev::{self, Extensions, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{web::Data, Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Client data stored for a single request cycle.
/// Distinct from ClientCtx because it is defined through request data.
#[derive(Clone, Debug)]
pub struct ClientCtxInner {
    /// User data. Optional. None is a guest user.
    pub client: Option<Profile>,
    /// CSRF token for form protection
    pub csrf_token: String,
    /// Time the request started for page load statistics.
    pub request_start: Instant,
}

impl Default for ClientCtxInner {
    fn default() -> Self {
        Self {
            client: None,
            csrf_token: String::new(),
            request_start: Instant::now(),
        }
    }
}

impl ClientCtxInner {
    pub async fn from_session(session: &Session) -> Self {
        use crate::middleware::csrf::get_or_create_csrf_token;
        use crate::session::authenticate_client_by_session;

        let client = authenticate_client_by_session(session).await;
        let csrf_token = get_or_create_csrf_token(session).unwrap_or_default();

        ClientCtxInner {
            client,
            csrf_token,
            ..Default::default()
        }
    }
}

/// Client context passed to routes.
/// Wraps ClientCtxInner, which is set at the beginning of the request.
#[derive(Clone, Debug)]
pub struct ClientCtx(Data<ClientCtxInner>);

impl Default for ClientCtx {
    fn default() -> Self {
        Self(Data::new(ClientCtxInner::default()))
    }
}

impl ClientCtx {
    /// Returns instance of Self with components required for ClientCtxInner.
    pub async fn from_session(session: &Session) -> Self {
        Self(Data::new(ClientCtxInner::from_session(session).await))
    }

    pub fn get_or_default_from_extensions(extensions: &mut Extensions) -> Self {
        match extensions.get::<Data<ClientCtxInner>>() {
            // Existing record in extensions; pull it and return clone.
            Some(cbox) => Self(cbox.clone()),
            // No existing record; create and insert it.
            None => {
                let cbox = Data::new(ClientCtxInner::default());
                extensions.insert(cbox.clone());
                Self(cbox)
            }
        }
    }

    /// Returns either the user's id or None.
    pub fn get_id(&self) -> Option<i32> {
        self.0.client.as_ref().map(|u| u.id)
    }

    /// Returns either the user's display name or the word for guest.
    pub fn get_name(&self) -> String {
        match &self.0.client {
            Some(user) => user.display_name().to_owned(),
            None => "Guest".to_owned(),
        }
    }

    /// Returns the username, or an empty string for guests.
    pub fn get_username(&self) -> &str {
        self.0
            .client
            .as_ref()
            .map(|u| u.username.as_str())
            .unwrap_or_default()
    }

    pub fn get_user(&self) -> Option<&Profile> {
        self.0.client.as_ref()
    }

    pub fn get_csrf_token(&self) -> &str {
        &self.0.csrf_token
    }

    pub fn is_user(&self) -> bool {
        self.0.client.is_some()
    }

    /// Staff, admins and superusers moderate content.
    pub fn is_moderator(&self) -> bool {
        self.0.client.as_ref().map_or(false, |u| u.is_moderator())
    }

    pub fn is_admin(&self) -> bool {
        self.0.client.as_ref().map_or(false, |u| u.is_admin)
    }

    /// Returns Duration representing request time.
    pub fn request_time(&self) -> Duration {
        Instant::now() - self.0.request_start
    }

    /// Returns human readable representing request time.
    pub fn request_time_as_string(&self) -> String {
        let us = self.request_time().as_micros();
        if us > 5000 {
            format!("{}ms", us / 1000)
        } else {
            format!("{}μs", us)
        }
    }

    /// Require user to be logged in. Returns user_id or ErrorUnauthorized.
    pub fn require_login(&self) -> Result<i32, actix_web::Error> {
        self.get_id()
            .ok_or_else(|| actix_web::error::ErrorUnauthorized("Login required"))
    }

    /// Require staff privileges. Returns user_id or an error.
    pub fn require_moderator(&self) -> Result<i32, actix_web::Error> {
        let user_id = self.require_login()?;
        if !self.is_moderator() {
            return Err(actix_web::error::ErrorForbidden("Insufficient permissions"));
        }
        Ok(user_id)
    }

    /// Require admin privileges. Returns user_id or an error.
    pub fn require_admin(&self) -> Result<i32, actix_web::Error> {
        let user_id = self.require_login()?;
        if !self.is_admin() {
            return Err(actix_web::error::ErrorForbidden("Insufficient permissions"));
        }
        Ok(user_id)
    }

    /// Owners and moderators may modify a record.
    pub fn can_modify(&self, resource_user_id: Option<i32>) -> bool {
        if self.is_moderator() {
            return true;
        }
        match (self.get_id(), resource_user_id) {
            (Some(user_id), Some(owner_id)) => user_id == owner_id,
            _ => false,
        }
    }

    /// Require ownership or staff privileges. Returns user_id or an error.
    pub fn require_modify(&self, resource_user_id: Option<i32>) -> Result<i32, actix_web::Error> {
        let user_id = self.require_login()?;
        if !self.can_modify(resource_user_id) {
            return Err(actix_web::error::ErrorForbidden("You don't own this resource"));
        }
        Ok(user_id)
    }
}

/// This implementation is what actually provides the `client: ClientCtx` in the parameters of route functions.
impl FromRequest for ClientCtx {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(ClientCtx::get_or_default_from_extensions(
            &mut req.extensions_mut(),
        )))
    }
}

impl<S: 'static, B> Transform<S, ServiceRequest> for ClientCtx
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ClientCtxMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ClientCtxMiddleware {
            service: Rc::new(service),
        }))
    }
}

/// Client context middleware
pub struct ClientCtxMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ClientCtxMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();
        let session = req.get_session();

        Box::pin(async move {
            let inner = ClientCtxInner::from_session(&session).await;
            req.extensions_mut().insert(Data::new(inner));
            svc.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(user: Option<Profile>) -> ClientCtx {
        ClientCtx(Data::new(ClientCtxInner {
            client: user,
            ..Default::default()
        }))
    }

    fn profile(id: i32, is_staff: bool) -> Profile {
        Profile {
            id,
            username: format!("user{}", id),
            full_name: String::new(),
            is_admin: false,
            is_staff,
            is_superuser: false,
        }
    }

    #[test]
    fn test_guest() {
        let guest = ctx(None);
        assert!(!guest.is_user());
        assert_eq!(guest.get_name(), "Guest");
        assert_eq!(guest.get_username(), "");
        assert!(guest.require_login().is_err());
        assert!(!guest.can_modify(Some(1)));
    }

    #[test]
    fn test_owner_can_modify() {
        let owner = ctx(Some(profile(3, false)));
        assert!(owner.can_modify(Some(3)));
        assert!(!owner.can_modify(Some(4)));
        assert!(!owner.can_modify(None));
        assert!(owner.require_moderator().is_err());
    }

    #[test]
    fn test_staff_can_modify_anything() {
        let staff = ctx(Some(profile(5, true)));
        assert!(staff.can_modify(Some(3)));
        assert!(staff.can_modify(None));
        assert_eq!(staff.require_moderator().unwrap(), 5);
        assert!(staff.require_admin().is_err());
    }
}
