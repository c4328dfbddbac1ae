use actix_session::{Session, SessionExt};
use actix_web::{dev, web, FromRequest, HttpRequest};
use serde::Serialize;
use std::future::{ready, Ready};

use crate::routes::ApiError;
use crate::AppState;

pub const SESSION_OWNER_KEY: &str = "owner_email";

/// A signed-in site owner. Used by the admin HTML pages.
#[derive(Serialize, Debug, Clone)]
pub struct AuthenticatedOwner {
    pub email: String,
}

impl FromRequest for AuthenticatedOwner {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        match signed_in_email(&req.get_session()) {
            Some(email) => ready(Ok(AuthenticatedOwner { email })),
            None => ready(Err(actix_web::error::ErrorUnauthorized("Not logged in."))),
        }
    }
}

/// Permission to change content through the JSON API. When the login gate
/// is switched off every caller gets one, with no email attached.
#[derive(Debug, Clone)]
pub struct ContentEditor {
    pub email: Option<String>,
}

impl FromRequest for ContentEditor {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let require_login = req
            .app_data::<web::Data<AppState>>()
            .map(|state| state.require_login)
            .unwrap_or(true);
        if !require_login {
            return ready(Ok(ContentEditor { email: None }));
        }
        match signed_in_email(&req.get_session()) {
            Some(email) => ready(Ok(ContentEditor { email: Some(email) })),
            None => {
                log::warn!("Rejected unauthenticated write to {}", req.path());
                ready(Err(ApiError::Unauthorized))
            }
        }
    }
}

fn signed_in_email(session: &Session) -> Option<String> {
    session.get::<String>(SESSION_OWNER_KEY).unwrap_or(None)
}
