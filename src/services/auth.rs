use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::errors::AppError;
use crate::models::Identity;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_NAME_HEADER: &str = "x-user-name";

/// Capability check for operator-only routes.
pub trait AdminPolicy: Send + Sync {
    fn is_authorized(&self, identity: &Identity) -> bool;
}

/// Admin access granted by email address, from configuration.
pub struct EmailAllowlist {
    emails: Vec<String>,
}

impl EmailAllowlist {
    pub fn new(emails: impl IntoIterator<Item = String>) -> Self {
        Self {
            emails: emails.into_iter().map(|e| e.trim().to_lowercase()).collect(),
        }
    }
}

impl AdminPolicy for EmailAllowlist {
    fn is_authorized(&self, identity: &Identity) -> bool {
        let email = identity.email.trim().to_lowercase();
        !email.is_empty() && self.emails.iter().any(|e| *e == email)
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn identity_from_headers(headers: &HeaderMap) -> Result<Identity, AppError> {
    let user_id = header(headers, USER_ID_HEADER).ok_or(AppError::Unauthorized)?;
    let email = header(headers, USER_EMAIL_HEADER).ok_or(AppError::Unauthorized)?;
    Ok(Identity {
        user_id,
        email,
        name: header(headers, USER_NAME_HEADER),
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity_from_headers(&parts.headers)
    }
}
