use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;

use koperasi_types::api::Claims;
use koperasi_types::models::{Role, User};

use crate::auth::AppState;
use crate::convert;
use crate::error::{ApiError, blocking};

/// Name of the cookie carrying the session token.
pub const AUTH_COOKIE: &str = "auth-token";

const TOKEN_LIFETIME_DAYS: i64 = 7;

/// Who is making the request. Resolved once per request from the session
/// cookie and handed to handlers as an ordinary argument.
#[derive(Debug, Clone)]
pub enum Session {
    Anonymous,
    Authenticated(User),
}

impl Session {
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(user) => Some(user),
        }
    }

    /// Any signed-in user, otherwise 403.
    pub fn require_user(&self) -> Result<&User, ApiError> {
        self.user().ok_or_else(ApiError::forbidden)
    }

    /// A signed-in user holding exactly `role`, otherwise 403.
    pub fn require_role(&self, role: Role) -> Result<&User, ApiError> {
        match self.user() {
            Some(user) if user.role == role => Ok(user),
            _ => Err(ApiError::forbidden()),
        }
    }
}

/// A missing, malformed or expired token, or one naming a user that no longer
/// exists, yields `Anonymous`. Only store failures reject the request.
impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(token) = jar.get(AUTH_COOKIE).map(|c| c.value().to_owned()) else {
            return Ok(Self::Anonymous);
        };

        let Some(claims) = decode_token(&state.jwt_secret, &token) else {
            return Ok(Self::Anonymous);
        };

        let row = blocking(state, move |db| db.get_user_by_id(&claims.sub)).await?;
        match row {
            Some(row) => Ok(Self::Authenticated(convert::user_from_row(row)?)),
            None => {
                debug!("Session token names an unknown user");
                Ok(Self::Anonymous)
            }
        }
    }
}

pub fn issue_token(secret: &str, user_id: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_LIFETIME_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn decode_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| debug!("Rejected session token: {}", e))
    .ok()
    .map(|data| data.claims)
}

/// The session cookie as set on login.
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Same name, path and flags as [`session_cookie`], with an empty value,
/// `Max-Age=0` and an expiry in the past.
pub fn expired_session_cookie(secure: bool) -> Cookie<'static> {
    let mut cookie = session_cookie(String::new(), secure);
    cookie.make_removal();
    cookie
}
