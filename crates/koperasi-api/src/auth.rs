use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Json, extract::State, extract::rejection::JsonRejection};
use axum_extra::extract::cookie::CookieJar;
use rand_core::OsRng;
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use koperasi_db::models::NewUser;
use koperasi_db::{Database, is_unique_violation};
use koperasi_types::api::{CreateUserRequest, LoginRequest, RegisterRequest, UserResponse};
use koperasi_types::models::{Role, User};

use crate::convert::{self, now_timestamp};
use crate::error::{ApiError, blocking};
use crate::location::GeoClient;
use crate::session::{self, Session};
use crate::storage::Storage;
use crate::validation::{Validator, account_rules};

pub const EMAIL_TAKEN: &str = "Email sudah terdaftar";
pub const INVALID_CREDENTIALS: &str = "Email atau password salah";

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub storage: Storage,
    pub geo: GeoClient,
    pub jwt_secret: String,
    /// Adds the `Secure` flag to the session cookie. On in production.
    pub secure_cookies: bool,
}

/// POST /api/auth/register: public sign-up. Always creates a `LOW` user.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Json(req) = payload?;

    let mut v = Validator::new();
    account_rules(&mut v, &req.name, &req.email, &req.password);
    v.finish()?;

    let user = create_account(&state, req.name, req.email, req.password, Role::Low, false).await?;
    info!("Registered user {} ({})", user.id, user.email);

    Ok(Json(UserResponse {
        message: Some("Registrasi berhasil".into()),
        user,
    }))
}

/// POST /api/users/create: admin-only account creation with an explicit
/// role. Accounts created here count as email-verified.
pub async fn create_user(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let admin = session.require_role(Role::High)?;
    let Json(req) = payload?;

    let mut v = Validator::new();
    account_rules(&mut v, &req.name, &req.email, &req.password);
    let role = req.role.parse::<Role>().ok();
    v.check(role.is_some(), "role", "Role harus HIGH atau LOW");
    v.finish()?;
    let role = role.ok_or_else(|| ApiError::BadRequest("Role harus HIGH atau LOW".into()))?;

    let user = create_account(&state, req.name, req.email, req.password, role, true).await?;
    info!("User {} created {} user {}", admin.id, role, user.id);

    Ok(Json(UserResponse {
        message: Some("User berhasil dibuat".into()),
        user,
    }))
}

/// POST /api/auth/login: verifies credentials and sets the session cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<UserResponse>), ApiError> {
    let Json(req) = payload?;

    let mut v = Validator::new();
    v.email("email", req.email.trim())
        .min_chars("password", &req.password, 1, "Password wajib diisi");
    v.finish()?;

    let email = normalize_email(&req.email);
    let row = blocking(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.into()))?;

    verify_password(&req.password, &row.password)?;

    let token = session::issue_token(&state.jwt_secret, &row.id)?;
    let user = convert::user_from_row(row)?;
    info!("User {} logged in", user.id);

    let jar = jar.add(session::session_cookie(token, state.secure_cookies));
    Ok((
        jar,
        Json(UserResponse {
            message: Some("Login berhasil".into()),
            user,
        }),
    ))
}

/// POST /api/auth/logout: always succeeds and expires the session cookie,
/// whether or not the caller had one.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<Value>) {
    let jar = jar.add(session::expired_session_cookie(state.secure_cookies));
    (jar, Json(json!({ "message": "Logout berhasil" })))
}

/// GET /api/auth/me
pub async fn me(session: Session) -> Result<Json<UserResponse>, ApiError> {
    match session {
        Session::Authenticated(user) => Ok(Json(UserResponse {
            message: None,
            user,
        })),
        Session::Anonymous => Err(ApiError::Unauthorized("Unauthorized".into())),
    }
}

async fn create_account(
    state: &AppState,
    name: String,
    email: String,
    password: String,
    role: Role,
    verified: bool,
) -> Result<User, ApiError> {
    let email = normalize_email(&email);

    let lookup = email.clone();
    if blocking(state, move |db| db.get_user_by_email(&lookup)).await?.is_some() {
        return Err(ApiError::BadRequest(EMAIL_TAKEN.into()));
    }

    // Hash before insert so a hashing failure never leaves a user behind
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    let id = Uuid::new_v4().to_string();
    let name = name.trim().to_string();
    let created = blocking(state, move |db| {
        let now = now_timestamp();
        db.create_user(&NewUser {
            id: &id,
            name: &name,
            email: &email,
            password_hash: &password_hash,
            role: role.as_str(),
            email_verified: verified.then_some(now.as_str()),
            created_at: &now,
        })?;
        db.get_user_by_id(&id)
    })
    .await;

    match created {
        Ok(Some(row)) => Ok(convert::user_from_row(row)?),
        Ok(None) => Err(anyhow::anyhow!("user vanished after insert").into()),
        // Lost a race with a concurrent registration of the same email
        Err(ApiError::Internal(e)) if is_unique_violation(&e) => {
            Err(ApiError::BadRequest(EMAIL_TAKEN.into()))
        }
        Err(e) => Err(e),
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

fn verify_password(password: &str, stored_hash: &str) -> Result<(), ApiError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| anyhow::anyhow!("stored password hash is unreadable: {}", e))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| ApiError::Unauthorized(INVALID_CREDENTIALS.into()))
}
