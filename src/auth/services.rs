use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{
    claims::SessionUser,
    dto::{LoginOutcome, PublicUser},
    jwt::{TokenCodec, TokenError},
    password::{hash_password, verify_dummy, verify_password},
    repo_types::{NewUser, Role, User},
};
use crate::error::{AppError, AppResult};
use crate::store::{StoreError, UserStore};

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid");
    }
    EMAIL_RE.is_match(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn missing_fields() -> AppError {
    AppError::Validation("Missing required fields".into())
}

/// Why a token did not resolve to a user. Kept typed for callers that need
/// to tell the cases apart; `resolve_identity` throws the detail away.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("no session token presented")]
    Missing,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("user {0} no longer exists")]
    UnknownUser(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Email + password login. Unknown email, password-less account and wrong
/// password are indistinguishable to the caller.
pub async fn login(
    users: &dyn UserStore,
    codec: &TokenCodec,
    email: Option<&str>,
    password: Option<&str>,
) -> AppResult<LoginOutcome> {
    let email = email.map(normalize_email).filter(|e| !e.is_empty());
    let password = password.filter(|p| !p.is_empty());
    let (Some(email), Some(password)) = (email, password) else {
        return Err(missing_fields());
    };

    let creds = users.find_credentials_by_email(&email).await?;
    let (user, ok) = match creds {
        Some(c) => match c.password_hash.as_deref() {
            Some(hash) => {
                let ok = verify_password(password, hash);
                (Some(c.user), ok)
            }
            None => {
                debug!(user_id = %c.user.id, "login for account without password");
                (None, verify_dummy(password))
            }
        },
        None => (None, verify_dummy(password)),
    };

    let user = match (user, ok) {
        (Some(u), true) => u,
        (u, _) => {
            warn!(email = %email, user_id = ?u.map(|u| u.id), "login rejected");
            return Err(AppError::InvalidCredentials);
        }
    };

    let token = codec
        .issue(&SessionUser::from(&user))
        .map_err(|e| AppError::Internal(e.into()))?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(LoginOutcome {
        token,
        user: PublicUser::from(&user),
    })
}

pub async fn register(
    users: &dyn UserStore,
    name: Option<&str>,
    email: Option<&str>,
    password: Option<&str>,
) -> AppResult<User> {
    let name = name.map(str::trim).filter(|n| !n.is_empty());
    let email = email.map(normalize_email).filter(|e| !e.is_empty());
    let password = password.filter(|p| !p.is_empty());
    let (Some(name), Some(email), Some(password)) = (name, email, password) else {
        return Err(missing_fields());
    };

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::Validation("Password too short".into()));
    }

    let hash = hash_password(password)?;
    let user = users
        .create(NewUser {
            name: name.to_string(),
            email,
            password_hash: Some(hash),
            role: Role::User,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Token -> live user, with the failure reason preserved.
pub async fn identify(
    users: &dyn UserStore,
    codec: &TokenCodec,
    token: Option<&str>,
) -> Result<User, IdentityError> {
    let token = token.filter(|t| !t.is_empty()).ok_or(IdentityError::Missing)?;
    let claims = codec.verify(token)?;
    users
        .find_by_id(claims.sub)
        .await?
        .ok_or(IdentityError::UnknownUser(claims.sub))
}

/// Never fails: any problem with the token or its user means anonymous.
pub async fn resolve_identity(
    users: &dyn UserStore,
    codec: &TokenCodec,
    token: Option<&str>,
) -> Option<Uuid> {
    match identify(users, codec, token).await {
        Ok(user) => Some(user.id),
        Err(IdentityError::Missing) => None,
        Err(IdentityError::Store(e)) => {
            warn!(error = %e, "identity lookup failed; treating as anonymous");
            None
        }
        Err(e) => {
            debug!(reason = %e, "token did not resolve");
            None
        }
    }
}
