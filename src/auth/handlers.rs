use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, instrument, warn};

use crate::{
    auth::{
        claims::SessionUser,
        cookies::{expired_session_cookie, session_cookie},
        dto::{LoginRequest, PublicUser, RegisterRequest, UserEnvelope},
        extractors::session_token,
        services::{self, IdentityError},
    },
    error::{AppError, AppResult, MessageBody},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

fn bad_body(e: JsonRejection) -> AppError {
    warn!(error = %e, "rejected request body");
    AppError::Validation("Missing required fields".into())
}

fn max_age_secs(state: &AppState) -> i64 {
    state.tokens.ttl().as_secs() as i64
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<(CookieJar, Json<UserEnvelope>)> {
    let Json(payload) = payload.map_err(bad_body)?;
    let outcome = services::login(
        state.users.as_ref(),
        &state.tokens,
        payload.email.as_deref(),
        payload.password.as_deref(),
    )
    .await?;

    let cookie = session_cookie(&outcome.token, max_age_secs(&state), state.config.production);
    Ok((
        jar.add(cookie),
        Json(UserEnvelope {
            user: Some(outcome.user),
        }),
    ))
}

/// Creates the account and signs it in.
#[instrument(skip(state, jar, payload))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, CookieJar, Json<UserEnvelope>)> {
    let Json(payload) = payload.map_err(bad_body)?;
    let user = services::register(
        state.users.as_ref(),
        payload.name.as_deref(),
        payload.email.as_deref(),
        payload.password.as_deref(),
    )
    .await?;

    let token = state
        .tokens
        .issue(&SessionUser::from(&user))
        .map_err(|e| AppError::Internal(e.into()))?;
    let cookie = session_cookie(&token, max_age_secs(&state), state.config.production);
    Ok((
        StatusCode::CREATED,
        jar.add(cookie),
        Json(UserEnvelope {
            user: Some(PublicUser::from(&user)),
        }),
    ))
}

/// Stateless: nothing to revoke, the client is told to drop the cookie.
#[instrument(skip(state, jar))]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<MessageBody>) {
    (
        jar.add(expired_session_cookie(state.config.production)),
        Json(MessageBody::new("Logged out")),
    )
}

/// Current identity, or `{"user": null}`. Never an error status.
#[instrument(skip(state, headers))]
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Json<UserEnvelope> {
    let token = session_token(&headers);
    let user = match services::identify(state.users.as_ref(), &state.tokens, token.as_deref()).await
    {
        Ok(u) => Some(PublicUser::from(&u)),
        Err(IdentityError::Missing) => None,
        Err(e) => {
            debug!(reason = %e, "me: anonymous");
            None
        }
    };
    Json(UserEnvelope { user })
}
