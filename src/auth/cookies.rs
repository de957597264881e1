//! Session cookie construction.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

pub const SESSION_COOKIE: &str = "token";

/// HttpOnly, SameSite=Strict, root path. `secure` only in production.
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(Duration::seconds(max_age_secs))
        .build()
}

/// Same attributes with an empty value and zero max-age, telling the
/// client to drop the session.
pub fn expired_session_cookie(secure: bool) -> Cookie<'static> {
    session_cookie("", 0, secure)
}
