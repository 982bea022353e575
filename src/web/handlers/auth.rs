//! Login and logout handlers.

use std::sync::Arc;

use axum::{
    extract::State,
    response::{Html, Redirect},
    Form,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

use super::AppState;
use crate::web::error::ApiError;
use crate::web::middleware::{session_token, SESSION_COOKIE};
use crate::web::render;

/// Login form body.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Shared password.
    pub password: String,
}

/// GET /login - Show the login form.
pub async fn login_form() -> Html<String> {
    Html(render::login_page(None))
}

/// POST /login - Exchange the shared password for a session cookie.
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Redirect), ApiError> {
    let token = state.sessions.login(&form.password).await?;

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build();

    Ok((jar.add(cookie), Redirect::to("/")))
}

/// POST /logout - Drop the caller's session and clear the cookie.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), ApiError> {
    if let Some(token) = session_token(&jar) {
        state.sessions.logout(&token).await?;
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/").build());
    Ok((jar, Redirect::to("/")))
}
