//! Session cookies and the gate in front of every dashboard page.
//!
//! This is a convenience check for the operator; the store and the
//! orchestrator enforce access on their own.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{debug, warn};

use super::AppState;
use crate::supabase::{Session, User};

pub const ACCESS_COOKIE: &str = "isomind-access-token";
pub const REFRESH_COOKIE: &str = "isomind-refresh-token";
const SESSION_DAYS: i64 = 7;

/// The signed-in operator, available to handlers behind the gate.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub access_token: String,
}

impl CurrentUser {
    pub fn display_name(&self) -> &str {
        self.user.email.as_deref().unwrap_or("operator")
    }
}

fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(SESSION_DAYS))
        .build()
}

pub fn store_session(jar: CookieJar, session: &Session, secure: bool) -> CookieJar {
    jar.add(session_cookie(ACCESS_COOKIE, session.access_token.clone(), secure))
        .add(session_cookie(REFRESH_COOKIE, session.refresh_token.clone(), secure))
}

pub fn clear_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ACCESS_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_COOKIE).path("/"))
}

enum Gate {
    Allow { current: CurrentUser, jar: CookieJar },
    Deny(CookieJar),
}

/// Redirects to `/` unless the request carries a session the identity
/// provider still accepts. Runs before the page handler, so nothing
/// protected is rendered for a visitor without one.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    match check(&state, jar).await {
        Gate::Allow { current, jar } => {
            request.extensions_mut().insert(current);
            (jar, next.run(request).await).into_response()
        }
        Gate::Deny(jar) => {
            debug!("[Session] No session for {}", request.uri().path());
            (jar, Redirect::to("/")).into_response()
        }
    }
}

async fn check(state: &AppState, jar: CookieJar) -> Gate {
    let Some(access_token) = jar.get(ACCESS_COOKIE).map(|c| c.value().to_string()) else {
        return Gate::Deny(jar);
    };

    match state.auth.get_user(&access_token).await {
        Ok(Some(user)) => {
            return Gate::Allow {
                current: CurrentUser { user, access_token },
                jar,
            };
        }
        Ok(None) => {}
        Err(e) => {
            warn!("[Session] Identity provider unavailable: {}", e);
            return Gate::Deny(jar);
        }
    }

    let Some(refresh_token) = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()) else {
        return Gate::Deny(clear_session(jar));
    };

    let session = match state.auth.refresh_session(&refresh_token).await {
        Ok(session) => session,
        Err(e) => {
            debug!("[Session] Refresh failed: {}", e);
            return Gate::Deny(clear_session(jar));
        }
    };

    let user = match session.user.clone() {
        Some(user) => user,
        None => match state.auth.get_user(&session.access_token).await {
            Ok(Some(user)) => user,
            _ => return Gate::Deny(clear_session(jar)),
        },
    };

    debug!("[Session] Refreshed session for {}", user.id);
    let jar = store_session(jar, &session, state.config.secure_cookies());
    Gate::Allow {
        current: CurrentUser {
            user,
            access_token: session.access_token,
        },
        jar,
    }
}
