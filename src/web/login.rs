use std::sync::Arc;

use axum::Form;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{info, warn};

use super::AppState;
use super::html::{self, AuthMode, Notice};
use super::session::{ACCESS_COOKIE, clear_session, store_session};

pub const SIGNUP_SENT: &str = "Check your email for the confirmation link.";
pub const RESET_SENT: &str = "Password reset instructions sent to your email.";

#[derive(Debug, Deserialize)]
pub struct ModeQuery {
    #[serde(default)]
    mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuthForm {
    #[serde(default)]
    mode: Option<String>,
    email: String,
    #[serde(default)]
    password: String,
}

pub async fn login_page(Query(query): Query<ModeQuery>) -> Html<String> {
    let mode = AuthMode::parse(query.mode.as_deref());
    Html(html::login_page(mode, "", &Notice::None))
}

/// Handles all three forms. Failures re-render the same form with the
/// provider's message; only a successful sign-in navigates away.
pub async fn submit(State(state): State<Arc<AppState>>, jar: CookieJar, Form(form): Form<AuthForm>) -> Response {
    let mode = AuthMode::parse(form.mode.as_deref());
    let email = form.email.trim();

    let outcome = match mode {
        AuthMode::Login => match state.auth.sign_in_with_password(email, &form.password).await {
            Ok(session) => {
                let jar = store_session(jar, &session, state.config.secure_cookies());
                return (jar, Redirect::to("/dashboard")).into_response();
            }
            Err(e) => Err(e),
        },
        AuthMode::Signup => state.auth.sign_up(email, &form.password).await.map(|_| SIGNUP_SENT),
        AuthMode::ForgotPassword => state
            .auth
            .reset_password_for_email(email, &state.config.password_reset_redirect())
            .await
            .map(|_| RESET_SENT),
    };

    let notice = match outcome {
        Ok(message) => Notice::Message(message.to_string()),
        Err(e) => {
            info!("[Auth] {:?} failed for {}: {}", mode, email, e);
            Notice::Error(e.detail())
        }
    };
    Html(html::login_page(mode, email, &notice)).into_response()
}

pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Some(token) = jar.get(ACCESS_COOKIE).map(|c| c.value().to_string()) {
        if let Err(e) = state.auth.sign_out(&token).await {
            warn!("[Auth] Sign-out failed, clearing cookies anyway: {}", e);
        }
    }
    (clear_session(jar), Redirect::to("/")).into_response()
}
