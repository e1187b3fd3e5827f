//! Sign-in exchange, token refresh, and logout.
//!
//! The primary path exchanges a provider-issued credential with the games
//! backend for a session. When the backend is unreachable (transport error
//! or 5xx) the same credential is exchanged with a secondary identity
//! service instead. A reachable backend that answers with garbage or a 4xx
//! is a hard failure; the fallback would not do any better.

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::gateway::Gateway;
use crate::identity;
use crate::session::{Session, SessionStore};

/// Identity provider tag sent with exchange requests.
const AUTH_PROVIDER: &str = "google";

/// Marker error: neither sign-in path could be reached at the transport
/// level. Ad blockers or network filters are the usual culprit.
#[derive(Debug, Clone, Copy)]
pub struct SignInBlocked;

impl std::fmt::Display for SignInBlocked {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "No identity service was reachable. Please remove ad blockers or network filters and try again"
        )
    }
}

impl std::error::Error for SignInBlocked {}

/// Which path produced the session.
#[derive(Debug, Clone)]
pub enum SignIn {
    /// The backend exchange succeeded.
    Exchanged { session: Session, message: String },
    /// The backend was unavailable; the secondary identity service
    /// produced the session.
    Fallback { session: Session, message: String },
}

impl SignIn {
    pub fn session(&self) -> &Session {
        match self {
            SignIn::Exchanged { session, .. } | SignIn::Fallback { session, .. } => session,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            SignIn::Exchanged { message, .. } | SignIn::Fallback { message, .. } => message,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExchangeResponse {
    #[serde(default)]
    message: Option<String>,
    session: ExchangeTokens,
}

#[derive(Debug, Deserialize)]
struct ExchangeTokens {
    access_token: String,
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct FallbackExchangeResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    user: Option<FallbackUser>,
}

#[derive(Debug, Deserialize)]
struct FallbackUser {
    #[serde(default)]
    email: Option<String>,
}

/// Exchanges a provider credential for a session and saves it to the store.
///
/// The credential is decoded locally for display fields only. On success the
/// store holds the new session and the result tags which path produced it.
///
/// # Errors
/// Returns an error if both paths fail; when neither service was reachable
/// the error carries the [`SignInBlocked`] marker.
pub async fn sign_in(
    http: &reqwest::Client,
    config: &Config,
    store: &SessionStore,
    credential: &str,
) -> Result<SignIn> {
    let who = identity::decode_identity(credential)?;

    let url = format!("{}/auth", config.backend.effective_base_url());
    let body = serde_json::json!({
        "credential": credential,
        "email": who.email,
        "firstName": who.given_name,
        "lastName": who.family_name,
        "auth": AUTH_PROVIDER,
    });

    let primary = http
        .post(&url)
        .header(reqwest::header::AUTHORIZATION, credential)
        .json(&body)
        .send()
        .await;

    let (primary_unreachable, primary_err) = match primary {
        Ok(response) if response.status().is_success() => {
            // The backend answered; a garbled body is a hard failure, not a
            // reason to fall back.
            let parsed: ExchangeResponse = response
                .json()
                .await
                .context("Failed to parse sign-in exchange response")?;
            let session = Session {
                access_token: parsed.session.access_token,
                refresh_token: parsed.session.refresh_token,
                user: Some(who.clone()),
            };
            store.save(&session)?;
            let message = parsed
                .message
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| format!("Signed in as {}", who.email));
            return Ok(SignIn::Exchanged { session, message });
        }
        Ok(response) if response.status().is_server_error() => {
            let status = response.status();
            (
                false,
                anyhow::anyhow!("Sign-in exchange failed (HTTP {status})"),
            )
        }
        Ok(response) => {
            // 4xx: the backend rejected this credential outright.
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Sign-in exchange rejected (HTTP {status}): {body}");
        }
        Err(err) => (
            true,
            anyhow::Error::new(err).context("Failed to send sign-in exchange request"),
        ),
    };

    debug!("primary sign-in exchange unavailable, trying fallback: {primary_err:#}");

    match exchange_fallback(http, config, credential).await {
        Ok(parsed) => {
            let email = parsed
                .user
                .and_then(|user| user.email)
                .unwrap_or_else(|| who.email.clone());
            let session = Session {
                access_token: parsed.access_token,
                refresh_token: parsed.refresh_token,
                user: Some(who),
            };
            store.save(&session)?;
            let message = format!("Signed in as {email} via the fallback identity service");
            Ok(SignIn::Fallback { session, message })
        }
        Err(fallback_err) => {
            if primary_unreachable && is_transport_error(&fallback_err) {
                Err(fallback_err.context(SignInBlocked))
            } else {
                Err(fallback_err
                    .context(format!("Sign-in failed on both paths ({primary_err:#})")))
            }
        }
    }
}

async fn exchange_fallback(
    http: &reqwest::Client,
    config: &Config,
    credential: &str,
) -> Result<FallbackExchangeResponse> {
    let url = format!("{}/auth/v1/token", config.fallback.effective_url());
    let response = http
        .post(&url)
        .query(&[("grant_type", "id_token")])
        .header("apikey", config.fallback.effective_api_key())
        .json(&serde_json::json!({
            "provider": AUTH_PROVIDER,
            "id_token": credential,
        }))
        .send()
        .await
        .context("Failed to send fallback identity exchange")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Fallback identity exchange failed (HTTP {status}): {body}");
    }

    response
        .json()
        .await
        .context("Failed to parse fallback identity response")
}

/// New tokens from a refresh call. `refresh_token` is present only when the
/// backend rotated it.
#[derive(Debug, Deserialize)]
pub struct RenewedTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Obtains a new access token for the stored refresh token.
///
/// # Errors
/// Returns an error if the operation fails.
pub async fn refresh(
    http: &reqwest::Client,
    base_url: &str,
    refresh_token: &str,
) -> Result<RenewedTokens> {
    let response = http
        .post(format!("{base_url}/auth/refresh"))
        .json(&serde_json::json!({ "refresh_token": refresh_token }))
        .send()
        .await
        .context("Failed to send token refresh request")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Token refresh failed (HTTP {status}): {body}");
    }

    response
        .json()
        .await
        .context("Failed to parse token refresh response")
}

/// Signs out: best-effort server-side logout, then the local session is
/// cleared unconditionally. Returns whether a session was stored.
///
/// # Errors
/// Returns an error only if clearing the local store fails.
pub async fn logout(gateway: &Gateway) -> Result<bool> {
    let had_session = gateway.store().load().is_some();

    if had_session {
        // A dead network must not keep the local session alive.
        match gateway
            .post("/auth/logout", Some(&serde_json::json!({})))
            .await
        {
            Ok(response) if !response.status().is_success() => {
                debug!("logout endpoint returned HTTP {}", response.status());
            }
            Ok(_) => {}
            Err(err) => debug!("logout request failed: {err:#}"),
        }
    }

    gateway.store().clear()?;
    Ok(had_session)
}

fn is_transport_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<reqwest::Error>()
        .is_some_and(|err| err.is_connect() || err.is_timeout() || err.is_request())
}
