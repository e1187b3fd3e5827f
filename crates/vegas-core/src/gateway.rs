//! Authenticated request gateway.
//!
//! Wraps backend calls: attaches the current bearer token from the injected
//! session store, and on a 401 runs exactly one refresh-and-retry cycle
//! before giving up. Refreshes are single-flight per gateway instance.

use anyhow::{Context, Result};
use reqwest::{Method, Response, StatusCode};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::auth;
use crate::config::{Config, HttpConfig};
use crate::session::{Session, SessionStore};

/// Terminal refresh failure: the stored session has been cleared and the
/// user must sign in again.
#[derive(Debug, Clone, Copy)]
pub struct SessionExpired;

impl std::fmt::Display for SessionExpired {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Session expired; please sign in again")
    }
}

impl std::error::Error for SessionExpired {}

/// Builds the shared HTTP client with the configured request timeout.
///
/// # Errors
/// Returns an error if the operation fails.
pub fn http_client(config: &HttpConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout())
        .build()
        .context("Failed to build HTTP client")
}

/// Gateway for backend requests.
///
/// Constructed explicitly with its session store; there is no process-wide
/// client.
pub struct Gateway {
    http: reqwest::Client,
    base_url: String,
    store: SessionStore,
    refresh_gate: Mutex<()>,
}

impl Gateway {
    /// Creates a gateway for the configured backend.
    ///
    /// # Errors
    /// Returns an error if the operation fails.
    pub fn new(config: &Config, store: SessionStore) -> Result<Self> {
        Ok(Self {
            http: http_client(&config.http)?,
            base_url: config.backend.effective_base_url(),
            store,
            refresh_gate: Mutex::new(()),
        })
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Performs a backend request with the current credentials.
    ///
    /// Absent a stored session the request goes out unauthenticated (some
    /// endpoints need no prior session). On a 401 with a session present,
    /// the refresh protocol runs once and the request is replayed once with
    /// the new token; a 401 on the replay is returned to the caller as-is.
    /// Any other failure is propagated without retry.
    ///
    /// # Errors
    /// Returns an error if the request cannot be sent, or with a
    /// [`SessionExpired`] marker when the refresh itself fails.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        let token = self.store.load().map(|session| session.access_token);

        let response = self.send(&method, path, body, token.as_deref()).await?;

        // The replay decision is scoped to this call: one send above, at
        // most one more below.
        let Some(stale_token) = token else {
            return Ok(response);
        };
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!("{method} {path}: access token rejected, refreshing");
        let renewed = self.refresh_session(&stale_token).await?;
        self.send(&method, path, body, Some(&renewed.access_token))
            .await
    }

    /// Convenience GET through [`Gateway::request`].
    ///
    /// # Errors
    /// Returns an error if the operation fails.
    pub async fn get(&self, path: &str) -> Result<Response> {
        self.request(Method::GET, path, None).await
    }

    /// Convenience POST through [`Gateway::request`].
    ///
    /// # Errors
    /// Returns an error if the operation fails.
    pub async fn post(&self, path: &str, body: Option<&serde_json::Value>) -> Result<Response> {
        self.request(Method::POST, path, body).await
    }

    /// Runs the refresh protocol for a session whose access token was
    /// rejected (or, at bootstrap, is about to be used for the first time).
    ///
    /// Single-flight: concurrent callers serialize on the refresh gate, and
    /// a caller that waited re-reads the store first — if another refresh
    /// already rotated the token there is nothing left to do. On refresh
    /// failure the store is cleared entirely and [`SessionExpired`] is
    /// surfaced.
    ///
    /// # Errors
    /// Returns an error if the operation fails.
    pub async fn refresh_session(&self, stale_access_token: &str) -> Result<Session> {
        let _gate = self.refresh_gate.lock().await;

        let Some(current) = self.store.load() else {
            return Err(anyhow::Error::new(SessionExpired));
        };
        if current.access_token != stale_access_token {
            // Another caller finished a refresh while we waited for the gate.
            return Ok(current);
        }

        match auth::refresh(&self.http, &self.base_url, &current.refresh_token).await {
            Ok(renewed) => {
                let session = Session {
                    access_token: renewed.access_token,
                    refresh_token: renewed.refresh_token.unwrap_or(current.refresh_token),
                    user: current.user,
                };
                self.store.save(&session)?;
                Ok(session)
            }
            Err(err) => {
                warn!("token refresh failed, clearing stored session: {err:#}");
                self.store.clear()?;
                Err(err.context(SessionExpired))
            }
        }
    }

    async fn send(
        &self,
        method: &Method,
        path: &str,
        body: Option<&serde_json::Value>,
        token: Option<&str>,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request
            .send()
            .await
            .with_context(|| format!("Failed to send {method} {url}"))
    }
}
