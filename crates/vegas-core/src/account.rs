//! Account balance fetch.

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::gateway::{Gateway, SessionExpired};

/// Account snapshot returned by the backend. Transient: never persisted,
/// refetched after any session refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountSnapshot {
    #[serde(default)]
    pub user: Option<AccountUser>,
    /// Current balance in credits.
    #[serde(default)]
    pub data: Option<i64>,
}

impl AccountSnapshot {
    pub fn balance(&self) -> Option<i64> {
        self.data
    }

    pub fn full_name(&self) -> Option<&str> {
        self.user
            .as_ref()?
            .user_metadata
            .as_ref()?
            .full_name
            .as_deref()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountUser {
    #[serde(default)]
    pub user_metadata: Option<UserMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Fetches the account snapshot through the gateway.
///
/// # Errors
/// Returns an error if the request fails; a 401 that survived the gateway's
/// single retry surfaces as [`SessionExpired`].
pub async fn fetch_account(gateway: &Gateway) -> Result<AccountSnapshot> {
    let response = gateway.get("/account").await?;

    if response.status() == StatusCode::UNAUTHORIZED {
        anyhow::bail!(SessionExpired);
    }
    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("Account request failed (HTTP {status})");
    }

    response
        .json()
        .await
        .context("Failed to parse account response")
}
