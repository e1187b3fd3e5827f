//! Startup session restore.
//!
//! Attempts to restore a prior session before any authenticated view is
//! shown: proactively run the refresh protocol on the stored tokens, then
//! fetch the account. Every failure clears the store and yields the
//! signed-out state; the user is never shown a half-authenticated view.

use anyhow::Result;
use tracing::debug;

use crate::account::{self, AccountSnapshot};
use crate::gateway::Gateway;
use crate::session::Session;

/// A restored session together with the freshly fetched account snapshot.
#[derive(Debug, Clone)]
pub struct Bootstrapped {
    pub session: Session,
    pub account: AccountSnapshot,
}

/// Restores the persisted session, if any.
///
/// Returns `Ok(None)` when there is no stored session, or when restoring it
/// fails for any reason (the store is cleared in that case). No account
/// request is issued when no session is stored.
///
/// # Errors
/// Returns an error only if clearing the local store fails.
pub async fn bootstrap(gateway: &Gateway) -> Result<Option<Bootstrapped>> {
    let Some(stored) = gateway.store().load() else {
        return Ok(None);
    };

    // Validate/rotate the tokens before first use.
    let session = match gateway.refresh_session(&stored.access_token).await {
        Ok(session) => session,
        Err(err) => {
            debug!("bootstrap refresh failed: {err:#}");
            // refresh_session has already cleared the store
            return Ok(None);
        }
    };

    match account::fetch_account(gateway).await {
        Ok(account) => Ok(Some(Bootstrapped { session, account })),
        Err(err) => {
            debug!("bootstrap account fetch failed: {err:#}");
            gateway.store().clear()?;
            Ok(None)
        }
    }
}
