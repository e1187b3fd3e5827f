//! Display-field decoding for provider-issued identity credentials.
//!
//! The credential is an opaque signed token from the identity provider. We
//! decode its payload segment for display fields only (email, names); the
//! signature is never verified here and the fields are never used for
//! authorization decisions.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

/// Display identity decoded from a sign-in credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl UserIdentity {
    /// Returns the best display name available: full name, given name, or
    /// the email as a last resort.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.given_name.as_deref())
            .unwrap_or(&self.email)
    }
}

/// Decodes the display fields from a credential's payload segment.
///
/// Tolerates missing name claims but requires an email; a structurally
/// malformed token (wrong segment count, bad base64, bad JSON) is an error.
///
/// # Errors
/// Returns an error if the operation fails.
pub fn decode_identity(credential: &str) -> Result<UserIdentity> {
    let parts: Vec<&str> = credential.split('.').collect();
    if parts.len() != 3 {
        anyhow::bail!("Credential is not a three-segment token");
    }

    let decoded = URL_SAFE_NO_PAD
        .decode(parts[1])
        .context("Failed to decode credential payload")?;
    let claims: serde_json::Value =
        serde_json::from_slice(&decoded).context("Failed to parse credential payload")?;

    let email = claims
        .get("email")
        .and_then(|v| v.as_str())
        .context("Credential payload has no email claim")?
        .to_string();

    let claim = |key: &str| {
        claims
            .get(key)
            .and_then(|v| v.as_str())
            .map(std::string::ToString::to_string)
    };

    Ok(UserIdentity {
        email,
        given_name: claim("given_name"),
        family_name: claim("family_name"),
        name: claim("name"),
    })
}
