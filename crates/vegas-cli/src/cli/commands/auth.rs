//! Sign-in, sign-out, and session status command handlers.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use vegas_core::auth;
use vegas_core::config::Config;
use vegas_core::gateway::{self, Gateway};
use vegas_core::session::{self, SessionStore};

/// Anything shorter than this cannot be a real identity token.
const MIN_CREDENTIAL_LEN: usize = 20;

pub async fn login(config: &Config, credential: Option<String>) -> Result<()> {
    let credential = match credential {
        Some(credential) => credential,
        None => prompt_credential()?,
    };
    let credential = credential.trim().to_string();

    if credential.is_empty() {
        anyhow::bail!("Credential is empty");
    }
    if credential.len() < MIN_CREDENTIAL_LEN {
        anyhow::bail!("Credential is too short to be an identity token");
    }

    let store = SessionStore::open_default();
    let http = gateway::http_client(&config.http)?;

    let outcome = auth::sign_in(&http, config, &store, &credential).await?;
    println!("{}", outcome.message());
    Ok(())
}

pub async fn logout(config: &Config) -> Result<()> {
    let store = SessionStore::open_default();
    if store.load().is_none() {
        println!("Not signed in.");
        return Ok(());
    }

    let gateway = Gateway::new(config, store)?;
    auth::logout(&gateway).await?;
    println!("Signed out.");
    Ok(())
}

pub fn status() -> Result<()> {
    let store = SessionStore::open_default();
    match store.load() {
        Some(current) => {
            match &current.user {
                Some(user) => println!("Signed in as {}", user.email),
                None => println!("Signed in."),
            }
            println!(
                "Access token: {}",
                session::mask_token(&current.access_token)
            );
        }
        None => println!("Not signed in."),
    }
    Ok(())
}

fn prompt_credential() -> Result<String> {
    print!("Paste the identity credential: ");
    std::io::stdout().flush().context("flush stdout")?;

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read credential from stdin")?;
    Ok(line)
}
