//! Account command handlers.

use anyhow::Result;
use vegas_core::bootstrap::{self, Bootstrapped};
use vegas_core::config::Config;
use vegas_core::gateway::Gateway;
use vegas_core::session::SessionStore;
use vegas_core::slots;

pub async fn balance(config: &Config) -> Result<()> {
    let gateway = Gateway::new(config, SessionStore::open_default())?;

    let Some(restored) = bootstrap::bootstrap(&gateway).await? else {
        println!("Not signed in. Run `vegas login` to sign in.");
        return Ok(());
    };

    if let Some(name) = display_name(&restored) {
        println!("Greetings, {name}!");
    }
    let balance = restored.account.balance().unwrap_or(slots::DEFAULT_BALANCE);
    println!("Balance: ${balance}");
    Ok(())
}

fn display_name(restored: &Bootstrapped) -> Option<String> {
    if let Some(name) = restored.account.full_name() {
        return Some(name.to_string());
    }
    restored
        .session
        .user
        .as_ref()
        .map(|user| user.display_name().to_string())
}
