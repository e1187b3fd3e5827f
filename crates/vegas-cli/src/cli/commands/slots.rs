//! Slot machine command handlers.

use anyhow::Result;
use vegas_core::bootstrap;
use vegas_core::config::Config;
use vegas_core::gateway::Gateway;
use vegas_core::session::SessionStore;
use vegas_core::slots::{DEFAULT_BALANCE, SlotMachine};

pub async fn spin(config: &Config, bet: Option<i64>, rounds: u32) -> Result<()> {
    let gateway = Gateway::new(config, SessionStore::open_default())?;

    let Some(restored) = bootstrap::bootstrap(&gateway).await? else {
        println!("Not signed in. Run `vegas login` to sign in.");
        return Ok(());
    };

    let bet = bet.unwrap_or(config.default_bet);
    let mut machine = SlotMachine::new(restored.account.balance().unwrap_or(DEFAULT_BALANCE));
    let mut rng = rand::thread_rng();

    for _ in 0..rounds {
        let outcome = machine.spin(bet, &mut rng)?;
        if outcome.is_win() {
            println!("{outcome}  +{}", outcome.payout);
        } else {
            println!("{outcome}  -{}", outcome.bet);
        }
    }
    println!("Balance: ${}", machine.balance());
    Ok(())
}
