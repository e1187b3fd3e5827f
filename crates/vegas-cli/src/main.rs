mod cli;

use vegas_core::gateway::SessionExpired;

fn main() {
    if let Err(e) = cli::run() {
        if e.downcast_ref::<SessionExpired>().is_some() {
            // Neutral signed-out state, not a raw error.
            println!("Session expired. Run `vegas login` to sign in again.");
            return;
        }
        eprintln!("{e:#}"); // pretty anyhow chain
        std::process::exit(1);
    }
}
