//! Slot machine rounds against a local balance.
//!
//! The balance is a local projection of the fetched account figure; spins
//! debit the bet and credit the payout. Nothing here talks to the network.

use anyhow::Result;
use rand::Rng;

/// Starting balance used when the account fetch yields no figure.
pub const DEFAULT_BALANCE: i64 = 20_670_000;

/// Reel symbols, cheapest to richest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Cherry,
    Lemon,
    Orange,
    Bell,
    Bar,
    Seven,
}

impl Symbol {
    pub fn label(self) -> &'static str {
        match self {
            Symbol::Cherry => "Cherry",
            Symbol::Lemon => "Lemon",
            Symbol::Orange => "Orange",
            Symbol::Bell => "Bell",
            Symbol::Bar => "Bar",
            Symbol::Seven => "Seven",
        }
    }
}

/// One reel strip; duplicates encode the weights.
const REEL: [Symbol; 16] = [
    Symbol::Cherry,
    Symbol::Cherry,
    Symbol::Cherry,
    Symbol::Cherry,
    Symbol::Cherry,
    Symbol::Lemon,
    Symbol::Lemon,
    Symbol::Lemon,
    Symbol::Lemon,
    Symbol::Orange,
    Symbol::Orange,
    Symbol::Orange,
    Symbol::Bell,
    Symbol::Bell,
    Symbol::Bar,
    Symbol::Seven,
];

/// Outcome of a single round.
#[derive(Debug, Clone, Copy)]
pub struct SpinOutcome {
    pub reels: [Symbol; 3],
    pub bet: i64,
    pub payout: i64,
}

impl SpinOutcome {
    pub fn is_win(&self) -> bool {
        self.payout > 0
    }
}

impl std::fmt::Display for SpinOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} | {} | {}",
            self.reels[0].label(),
            self.reels[1].label(),
            self.reels[2].label()
        )
    }
}

/// A machine holding the player's local balance.
#[derive(Debug, Clone)]
pub struct SlotMachine {
    balance: i64,
}

impl SlotMachine {
    pub fn new(balance: i64) -> Self {
        Self { balance }
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    /// Plays one round: debits the bet, spins three reels, credits the
    /// payout.
    ///
    /// # Errors
    /// Returns an error when the bet is not positive or exceeds the balance.
    pub fn spin(&mut self, bet: i64, rng: &mut impl Rng) -> Result<SpinOutcome> {
        if bet <= 0 {
            anyhow::bail!("Bet must be positive");
        }
        if bet > self.balance {
            anyhow::bail!("Bet of {bet} exceeds balance of {}", self.balance);
        }

        let reels = [
            REEL[rng.gen_range(0..REEL.len())],
            REEL[rng.gen_range(0..REEL.len())],
            REEL[rng.gen_range(0..REEL.len())],
        ];
        let payout = bet * payout_multiplier(reels);
        self.balance = self.balance - bet + payout;

        Ok(SpinOutcome { reels, bet, payout })
    }
}

/// Paytable: three of a kind pays by symbol; a pair of cherries pays a
/// consolation. Everything else loses the bet.
fn payout_multiplier(reels: [Symbol; 3]) -> i64 {
    if reels[0] == reels[1] && reels[1] == reels[2] {
        return match reels[0] {
            Symbol::Seven => 50,
            Symbol::Bar => 20,
            Symbol::Bell => 10,
            Symbol::Orange => 8,
            Symbol::Lemon => 5,
            Symbol::Cherry => 4,
        };
    }

    let cherries = reels
        .iter()
        .filter(|symbol| **symbol == Symbol::Cherry)
        .count();
    if cherries >= 2 { 2 } else { 0 }
}
