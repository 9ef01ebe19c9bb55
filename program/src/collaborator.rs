// External collaborators the raffle engine depends on.
//
// The engine never talks to an oracle or a token program directly; the
// processor hands it implementations backed by Switchboard and SPL token
// accounts, while unit tests hand it deterministic doubles.
use solana_program::pubkey::Pubkey;

use crate::raffle_error::RaffleError;

/// A price answer: `value / 10^decimals` reference units per whole token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Price {
    pub value: i128,
    pub decimals: u8,
}

impl Price {
    pub fn new(value: i128, decimals: u8) -> Self {
        Self { value, decimals }
    }
}

/// Price-feed collaborator.
pub trait PriceSource {
    /// Current price of `mint`. Implementations reject stale answers with
    /// `OracleUnavailable`; the normalizer rejects non-positive ones.
    fn price(&self, mint: &Pubkey) -> Result<Price, RaffleError>;
}

/// Randomness collaborator.
pub trait RandomnessSource {
    /// Submits a randomness request and returns its identifier.
    fn request(&mut self) -> Result<u128, RaffleError>;
}

/// Token-transfer collaborator for every token type plus the native fee.
///
/// A failing call must have no effect of its own. Calls that succeeded
/// earlier in the same instruction are not undone by the engine; on chain the
/// runtime discards them together with the failed transaction.
pub trait TokenVault {
    /// Moves `amount` of `mint` and the `fee` from `depositor` into custody.
    /// Either both movements happen or the call fails with `TransferFailed`.
    fn take_deposit(
        &mut self,
        depositor: &Pubkey,
        mint: &Pubkey,
        amount: u64,
        fee: u64,
    ) -> Result<(), RaffleError>;

    /// Releases `amount` of pooled `mint` to `recipient`.
    fn pay_out(&mut self, recipient: &Pubkey, mint: &Pubkey, amount: u64)
        -> Result<(), RaffleError>;

    /// Releases collected ticket fees to `recipient`.
    fn pay_fee(&mut self, recipient: &Pubkey, amount: u64) -> Result<(), RaffleError>;
}
