// Deterministic stand-ins for the price, randomness and token collaborators.
use std::collections::HashMap;

use solana_program::pubkey::Pubkey;

use crate::collaborator::{Price, PriceSource, RandomnessSource, TokenVault};
use crate::raffle_error::RaffleError;

#[derive(Default)]
pub struct FixedPrices {
    prices: HashMap<Pubkey, Price>,
}

impl FixedPrices {
    pub fn with(mut self, mint: Pubkey, price: Price) -> Self {
        self.prices.insert(mint, price);
        self
    }
}

impl PriceSource for FixedPrices {
    fn price(&self, mint: &Pubkey) -> Result<Price, RaffleError> {
        self.prices.get(mint).copied().ok_or(RaffleError::UnknownToken)
    }
}

/// Hands out sequential request ids, or fails every request when `offline`.
#[derive(Default)]
pub struct SequentialRandomness {
    pub issued: u128,
    pub offline: bool,
}

impl RandomnessSource for SequentialRandomness {
    fn request(&mut self) -> Result<u128, RaffleError> {
        if self.offline {
            return Err(RaffleError::OracleUnavailable);
        }
        self.issued += 1;
        Ok(self.issued)
    }
}

/// In-memory token ledger: wallet balances, raffle custody and fee lamports.
///
/// Each call applies on its own. Undoing earlier calls of a failed
/// instruction is left to the test, as the runtime does on chain.
#[derive(Clone, Default)]
pub struct LedgerVault {
    wallets: HashMap<(Pubkey, Pubkey), u64>,
    lamports: HashMap<Pubkey, u64>,
    custody: HashMap<Pubkey, u64>,
    fees: u64,
    frozen_mint: Option<Pubkey>,
}

impl LedgerVault {
    pub fn fund(mut self, owner: &Pubkey, mint: &Pubkey, amount: u64) -> Self {
        *self.wallets.entry((*owner, *mint)).or_default() += amount;
        self
    }

    pub fn fund_lamports(mut self, owner: &Pubkey, amount: u64) -> Self {
        *self.lamports.entry(*owner).or_default() += amount;
        self
    }

    /// Makes every payout of `mint` fail.
    pub fn freeze(&mut self, mint: &Pubkey) {
        self.frozen_mint = Some(*mint);
    }

    pub fn balance_of(&self, owner: &Pubkey, mint: &Pubkey) -> u64 {
        self.wallets.get(&(*owner, *mint)).copied().unwrap_or(0)
    }

    pub fn lamports_of(&self, owner: &Pubkey) -> u64 {
        self.lamports.get(owner).copied().unwrap_or(0)
    }

    pub fn custody_of(&self, mint: &Pubkey) -> u64 {
        self.custody.get(mint).copied().unwrap_or(0)
    }

    pub fn fees_held(&self) -> u64 {
        self.fees
    }
}

impl TokenVault for LedgerVault {
    fn take_deposit(
        &mut self,
        depositor: &Pubkey,
        mint: &Pubkey,
        amount: u64,
        fee: u64,
    ) -> Result<(), RaffleError> {
        let tokens = self.balance_of(depositor, mint);
        let lamports = self.lamports_of(depositor);
        if tokens < amount || lamports < fee {
            return Err(RaffleError::TransferFailed);
        }
        self.wallets.insert((*depositor, *mint), tokens - amount);
        self.lamports.insert(*depositor, lamports - fee);
        *self.custody.entry(*mint).or_default() += amount;
        self.fees += fee;
        Ok(())
    }

    fn pay_out(&mut self, recipient: &Pubkey, mint: &Pubkey, amount: u64) -> Result<(), RaffleError> {
        let held = self.custody_of(mint);
        if self.frozen_mint == Some(*mint) || held < amount {
            return Err(RaffleError::TransferFailed);
        }
        self.custody.insert(*mint, held - amount);
        *self.wallets.entry((*recipient, *mint)).or_default() += amount;
        Ok(())
    }

    fn pay_fee(&mut self, recipient: &Pubkey, amount: u64) -> Result<(), RaffleError> {
        if self.fees < amount {
            return Err(RaffleError::TransferFailed);
        }
        self.fees -= amount;
        *self.lamports.entry(*recipient).or_default() += amount;
        Ok(())
    }
}
