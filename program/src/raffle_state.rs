use std::mem::size_of;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, program_error::ProgramError, pubkey::Pubkey};

use crate::chance::{ChanceEntry, ChanceLedger};
use crate::collaborator::{PriceSource, TokenVault};
use crate::normalizer;
use crate::raffle_error::RaffleError;

/// Most token types an on-chain raffle may take. Fulfilment lists two token
/// accounts per pooled mint and must fit in a single transaction.
pub const MAX_TOKENS_PER_RAFFLE: u32 = 10;

/// Heap an instruction may spend on raffle state. The rest of the 32 KiB
/// program heap is left to account infos, logging and CPI.
pub const STATE_HEAP_BUDGET: usize = 16 * 1024;

/// Heap set aside per paid-out mint for the transfer CPI and its log line
const TRANSFER_HEAP_ALLOWANCE: usize = 512;

/// Status of a raffle
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaffleStatus {
    /// Raffle is open for deposits
    Open,
    /// Draw triggered, waiting for the randomness response
    AwaitingRandomness,
    /// Winner chosen and payout attempted
    Resolved,
}

/// Immutable settings fixed when the raffle is created
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RaffleConfig {
    /// Cap on distinct participants
    pub max_players: u32,
    /// Cap on distinct token types
    pub max_tokens: u32,
    /// Fixed ante in lamports charged per deposit call
    pub ticket_fee: u64,
    /// Price oracle registry account
    pub price_oracle: Pubkey,
    /// Switchboard VRF account used for the draw
    pub randomness_oracle: Pubkey,
    /// Receives the collected ticket fees on resolution
    pub fee_recipient: Pubkey,
}

impl RaffleConfig {
    pub const LEN: usize = 4 + 4 + 8 + 32 + 32 + 32;

    pub fn validate(&self) -> Result<(), RaffleError> {
        if self.max_players == 0 || self.max_tokens == 0 {
            return Err(RaffleError::InvalidConfig);
        }
        Ok(())
    }

    /// Caps a raffle account can serve: every instruction has to decode the
    /// raffle within the program heap, and fulfilment has to fit one transaction.
    pub fn validate_account_limits(&self) -> Result<(), RaffleError> {
        self.validate()?;
        if self.max_tokens > MAX_TOKENS_PER_RAFFLE {
            msg!(
                "Token cap {} exceeds the limit of {}",
                self.max_tokens,
                MAX_TOKENS_PER_RAFFLE
            );
            return Err(RaffleError::InvalidConfig);
        }
        if self.max_players > Raffle::max_players_for(self.max_tokens) {
            msg!(
                "Player cap {} exceeds the limit of {} for {} tokens",
                self.max_players,
                Raffle::max_players_for(self.max_tokens),
                self.max_tokens
            );
            return Err(RaffleError::InvalidConfig);
        }
        Ok(())
    }
}

/// A token type seen by the raffle
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct TokenEntry {
    pub mint: Pubkey,
    pub decimals: u8,
    pub is_registered_with_price_oracle: bool,
    /// Amount of this token currently held in custody
    pub pooled: u64,
}

impl TokenEntry {
    pub const LEN: usize = 32 + 1 + 1 + 8;
}

/// One token balance a player holds in the pool
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct TokenBalance {
    pub mint: Pubkey,
    pub amount: u64,
}

impl TokenBalance {
    pub const LEN: usize = 32 + 8;
}

/// A participant's holdings, one account per player and raffle
/// (PDA `[b"player", raffle, player]`), created on first deposit.
///
/// Balances are claims on the pool while the raffle is unresolved. Once the
/// pool is paid out they are a deposit history, and the account may be closed.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Player {
    /// Is the account initialized
    pub is_initialized: bool,
    pub raffle: Pubkey,
    pub address: Pubkey,
    pub balances: Vec<TokenBalance>,
}

impl Player {
    pub fn new(raffle: Pubkey, address: Pubkey) -> Self {
        Self {
            is_initialized: true,
            raffle,
            address,
            balances: Vec::new(),
        }
    }

    /// Account size needed for a player of a raffle with the given token cap
    pub fn space(max_tokens: u32) -> usize {
        1 + 32 + 32 + 4 + max_tokens as usize * TokenBalance::LEN
    }

    pub fn load(src: &[u8]) -> Result<Self, ProgramError> {
        let mut data = src;
        Self::deserialize(&mut data).map_err(|_| ProgramError::InvalidAccountData)
    }

    pub fn save(&self, dst: &mut [u8]) -> Result<(), ProgramError> {
        let mut writer = dst;
        self.serialize(&mut writer)
            .map_err(|_| ProgramError::AccountDataTooSmall)
    }

    pub fn balance_of(&self, mint: &Pubkey) -> u64 {
        self.balances
            .iter()
            .find(|balance| balance.mint == *mint)
            .map_or(0, |balance| balance.amount)
    }

    fn credit(&mut self, mint: &Pubkey, amount: u64) {
        match self.balances.iter_mut().find(|balance| balance.mint == *mint) {
            // bounded by the token's pooled total, which was checked
            Some(balance) => balance.amount += amount,
            None => self.balances.push(TokenBalance {
                mint: *mint,
                amount,
            }),
        }
    }
}

/// Raffle account data
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Raffle {
    /// Is the account initialized
    pub is_initialized: bool,
    /// Administrator allowed to trigger the draw
    pub admin: Pubkey,
    pub config: RaffleConfig,
    pub status: RaffleStatus,
    /// Outstanding randomness request identifier
    pub pending_request: Option<u128>,
    /// Winner of the raffle once resolved
    pub winner: Option<Pubkey>,
    /// Set when settlement has been carried out
    pub payout_attempted: bool,
    /// Ticket fees collected over the raffle's lifetime
    pub collected_fee: u64,
    /// Number of accepted deposit calls
    pub deposit_count: u64,
    pub tokens: Vec<TokenEntry>,
    /// Participants in first-deposit order with their chance
    pub ledger: ChanceLedger,
}

impl Raffle {
    pub fn new(admin: Pubkey, config: RaffleConfig) -> Result<Self, RaffleError> {
        config.validate()?;
        Ok(Self {
            is_initialized: true,
            admin,
            config,
            status: RaffleStatus::Open,
            pending_request: None,
            winner: None,
            payout_attempted: false,
            collected_fee: 0,
            deposit_count: 0,
            tokens: Vec::new(),
            ledger: ChanceLedger::default(),
        })
    }

    /// Account size needed for a raffle with the given caps
    pub fn space(max_players: u32, max_tokens: u32) -> usize {
        1 + 32
            + RaffleConfig::LEN
            + 1
            + (1 + 16)
            + (1 + 32)
            + 1
            + 8
            + 8
            + 4
            + max_tokens as usize * TokenEntry::LEN
            + ChanceLedger::space(max_players)
    }

    /// Worst-case heap taken by raffle state in one instruction: the decoded
    /// token list and chance ledger, a player's balances, and the per-mint
    /// settlement list plus transfer scratch of a payout.
    pub fn heap_footprint(max_players: u32, max_tokens: u32) -> usize {
        let per_token = size_of::<TokenEntry>()
            + size_of::<TokenBalance>()
            + size_of::<(Pubkey, u64)>()
            + TRANSFER_HEAP_ALLOWANCE;
        (max_players as usize)
            .saturating_mul(size_of::<ChanceEntry>())
            .saturating_add((max_tokens as usize).saturating_mul(per_token))
    }

    /// Largest player cap an on-chain raffle with `max_tokens` can take.
    pub fn max_players_for(max_tokens: u32) -> u32 {
        if max_tokens > MAX_TOKENS_PER_RAFFLE {
            return 0;
        }
        let spare = STATE_HEAP_BUDGET.saturating_sub(Self::heap_footprint(0, max_tokens));
        (spare / size_of::<ChanceEntry>()) as u32
    }

    /// Reads the raffle from account data, ignoring trailing free space.
    pub fn load(src: &[u8]) -> Result<Self, ProgramError> {
        let mut data = src;
        Self::deserialize(&mut data).map_err(|_| ProgramError::InvalidAccountData)
    }

    pub fn save(&self, dst: &mut [u8]) -> Result<(), ProgramError> {
        let mut writer = dst;
        self.serialize(&mut writer)
            .map_err(|_| ProgramError::AccountDataTooSmall)
    }

    pub fn token(&self, mint: &Pubkey) -> Option<&TokenEntry> {
        self.tokens.iter().find(|token| token.mint == *mint)
    }

    pub fn player_count(&self) -> usize {
        self.ledger.len()
    }

    pub fn chance_of(&self, address: &Pubkey) -> u128 {
        self.ledger.chance_of(address).unwrap_or(0)
    }

    pub fn total_chance(&self) -> u128 {
        self.ledger.total_chance()
    }

    /// Accepts a deposit by `player` of `amount` of `mint` plus the ticket fee.
    ///
    /// Every check, the price lookup and the custody transfer happen before
    /// any field is touched, so a rejected deposit leaves the raffle and the
    /// player as they were. Returns the normalized value credited as chance.
    #[allow(clippy::too_many_arguments)]
    pub fn deposit<P, V>(
        &mut self,
        player: &mut Player,
        mint: &Pubkey,
        token_decimals: u8,
        amount: u64,
        fee_payment: u64,
        prices: &P,
        vault: &mut V,
    ) -> Result<u128, RaffleError>
    where
        P: PriceSource + ?Sized,
        V: TokenVault + ?Sized,
    {
        if self.status != RaffleStatus::Open {
            msg!("Deposits are closed");
            return Err(RaffleError::RaffleNotOpen);
        }
        if fee_payment != self.config.ticket_fee {
            msg!(
                "Fee payment {} does not match ticket fee {}",
                fee_payment,
                self.config.ticket_fee
            );
            return Err(RaffleError::InvalidFee);
        }
        if amount == 0 {
            return Err(RaffleError::InvalidAmount);
        }

        let depositor = player.address;
        let is_new_player = self.ledger.chance_of(&depositor).is_none();
        if is_new_player && self.ledger.len() >= self.config.max_players as usize {
            msg!("Player cap of {} reached", self.config.max_players);
            return Err(RaffleError::CapacityExceeded);
        }

        let token_index = self.tokens.iter().position(|t| t.mint == *mint);
        if token_index.is_none() && self.tokens.len() >= self.config.max_tokens as usize {
            msg!("Token cap of {} reached", self.config.max_tokens);
            return Err(RaffleError::CapacityExceeded);
        }
        let decimals = match token_index {
            Some(index) => self.tokens[index].decimals,
            None => token_decimals,
        };

        let value = normalizer::normalize(prices, mint, decimals, amount)?;
        if value == 0 {
            msg!("Deposit of {} {} is worth nothing at the current price", amount, mint);
            return Err(RaffleError::InvalidAmount);
        }

        let collected_fee = self
            .collected_fee
            .checked_add(fee_payment)
            .ok_or(RaffleError::MathOverflow)?;
        let pooled = token_index
            .map_or(0, |index| self.tokens[index].pooled)
            .checked_add(amount)
            .ok_or(RaffleError::MathOverflow)?;
        self.ledger.check_add(value)?;

        vault.take_deposit(&depositor, mint, amount, fee_payment)?;

        self.ledger.add_chance(&depositor, value)?;
        match token_index {
            Some(index) => self.tokens[index].pooled = pooled,
            None => self.tokens.push(TokenEntry {
                mint: *mint,
                decimals,
                is_registered_with_price_oracle: true,
                pooled,
            }),
        }
        player.credit(mint, amount);
        self.collected_fee = collected_fee;
        self.deposit_count += 1;

        msg!(
            "Deposit accepted: player={}, mint={}, amount={}, value={}",
            depositor,
            mint,
            amount,
            value
        );
        Ok(value)
    }
}
