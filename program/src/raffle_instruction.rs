use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
    sysvar::recent_blockhashes,
};
use std::mem::size_of;

use crate::oracle_state::FeedQuote;
use crate::raffle_error::RaffleError;
use crate::utils::{
    find_feed_record_address, find_player_address, find_vault_authority, vault_token_address,
};

#[derive(Clone, Debug, PartialEq)]
pub enum RaffleInstruction {
    /// Initialize a price oracle registry
    ///
    /// Accounts expected:
    /// 0. `[signer]` The admin allowed to register price feeds
    /// 1. `[writable]` The oracle account, pre-created and owned by this program
    /// 2. `[]` Switchboard aggregator pricing the native currency in USD
    InitializePriceOracle {
        /// Oldest acceptable aggregator answer, in seconds
        max_staleness: i64,
    },

    /// Register (or re-point) the price feed of a mint (oracle admin only)
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The oracle admin, pays for the feed record
    /// 1. `[]` The oracle account
    /// 2. `[writable]` The feed record (PDA `[b"feed", oracle, mint]`)
    /// 3. `[]` The token mint
    /// 4. `[]` Switchboard aggregator answering for the mint
    /// 5. `[]` The system program
    RegisterPriceFeed {
        /// Unit the aggregator quotes the mint in
        quote: FeedQuote,
    },

    /// Initialize a new raffle
    ///
    /// Accounts expected:
    /// 0. `[signer]` The raffle admin
    /// 1. `[writable]` The raffle account, pre-created with `Raffle::space` and owned by this program.
    ///    The caps must pass `RaffleConfig::validate_account_limits`.
    /// 2. `[]` The price oracle account
    /// 3. `[]` The Switchboard VRF account, with the raffle's vault authority as its authority
    /// 4. `[]` Account receiving the collected ticket fees
    InitializeRaffle {
        max_players: u32,
        max_tokens: u32,
        /// Fee in lamports paid with every deposit
        ticket_fee: u64,
    },

    /// Deposit tokens into a raffle
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The player, pays the ticket fee
    /// 1. `[writable]` The raffle account
    /// 2. `[writable]` The player record (PDA `[b"player", raffle, player]`), created on first deposit
    /// 3. `[]` The price oracle account
    /// 4. `[]` The feed record of the mint
    /// 5. `[]` The aggregator named by the feed record
    /// 6. `[]` The token mint
    /// 7. `[writable]` The player's token account
    /// 8. `[writable]` The vault token account (ATA of the vault authority)
    /// 9. `[]` The vault authority (PDA `[b"vault", raffle]`)
    /// 10. `[]` The token program
    /// 11. `[]` The associated token account program
    /// 12. `[]` The system program
    /// 13. `[]` Optional: the oracle's native/USD aggregator, for native-quoted feeds
    Deposit {
        /// Token amount in base units
        amount: u64,
        /// Ticket fee payment in lamports
        fee: u64,
    },

    /// Close deposits and request VRF randomness (raffle admin only)
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The raffle admin, pays for the VRF request
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The vault authority, signs as the VRF authority
    /// 3. `[writable]` The VRF account
    /// 4. `[writable]` The oracle queue
    /// 5. `[]` The queue authority
    /// 6. `[]` The queue data buffer
    /// 7. `[writable]` The VRF permission account
    /// 8. `[writable]` The VRF escrow
    /// 9. `[writable]` The admin's wrapped SOL token account
    /// 10. `[]` The recent blockhashes sysvar
    /// 11. `[]` The Switchboard program state
    /// 12. `[]` The token program
    /// 13. `[]` The Switchboard program
    RequestDraw { state_bump: u8, permission_bump: u8 },

    /// Replace an outstanding VRF request that never resolved (raffle admin only)
    ///
    /// Accounts expected: same as `RequestDraw`
    RetryDraw { state_bump: u8, permission_bump: u8 },

    /// Select the winner from the VRF result and pay out (anyone)
    ///
    /// Accounts expected:
    /// 0. `[writable]` The raffle account
    /// 1. `[]` The VRF account
    /// 2. `[]` The vault authority
    /// 3. `[]` The token program
    /// 4. `[writable]` The fee recipient
    /// 5.. For each token with a pooled balance, in registration order:
    ///     `[writable]` the vault token account, then
    ///     `[writable]` the winner's token account of that mint
    FulfillRandomness {
        /// Request id the raffle is waiting on
        request_id: u128,
    },

    /// Close a player record of a resolved raffle, returning its rent
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The player
    /// 1. `[]` The raffle account
    /// 2. `[writable]` The player record
    ClosePlayer,
}

impl RaffleInstruction {
    /// Unpacks a byte buffer into a RaffleInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (tag, rest) = input
            .split_first()
            .ok_or(RaffleError::InvalidInstructionData)?;

        Ok(match tag {
            0 => {
                let (max_staleness, _) = Self::unpack_i64(rest)?;
                Self::InitializePriceOracle { max_staleness }
            }
            1 => {
                let (quote, _) = Self::unpack_u8(rest)?;
                let quote =
                    FeedQuote::try_from(quote).map_err(|_| RaffleError::InvalidInstructionData)?;
                Self::RegisterPriceFeed { quote }
            }
            2 => {
                let (max_players, rest) = Self::unpack_u32(rest)?;
                let (max_tokens, rest) = Self::unpack_u32(rest)?;
                let (ticket_fee, _) = Self::unpack_u64(rest)?;
                Self::InitializeRaffle {
                    max_players,
                    max_tokens,
                    ticket_fee,
                }
            }
            3 => {
                let (amount, rest) = Self::unpack_u64(rest)?;
                let (fee, _) = Self::unpack_u64(rest)?;
                Self::Deposit { amount, fee }
            }
            4 | 5 => {
                let (state_bump, rest) = Self::unpack_u8(rest)?;
                let (permission_bump, _) = Self::unpack_u8(rest)?;
                if *tag == 4 {
                    Self::RequestDraw {
                        state_bump,
                        permission_bump,
                    }
                } else {
                    Self::RetryDraw {
                        state_bump,
                        permission_bump,
                    }
                }
            }
            6 => {
                let (request_id, _) = Self::unpack_u128(rest)?;
                Self::FulfillRandomness { request_id }
            }
            7 => Self::ClosePlayer,
            _ => return Err(RaffleError::InvalidInstructionData.into()),
        })
    }

    /// Packs a RaffleInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(size_of::<Self>());
        match *self {
            Self::InitializePriceOracle { max_staleness } => {
                buf.push(0);
                buf.extend_from_slice(&max_staleness.to_le_bytes());
            }
            Self::RegisterPriceFeed { quote } => {
                buf.push(1);
                buf.push(quote.into());
            }
            Self::InitializeRaffle {
                max_players,
                max_tokens,
                ticket_fee,
            } => {
                buf.push(2);
                buf.extend_from_slice(&max_players.to_le_bytes());
                buf.extend_from_slice(&max_tokens.to_le_bytes());
                buf.extend_from_slice(&ticket_fee.to_le_bytes());
            }
            Self::Deposit { amount, fee } => {
                buf.push(3);
                buf.extend_from_slice(&amount.to_le_bytes());
                buf.extend_from_slice(&fee.to_le_bytes());
            }
            Self::RequestDraw {
                state_bump,
                permission_bump,
            } => {
                buf.push(4);
                buf.push(state_bump);
                buf.push(permission_bump);
            }
            Self::RetryDraw {
                state_bump,
                permission_bump,
            } => {
                buf.push(5);
                buf.push(state_bump);
                buf.push(permission_bump);
            }
            Self::FulfillRandomness { request_id } => {
                buf.push(6);
                buf.extend_from_slice(&request_id.to_le_bytes());
            }
            Self::ClosePlayer => buf.push(7),
        }
        buf
    }

    fn unpack_u8(input: &[u8]) -> Result<(u8, &[u8]), ProgramError> {
        let (value, rest) = input
            .split_first()
            .ok_or(RaffleError::InvalidInstructionData)?;
        Ok((*value, rest))
    }

    fn unpack_u32(input: &[u8]) -> Result<(u32, &[u8]), ProgramError> {
        let value = input
            .get(..4)
            .and_then(|slice| slice.try_into().ok())
            .map(u32::from_le_bytes)
            .ok_or(RaffleError::InvalidInstructionData)?;
        Ok((value, &input[4..]))
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        let value = input
            .get(..8)
            .and_then(|slice| slice.try_into().ok())
            .map(u64::from_le_bytes)
            .ok_or(RaffleError::InvalidInstructionData)?;
        Ok((value, &input[8..]))
    }

    fn unpack_i64(input: &[u8]) -> Result<(i64, &[u8]), ProgramError> {
        let value = input
            .get(..8)
            .and_then(|slice| slice.try_into().ok())
            .map(i64::from_le_bytes)
            .ok_or(RaffleError::InvalidInstructionData)?;
        Ok((value, &input[8..]))
    }

    fn unpack_u128(input: &[u8]) -> Result<(u128, &[u8]), ProgramError> {
        let value = input
            .get(..16)
            .and_then(|slice| slice.try_into().ok())
            .map(u128::from_le_bytes)
            .ok_or(RaffleError::InvalidInstructionData)?;
        Ok((value, &input[16..]))
    }
}

/// Create initialize_price_oracle instruction
pub fn initialize_price_oracle(
    program_id: &Pubkey,
    admin: &Pubkey,
    oracle_account: &Pubkey,
    native_aggregator: &Pubkey,
    max_staleness: i64,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::InitializePriceOracle { max_staleness }.pack();

    let accounts = vec![
        AccountMeta::new_readonly(*admin, true),
        AccountMeta::new(*oracle_account, false),
        AccountMeta::new_readonly(*native_aggregator, false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create register_price_feed instruction
pub fn register_price_feed(
    program_id: &Pubkey,
    admin: &Pubkey,
    oracle_account: &Pubkey,
    mint: &Pubkey,
    aggregator: &Pubkey,
    quote: FeedQuote,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::RegisterPriceFeed { quote }.pack();
    let (feed_record, _) = find_feed_record_address(program_id, oracle_account, mint);

    let accounts = vec![
        AccountMeta::new(*admin, true),
        AccountMeta::new_readonly(*oracle_account, false),
        AccountMeta::new(feed_record, false),
        AccountMeta::new_readonly(*mint, false),
        AccountMeta::new_readonly(*aggregator, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create initialize_raffle instruction
#[allow(clippy::too_many_arguments)]
pub fn initialize_raffle(
    program_id: &Pubkey,
    admin: &Pubkey,
    raffle_account: &Pubkey,
    oracle_account: &Pubkey,
    vrf_account: &Pubkey,
    fee_recipient: &Pubkey,
    max_players: u32,
    max_tokens: u32,
    ticket_fee: u64,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::InitializeRaffle {
        max_players,
        max_tokens,
        ticket_fee,
    }
    .pack();

    let accounts = vec![
        AccountMeta::new_readonly(*admin, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new_readonly(*oracle_account, false),
        AccountMeta::new_readonly(*vrf_account, false),
        AccountMeta::new_readonly(*fee_recipient, false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create deposit instruction
#[allow(clippy::too_many_arguments)]
pub fn deposit(
    program_id: &Pubkey,
    player: &Pubkey,
    raffle_account: &Pubkey,
    oracle_account: &Pubkey,
    mint: &Pubkey,
    aggregator: &Pubkey,
    player_token_account: &Pubkey,
    native_aggregator: Option<&Pubkey>,
    amount: u64,
    fee: u64,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::Deposit { amount, fee }.pack();
    let (feed_record, _) = find_feed_record_address(program_id, oracle_account, mint);
    let (vault_authority, _) = find_vault_authority(program_id, raffle_account);
    let (player_record, _) = find_player_address(program_id, raffle_account, player);

    let mut accounts = vec![
        AccountMeta::new(*player, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new(player_record, false),
        AccountMeta::new_readonly(*oracle_account, false),
        AccountMeta::new_readonly(feed_record, false),
        AccountMeta::new_readonly(*aggregator, false),
        AccountMeta::new_readonly(*mint, false),
        AccountMeta::new(*player_token_account, false),
        AccountMeta::new(vault_token_address(program_id, raffle_account, mint), false),
        AccountMeta::new_readonly(vault_authority, false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(spl_associated_token_account::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    if let Some(native_aggregator) = native_aggregator {
        accounts.push(AccountMeta::new_readonly(*native_aggregator, false));
    }

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Switchboard accounts a VRF request needs
#[derive(Clone, Debug)]
pub struct VrfRequestKeys {
    pub vrf: Pubkey,
    pub oracle_queue: Pubkey,
    pub queue_authority: Pubkey,
    pub data_buffer: Pubkey,
    pub permission: Pubkey,
    pub escrow: Pubkey,
    /// Payer's wrapped SOL token account
    pub payer_wallet: Pubkey,
    pub program_state: Pubkey,
    pub switchboard_program: Pubkey,
}

fn draw_accounts(
    program_id: &Pubkey,
    admin: &Pubkey,
    raffle_account: &Pubkey,
    keys: &VrfRequestKeys,
) -> Vec<AccountMeta> {
    let (vault_authority, _) = find_vault_authority(program_id, raffle_account);
    vec![
        AccountMeta::new(*admin, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new_readonly(vault_authority, false),
        AccountMeta::new(keys.vrf, false),
        AccountMeta::new(keys.oracle_queue, false),
        AccountMeta::new_readonly(keys.queue_authority, false),
        AccountMeta::new_readonly(keys.data_buffer, false),
        AccountMeta::new(keys.permission, false),
        AccountMeta::new(keys.escrow, false),
        AccountMeta::new(keys.payer_wallet, false),
        AccountMeta::new_readonly(recent_blockhashes::id(), false),
        AccountMeta::new_readonly(keys.program_state, false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(keys.switchboard_program, false),
    ]
}

/// Create request_draw instruction
pub fn request_draw(
    program_id: &Pubkey,
    admin: &Pubkey,
    raffle_account: &Pubkey,
    keys: &VrfRequestKeys,
    state_bump: u8,
    permission_bump: u8,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::RequestDraw {
        state_bump,
        permission_bump,
    }
    .pack();

    Ok(Instruction {
        program_id: *program_id,
        accounts: draw_accounts(program_id, admin, raffle_account, keys),
        data,
    })
}

/// Create retry_draw instruction
pub fn retry_draw(
    program_id: &Pubkey,
    admin: &Pubkey,
    raffle_account: &Pubkey,
    keys: &VrfRequestKeys,
    state_bump: u8,
    permission_bump: u8,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::RetryDraw {
        state_bump,
        permission_bump,
    }
    .pack();

    Ok(Instruction {
        program_id: *program_id,
        accounts: draw_accounts(program_id, admin, raffle_account, keys),
        data,
    })
}

/// Create fulfill_randomness instruction
///
/// `payouts` lists, for each pooled mint in registration order, the mint and
/// the winner's token account for it.
pub fn fulfill_randomness(
    program_id: &Pubkey,
    raffle_account: &Pubkey,
    vrf_account: &Pubkey,
    fee_recipient: &Pubkey,
    payouts: &[(Pubkey, Pubkey)],
    request_id: u128,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::FulfillRandomness { request_id }.pack();
    let (vault_authority, _) = find_vault_authority(program_id, raffle_account);

    let mut accounts = vec![
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new_readonly(*vrf_account, false),
        AccountMeta::new_readonly(vault_authority, false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new(*fee_recipient, false),
    ];
    for (mint, winner_token_account) in payouts {
        accounts.push(AccountMeta::new(
            vault_token_address(program_id, raffle_account, mint),
            false,
        ));
        accounts.push(AccountMeta::new(*winner_token_account, false));
    }

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create close_player instruction
pub fn close_player(
    program_id: &Pubkey,
    player: &Pubkey,
    raffle_account: &Pubkey,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::ClosePlayer.pack();
    let (player_record, _) = find_player_address(program_id, raffle_account, player);

    let accounts = vec![
        AccountMeta::new(*player, true),
        AccountMeta::new_readonly(*raffle_account, false),
        AccountMeta::new(player_record, false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}
