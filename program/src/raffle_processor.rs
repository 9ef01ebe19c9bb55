use crate::oracle_state::{FeedQuote, PriceFeedRecord, PriceOracle};
use crate::price_feed::SwitchboardPrices;
use crate::raffle_error::RaffleError;
use crate::raffle_instruction::RaffleInstruction;
use crate::raffle_state::{Player, Raffle, RaffleConfig, RaffleStatus};
use crate::utils::{
    find_feed_record_address, find_player_address, find_vault_authority, FEED_SEED, PLAYER_SEED,
    VAULT_SEED,
};
use crate::vault::{DepositAccounts, MintAccounts, SplVault};
use crate::vrf::{self, SwitchboardRandomness};

use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::invoke_signed,
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    system_instruction,
    sysvar::{clock::Clock, rent::Rent, Sysvar},
};
use spl_token::state::Mint;
use switchboard_v2::{VrfRequestRandomness, SWITCHBOARD_PROGRAM_ID};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleInstruction::unpack(instruction_data)?;

        match instruction {
            RaffleInstruction::InitializePriceOracle { max_staleness } => {
                msg!("Instruction: Initialize Price Oracle");
                Self::process_initialize_price_oracle(accounts, max_staleness, program_id)
            }
            RaffleInstruction::RegisterPriceFeed { quote } => {
                msg!("Instruction: Register Price Feed");
                Self::process_register_price_feed(accounts, quote, program_id)
            }
            RaffleInstruction::InitializeRaffle {
                max_players,
                max_tokens,
                ticket_fee,
            } => {
                msg!("Instruction: Initialize Raffle");
                Self::process_initialize_raffle(
                    accounts,
                    max_players,
                    max_tokens,
                    ticket_fee,
                    program_id,
                )
            }
            RaffleInstruction::Deposit { amount, fee } => {
                msg!("Instruction: Deposit");
                Self::process_deposit(accounts, amount, fee, program_id)
            }
            RaffleInstruction::RequestDraw {
                state_bump,
                permission_bump,
            } => {
                msg!("Instruction: Request Draw");
                Self::process_draw_request(accounts, state_bump, permission_bump, false, program_id)
            }
            RaffleInstruction::RetryDraw {
                state_bump,
                permission_bump,
            } => {
                msg!("Instruction: Retry Draw");
                Self::process_draw_request(accounts, state_bump, permission_bump, true, program_id)
            }
            RaffleInstruction::FulfillRandomness { request_id } => {
                msg!("Instruction: Fulfill Randomness");
                Self::process_fulfill_randomness(accounts, request_id, program_id)
            }
            RaffleInstruction::ClosePlayer => {
                msg!("Instruction: Close Player");
                Self::process_close_player(accounts, program_id)
            }
        }
    }

    fn process_initialize_price_oracle(
        accounts: &[AccountInfo],
        max_staleness: i64,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let admin_info = next_account_info(account_info_iter)?;
        let oracle_info = next_account_info(account_info_iter)?;
        let native_aggregator_info = next_account_info(account_info_iter)?;

        if !admin_info.is_signer {
            msg!("Admin must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        if oracle_info.owner != program_id {
            msg!("Oracle account must be owned by this program");
            return Err(ProgramError::IncorrectProgramId);
        }
        if !Rent::get()?.is_exempt(oracle_info.lamports(), oracle_info.data_len()) {
            msg!("Oracle account must be rent exempt");
            return Err(ProgramError::AccountNotRentExempt);
        }

        let oracle = PriceOracle::unpack_unchecked(&oracle_info.data.borrow())?;
        if oracle.is_initialized {
            msg!("Oracle account is already initialized");
            return Err(ProgramError::AccountAlreadyInitialized);
        }
        if max_staleness <= 0 {
            msg!("Max staleness must be positive");
            return Err(RaffleError::InvalidConfig.into());
        }

        let oracle = PriceOracle {
            is_initialized: true,
            admin: *admin_info.key,
            native_aggregator: *native_aggregator_info.key,
            max_staleness,
        };
        PriceOracle::pack(oracle, &mut oracle_info.data.borrow_mut())?;

        msg!(
            "Price oracle initialized: Admin={}, NativeFeed={}, MaxStaleness={}s",
            admin_info.key,
            native_aggregator_info.key,
            max_staleness
        );
        Ok(())
    }

    fn process_register_price_feed(
        accounts: &[AccountInfo],
        quote: FeedQuote,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let admin_info = next_account_info(account_info_iter)?;
        let oracle_info = next_account_info(account_info_iter)?;
        let feed_record_info = next_account_info(account_info_iter)?;
        let mint_info = next_account_info(account_info_iter)?;
        let aggregator_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !admin_info.is_signer {
            msg!("Admin must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        if oracle_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }
        let oracle = PriceOracle::unpack(&oracle_info.data.borrow())?;
        if oracle.admin != *admin_info.key {
            msg!("Only the oracle admin can register price feeds");
            return Err(RaffleError::NotRaffleAdmin.into());
        }

        let (expected_record, bump_seed) =
            find_feed_record_address(program_id, oracle_info.key, mint_info.key);
        if *feed_record_info.key != expected_record {
            msg!("Invalid feed record address");
            return Err(RaffleError::InvalidAccount.into());
        }
        if mint_info.owner != &spl_token::id() {
            msg!("Mint must be owned by the token program");
            return Err(RaffleError::InvalidAccount.into());
        }
        if aggregator_info.owner != &SWITCHBOARD_PROGRAM_ID {
            msg!("Aggregator must be owned by the Switchboard program");
            return Err(RaffleError::InvalidAccount.into());
        }

        if feed_record_info.owner != program_id {
            msg!("Creating feed record for mint {}", mint_info.key);
            let rent_lamports = Rent::get()?.minimum_balance(PriceFeedRecord::LEN);
            invoke_signed(
                &system_instruction::create_account(
                    admin_info.key,
                    feed_record_info.key,
                    rent_lamports,
                    PriceFeedRecord::LEN as u64,
                    program_id,
                ),
                &[
                    admin_info.clone(),
                    feed_record_info.clone(),
                    system_program_info.clone(),
                ],
                &[&[
                    FEED_SEED,
                    oracle_info.key.as_ref(),
                    mint_info.key.as_ref(),
                    &[bump_seed],
                ]],
            )?;
        }

        let record = PriceFeedRecord {
            is_initialized: true,
            oracle: *oracle_info.key,
            mint: *mint_info.key,
            aggregator: *aggregator_info.key,
            quote,
        };
        PriceFeedRecord::pack(record, &mut feed_record_info.data.borrow_mut())?;

        msg!(
            "Price feed registered: Mint={}, Aggregator={}, Quote={:?}",
            mint_info.key,
            aggregator_info.key,
            quote
        );
        Ok(())
    }

    fn process_initialize_raffle(
        accounts: &[AccountInfo],
        max_players: u32,
        max_tokens: u32,
        ticket_fee: u64,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let admin_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let oracle_info = next_account_info(account_info_iter)?;
        let vrf_info = next_account_info(account_info_iter)?;
        let fee_recipient_info = next_account_info(account_info_iter)?;

        if !admin_info.is_signer {
            msg!("Admin must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        if raffle_info.owner != program_id {
            msg!("Raffle account must be owned by this program");
            return Err(ProgramError::IncorrectProgramId);
        }
        if !Rent::get()?.is_exempt(raffle_info.lamports(), raffle_info.data_len()) {
            msg!("Raffle account must be rent exempt");
            return Err(ProgramError::AccountNotRentExempt);
        }
        if let Ok(existing) = Raffle::load(&raffle_info.data.borrow()) {
            if existing.is_initialized {
                msg!("Raffle account is already initialized");
                return Err(ProgramError::AccountAlreadyInitialized);
            }
        }

        if oracle_info.owner != program_id
            || PriceOracle::unpack(&oracle_info.data.borrow()).is_err()
        {
            msg!("Price oracle account is not an initialized oracle");
            return Err(RaffleError::InvalidAccount.into());
        }
        if vrf_info.owner != &SWITCHBOARD_PROGRAM_ID {
            msg!("VRF account not owned by Switchboard program");
            return Err(RaffleError::InvalidAccount.into());
        }

        let config = RaffleConfig {
            max_players,
            max_tokens,
            ticket_fee,
            price_oracle: *oracle_info.key,
            randomness_oracle: *vrf_info.key,
            fee_recipient: *fee_recipient_info.key,
        };
        config.validate_account_limits()?;
        let raffle = Raffle::new(*admin_info.key, config)?;

        let required = Raffle::space(max_players, max_tokens);
        if raffle_info.data_len() < required {
            msg!(
                "Raffle account holds {} bytes, {} required",
                raffle_info.data_len(),
                required
            );
            return Err(ProgramError::AccountDataTooSmall);
        }
        raffle.save(&mut raffle_info.data.borrow_mut())?;

        msg!(
            "Raffle initialized: MaxPlayers={}, MaxTokens={}, TicketFee={}",
            max_players,
            max_tokens,
            ticket_fee
        );
        Ok(())
    }

    fn process_deposit(
        accounts: &[AccountInfo],
        amount: u64,
        fee: u64,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let player_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let player_record_info = next_account_info(account_info_iter)?;
        let oracle_info = next_account_info(account_info_iter)?;
        let feed_record_info = next_account_info(account_info_iter)?;
        let aggregator_info = next_account_info(account_info_iter)?;
        let mint_info = next_account_info(account_info_iter)?;
        let player_token_info = next_account_info(account_info_iter)?;
        let vault_token_info = next_account_info(account_info_iter)?;
        let vault_authority_info = next_account_info(account_info_iter)?;
        let token_program_info = next_account_info(account_info_iter)?;
        let associated_token_program_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;
        let native_aggregator_info = next_account_info(account_info_iter).ok();

        if !player_info.is_signer {
            msg!("Player must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        let mut raffle = Self::load_raffle(raffle_info, program_id)?;

        if *oracle_info.key != raffle.config.price_oracle || oracle_info.owner != program_id {
            msg!("Price oracle does not match the raffle's oracle");
            return Err(RaffleError::InvalidAccount.into());
        }
        let oracle = PriceOracle::unpack(&oracle_info.data.borrow())?;

        let (expected_record, _) =
            find_feed_record_address(program_id, oracle_info.key, mint_info.key);
        if *feed_record_info.key != expected_record {
            msg!("Invalid feed record address");
            return Err(RaffleError::InvalidAccount.into());
        }
        // an unregistered mint has no record; pricing rejects it as unknown
        let record = if feed_record_info.owner == program_id {
            PriceFeedRecord::unpack_unchecked(&feed_record_info.data.borrow()).unwrap_or_default()
        } else {
            PriceFeedRecord::default()
        };

        if *token_program_info.key != spl_token::id() {
            return Err(ProgramError::IncorrectProgramId);
        }
        if mint_info.owner != &spl_token::id() {
            msg!("Mint must be owned by the token program");
            return Err(RaffleError::InvalidAccount.into());
        }
        let decimals = Mint::unpack(&mint_info.data.borrow())
            .map_err(|_| RaffleError::InvalidAccount)?
            .decimals;

        let authority_bump = Self::check_vault_authority(vault_authority_info, raffle_info, program_id)?;
        let mut player = Self::load_or_create_player(
            player_info,
            player_record_info,
            raffle_info,
            system_program_info,
            raffle.config.max_tokens,
            program_id,
        )?;

        let now = Clock::get()?.unix_timestamp;
        let prices = SwitchboardPrices::new(
            oracle,
            record,
            aggregator_info,
            native_aggregator_info,
            now,
        );
        let mut vault = SplVault {
            raffle: raffle_info,
            vault_authority: vault_authority_info,
            authority_bump,
            token_program: token_program_info,
            mints: vec![MintAccounts {
                mint: *mint_info.key,
                vault_token: vault_token_info,
                counterparty_token: player_token_info,
            }],
            deposit: Some(DepositAccounts {
                depositor: player_info,
                mint: mint_info,
                associated_token_program: associated_token_program_info,
                system_program: system_program_info,
            }),
            fee_recipient: None,
        };

        raffle.deposit(
            &mut player,
            mint_info.key,
            decimals,
            amount,
            fee,
            &prices,
            &mut vault,
        )?;
        raffle.save(&mut raffle_info.data.borrow_mut())?;
        player.save(&mut player_record_info.data.borrow_mut())?;
        Ok(())
    }

    fn process_draw_request(
        accounts: &[AccountInfo],
        state_bump: u8,
        permission_bump: u8,
        retry: bool,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let admin_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let vault_authority_info = next_account_info(account_info_iter)?;
        let vrf_info = next_account_info(account_info_iter)?;
        let oracle_queue_info = next_account_info(account_info_iter)?;
        let queue_authority_info = next_account_info(account_info_iter)?;
        let data_buffer_info = next_account_info(account_info_iter)?;
        let permission_info = next_account_info(account_info_iter)?;
        let escrow_info = next_account_info(account_info_iter)?;
        let payer_wallet_info = next_account_info(account_info_iter)?;
        let recent_blockhashes_info = next_account_info(account_info_iter)?;
        let program_state_info = next_account_info(account_info_iter)?;
        let token_program_info = next_account_info(account_info_iter)?;
        let switchboard_program_info = next_account_info(account_info_iter)?;

        if !admin_info.is_signer {
            msg!("Admin must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        let mut raffle = Self::load_raffle(raffle_info, program_id)?;

        let authority_bump = Self::check_vault_authority(vault_authority_info, raffle_info, program_id)?;
        if *vrf_info.key != raffle.config.randomness_oracle {
            msg!("VRF account does not match the one registered with this raffle");
            return Err(RaffleError::InvalidAccount.into());
        }
        if *switchboard_program_info.key != SWITCHBOARD_PROGRAM_ID {
            return Err(ProgramError::IncorrectProgramId);
        }

        let bump_seed = [authority_bump];
        let authority_seeds: &[&[u8]] = &[VAULT_SEED, raffle_info.key.as_ref(), &bump_seed];
        let mut randomness = SwitchboardRandomness {
            accounts: VrfRequestRandomness {
                authority: vault_authority_info.clone(),
                vrf: vrf_info.clone(),
                oracle_queue: oracle_queue_info.clone(),
                queue_authority: queue_authority_info.clone(),
                data_buffer: data_buffer_info.clone(),
                permission: permission_info.clone(),
                escrow: escrow_info.clone(),
                payer_wallet: payer_wallet_info.clone(),
                payer_authority: admin_info.clone(),
                recent_blockhashes: recent_blockhashes_info.clone(),
                program_state: program_state_info.clone(),
                token_program: token_program_info.clone(),
            },
            switchboard_program: switchboard_program_info.clone(),
            state_bump,
            permission_bump,
            authority_seeds,
        };

        if retry {
            raffle.retry_draw(admin_info.key, &mut randomness)?;
        } else {
            raffle.request_draw(admin_info.key, &mut randomness)?;
        }
        raffle.save(&mut raffle_info.data.borrow_mut())?;
        Ok(())
    }

    fn process_fulfill_randomness(
        accounts: &[AccountInfo],
        request_id: u128,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;
        let vrf_info = next_account_info(account_info_iter)?;
        let vault_authority_info = next_account_info(account_info_iter)?;
        let token_program_info = next_account_info(account_info_iter)?;
        let fee_recipient_info = next_account_info(account_info_iter)?;

        let mut raffle = Self::load_raffle(raffle_info, program_id)?;
        if raffle.status != RaffleStatus::AwaitingRandomness {
            msg!("Raffle is {:?}, no randomness outstanding", raffle.status);
            return Err(RaffleError::UnknownRequest.into());
        }

        let authority_bump = Self::check_vault_authority(vault_authority_info, raffle_info, program_id)?;
        if *token_program_info.key != spl_token::id() {
            return Err(ProgramError::IncorrectProgramId);
        }
        if *fee_recipient_info.key != raffle.config.fee_recipient {
            msg!("Fee recipient does not match the raffle's fee recipient");
            return Err(RaffleError::InvalidAccount.into());
        }

        let (counter, random_value) =
            vrf::read_vrf_result(vrf_info, &raffle.config.randomness_oracle)?;
        if counter != request_id {
            msg!(
                "VRF result belongs to request {}, not {}",
                counter,
                request_id
            );
            return Err(RaffleError::UnknownRequest.into());
        }

        let mut mints = Vec::with_capacity(raffle.tokens.len());
        for token in raffle.tokens.iter().filter(|token| token.pooled > 0) {
            mints.push(MintAccounts {
                mint: token.mint,
                vault_token: next_account_info(account_info_iter)?,
                counterparty_token: next_account_info(account_info_iter)?,
            });
        }
        let mut vault = SplVault {
            raffle: raffle_info,
            vault_authority: vault_authority_info,
            authority_bump,
            token_program: token_program_info,
            mints,
            deposit: None,
            fee_recipient: Some(fee_recipient_info),
        };

        let settlement = raffle.fulfill(request_id, random_value, &mut vault)?;
        raffle.save(&mut raffle_info.data.borrow_mut())?;

        msg!(
            "Raffle {} completed! Winner: {}, tokens paid: {}, fee paid: {}",
            raffle_info.key,
            settlement.winner,
            settlement.tokens.len(),
            settlement.fee
        );
        Ok(())
    }

    fn process_close_player(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let player_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let player_record_info = next_account_info(account_info_iter)?;

        if !player_info.is_signer {
            msg!("Player must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        let raffle = Self::load_raffle(raffle_info, program_id)?;
        if raffle.status != RaffleStatus::Resolved {
            msg!("Player records stay open until the raffle is resolved");
            return Err(RaffleError::RaffleNotResolved.into());
        }

        let (expected_record, _) = find_player_address(program_id, raffle_info.key, player_info.key);
        if *player_record_info.key != expected_record || player_record_info.owner != program_id {
            msg!("Invalid player record account");
            return Err(RaffleError::InvalidAccount.into());
        }
        let player = Player::load(&player_record_info.data.borrow())?;
        if !player.is_initialized
            || player.raffle != *raffle_info.key
            || player.address != *player_info.key
        {
            msg!("Player record does not match the raffle or player");
            return Err(ProgramError::InvalidAccountData);
        }

        let record_lamports = player_record_info.lamports();
        **player_record_info.lamports.borrow_mut() = 0;
        **player_info.lamports.borrow_mut() = player_info
            .lamports()
            .checked_add(record_lamports)
            .ok_or(RaffleError::MathOverflow)?;
        player_record_info.data.borrow_mut().fill(0);

        msg!(
            "Player record closed: Player={}, Refund={}",
            player_info.key,
            record_lamports
        );
        Ok(())
    }

    /// Loads the depositor's record, creating the PDA on first deposit.
    fn load_or_create_player<'a>(
        player_info: &AccountInfo<'a>,
        player_record_info: &AccountInfo<'a>,
        raffle_info: &AccountInfo<'a>,
        system_program_info: &AccountInfo<'a>,
        max_tokens: u32,
        program_id: &Pubkey,
    ) -> Result<Player, ProgramError> {
        let (expected_record, bump_seed) =
            find_player_address(program_id, raffle_info.key, player_info.key);
        if *player_record_info.key != expected_record {
            msg!("Invalid player record address");
            return Err(RaffleError::InvalidAccount.into());
        }

        if player_record_info.owner == program_id {
            let player = Player::load(&player_record_info.data.borrow())?;
            if !player.is_initialized
                || player.raffle != *raffle_info.key
                || player.address != *player_info.key
            {
                msg!("Player record does not match the raffle or player");
                return Err(ProgramError::InvalidAccountData);
            }
            return Ok(player);
        }

        msg!("Creating player record for {}", player_info.key);
        let space = Player::space(max_tokens);
        let rent_lamports = Rent::get()?.minimum_balance(space);
        invoke_signed(
            &system_instruction::create_account(
                player_info.key,
                player_record_info.key,
                rent_lamports,
                space as u64,
                program_id,
            ),
            &[
                player_info.clone(),
                player_record_info.clone(),
                system_program_info.clone(),
            ],
            &[&[
                PLAYER_SEED,
                raffle_info.key.as_ref(),
                player_info.key.as_ref(),
                &[bump_seed],
            ]],
        )?;
        Ok(Player::new(*raffle_info.key, *player_info.key))
    }

    fn load_raffle(raffle_info: &AccountInfo, program_id: &Pubkey) -> Result<Raffle, ProgramError> {
        if raffle_info.owner != program_id {
            msg!("Raffle account must be owned by this program");
            return Err(ProgramError::IncorrectProgramId);
        }
        let raffle = Raffle::load(&raffle_info.data.borrow())?;
        if !raffle.is_initialized {
            msg!("Raffle account is not initialized");
            return Err(ProgramError::UninitializedAccount);
        }
        Ok(raffle)
    }

    fn check_vault_authority(
        vault_authority_info: &AccountInfo,
        raffle_info: &AccountInfo,
        program_id: &Pubkey,
    ) -> Result<u8, ProgramError> {
        let (expected, bump) = find_vault_authority(program_id, raffle_info.key);
        if *vault_authority_info.key != expected {
            msg!("Invalid vault authority account");
            return Err(RaffleError::InvalidAccount.into());
        }
        Ok(bump)
    }
}
