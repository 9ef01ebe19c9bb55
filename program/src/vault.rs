// SPL token and lamport custody for raffle deposits and payouts
use solana_program::{
    account_info::AccountInfo,
    msg,
    program::{invoke, invoke_signed},
    program_pack::Pack,
    pubkey::Pubkey,
    system_instruction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account,
};
use spl_token::state::Account as TokenAccount;

use crate::collaborator::TokenVault;
use crate::raffle_error::RaffleError;
use crate::utils::VAULT_SEED;

/// Token accounts on both sides of a transfer of one mint.
pub struct MintAccounts<'a, 'info> {
    pub mint: Pubkey,
    /// Raffle custody account (ATA of the vault authority)
    pub vault_token: &'a AccountInfo<'info>,
    /// Depositor's source account, or the winner's destination account
    pub counterparty_token: &'a AccountInfo<'info>,
}

/// Accounts only a deposit needs.
pub struct DepositAccounts<'a, 'info> {
    pub depositor: &'a AccountInfo<'info>,
    pub mint: &'a AccountInfo<'info>,
    pub associated_token_program: &'a AccountInfo<'info>,
    pub system_program: &'a AccountInfo<'info>,
}

/// Custody backed by SPL token accounts owned by the raffle's vault authority
/// PDA. Ticket fees are held as lamports on the raffle account itself.
pub struct SplVault<'a, 'info> {
    pub raffle: &'a AccountInfo<'info>,
    pub vault_authority: &'a AccountInfo<'info>,
    pub authority_bump: u8,
    pub token_program: &'a AccountInfo<'info>,
    pub mints: Vec<MintAccounts<'a, 'info>>,
    pub deposit: Option<DepositAccounts<'a, 'info>>,
    pub fee_recipient: Option<&'a AccountInfo<'info>>,
}

impl<'a, 'info> SplVault<'a, 'info> {
    fn accounts_for(&self, mint: &Pubkey) -> Result<&MintAccounts<'a, 'info>, RaffleError> {
        let accounts = self
            .mints
            .iter()
            .find(|accounts| accounts.mint == *mint)
            .ok_or_else(|| {
                msg!("Token accounts for mint {} not supplied", mint);
                RaffleError::InvalidAccount
            })?;
        let expected = get_associated_token_address(self.vault_authority.key, mint);
        if *accounts.vault_token.key != expected {
            msg!("Vault token account must be {}", expected);
            return Err(RaffleError::InvalidAccount);
        }
        Ok(accounts)
    }

    fn create_vault_token_account(
        &self,
        deposit: &DepositAccounts<'a, 'info>,
        vault_token: &AccountInfo<'info>,
    ) -> Result<(), RaffleError> {
        msg!("Creating vault token account for mint {}", deposit.mint.key);
        invoke(
            &create_associated_token_account(
                deposit.depositor.key,
                self.vault_authority.key,
                deposit.mint.key,
                self.token_program.key,
            ),
            &[
                deposit.depositor.clone(),
                vault_token.clone(),
                self.vault_authority.clone(),
                deposit.mint.clone(),
                deposit.system_program.clone(),
                self.token_program.clone(),
                deposit.associated_token_program.clone(),
            ],
        )
        .map_err(|err| {
            msg!("Vault token account creation failed: {:?}", err);
            RaffleError::TransferFailed
        })
    }
}

impl<'a, 'info> TokenVault for SplVault<'a, 'info> {
    fn take_deposit(
        &mut self,
        depositor: &Pubkey,
        mint: &Pubkey,
        amount: u64,
        fee: u64,
    ) -> Result<(), RaffleError> {
        let deposit = self.deposit.as_ref().ok_or(RaffleError::InvalidAccount)?;
        if deposit.depositor.key != depositor || deposit.mint.key != mint {
            return Err(RaffleError::InvalidAccount);
        }
        let accounts = self.accounts_for(mint)?;

        if accounts.vault_token.data_is_empty() {
            self.create_vault_token_account(deposit, accounts.vault_token)?;
        }

        invoke(
            &spl_token::instruction::transfer(
                self.token_program.key,
                accounts.counterparty_token.key,
                accounts.vault_token.key,
                depositor,
                &[],
                amount,
            )
            .map_err(|_| RaffleError::TransferFailed)?,
            &[
                accounts.counterparty_token.clone(),
                accounts.vault_token.clone(),
                deposit.depositor.clone(),
                self.token_program.clone(),
            ],
        )
        .map_err(|err| {
            msg!("Deposit transfer failed: {:?}", err);
            RaffleError::TransferFailed
        })?;

        if fee > 0 {
            invoke(
                &system_instruction::transfer(depositor, self.raffle.key, fee),
                &[
                    deposit.depositor.clone(),
                    self.raffle.clone(),
                    deposit.system_program.clone(),
                ],
            )
            .map_err(|err| {
                msg!("Ticket fee transfer failed: {:?}", err);
                RaffleError::TransferFailed
            })?;
        }
        Ok(())
    }

    fn pay_out(&mut self, recipient: &Pubkey, mint: &Pubkey, amount: u64) -> Result<(), RaffleError> {
        let accounts = self.accounts_for(mint)?;

        let destination = {
            let data = accounts
                .counterparty_token
                .try_borrow_data()
                .map_err(|_| RaffleError::InvalidAccount)?;
            TokenAccount::unpack(&data).map_err(|_| RaffleError::InvalidAccount)?
        };
        if destination.owner != *recipient || destination.mint != *mint {
            msg!(
                "Token account {} is not the winner's {} account",
                accounts.counterparty_token.key,
                mint
            );
            return Err(RaffleError::InvalidAccount);
        }

        invoke_signed(
            &spl_token::instruction::transfer(
                self.token_program.key,
                accounts.vault_token.key,
                accounts.counterparty_token.key,
                self.vault_authority.key,
                &[],
                amount,
            )
            .map_err(|_| RaffleError::TransferFailed)?,
            &[
                accounts.vault_token.clone(),
                accounts.counterparty_token.clone(),
                self.vault_authority.clone(),
                self.token_program.clone(),
            ],
            &[&[VAULT_SEED, self.raffle.key.as_ref(), &[self.authority_bump]]],
        )
        .map_err(|err| {
            msg!("Payout transfer failed: {:?}", err);
            RaffleError::TransferFailed
        })
    }

    fn pay_fee(&mut self, recipient: &Pubkey, amount: u64) -> Result<(), RaffleError> {
        let fee_recipient = self.fee_recipient.ok_or(RaffleError::InvalidAccount)?;
        if fee_recipient.key != recipient {
            msg!("Fee recipient account must be {}", recipient);
            return Err(RaffleError::InvalidAccount);
        }

        let mut raffle_lamports = self
            .raffle
            .try_borrow_mut_lamports()
            .map_err(|_| RaffleError::TransferFailed)?;
        let mut recipient_lamports = fee_recipient
            .try_borrow_mut_lamports()
            .map_err(|_| RaffleError::TransferFailed)?;

        **raffle_lamports = raffle_lamports
            .checked_sub(amount)
            .ok_or(RaffleError::TransferFailed)?;
        **recipient_lamports = recipient_lamports
            .checked_add(amount)
            .ok_or(RaffleError::TransferFailed)?;
        Ok(())
    }
}
