// Chance Raffle: multi-token raffle weighted by deposited value

// Raffle engine
pub mod chance;
pub mod collaborator;
pub mod draw;
pub mod normalizer;
pub mod payout;
pub mod raffle_state;

// Program surface
pub mod raffle_entrypoint;
pub mod raffle_error;
pub mod raffle_instruction;
pub mod raffle_processor;

// Oracle, randomness and custody adapters
pub mod oracle_state;
pub mod price_feed;
pub mod utils;
pub mod vault;
pub mod vrf;

#[cfg(test)]
mod test_doubles;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

/// Instruction processor, exposed for program tests and CPI callers
pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    raffle_processor::Processor::process(program_id, accounts, instruction_data)
}
