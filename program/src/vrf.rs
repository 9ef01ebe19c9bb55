// Switchboard VRF integration for the raffle draw
use arrayref::array_ref;
use solana_program::{account_info::AccountInfo, msg, pubkey::Pubkey};
use switchboard_v2::{VrfAccountData, VrfRequestRandomness, SWITCHBOARD_PROGRAM_ID};

use crate::collaborator::RandomnessSource;
use crate::raffle_error::RaffleError;

/// Requests randomness from a Switchboard VRF account whose authority is a
/// PDA of this program. The request id is the VRF request counter.
pub struct SwitchboardRandomness<'a, 'info> {
    pub accounts: VrfRequestRandomness<'info>,
    pub switchboard_program: AccountInfo<'info>,
    pub state_bump: u8,
    pub permission_bump: u8,
    /// Seeds of the VRF authority PDA
    pub authority_seeds: &'a [&'a [u8]],
}

impl<'a, 'info> RandomnessSource for SwitchboardRandomness<'a, 'info> {
    fn request(&mut self) -> Result<u128, RaffleError> {
        ensure_switchboard_owned(&self.accounts.vrf)?;

        self.accounts
            .invoke_signed(
                self.switchboard_program.clone(),
                self.state_bump,
                self.permission_bump,
                &[self.authority_seeds],
            )
            .map_err(|err| {
                msg!("VRF randomness request failed: {:?}", err);
                RaffleError::OracleUnavailable
            })?;

        let vrf = VrfAccountData::new(&self.accounts.vrf).map_err(|_| RaffleError::OracleUnavailable)?;
        msg!("VRF randomness request submitted, counter={}", { vrf.counter });
        Ok(vrf.counter)
    }
}

fn ensure_switchboard_owned(vrf_account_info: &AccountInfo) -> Result<(), RaffleError> {
    if vrf_account_info.owner != &SWITCHBOARD_PROGRAM_ID {
        msg!("VRF account not owned by Switchboard program");
        return Err(RaffleError::InvalidAccount);
    }
    Ok(())
}

/// Reads the request counter and the verified random value of a VRF account.
pub fn read_vrf_result(
    vrf_account_info: &AccountInfo,
    expected: &Pubkey,
) -> Result<(u128, u128), RaffleError> {
    if vrf_account_info.key != expected {
        msg!("VRF account does not match the one registered with this raffle");
        return Err(RaffleError::InvalidAccount);
    }
    ensure_switchboard_owned(vrf_account_info)?;

    let vrf = VrfAccountData::new(vrf_account_info).map_err(|_| RaffleError::OracleUnavailable)?;
    let result = vrf.get_result().map_err(|_| {
        msg!("VRF account does not have a valid result");
        RaffleError::OracleUnavailable
    })?;
    if result == [0u8; 32] {
        msg!("VRF result not yet verified");
        return Err(RaffleError::OracleUnavailable);
    }

    Ok((vrf.counter, randomness_from_bytes(&result)))
}

/// First 16 bytes of a VRF result as a little-endian `u128`.
pub fn randomness_from_bytes(vrf_result: &[u8; 32]) -> u128 {
    u128::from_le_bytes(*array_ref![vrf_result, 0, 16])
}
