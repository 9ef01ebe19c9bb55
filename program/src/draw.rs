// Draw lifecycle: Open -> AwaitingRandomness -> Resolved.
use solana_program::{msg, pubkey::Pubkey};

use crate::collaborator::{RandomnessSource, TokenVault};
use crate::payout::Settlement;
use crate::raffle_error::RaffleError;
use crate::raffle_state::{Raffle, RaffleStatus};

impl Raffle {
    fn ensure_admin(&self, caller: &Pubkey) -> Result<(), RaffleError> {
        if self.admin != *caller {
            msg!("Only the raffle admin can trigger a draw");
            return Err(RaffleError::NotRaffleAdmin);
        }
        Ok(())
    }

    /// Closes deposits and submits a randomness request.
    pub fn request_draw<R>(&mut self, caller: &Pubkey, randomness: &mut R) -> Result<u128, RaffleError>
    where
        R: RandomnessSource + ?Sized,
    {
        self.ensure_admin(caller)?;
        if self.status != RaffleStatus::Open {
            msg!("Raffle is {:?}, cannot start a draw", self.status);
            return Err(RaffleError::AlreadyDrawing);
        }
        if self.ledger.is_empty() || self.ledger.total_chance() == 0 {
            msg!("No chance has been deposited, cannot draw");
            return Err(RaffleError::EmptyPool);
        }

        let request_id = randomness.request()?;
        self.status = RaffleStatus::AwaitingRandomness;
        self.pending_request = Some(request_id);

        msg!("Randomness requested: request_id={}", request_id);
        Ok(request_id)
    }

    /// Replaces an outstanding randomness request that never resolved.
    ///
    /// The raffle stays in `AwaitingRandomness`; a late response to the
    /// replaced request is rejected as unknown.
    pub fn retry_draw<R>(&mut self, caller: &Pubkey, randomness: &mut R) -> Result<u128, RaffleError>
    where
        R: RandomnessSource + ?Sized,
    {
        self.ensure_admin(caller)?;
        if self.status != RaffleStatus::AwaitingRandomness {
            msg!("Raffle is {:?}, nothing to retry", self.status);
            return Err(RaffleError::NotAwaitingRandomness);
        }

        let request_id = randomness.request()?;
        msg!(
            "Randomness re-requested: replaced={:?}, request_id={}",
            self.pending_request,
            request_id
        );
        self.pending_request = Some(request_id);
        Ok(request_id)
    }

    /// Handles the randomness response: picks the winner and settles the pool.
    ///
    /// If settlement fails the raffle is put back to awaiting this request and
    /// the error is returned, so the response can be delivered again.
    pub fn fulfill<V>(
        &mut self,
        request_id: u128,
        random_value: u128,
        vault: &mut V,
    ) -> Result<Settlement, RaffleError>
    where
        V: TokenVault + ?Sized,
    {
        if self.status != RaffleStatus::AwaitingRandomness
            || self.pending_request != Some(request_id)
        {
            msg!(
                "Randomness response {} does not match outstanding request {:?}",
                request_id,
                self.pending_request
            );
            return Err(RaffleError::UnknownRequest);
        }

        let winner = self.ledger.pick_winner(random_value)?;
        self.status = RaffleStatus::Resolved;
        self.pending_request = None;
        self.winner = Some(winner);

        match self.settle(&winner, vault) {
            Ok(settlement) => {
                msg!("Raffle resolved: winner={}", winner);
                Ok(settlement)
            }
            Err(err) => {
                msg!("Settlement failed, raffle left awaiting randomness");
                self.status = RaffleStatus::AwaitingRandomness;
                self.pending_request = Some(request_id);
                self.winner = None;
                Err(err)
            }
        }
    }
}
