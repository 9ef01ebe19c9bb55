// Payout settlement: pooled tokens to the winner, ticket fees to the fee recipient.
use solana_program::{msg, pubkey::Pubkey};

use crate::collaborator::TokenVault;
use crate::raffle_error::RaffleError;
use crate::raffle_state::{Raffle, RaffleStatus};

/// What a resolved raffle paid out
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub winner: Pubkey,
    /// Pooled amount released per mint, in token registration order
    pub tokens: Vec<(Pubkey, u64)>,
    pub fee: u64,
}

impl Raffle {
    /// Pays every pooled token balance to `winner` and the collected fees to
    /// the fee recipient. Runs once, after the raffle is marked resolved.
    ///
    /// Pooled amounts are zeroed before any transfer is made and put back if
    /// one fails.
    pub(crate) fn settle<V>(&mut self, winner: &Pubkey, vault: &mut V) -> Result<Settlement, RaffleError>
    where
        V: TokenVault + ?Sized,
    {
        if self.status != RaffleStatus::Resolved {
            msg!("Raffle is {:?}, nothing to settle", self.status);
            return Err(RaffleError::RaffleNotResolved);
        }
        if self.payout_attempted {
            msg!("Payout already attempted");
            return Err(RaffleError::PayoutAlreadyAttempted);
        }
        self.payout_attempted = true;

        let mut tokens = Vec::with_capacity(self.tokens.len());
        for token in self.tokens.iter_mut().filter(|token| token.pooled > 0) {
            tokens.push((token.mint, token.pooled));
            token.pooled = 0;
        }
        let fee = self.collected_fee;

        if let Err(err) = self.release(winner, &tokens, fee, vault) {
            for (mint, amount) in &tokens {
                if let Some(token) = self.tokens.iter_mut().find(|token| token.mint == *mint) {
                    token.pooled = *amount;
                }
            }
            self.payout_attempted = false;
            return Err(err);
        }

        Ok(Settlement {
            winner: *winner,
            tokens,
            fee,
        })
    }

    fn release<V>(
        &self,
        winner: &Pubkey,
        tokens: &[(Pubkey, u64)],
        fee: u64,
        vault: &mut V,
    ) -> Result<(), RaffleError>
    where
        V: TokenVault + ?Sized,
    {
        for (mint, amount) in tokens {
            msg!("Paying {} of {} to winner {}", amount, mint, winner);
            vault.pay_out(winner, mint, *amount)?;
        }
        if fee > 0 {
            msg!("Paying {} lamports of fees to {}", fee, self.config.fee_recipient);
            vault.pay_fee(&self.config.fee_recipient, fee)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::Price;
    use crate::raffle_state::{Player, RaffleConfig};
    use crate::test_doubles::{FixedPrices, LedgerVault, SequentialRandomness};

    const TICKET_FEE: u64 = 5_000;

    #[test]
    fn winner_takes_every_pooled_token_and_fees_go_to_recipient() {
        let admin = Pubkey::new_unique();
        let fee_recipient = Pubkey::new_unique();
        let mut raffle = Raffle::new(
            admin,
            RaffleConfig {
                max_players: 10,
                max_tokens: 10,
                ticket_fee: TICKET_FEE,
                price_oracle: Pubkey::new_unique(),
                randomness_oracle: Pubkey::new_unique(),
                fee_recipient,
            },
        )
        .unwrap();

        let alice = Pubkey::new_unique();
        let bob = Pubkey::new_unique();
        let link = Pubkey::new_unique();
        let dai = Pubkey::new_unique();
        let unused = Pubkey::new_unique();
        let prices = FixedPrices::default()
            .with(link, Price::new(25, 8))
            .with(dai, Price::new(1, 0))
            .with(unused, Price::new(1, 0));
        let mut vault = LedgerVault::default()
            .fund(&alice, &link, 1_000)
            .fund(&bob, &link, 500)
            .fund(&bob, &dai, 2_000)
            .fund_lamports(&alice, TICKET_FEE)
            .fund_lamports(&bob, 2 * TICKET_FEE);

        let mut alice_record = Player::new(Pubkey::default(), alice);
        let mut bob_record = Player::new(Pubkey::default(), bob);
        raffle.deposit(&mut alice_record, &link, 8, 1_000, TICKET_FEE, &prices, &mut vault).unwrap();
        raffle.deposit(&mut bob_record, &link, 8, 500, TICKET_FEE, &prices, &mut vault).unwrap();
        raffle.deposit(&mut bob_record, &dai, 0, 2_000, TICKET_FEE, &prices, &mut vault).unwrap();

        let mut randomness = SequentialRandomness::default();
        let request_id = raffle.request_draw(&admin, &mut randomness).unwrap();
        let settlement = raffle.fulfill(request_id, 0, &mut vault).unwrap();

        // alice owns the first interval
        assert_eq!(settlement.winner, alice);
        assert_eq!(settlement.tokens, vec![(link, 1_500), (dai, 2_000)]);
        assert_eq!(settlement.fee, 3 * TICKET_FEE);

        assert_eq!(vault.balance_of(&alice, &link), 1_500);
        assert_eq!(vault.balance_of(&alice, &dai), 2_000);
        assert_eq!(vault.custody_of(&link), 0);
        assert_eq!(vault.custody_of(&dai), 0);
        assert_eq!(vault.lamports_of(&fee_recipient), 3 * TICKET_FEE);
        assert_eq!(vault.fees_held(), 0);

        assert!(raffle.payout_attempted);
        assert!(raffle.tokens.iter().all(|token| token.pooled == 0));
        // player records keep the deposit history
        assert_eq!(bob_record.balance_of(&dai), 2_000);
        // chance history and lifetime fee total survive resolution
        assert_eq!(raffle.collected_fee, 3 * TICKET_FEE);
        assert_eq!(raffle.chance_of(&alice), 2_500_000);
    }

    #[test]
    fn settle_runs_at_most_once() {
        let admin = Pubkey::new_unique();
        let mut raffle = Raffle::new(
            admin,
            RaffleConfig {
                max_players: 1,
                max_tokens: 1,
                ticket_fee: 0,
                price_oracle: Pubkey::new_unique(),
                randomness_oracle: Pubkey::new_unique(),
                fee_recipient: admin,
            },
        )
        .unwrap();
        let player = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let prices = FixedPrices::default().with(mint, Price::new(1, 0));
        let mut vault = LedgerVault::default().fund(&player, &mint, 10);
        let mut record = Player::new(Pubkey::default(), player);
        raffle.deposit(&mut record, &mint, 0, 10, 0, &prices, &mut vault).unwrap();

        assert_eq!(
            raffle.settle(&player, &mut vault).unwrap_err(),
            RaffleError::RaffleNotResolved
        );

        let mut randomness = SequentialRandomness::default();
        let request_id = raffle.request_draw(&admin, &mut randomness).unwrap();
        let settlement = raffle.fulfill(request_id, 7, &mut vault).unwrap();
        assert_eq!(settlement.fee, 0);
        assert_eq!(
            raffle.settle(&player, &mut vault).unwrap_err(),
            RaffleError::PayoutAlreadyAttempted
        );
        assert_eq!(vault.balance_of(&player, &mint), 10);
    }

    #[test]
    fn failed_payout_puts_pooled_amounts_back() {
        let admin = Pubkey::new_unique();
        let mut raffle = Raffle::new(
            admin,
            RaffleConfig {
                max_players: 2,
                max_tokens: 2,
                ticket_fee: TICKET_FEE,
                price_oracle: Pubkey::new_unique(),
                randomness_oracle: Pubkey::new_unique(),
                fee_recipient: admin,
            },
        )
        .unwrap();
        let player = Pubkey::new_unique();
        let first = Pubkey::new_unique();
        let second = Pubkey::new_unique();
        let prices = FixedPrices::default()
            .with(first, Price::new(1, 0))
            .with(second, Price::new(1, 0));
        let mut vault = LedgerVault::default()
            .fund(&player, &first, 4)
            .fund(&player, &second, 6)
            .fund_lamports(&player, 2 * TICKET_FEE);
        let mut record = Player::new(Pubkey::default(), player);
        raffle.deposit(&mut record, &first, 0, 4, TICKET_FEE, &prices, &mut vault).unwrap();
        raffle.deposit(&mut record, &second, 0, 6, TICKET_FEE, &prices, &mut vault).unwrap();

        raffle.status = RaffleStatus::Resolved;
        vault.freeze(&second);
        assert_eq!(
            raffle.settle(&player, &mut vault).unwrap_err(),
            RaffleError::TransferFailed
        );
        assert!(!raffle.payout_attempted);
        assert_eq!(raffle.token(&first).unwrap().pooled, 4);
        assert_eq!(raffle.token(&second).unwrap().pooled, 6);
    }
}
