// Chance ledger: cumulative-weight index used for weighted winner selection.
use std::io;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::raffle_error::RaffleError;

/// Accumulated chance of one player
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChanceEntry {
    pub player: Pubkey,
    pub chance: u128,
}

impl ChanceEntry {
    pub const LEN: usize = 32 + 16;
}

/// Players in first-deposit order with their accumulated chance.
///
/// Selection walks the entries in insertion order, so the winner for a given
/// random value depends only on the deposit history.
#[derive(BorshSerialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ChanceLedger {
    entries: Vec<ChanceEntry>,
    total_chance: u128,
}

// One allocation sized to the stored entry count; the on-chain heap never frees.
impl BorshDeserialize for ChanceLedger {
    fn deserialize(buf: &mut &[u8]) -> io::Result<Self> {
        let len = u32::deserialize(buf)? as usize;
        let needed = len
            .checked_mul(ChanceEntry::LEN)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "chance ledger too long"))?;
        if buf.len() < needed {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "chance ledger truncated",
            ));
        }

        let mut entries = Vec::with_capacity(len);
        for _ in 0..len {
            entries.push(ChanceEntry::deserialize(buf)?);
        }
        let total_chance = u128::deserialize(buf)?;
        Ok(Self {
            entries,
            total_chance,
        })
    }
}

impl ChanceLedger {
    /// Serialized size for a ledger holding `max_players` entries
    pub fn space(max_players: u32) -> usize {
        4 + max_players as usize * ChanceEntry::LEN + 16
    }

    pub fn total_chance(&self) -> u128 {
        self.total_chance
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ChanceEntry] {
        &self.entries
    }

    pub fn chance_of(&self, player: &Pubkey) -> Option<u128> {
        self.entries
            .iter()
            .find(|entry| entry.player == *player)
            .map(|entry| entry.chance)
    }

    /// Fails with `MathOverflow` if adding `amount` would overflow the total.
    pub fn check_add(&self, amount: u128) -> Result<(), RaffleError> {
        self.total_chance
            .checked_add(amount)
            .map(|_| ())
            .ok_or(RaffleError::MathOverflow)
    }

    /// Adds `amount` to the player's chance, appending the player on first sight.
    pub fn add_chance(&mut self, player: &Pubkey, amount: u128) -> Result<(), RaffleError> {
        let total_chance = self
            .total_chance
            .checked_add(amount)
            .ok_or(RaffleError::MathOverflow)?;

        match self.entries.iter_mut().find(|entry| entry.player == *player) {
            // a player's chance never exceeds the total, so this cannot overflow
            Some(entry) => entry.chance += amount,
            None => self.entries.push(ChanceEntry {
                player: *player,
                chance: amount,
            }),
        }
        self.total_chance = total_chance;
        Ok(())
    }

    /// Maps `random_value mod total_chance` onto the cumulative intervals and
    /// returns the first player whose cumulative chance strictly exceeds it.
    pub fn pick_winner(&self, random_value: u128) -> Result<Pubkey, RaffleError> {
        if self.total_chance == 0 {
            return Err(RaffleError::EmptyPool);
        }
        let target = random_value % self.total_chance;

        let mut cumulative: u128 = 0;
        for entry in &self.entries {
            cumulative += entry.chance;
            if cumulative > target {
                return Ok(entry.player);
            }
        }
        // cumulative ends at total_chance > target
        Err(RaffleError::EmptyPool)
    }
}
