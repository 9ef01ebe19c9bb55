// Switchboard aggregator adapter for the price-feed collaborator
use solana_program::{account_info::AccountInfo, msg, pubkey::Pubkey};
use switchboard_v2::{AggregatorAccountData, SWITCHBOARD_PROGRAM_ID};

use crate::collaborator::{Price, PriceSource};
use crate::oracle_state::{FeedQuote, PriceFeedRecord, PriceOracle};
use crate::raffle_error::RaffleError;

/// Prices the one mint a feed record was registered for.
pub struct SwitchboardPrices<'a, 'info> {
    oracle: PriceOracle,
    record: PriceFeedRecord,
    aggregator: &'a AccountInfo<'info>,
    native_aggregator: Option<&'a AccountInfo<'info>>,
    now: i64,
}

impl<'a, 'info> SwitchboardPrices<'a, 'info> {
    pub fn new(
        oracle: PriceOracle,
        record: PriceFeedRecord,
        aggregator: &'a AccountInfo<'info>,
        native_aggregator: Option<&'a AccountInfo<'info>>,
        now: i64,
    ) -> Self {
        Self {
            oracle,
            record,
            aggregator,
            native_aggregator,
            now,
        }
    }

    fn read(&self, info: &AccountInfo<'info>, expected: &Pubkey) -> Result<Price, RaffleError> {
        if info.key != expected {
            msg!("Aggregator {} does not match registered {}", info.key, expected);
            return Err(RaffleError::InvalidAccount);
        }
        if info.owner != &SWITCHBOARD_PROGRAM_ID {
            msg!("Aggregator account not owned by Switchboard program");
            return Err(RaffleError::InvalidAccount);
        }

        let data = info.try_borrow_data().map_err(|_| {
            msg!("Could not read aggregator {}", info.key);
            RaffleError::OracleUnavailable
        })?;
        let aggregator = AggregatorAccountData::new_from_bytes(&data).map_err(|_| {
            msg!("Could not read aggregator {}", info.key);
            RaffleError::OracleUnavailable
        })?;
        let updated_at = aggregator.latest_confirmed_round.round_open_timestamp;
        ensure_fresh(updated_at, self.now, self.oracle.max_staleness)?;

        let decimal = aggregator
            .get_result()
            .map_err(|_| RaffleError::OracleUnavailable)?;
        price_from_decimal(decimal.mantissa, decimal.scale)
    }
}

impl<'a, 'info> PriceSource for SwitchboardPrices<'a, 'info> {
    fn price(&self, mint: &Pubkey) -> Result<Price, RaffleError> {
        if !self.record.is_initialized || self.record.mint != *mint {
            msg!("No price feed registered for {}", mint);
            return Err(RaffleError::UnknownToken);
        }

        let price = self.read(self.aggregator, &self.record.aggregator)?;
        match self.record.quote {
            FeedQuote::Usd => Ok(price),
            FeedQuote::Native => {
                let native_info = self.native_aggregator.ok_or_else(|| {
                    msg!("Native price feed account missing");
                    RaffleError::InvalidAccount
                })?;
                let native = self.read(native_info, &self.oracle.native_aggregator)?;
                price.quoted_through(native)
            }
        }
    }
}

/// Rejects answers older than `max_staleness` seconds.
pub fn ensure_fresh(updated_at: i64, now: i64, max_staleness: i64) -> Result<(), RaffleError> {
    let age = now
        .checked_sub(updated_at)
        .ok_or(RaffleError::MathOverflow)?;
    if age > max_staleness {
        msg!("Price answer is {}s old, limit is {}s", age, max_staleness);
        return Err(RaffleError::OracleUnavailable);
    }
    Ok(())
}

/// Converts a Switchboard decimal into a `Price`; non-positive answers are
/// treated as no answer.
pub fn price_from_decimal(mantissa: i128, scale: u32) -> Result<Price, RaffleError> {
    if mantissa <= 0 {
        msg!("Aggregator answered a non-positive price");
        return Err(RaffleError::OracleUnavailable);
    }
    let decimals = u8::try_from(scale).map_err(|_| RaffleError::OracleUnavailable)?;
    Ok(Price::new(mantissa, decimals))
}
