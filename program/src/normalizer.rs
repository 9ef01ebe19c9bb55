// Price normalization of heterogeneous token amounts into the reference unit.
use solana_program::pubkey::Pubkey;

use crate::collaborator::{Price, PriceSource};
use crate::raffle_error::RaffleError;

/// Decimals of the common reference unit every deposit is valued in.
pub const REFERENCE_DECIMALS: u8 = 18;

impl Price {
    /// Chains a price quoted in the native currency onto the native/reference
    /// price, giving a price in the reference unit.
    pub fn quoted_through(self, native: Price) -> Result<Price, RaffleError> {
        let value = self
            .value
            .checked_mul(native.value)
            .ok_or(RaffleError::MathOverflow)?;
        let decimals = self
            .decimals
            .checked_add(native.decimals)
            .ok_or(RaffleError::MathOverflow)?;
        Ok(Price { value, decimals })
    }
}

/// `amount * price / 10^(token_decimals + price_decimals - REFERENCE_DECIMALS)`,
/// multiplying before dividing and rounding down.
pub fn normalized_value(amount: u64, token_decimals: u8, price: Price) -> Result<u128, RaffleError> {
    if amount == 0 {
        return Err(RaffleError::InvalidAmount);
    }
    if price.value <= 0 {
        return Err(RaffleError::OracleUnavailable);
    }
    let price_value = u128::try_from(price.value).map_err(|_| RaffleError::OracleUnavailable)?;

    let product = u128::from(amount)
        .checked_mul(price_value)
        .ok_or(RaffleError::MathOverflow)?;

    let exponent = i32::from(token_decimals) + i32::from(price.decimals)
        - i32::from(REFERENCE_DECIMALS);

    if exponent >= 0 {
        // 10^39 exceeds u128, and so does any product it could divide.
        Ok(match 10u128.checked_pow(exponent.unsigned_abs()) {
            Some(divisor) => product / divisor,
            None => 0,
        })
    } else {
        let factor = 10u128
            .checked_pow(exponent.unsigned_abs())
            .ok_or(RaffleError::MathOverflow)?;
        product.checked_mul(factor).ok_or(RaffleError::MathOverflow)
    }
}

/// Values `amount` of `mint` in the reference unit using the price feed.
pub fn normalize<P: PriceSource + ?Sized>(
    prices: &P,
    mint: &Pubkey,
    token_decimals: u8,
    amount: u64,
) -> Result<u128, RaffleError> {
    if amount == 0 {
        return Err(RaffleError::InvalidAmount);
    }
    let price = prices.price(mint)?;
    normalized_value(amount, token_decimals, price)
}
