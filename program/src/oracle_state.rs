use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use solana_program::{
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::Pubkey,
};

/// Unit an aggregator quotes a mint in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedQuote {
    /// Aggregator answers in the reference unit directly
    Usd,
    /// Aggregator answers in the native currency; chained through the
    /// oracle's native/reference aggregator
    Native,
}

impl Default for FeedQuote {
    fn default() -> Self {
        FeedQuote::Usd
    }
}

impl TryFrom<u8> for FeedQuote {
    type Error = ProgramError;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(FeedQuote::Usd),
            1 => Ok(FeedQuote::Native),
            _ => Err(ProgramError::InvalidInstructionData),
        }
    }
}

impl From<FeedQuote> for u8 {
    fn from(quote: FeedQuote) -> Self {
        match quote {
            FeedQuote::Usd => 0,
            FeedQuote::Native => 1,
        }
    }
}

/// Price oracle registry account
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceOracle {
    /// Is the account initialized
    pub is_initialized: bool,
    /// Admin allowed to register feeds
    pub admin: Pubkey,
    /// Aggregator pricing the native currency in the reference unit
    pub native_aggregator: Pubkey,
    /// Oldest acceptable aggregator answer, in seconds
    pub max_staleness: i64,
}

/// Feed registration for one mint (PDA `[b"feed", oracle, mint]`)
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PriceFeedRecord {
    /// Is the account initialized
    pub is_initialized: bool,
    /// Oracle registry this record belongs to
    pub oracle: Pubkey,
    pub mint: Pubkey,
    /// Switchboard aggregator answering for the mint
    pub aggregator: Pubkey,
    pub quote: FeedQuote,
}

impl Sealed for PriceOracle {}
impl Sealed for PriceFeedRecord {}

impl IsInitialized for PriceOracle {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl IsInitialized for PriceFeedRecord {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Pack for PriceOracle {
    const LEN: usize = 1 + 32 + 32 + 8;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, PriceOracle::LEN];
        let (is_initialized, admin, native_aggregator, max_staleness) =
            array_refs![src, 1, 32, 32, 8];

        Ok(PriceOracle {
            is_initialized: is_initialized[0] != 0,
            admin: Pubkey::new_from_array(*admin),
            native_aggregator: Pubkey::new_from_array(*native_aggregator),
            max_staleness: i64::from_le_bytes(*max_staleness),
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, PriceOracle::LEN];
        let (is_initialized_dst, admin_dst, native_aggregator_dst, max_staleness_dst) =
            mut_array_refs![dst, 1, 32, 32, 8];

        is_initialized_dst[0] = self.is_initialized as u8;
        admin_dst.copy_from_slice(self.admin.as_ref());
        native_aggregator_dst.copy_from_slice(self.native_aggregator.as_ref());
        *max_staleness_dst = self.max_staleness.to_le_bytes();
    }
}

impl Pack for PriceFeedRecord {
    const LEN: usize = 1 + 32 + 32 + 32 + 1;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, PriceFeedRecord::LEN];
        let (is_initialized, oracle, mint, aggregator, quote) = array_refs![src, 1, 32, 32, 32, 1];

        let quote =
            FeedQuote::try_from(quote[0]).map_err(|_| ProgramError::InvalidAccountData)?;

        Ok(PriceFeedRecord {
            is_initialized: is_initialized[0] != 0,
            oracle: Pubkey::new_from_array(*oracle),
            mint: Pubkey::new_from_array(*mint),
            aggregator: Pubkey::new_from_array(*aggregator),
            quote,
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, PriceFeedRecord::LEN];
        let (is_initialized_dst, oracle_dst, mint_dst, aggregator_dst, quote_dst) =
            mut_array_refs![dst, 1, 32, 32, 32, 1];

        is_initialized_dst[0] = self.is_initialized as u8;
        oracle_dst.copy_from_slice(self.oracle.as_ref());
        mint_dst.copy_from_slice(self.mint.as_ref());
        aggregator_dst.copy_from_slice(self.aggregator.as_ref());
        quote_dst[0] = self.quote.into();
    }
}
