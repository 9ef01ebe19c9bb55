use solana_program::{
    decode_error::DecodeError, msg, program_error::PrintProgramError, program_error::ProgramError,
};
use thiserror::Error;

/// Errors that may be returned by the Raffle program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RaffleError {
    /// Invalid instruction data passed
    #[error("Invalid instruction data")]
    InvalidInstructionData,

    /// Deposit amount must be positive
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    /// Fee payment does not equal the ticket fee
    #[error("Fee payment must equal the ticket fee")]
    InvalidFee,

    /// Player or token cap reached
    #[error("Raffle capacity exceeded")]
    CapacityExceeded,

    /// Price feed returned a non-positive or stale answer
    #[error("Price oracle unavailable")]
    OracleUnavailable,

    /// Draw requested with no participants or no chance
    #[error("Raffle pool is empty")]
    EmptyPool,

    /// Draw requested while one is outstanding or the raffle is resolved
    #[error("A draw is already in progress")]
    AlreadyDrawing,

    /// Randomness response does not match the outstanding request
    #[error("Unknown randomness request")]
    UnknownRequest,

    /// Token movement was rejected
    #[error("Token transfer failed")]
    TransferFailed,

    /// Only the raffle admin can perform this action
    #[error("Only the raffle admin can perform this action")]
    NotRaffleAdmin,

    /// Deposits are only accepted while the raffle is open
    #[error("Raffle is not open for deposits")]
    RaffleNotOpen,

    /// Retry requested without an outstanding randomness request
    #[error("Raffle is not awaiting randomness")]
    NotAwaitingRandomness,

    /// Mint has no registered price feed
    #[error("Token has no registered price feed")]
    UnknownToken,

    /// Account does not match the expected key, owner or seeds
    #[error("Unexpected account")]
    InvalidAccount,

    /// Checked arithmetic overflowed
    #[error("Arithmetic overflow")]
    MathOverflow,

    /// Raffle or oracle configuration rejected
    #[error("Invalid configuration")]
    InvalidConfig,

    /// Action needs a resolved raffle
    #[error("Raffle has not been resolved")]
    RaffleNotResolved,

    /// Settlement already ran for this raffle
    #[error("Payout was already attempted")]
    PayoutAlreadyAttempted,
}

impl From<RaffleError> for ProgramError {
    fn from(e: RaffleError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for RaffleError {
    fn type_of() -> &'static str {
        "Raffle Error"
    }
}

impl PrintProgramError for RaffleError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}
