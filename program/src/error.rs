// Pooled Lottery Program - Errors
use solana_program::{
    decode_error::DecodeError,
    msg,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

/// Errors that may be returned by the lottery program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum LotteryError {
    /// Attached value differs from the entry fee
    #[error("Please send exactly 0.1 SOL")]
    InvalidEntryAmount,

    /// Caller is not the ledger manager
    #[error("You are not the manager")]
    NotAuthorized,

    #[error("Cannot pick a winner with less than 3 participants")]
    InsufficientParticipants,

    #[error("Lottery ledger already initialized")]
    LedgerAlreadyInitialized,

    #[error("Lottery ledger not initialized")]
    LedgerNotInitialized,

    #[error("Ledger account is not owned by this program")]
    InvalidLedgerAccount,

    /// The drawn winner's account was not passed to PickWinner
    #[error("Winner account was not supplied")]
    WinnerAccountMissing,

    #[error("Randomness source returned an out-of-range index")]
    RandomIndexOutOfRange,

    /// Stored pool does not equal participant count times the fee
    #[error("Pooled balance does not match participant count")]
    PoolBalanceMismatch,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    #[error("Ledger account cannot cover the payout")]
    InsufficientVaultFunds,

    /// Wrong address, owner or contents for a prize claim account
    #[error("Invalid prize claim account")]
    InvalidPrizeClaim,
}

impl From<LotteryError> for ProgramError {
    fn from(e: LotteryError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for LotteryError {
    fn type_of() -> &'static str {
        "Lottery Error"
    }
}

impl PrintProgramError for LotteryError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}
