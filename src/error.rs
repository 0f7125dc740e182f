use solana_program::{
    decode_error::DecodeError,
    msg,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

/// Errors that may be returned by the rifa program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RaffleError {
    /// A price feed reported a non-positive, unset or too old answer
    #[error("Price feed answer is stale or invalid")]
    StaleOracle,

    /// Attached payment does not match the ticket price exactly
    #[error("Payment does not match the ticket price")]
    IncorrectPayment,

    /// Round is not accepting tickets
    #[error("Round is not open")]
    RoundNotOpen,

    /// Round interval has not elapsed yet
    #[error("Round interval has not elapsed yet")]
    TooEarly,

    /// Randomness was already requested for this round
    #[error("Randomness already requested for this round")]
    AlreadyRequested,

    /// Only the coordinator authority may deliver randomness
    #[error("Caller is not the randomness coordinator")]
    UnauthorizedCaller,

    /// Request id does not match the outstanding request
    #[error("Unknown randomness request")]
    UnknownRequest,

    /// Request was already fulfilled and settled
    #[error("Randomness request already fulfilled")]
    AlreadyFulfilled,

    /// No tickets were sold in this round
    #[error("No tickets were sold in this round")]
    NoParticipants,

    /// Ticket count must be at least one
    #[error("Ticket count must be greater than zero")]
    InvalidTicketCount,

    /// The round has no room for another ticket range
    #[error("Round ticket capacity reached")]
    RoundFull,

    /// Checked arithmetic overflowed
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    /// Raffle parameters failed validation
    #[error("Invalid raffle configuration")]
    InvalidConfig,

    /// Coordinator did not hand back a request id
    #[error("Randomness coordinator returned no request id")]
    CoordinatorNoResponse,

    /// A payout would leave the recipient below its rent-exempt minimum
    #[error("Payout recipient would not be rent exempt")]
    RecipientNotRentExempt,
}

impl From<RaffleError> for ProgramError {
    fn from(e: RaffleError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for RaffleError {
    fn type_of() -> &'static str {
        "Rifa Error"
    }
}

impl PrintProgramError for RaffleError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}
