// Randomness gate: one request and one fulfillment per round
use solana_program::{clock::UnixTimestamp, msg, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    coordinator::{random_value_from_word, RandomWordsRequest, RandomnessCoordinator},
    error::RaffleError,
    settlement::{FundsTransfer, SettlementReceipt},
    state::{Config, DrawStatus, RaffleState, RoundStatus},
};

/// Words asked from the coordinator per round
pub const NUM_WORDS: u32 = 1;

impl RaffleState {
    /// Closes ticket sales and asks the coordinator for a random value.
    ///
    /// Only allowed once per round, after the round interval elapsed and
    /// with at least one ticket sold. Returns the coordinator's request id.
    pub fn request_randomness(
        &mut self,
        config: &Config,
        now: UnixTimestamp,
        coordinator: &mut dyn RandomnessCoordinator,
    ) -> Result<u64, ProgramError> {
        if self.round.draw != DrawStatus::None {
            msg!("Round {} already has a randomness request", self.round.id);
            return Err(RaffleError::AlreadyRequested.into());
        }
        if !self.round.has_elapsed(now, config.round_interval) {
            msg!(
                "Round {} closes at {}, now is {}",
                self.round.id,
                self.round.start_time.saturating_add(config.round_interval),
                now
            );
            return Err(RaffleError::TooEarly.into());
        }
        if self.round.total_tickets == 0 {
            msg!("Round {} has no tickets, staying open", self.round.id);
            return Err(RaffleError::NoParticipants.into());
        }

        let request_id = coordinator.request_random_words(&RandomWordsRequest {
            key_hash: config.key_hash,
            subscription_id: config.subscription_id,
            callback_gas_limit: config.callback_gas_limit,
            num_words: NUM_WORDS,
        })?;

        self.round.draw = DrawStatus::Requested;
        self.round.status = RoundStatus::AwaitingRandomness;
        self.round.random_request_id = Some(request_id);
        Ok(request_id)
    }

    /// Consumes the coordinator's answer and settles the round.
    ///
    /// `caller` must be the coordinator authority. The request must be the
    /// round's outstanding one. A repeated delivery of one of the last
    /// `FULFILLED_HISTORY` settled requests fails with `AlreadyFulfilled`.
    /// Older ids are reported as `UnknownRequest`. Neither settles again.
    /// Settlement is applied to a scratch copy and committed only when every
    /// transfer succeeded.
    pub fn fulfill_randomness(
        &mut self,
        config: &Config,
        caller: &Pubkey,
        request_id: u64,
        random_words: &[[u8; 32]],
        now: UnixTimestamp,
        transfers: &mut dyn FundsTransfer,
    ) -> Result<SettlementReceipt, ProgramError> {
        if *caller != config.coordinator_authority {
            msg!("{} is not the coordinator authority", caller);
            return Err(RaffleError::UnauthorizedCaller.into());
        }

        match (self.round.draw, self.round.random_request_id) {
            (DrawStatus::Requested, Some(outstanding)) if outstanding == request_id => {}
            _ if self.was_fulfilled(request_id) => {
                msg!("Request {} was already fulfilled", request_id);
                return Err(RaffleError::AlreadyFulfilled.into());
            }
            _ => {
                msg!("Request {} is not outstanding for round {}", request_id, self.round.id);
                return Err(RaffleError::UnknownRequest.into());
            }
        }

        let word = random_words.first().ok_or(ProgramError::InvalidInstructionData)?;
        let random_value = random_value_from_word(word);

        let mut next = self.clone();
        next.round.draw = DrawStatus::Fulfilled;
        next.remember_fulfilled(request_id);
        let receipt = next.settle(config, random_value, now, transfers)?;
        *self = next;
        Ok(receipt)
    }
}
