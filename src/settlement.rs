//! Winner selection and pot payout.
//!
//! The pot is split between the configured beneficiary and the winner. All
//! bookkeeping (pot debited, winner recorded, round advanced) happens before
//! any lamports move, and the caller discards the whole state change if a
//! transfer fails.

use solana_program::{
    clock::UnixTimestamp, entrypoint::ProgramResult, msg, program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::{
    error::RaffleError,
    state::{Config, RaffleState, Round, RoundStatus, SettlementSummary, BPS_DENOMINATOR},
};

/// Moves lamports out of the pot
pub trait FundsTransfer {
    fn transfer(&mut self, recipient: &Pubkey, amount: u64) -> ProgramResult;
}

/// What a settlement paid and to whom
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettlementReceipt {
    pub round_id: u64,
    pub winning_index: u64,
    pub winner: Pubkey,
    pub winner_amount: u64,
    pub beneficiary: Pubkey,
    pub beneficiary_amount: u64,
}

/// Splits `pot` into (beneficiary, winner) shares. The beneficiary share
/// rounds down, the winner receives the remainder.
pub fn split_pot(pot: u64, beneficiary_share_bps: u16) -> Result<(u64, u64), ProgramError> {
    let beneficiary = (pot as u128)
        .checked_mul(beneficiary_share_bps as u128)
        .map(|n| n / BPS_DENOMINATOR as u128)
        .ok_or(RaffleError::ArithmeticOverflow)?;
    let beneficiary = u64::try_from(beneficiary).map_err(|_| RaffleError::ArithmeticOverflow)?;
    let winner = pot
        .checked_sub(beneficiary)
        .ok_or(RaffleError::ArithmeticOverflow)?;
    Ok((beneficiary, winner))
}

impl Round {
    /// Participant owning the ticket picked by `random_value`
    pub fn winner_for(&self, random_value: u64) -> Result<(u64, Pubkey), ProgramError> {
        if self.total_tickets == 0 {
            return Err(RaffleError::NoParticipants.into());
        }
        let winning_index = random_value % self.total_tickets;
        let winner = self
            .owner_of(winning_index)
            .ok_or(ProgramError::InvalidAccountData)?;
        Ok((winning_index, winner))
    }
}

impl RaffleState {
    /// Picks the winner, records the outcome, opens the next round and
    /// then pays the beneficiary and the winner.
    pub fn settle(
        &mut self,
        config: &Config,
        random_value: u64,
        now: UnixTimestamp,
        transfers: &mut dyn FundsTransfer,
    ) -> Result<SettlementReceipt, ProgramError> {
        let (winning_index, winner) = self.round.winner_for(random_value)?;
        let pot = self.round.pot;
        let (beneficiary_amount, winner_amount) = split_pot(pot, config.beneficiary_share_bps)?;
        let request_id = self
            .round
            .random_request_id
            .ok_or(RaffleError::UnknownRequest)?;

        // effects
        self.round.pot = 0;
        self.round.winner = Some(winner);
        self.round.status = RoundStatus::Settled;
        let settled_id = self.round.id;
        self.last_settlement = Some(SettlementSummary {
            round_id: settled_id,
            request_id,
            winner,
            winner_amount,
            beneficiary_amount,
        });
        self.round = self.round.next(now)?;

        // interactions
        if beneficiary_amount > 0 {
            transfers.transfer(&config.beneficiary, beneficiary_amount)?;
        }
        if winner_amount > 0 {
            transfers.transfer(&winner, winner_amount)?;
        }

        msg!(
            "Round {} settled: ticket {} won, winner {} gets {}, beneficiary {} gets {}",
            settled_id,
            winning_index,
            winner,
            winner_amount,
            config.beneficiary,
            beneficiary_amount
        );

        Ok(SettlementReceipt {
            round_id: settled_id,
            winning_index,
            winner,
            winner_amount,
            beneficiary: config.beneficiary,
            beneficiary_amount,
        })
    }
}
