// Ticket sales for the current round
use solana_program::{clock::UnixTimestamp, msg, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    error::RaffleError,
    price::{ticket_price_in_native, PriceFeed},
    state::{Config, RaffleState, RoundStatus},
};

/// Receipt of an accepted purchase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Purchase {
    pub round_id: u64,
    pub ticket_count: u64,
    pub price_per_ticket: u64,
    pub paid: u64,
}

impl RaffleState {
    /// Buys `ticket_count` tickets for `buyer` with an attached `payment`.
    ///
    /// The price is read from the feeds at call time and locked in for this
    /// purchase. The payment must equal `ticket_count * price` exactly,
    /// otherwise the whole purchase is rejected and nothing changes.
    pub fn buy_tickets(
        &mut self,
        config: &Config,
        native_usd: &dyn PriceFeed,
        fiat_usd: &dyn PriceFeed,
        now: UnixTimestamp,
        buyer: Pubkey,
        ticket_count: u64,
        payment: u64,
    ) -> Result<Purchase, ProgramError> {
        if self.round.status != RoundStatus::Open {
            msg!("Round {} is not open for sales", self.round.id);
            return Err(RaffleError::RoundNotOpen.into());
        }
        let price_per_ticket = ticket_price_in_native(config, native_usd, fiat_usd, now)?;
        msg!(
            "Ticket price: {} lamports, {} tickets, payment {}",
            price_per_ticket,
            ticket_count,
            payment
        );

        self.round
            .record_purchase(buyer, ticket_count, payment, price_per_ticket)?;

        Ok(Purchase {
            round_id: self.round.id,
            ticket_count,
            price_per_ticket,
            paid: payment,
        })
    }
}
