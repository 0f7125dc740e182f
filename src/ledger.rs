// Per-round bookkeeping: ticket ranges, pot and round lifecycle
use solana_program::{clock::UnixTimestamp, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    error::RaffleError,
    state::{DrawStatus, Round, RoundStatus, TicketRange, MAX_TICKET_RANGES},
};

impl Round {
    /// Opens an empty round
    pub fn open(id: u64, start_time: UnixTimestamp) -> Self {
        Self {
            id,
            start_time,
            status: RoundStatus::Open,
            draw: DrawStatus::None,
            pot: 0,
            total_tickets: 0,
            tickets: Vec::new(),
            random_request_id: None,
            winner: None,
        }
    }

    /// Whether the round interval has elapsed at `now`
    pub fn has_elapsed(&self, now: UnixTimestamp, interval: i64) -> bool {
        now.saturating_sub(self.start_time) >= interval
    }

    /// Records a purchase of `ticket_count` tickets paid with `paid_amount`
    /// at `price_per_ticket`. The payment must match exactly.
    pub fn record_purchase(
        &mut self,
        participant: Pubkey,
        ticket_count: u64,
        paid_amount: u64,
        price_per_ticket: u64,
    ) -> Result<(), ProgramError> {
        if self.status != RoundStatus::Open {
            return Err(RaffleError::RoundNotOpen.into());
        }
        if ticket_count == 0 {
            return Err(RaffleError::InvalidTicketCount.into());
        }
        let expected = ticket_count
            .checked_mul(price_per_ticket)
            .ok_or(RaffleError::ArithmeticOverflow)?;
        if paid_amount != expected {
            return Err(RaffleError::IncorrectPayment.into());
        }

        let start = self.total_tickets;
        let end = start
            .checked_add(ticket_count)
            .ok_or(RaffleError::ArithmeticOverflow)?;
        let pot = self
            .pot
            .checked_add(paid_amount)
            .ok_or(RaffleError::ArithmeticOverflow)?;

        // Back-to-back purchases by the same participant stay one range
        let extends_last = self
            .tickets
            .last()
            .map_or(false, |last| last.participant == participant);
        if extends_last {
            if let Some(last) = self.tickets.last_mut() {
                last.end = end;
            }
        } else {
            if self.tickets.len() >= MAX_TICKET_RANGES {
                return Err(RaffleError::RoundFull.into());
            }
            self.tickets.push(TicketRange {
                participant,
                start,
                end,
            });
        }

        self.total_tickets = end;
        self.pot = pot;
        Ok(())
    }

    /// Sum of the participant's ranges in this round
    pub fn ticket_count_of(&self, participant: &Pubkey) -> u64 {
        self.tickets
            .iter()
            .filter(|range| range.participant == *participant)
            .map(TicketRange::len)
            .sum()
    }

    /// Owner of the ticket at `index`, found by binary search over the ranges
    pub fn owner_of(&self, index: u64) -> Option<Pubkey> {
        let position = self.tickets.partition_point(|range| range.end <= index);
        self.tickets
            .get(position)
            .filter(|range| range.contains(index))
            .map(|range| range.participant)
    }

    /// The round that supersedes this one
    pub fn next(&self, now: UnixTimestamp) -> Result<Round, ProgramError> {
        let id = self.id.checked_add(1).ok_or(RaffleError::ArithmeticOverflow)?;
        Ok(Round::open(id, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purchases_occupy_contiguous_ranges() {
        let alice = Pubkey::new_unique();
        let bob = Pubkey::new_unique();
        let mut round = Round::open(0, 100);

        round.record_purchase(alice, 2, 20, 10).unwrap();
        round.record_purchase(bob, 1, 10, 10).unwrap();
        round.record_purchase(alice, 3, 36, 12).unwrap();

        assert_eq!(round.total_tickets, 6);
        assert_eq!(round.pot, 66);
        assert_eq!(
            round.tickets,
            vec![
                TicketRange { participant: alice, start: 0, end: 2 },
                TicketRange { participant: bob, start: 2, end: 3 },
                TicketRange { participant: alice, start: 3, end: 6 },
            ]
        );
        let sum: u64 = round.tickets.iter().map(TicketRange::len).sum();
        assert_eq!(sum, round.total_tickets);
        assert_eq!(round.ticket_count_of(&alice), 5);
        assert_eq!(round.ticket_count_of(&bob), 1);
        assert_eq!(round.ticket_count_of(&Pubkey::new_unique()), 0);
    }

    #[test]
    fn consecutive_purchases_extend_the_last_range() {
        let alice = Pubkey::new_unique();
        let mut round = Round::open(0, 0);
        round.record_purchase(alice, 1, 5, 5).unwrap();
        round.record_purchase(alice, 2, 10, 5).unwrap();
        assert_eq!(round.tickets.len(), 1);
        assert_eq!(round.tickets[0].end, 3);
    }

    #[test]
    fn payment_must_match_exactly() {
        let mut round = Round::open(0, 0);
        let buyer = Pubkey::new_unique();
        for paid in [29, 31, 0] {
            assert_eq!(
                round.record_purchase(buyer, 3, paid, 10).unwrap_err(),
                RaffleError::IncorrectPayment.into()
            );
        }
        assert_eq!(round, Round::open(0, 0));
    }

    #[test]
    fn zero_tickets_rejected() {
        let mut round = Round::open(0, 0);
        assert_eq!(
            round.record_purchase(Pubkey::new_unique(), 0, 0, 10).unwrap_err(),
            RaffleError::InvalidTicketCount.into()
        );
    }

    #[test]
    fn only_open_rounds_sell() {
        let mut round = Round::open(0, 0);
        round.status = RoundStatus::AwaitingRandomness;
        assert_eq!(
            round.record_purchase(Pubkey::new_unique(), 1, 10, 10).unwrap_err(),
            RaffleError::RoundNotOpen.into()
        );
    }

    #[test]
    fn capacity_is_bounded() {
        let mut round = Round::open(0, 0);
        for _ in 0..MAX_TICKET_RANGES {
            round.record_purchase(Pubkey::new_unique(), 1, 1, 1).unwrap();
        }
        assert_eq!(
            round.record_purchase(Pubkey::new_unique(), 1, 1, 1).unwrap_err(),
            RaffleError::RoundFull.into()
        );
        // the last buyer can still top up their own range
        let last = round.tickets.last().unwrap().participant;
        round.record_purchase(last, 1, 1, 1).unwrap();
    }

    #[test]
    fn owner_lookup_walks_ranges() {
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        let c = Pubkey::new_unique();
        let mut round = Round::open(0, 0);
        round.record_purchase(a, 2, 2, 1).unwrap();
        round.record_purchase(b, 1, 1, 1).unwrap();
        round.record_purchase(c, 4, 4, 1).unwrap();

        let owners: Vec<_> = (0..7).map(|i| round.owner_of(i).unwrap()).collect();
        assert_eq!(owners, vec![a, a, b, c, c, c, c]);
        assert_eq!(round.owner_of(7), None);
    }

    #[test]
    fn next_round_starts_empty() {
        let mut round = Round::open(4, 0);
        round.record_purchase(Pubkey::new_unique(), 2, 2, 1).unwrap();
        let next = round.next(900).unwrap();
        assert_eq!(next, Round::open(5, 900));
    }

    #[test]
    fn elapsed_is_inclusive() {
        let round = Round::open(0, 1_000);
        assert!(!round.has_elapsed(1_059, 60));
        assert!(round.has_elapsed(1_060, 60));
    }
}
