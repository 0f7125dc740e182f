use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::UnixTimestamp,
    entrypoint::ProgramResult,
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::Pubkey,
};

use crate::error::RaffleError;

/// Maximum number of ticket ranges a single round can hold
pub const MAX_TICKET_RANGES: usize = 128;

/// Upper bound for the decimal exponents accepted in the configuration
pub const MAX_DECIMALS: u8 = 18;

/// Basis points representing the whole pot
pub const BPS_DENOMINATOR: u16 = 10_000;

/// Number of most recently fulfilled request ids remembered for duplicate detection
pub const FULFILLED_HISTORY: usize = 16;

/// Status of a round
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundStatus {
    /// Round is open for ticket sales
    Open,
    /// Interval elapsed and a random value was requested, sales are frozen
    AwaitingRandomness,
    /// Winner picked and pot paid out
    Settled,
}

/// Progress of the randomness draw for a round
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawStatus {
    None,
    Requested,
    Fulfilled,
}

/// A contiguous block of ticket indices owned by one participant.
/// `start` is inclusive, `end` is exclusive.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TicketRange {
    pub participant: Pubkey,
    pub start: u64,
    pub end: u64,
}

impl TicketRange {
    pub const LEN: usize = 32 + 8 + 8;

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, index: u64) -> bool {
        self.start <= index && index < self.end
    }
}

/// One lottery cycle
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Round {
    /// Sequential round number, starting at 0
    pub id: u64,
    /// When the round opened (Unix timestamp)
    pub start_time: UnixTimestamp,
    pub status: RoundStatus,
    pub draw: DrawStatus,
    /// Lamports collected by ticket sales in this round
    pub pot: u64,
    pub total_tickets: u64,
    /// Ordered, disjoint and contiguous ticket ranges
    pub tickets: Vec<TicketRange>,
    /// Outstanding randomness request, set while awaiting randomness
    pub random_request_id: Option<u64>,
    /// Set once the round is settled
    pub winner: Option<Pubkey>,
}

impl Round {
    pub const LEN: usize =
        8 + 8 + 1 + 1 + 8 + 8 + (4 + MAX_TICKET_RANGES * TicketRange::LEN) + (1 + 8) + (1 + 32);
}

/// Outcome of the most recently settled round
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettlementSummary {
    pub round_id: u64,
    pub request_id: u64,
    pub winner: Pubkey,
    pub winner_amount: u64,
    pub beneficiary_amount: u64,
}

impl SettlementSummary {
    pub const LEN: usize = 8 + 8 + 32 + 8 + 8;
}

/// Raffle state account data
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RaffleState {
    /// Is the account initialized
    pub is_initialized: bool,
    /// The round currently selling tickets or drawing
    pub round: Round,
    pub last_settlement: Option<SettlementSummary>,
    /// Recently settled request ids, oldest first, at most `FULFILLED_HISTORY`
    pub fulfilled_requests: Vec<u64>,
}

impl RaffleState {
    pub const LEN: usize =
        1 + Round::LEN + (1 + SettlementSummary::LEN) + (4 + FULFILLED_HISTORY * 8);

    /// Fresh state with round 0 opened at `now`
    pub fn new(now: UnixTimestamp) -> Self {
        Self {
            is_initialized: true,
            round: Round::open(0, now),
            last_settlement: None,
            fulfilled_requests: Vec::new(),
        }
    }

    /// Reads the state from account data. Trailing bytes after the encoded
    /// state are ignored since the account is sized for a full round.
    pub fn load(src: &[u8]) -> Result<Self, ProgramError> {
        let mut buf = src;
        let state =
            Self::deserialize(&mut buf).map_err(|_| ProgramError::InvalidAccountData)?;
        if !state.is_initialized {
            return Err(ProgramError::UninitializedAccount);
        }
        Ok(state)
    }

    pub fn store(&self, dst: &mut [u8]) -> ProgramResult {
        let mut cursor: &mut [u8] = dst;
        self.serialize(&mut cursor)
            .map_err(|_| ProgramError::AccountDataTooSmall)
    }

    pub fn current_round_id(&self) -> u64 {
        self.round.id
    }

    pub fn pot(&self) -> u64 {
        self.round.pot
    }

    pub fn total_tickets(&self) -> u64 {
        self.round.total_tickets
    }

    pub fn last_winner(&self) -> Option<Pubkey> {
        self.last_settlement.map(|summary| summary.winner)
    }

    /// Whether `request_id` was settled within the remembered history
    pub fn was_fulfilled(&self, request_id: u64) -> bool {
        self.fulfilled_requests.contains(&request_id)
    }

    /// Remembers a settled request, forgetting the oldest one when full
    pub fn remember_fulfilled(&mut self, request_id: u64) {
        if self.fulfilled_requests.len() >= FULFILLED_HISTORY {
            self.fulfilled_requests.remove(0);
        }
        self.fulfilled_requests.push(request_id);
    }

    /// Tickets held by `participant` in the current round
    pub fn my_ticket_count(&self, participant: &Pubkey) -> u64 {
        self.round.ticket_count_of(participant)
    }
}

/// Deployment parameters, validated once and frozen into [`Config`]
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RaffleParams {
    /// Ticket price in fiat minor units (e.g. euro cents)
    pub ticket_price_fiat: u64,
    /// Decimal exponent of the fiat minor unit (2 for cents)
    pub fiat_decimals: u8,
    /// Decimal exponent of the native base unit (9 for lamports)
    pub native_decimals: u8,
    /// Round duration in seconds
    pub round_interval: i64,
    pub beneficiary: Pubkey,
    /// Beneficiary share of the pot in basis points, the winner gets the rest
    pub beneficiary_share_bps: u16,
    pub native_usd_feed: Pubkey,
    pub fiat_usd_feed: Pubkey,
    /// Maximum feed answer age in seconds, zero disables the check
    pub max_feed_age: i64,
    /// Randomness coordinator program
    pub vrf_coordinator: Pubkey,
    pub key_hash: [u8; 32],
    pub subscription_id: u64,
    pub callback_gas_limit: u32,
}

impl RaffleParams {
    pub fn validate(&self) -> Result<(), RaffleError> {
        if self.ticket_price_fiat == 0
            || self.round_interval <= 0
            || self.max_feed_age < 0
            || self.fiat_decimals > MAX_DECIMALS
            || self.native_decimals > MAX_DECIMALS
            || self.beneficiary_share_bps > BPS_DENOMINATOR
            || self.native_usd_feed == self.fiat_usd_feed
        {
            return Err(RaffleError::InvalidConfig);
        }
        Ok(())
    }
}

/// Immutable raffle configuration account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Is the account initialized
    pub is_initialized: bool,
    pub ticket_price_fiat: u64,
    pub fiat_decimals: u8,
    pub native_decimals: u8,
    pub round_interval: i64,
    pub beneficiary: Pubkey,
    pub beneficiary_share_bps: u16,
    pub native_usd_feed: Pubkey,
    pub fiat_usd_feed: Pubkey,
    pub max_feed_age: i64,
    pub vrf_coordinator: Pubkey,
    /// PDA of the coordinator program allowed to sign the callback
    pub coordinator_authority: Pubkey,
    pub key_hash: [u8; 32],
    pub subscription_id: u64,
    pub callback_gas_limit: u32,
    pub config_bump: u8,
    pub state_bump: u8,
}

impl Config {
    pub fn new(
        params: &RaffleParams,
        coordinator_authority: Pubkey,
        config_bump: u8,
        state_bump: u8,
    ) -> Self {
        Self {
            is_initialized: true,
            ticket_price_fiat: params.ticket_price_fiat,
            fiat_decimals: params.fiat_decimals,
            native_decimals: params.native_decimals,
            round_interval: params.round_interval,
            beneficiary: params.beneficiary,
            beneficiary_share_bps: params.beneficiary_share_bps,
            native_usd_feed: params.native_usd_feed,
            fiat_usd_feed: params.fiat_usd_feed,
            max_feed_age: params.max_feed_age,
            vrf_coordinator: params.vrf_coordinator,
            coordinator_authority,
            key_hash: params.key_hash,
            subscription_id: params.subscription_id,
            callback_gas_limit: params.callback_gas_limit,
            config_bump,
            state_bump,
        }
    }
}

impl Sealed for Config {}

impl IsInitialized for Config {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Pack for Config {
    const LEN: usize = 1 + 8 + 1 + 1 + 8 + 32 + 2 + 32 + 32 + 8 + 32 + 32 + 32 + 8 + 4 + 1 + 1;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, Config::LEN];
        let (
            is_initialized,
            ticket_price_fiat,
            fiat_decimals,
            native_decimals,
            round_interval,
            beneficiary,
            beneficiary_share_bps,
            native_usd_feed,
            fiat_usd_feed,
            max_feed_age,
            vrf_coordinator,
            coordinator_authority,
            key_hash,
            subscription_id,
            callback_gas_limit,
            config_bump,
            state_bump,
        ) = array_refs![src, 1, 8, 1, 1, 8, 32, 2, 32, 32, 8, 32, 32, 32, 8, 4, 1, 1];

        Ok(Config {
            is_initialized: is_initialized[0] != 0,
            ticket_price_fiat: u64::from_le_bytes(*ticket_price_fiat),
            fiat_decimals: fiat_decimals[0],
            native_decimals: native_decimals[0],
            round_interval: i64::from_le_bytes(*round_interval),
            beneficiary: Pubkey::new_from_array(*beneficiary),
            beneficiary_share_bps: u16::from_le_bytes(*beneficiary_share_bps),
            native_usd_feed: Pubkey::new_from_array(*native_usd_feed),
            fiat_usd_feed: Pubkey::new_from_array(*fiat_usd_feed),
            max_feed_age: i64::from_le_bytes(*max_feed_age),
            vrf_coordinator: Pubkey::new_from_array(*vrf_coordinator),
            coordinator_authority: Pubkey::new_from_array(*coordinator_authority),
            key_hash: *key_hash,
            subscription_id: u64::from_le_bytes(*subscription_id),
            callback_gas_limit: u32::from_le_bytes(*callback_gas_limit),
            config_bump: config_bump[0],
            state_bump: state_bump[0],
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, Config::LEN];
        let (
            is_initialized_dst,
            ticket_price_fiat_dst,
            fiat_decimals_dst,
            native_decimals_dst,
            round_interval_dst,
            beneficiary_dst,
            beneficiary_share_bps_dst,
            native_usd_feed_dst,
            fiat_usd_feed_dst,
            max_feed_age_dst,
            vrf_coordinator_dst,
            coordinator_authority_dst,
            key_hash_dst,
            subscription_id_dst,
            callback_gas_limit_dst,
            config_bump_dst,
            state_bump_dst,
        ) = mut_array_refs![dst, 1, 8, 1, 1, 8, 32, 2, 32, 32, 8, 32, 32, 32, 8, 4, 1, 1];

        is_initialized_dst[0] = self.is_initialized as u8;
        *ticket_price_fiat_dst = self.ticket_price_fiat.to_le_bytes();
        fiat_decimals_dst[0] = self.fiat_decimals;
        native_decimals_dst[0] = self.native_decimals;
        *round_interval_dst = self.round_interval.to_le_bytes();
        beneficiary_dst.copy_from_slice(self.beneficiary.as_ref());
        *beneficiary_share_bps_dst = self.beneficiary_share_bps.to_le_bytes();
        native_usd_feed_dst.copy_from_slice(self.native_usd_feed.as_ref());
        fiat_usd_feed_dst.copy_from_slice(self.fiat_usd_feed.as_ref());
        *max_feed_age_dst = self.max_feed_age.to_le_bytes();
        vrf_coordinator_dst.copy_from_slice(self.vrf_coordinator.as_ref());
        coordinator_authority_dst.copy_from_slice(self.coordinator_authority.as_ref());
        key_hash_dst.copy_from_slice(&self.key_hash);
        *subscription_id_dst = self.subscription_id.to_le_bytes();
        *callback_gas_limit_dst = self.callback_gas_limit.to_le_bytes();
        config_bump_dst[0] = self.config_bump;
        state_bump_dst[0] = self.state_bump;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_params;

    #[test]
    fn config_pack_keeps_every_field() {
        let config = Config::new(&sample_params(), Pubkey::new_unique(), 254, 253);
        let mut buf = vec![0u8; Config::LEN];
        Config::pack(config, &mut buf).unwrap();
        assert_eq!(Config::unpack(&buf).unwrap(), config);
    }

    #[test]
    fn uninitialized_config_is_rejected() {
        let buf = vec![0u8; Config::LEN];
        assert_eq!(
            Config::unpack(&buf).unwrap_err(),
            ProgramError::UninitializedAccount
        );
    }

    #[test]
    fn params_validation() {
        assert!(sample_params().validate().is_ok());

        let mut params = sample_params();
        params.beneficiary_share_bps = 10_001;
        assert_eq!(params.validate(), Err(RaffleError::InvalidConfig));

        let mut params = sample_params();
        params.round_interval = 0;
        assert_eq!(params.validate(), Err(RaffleError::InvalidConfig));

        let mut params = sample_params();
        params.ticket_price_fiat = 0;
        assert_eq!(params.validate(), Err(RaffleError::InvalidConfig));

        let mut params = sample_params();
        params.native_decimals = 19;
        assert_eq!(params.validate(), Err(RaffleError::InvalidConfig));
    }

    #[test]
    fn full_round_fits_in_state_account() {
        let mut state = RaffleState::new(1_700_000_000);
        for i in 0..MAX_TICKET_RANGES as u64 {
            state.round.tickets.push(TicketRange {
                participant: Pubkey::new_unique(),
                start: i,
                end: i + 1,
            });
        }
        state.round.random_request_id = Some(u64::MAX);
        state.round.winner = Some(Pubkey::new_unique());
        state.last_settlement = Some(SettlementSummary {
            round_id: 1,
            request_id: 2,
            winner: Pubkey::new_unique(),
            winner_amount: 3,
            beneficiary_amount: 4,
        });
        for request_id in 0..FULFILLED_HISTORY as u64 + 3 {
            state.remember_fulfilled(request_id);
        }
        assert_eq!(state.fulfilled_requests.len(), FULFILLED_HISTORY);
        assert!(!state.was_fulfilled(2));
        assert!(state.was_fulfilled(FULFILLED_HISTORY as u64 + 2));

        let mut data = vec![0u8; RaffleState::LEN];
        state.store(&mut data).unwrap();
        assert_eq!(RaffleState::load(&data).unwrap(), state);
    }

    #[test]
    fn shrinking_state_ignores_stale_trailing_bytes() {
        let mut data = vec![0u8; RaffleState::LEN];
        let mut state = RaffleState::new(10);
        state.round.tickets.push(TicketRange {
            participant: Pubkey::new_unique(),
            start: 0,
            end: 5,
        });
        state.store(&mut data).unwrap();

        let fresh = RaffleState::new(20);
        fresh.store(&mut data).unwrap();
        assert_eq!(RaffleState::load(&data).unwrap(), fresh);
    }
}
