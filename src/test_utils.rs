// Shared fixtures for unit tests
use solana_program::{
    clock::UnixTimestamp, entrypoint::ProgramResult, program_error::ProgramError, pubkey::Pubkey,
};

use crate::{
    coordinator::{coordinator_authority, RandomWordsRequest, RandomnessCoordinator},
    price::{FeedAnswer, PriceFeed},
    settlement::FundsTransfer,
    state::{Config, RaffleParams, RaffleState},
};

pub const NOW: UnixTimestamp = 1_700_000_000;

pub fn sample_params() -> RaffleParams {
    RaffleParams {
        ticket_price_fiat: 500,
        fiat_decimals: 2,
        native_decimals: 9,
        round_interval: 7 * 24 * 60 * 60,
        beneficiary: Pubkey::new_unique(),
        beneficiary_share_bps: 2_000,
        native_usd_feed: Pubkey::new_unique(),
        fiat_usd_feed: Pubkey::new_unique(),
        max_feed_age: 3_600,
        vrf_coordinator: Pubkey::new_unique(),
        key_hash: [7u8; 32],
        subscription_id: 42,
        callback_gas_limit: 200_000,
    }
}

fn config_from(params: &RaffleParams) -> Config {
    Config::new(params, coordinator_authority(&params.vrf_coordinator), 255, 254)
}

pub fn sample_config() -> Config {
    config_from(&sample_params())
}

/// Whole-unit pricing where one fiat unit buys one native unit
pub fn parity_config(ticket_price: u64) -> Config {
    let params = RaffleParams {
        ticket_price_fiat: ticket_price,
        fiat_decimals: 0,
        native_decimals: 0,
        round_interval: 3_600,
        ..sample_params()
    };
    config_from(&params)
}

pub struct StaticFeed(pub FeedAnswer);

impl StaticFeed {
    pub fn new(value: i128, decimals: u32, updated_at: UnixTimestamp) -> Self {
        Self(FeedAnswer {
            value,
            decimals,
            updated_at,
        })
    }
}

impl PriceFeed for StaticFeed {
    fn latest_answer(&self) -> Result<FeedAnswer, ProgramError> {
        Ok(self.0)
    }
}

/// Native/USD and fiat/USD feeds at the same rate
pub fn parity_feeds() -> (StaticFeed, StaticFeed) {
    (
        StaticFeed::new(1_00000000, 8, NOW),
        StaticFeed::new(1_00000000, 8, NOW),
    )
}

/// Round 0 opened at `NOW` with the given purchases at the configured price
pub fn funded_state(config: &Config, entries: &[(Pubkey, u64)]) -> RaffleState {
    let mut state = RaffleState::new(NOW);
    let price = config.ticket_price_fiat;
    for (participant, count) in entries {
        state
            .round
            .record_purchase(*participant, *count, count * price, price)
            .unwrap();
    }
    state
}

pub fn random_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[..8].copy_from_slice(&value.to_le_bytes());
    word
}

pub struct FixedCoordinator {
    pub request_id: u64,
    pub requests: Vec<RandomWordsRequest>,
}

impl FixedCoordinator {
    pub fn new(request_id: u64) -> Self {
        Self {
            request_id,
            requests: Vec::new(),
        }
    }
}

impl RandomnessCoordinator for FixedCoordinator {
    fn request_random_words(&mut self, request: &RandomWordsRequest) -> Result<u64, ProgramError> {
        self.requests.push(*request);
        Ok(self.request_id)
    }
}

#[derive(Default)]
pub struct RecordingTransfers {
    pub sent: Vec<(Pubkey, u64)>,
    fail_at: Option<usize>,
}

impl RecordingTransfers {
    /// Fails the transfer with the given zero-based position
    pub fn failing_on(position: usize) -> Self {
        Self {
            sent: Vec::new(),
            fail_at: Some(position),
        }
    }
}

impl FundsTransfer for RecordingTransfers {
    fn transfer(&mut self, recipient: &Pubkey, amount: u64) -> ProgramResult {
        if self.fail_at == Some(self.sent.len()) {
            return Err(ProgramError::InsufficientFunds);
        }
        self.sent.push((*recipient, amount));
        Ok(())
    }
}
