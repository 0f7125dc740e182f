//! Fiat to native price conversion from two USD price feeds.
//!
//! The ticket price is configured in fiat minor units while payment is made
//! in the native asset. Both feeds quote against USD, so the native/fiat rate
//! is `native_usd / fiat_usd`. Both answers are normalized to a common
//! precision before they are combined and the result always rounds up.

use solana_program::{clock::UnixTimestamp, msg, program_error::ProgramError};

use crate::{error::RaffleError, state::Config};

/// Largest decimal precision accepted from a feed
pub const MAX_FEED_DECIMALS: u32 = 18;

/// Latest answer reported by a price feed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeedAnswer {
    /// Signed fixed-point value
    pub value: i128,
    /// Number of decimals in `value`
    pub decimals: u32,
    /// When the answer was last updated, zero if never
    pub updated_at: UnixTimestamp,
}

/// A source of USD denominated prices
pub trait PriceFeed {
    fn latest_answer(&self) -> Result<FeedAnswer, ProgramError>;
}

/// Snapshot of both feeds, read fresh for every pricing request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceQuote {
    pub native_per_usd: FeedAnswer,
    pub fiat_per_usd: FeedAnswer,
}

impl PriceQuote {
    pub fn read(
        native_usd: &dyn PriceFeed,
        fiat_usd: &dyn PriceFeed,
        now: UnixTimestamp,
        max_age: i64,
    ) -> Result<Self, ProgramError> {
        let native_per_usd = native_usd.latest_answer()?;
        check_answer(&native_per_usd, now, max_age)?;
        let fiat_per_usd = fiat_usd.latest_answer()?;
        check_answer(&fiat_per_usd, now, max_age)?;
        Ok(Self {
            native_per_usd,
            fiat_per_usd,
        })
    }
}

fn check_answer(answer: &FeedAnswer, now: UnixTimestamp, max_age: i64) -> Result<(), RaffleError> {
    if answer.value <= 0 || answer.updated_at <= 0 {
        msg!("Feed answer {} updated at {} is not usable", answer.value, answer.updated_at);
        return Err(RaffleError::StaleOracle);
    }
    if answer.decimals > MAX_FEED_DECIMALS {
        msg!("Feed reports {} decimals", answer.decimals);
        return Err(RaffleError::StaleOracle);
    }
    if max_age > 0 && now.saturating_sub(answer.updated_at) > max_age {
        msg!("Feed answer is {} seconds old", now.saturating_sub(answer.updated_at));
        return Err(RaffleError::StaleOracle);
    }
    Ok(())
}

fn pow10(exp: u32) -> Result<u128, RaffleError> {
    10u128.checked_pow(exp).ok_or(RaffleError::ArithmeticOverflow)
}

/// Scales both answers to the larger of the two precisions
fn normalize(a: &FeedAnswer, b: &FeedAnswer) -> Result<(u128, u128), RaffleError> {
    let common = a.decimals.max(b.decimals);
    let scale = |answer: &FeedAnswer| -> Result<u128, RaffleError> {
        (answer.value as u128)
            .checked_mul(pow10(common - answer.decimals)?)
            .ok_or(RaffleError::ArithmeticOverflow)
    };
    Ok((scale(a)?, scale(b)?))
}

/// Converts a fiat amount (minor units) into native base units, rounding up
pub fn fiat_to_native(
    fiat_amount: u64,
    fiat_decimals: u8,
    native_decimals: u8,
    quote: &PriceQuote,
) -> Result<u64, ProgramError> {
    let (native_usd, fiat_usd) = normalize(&quote.native_per_usd, &quote.fiat_per_usd)?;
    if native_usd == 0 {
        return Err(RaffleError::StaleOracle.into());
    }

    // native = fiat * 10^native_decimals * fiat_usd / (10^fiat_decimals * native_usd)
    let numerator = (fiat_amount as u128)
        .checked_mul(pow10(native_decimals as u32)?)
        .and_then(|n| n.checked_mul(fiat_usd))
        .ok_or(RaffleError::ArithmeticOverflow)?;
    let denominator = pow10(fiat_decimals as u32)?
        .checked_mul(native_usd)
        .ok_or(RaffleError::ArithmeticOverflow)?;

    let mut amount = numerator / denominator;
    if numerator % denominator != 0 {
        amount += 1;
    }
    Ok(u64::try_from(amount).map_err(|_| RaffleError::ArithmeticOverflow)?)
}

/// Price of a single ticket in native base units at this moment
pub fn ticket_price_in_native(
    config: &Config,
    native_usd: &dyn PriceFeed,
    fiat_usd: &dyn PriceFeed,
    now: UnixTimestamp,
) -> Result<u64, ProgramError> {
    let quote = PriceQuote::read(native_usd, fiat_usd, now, config.max_feed_age)?;
    fiat_to_native(
        config.ticket_price_fiat,
        config.fiat_decimals,
        config.native_decimals,
        &quote,
    )
}

/// Total native price for `ticket_count` tickets at this moment
pub fn quote_tickets(
    config: &Config,
    native_usd: &dyn PriceFeed,
    fiat_usd: &dyn PriceFeed,
    now: UnixTimestamp,
    ticket_count: u64,
) -> Result<u64, ProgramError> {
    if ticket_count == 0 {
        return Err(RaffleError::InvalidTicketCount.into());
    }
    let per_ticket = ticket_price_in_native(config, native_usd, fiat_usd, now)?;
    per_ticket
        .checked_mul(ticket_count)
        .ok_or_else(|| RaffleError::ArithmeticOverflow.into())
}
