// Switchboard aggregator accounts as USD price feeds
use solana_program::{account_info::AccountInfo, msg, program_error::ProgramError, pubkey::Pubkey};
use switchboard_v2::{AggregatorAccountData, SWITCHBOARD_PROGRAM_ID};

use crate::price::{FeedAnswer, PriceFeed};

/// A Switchboard v2 aggregator account read as a price feed
pub struct SwitchboardFeed<'a, 'info> {
    account: &'a AccountInfo<'info>,
}

impl<'a, 'info> SwitchboardFeed<'a, 'info> {
    /// Wraps `account` after checking it is the configured feed and is
    /// owned by the Switchboard program
    pub fn new(account: &'a AccountInfo<'info>, expected: &Pubkey) -> Result<Self, ProgramError> {
        if account.key != expected {
            msg!("Feed {} does not match configured feed {}", account.key, expected);
            return Err(ProgramError::InvalidArgument);
        }
        if account.owner != &SWITCHBOARD_PROGRAM_ID {
            msg!("Feed account not owned by Switchboard program");
            return Err(ProgramError::IncorrectProgramId);
        }
        Ok(Self { account })
    }
}

impl<'a, 'info> PriceFeed for SwitchboardFeed<'a, 'info> {
    fn latest_answer(&self) -> Result<FeedAnswer, ProgramError> {
        let data = self.account.try_borrow_data()?;
        let aggregator = AggregatorAccountData::new_from_bytes(&data)?;
        let result = aggregator.get_result()?;
        Ok(FeedAnswer {
            value: result.mantissa,
            decimals: result.scale,
            updated_at: aggregator.latest_confirmed_round.round_open_timestamp,
        })
    }
}
