// Rifa: a recurring on-chain raffle priced in fiat and drawn with verifiable randomness

// Accounts, instructions and program glue
pub mod error;
pub mod instruction;
pub mod processor;
pub mod state;
pub mod utils;

// Raffle core
pub mod ledger;
pub mod price;
pub mod randomness;
pub mod sale;
pub mod settlement;

// External services: price feeds and the randomness coordinator
pub mod coordinator;
pub mod oracle;

#[cfg(not(feature = "no-entrypoint"))]
mod entrypoint;

#[cfg(test)]
mod test_utils;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process(program_id, accounts, instruction_data)
}
