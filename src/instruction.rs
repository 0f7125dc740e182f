use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use crate::{
    state::RaffleParams,
    utils::{find_config_address, find_raffle_address},
};

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub enum RaffleInstruction {
    /// Deploy the raffle: store the immutable configuration and open round 0
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The deployer, pays for both accounts
    /// 1. `[writable]` The config account (PDA)
    /// 2. `[writable]` The raffle state account (PDA)
    /// 3. `[]` The system program
    InitializeRaffle {
        params: RaffleParams,
    },

    /// Buy tickets in the current round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The buyer, pays for the tickets
    /// 1. `[]` The config account
    /// 2. `[writable]` The raffle state account, receives the payment
    /// 3. `[]` Native/USD price feed
    /// 4. `[]` Fiat/USD price feed
    /// 5. `[]` The system program
    BuyTickets {
        /// Number of tickets to buy
        ticket_count: u64,
        /// Lamports attached to the purchase, must equal the current price
        payment: u64,
    },

    /// Close ticket sales and request a random value (anyone may call)
    ///
    /// Accounts expected:
    /// 0. `[signer]` Any user
    /// 1. `[]` The config account
    /// 2. `[writable]` The raffle state account
    /// 3. `[]` The randomness coordinator program
    /// Remaining accounts are forwarded to the coordinator
    RequestRandomness {},

    /// Coordinator callback delivering the random words, settles the round
    ///
    /// Accounts expected:
    /// 0. `[signer]` The coordinator authority
    /// 1. `[]` The config account
    /// 2. `[writable]` The raffle state account
    /// 3. `[writable]` The beneficiary
    /// Remaining `[writable]` accounts must include the winner
    FulfillRandomWords {
        request_id: u64,
        random_words: Vec<[u8; 32]>,
    },

    /// Publish the current price of `ticket_count` tickets as return data
    ///
    /// Accounts expected:
    /// 0. `[]` The config account
    /// 1. `[]` Native/USD price feed
    /// 2. `[]` Fiat/USD price feed
    QuoteTickets {
        ticket_count: u64,
    },
}

impl RaffleInstruction {
    /// Unpacks a byte buffer into a RaffleInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(input).map_err(|_| ProgramError::InvalidInstructionData)
    }

    /// Packs a RaffleInstruction into a byte buffer
    pub fn pack(&self) -> Result<Vec<u8>, ProgramError> {
        self.try_to_vec()
            .map_err(|_| ProgramError::InvalidInstructionData)
    }
}

/// Create initialize_raffle instruction
pub fn initialize_raffle(
    program_id: &Pubkey,
    payer: &Pubkey,
    params: RaffleParams,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::InitializeRaffle { params }.pack()?;
    let (config, _) = find_config_address(program_id);
    let (raffle, _) = find_raffle_address(program_id);

    let accounts = vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new(config, false),
        AccountMeta::new(raffle, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create buy_tickets instruction
pub fn buy_tickets(
    program_id: &Pubkey,
    buyer: &Pubkey,
    native_usd_feed: &Pubkey,
    fiat_usd_feed: &Pubkey,
    ticket_count: u64,
    payment: u64,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::BuyTickets {
        ticket_count,
        payment,
    }
    .pack()?;
    let (config, _) = find_config_address(program_id);
    let (raffle, _) = find_raffle_address(program_id);

    let accounts = vec![
        AccountMeta::new(*buyer, true),
        AccountMeta::new_readonly(config, false),
        AccountMeta::new(raffle, false),
        AccountMeta::new_readonly(*native_usd_feed, false),
        AccountMeta::new_readonly(*fiat_usd_feed, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create request_randomness instruction
pub fn request_randomness(
    program_id: &Pubkey,
    caller: &Pubkey,
    coordinator_program: &Pubkey,
    coordinator_accounts: &[AccountMeta],
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::RequestRandomness {}.pack()?;
    let (config, _) = find_config_address(program_id);
    let (raffle, _) = find_raffle_address(program_id);

    let mut accounts = vec![
        AccountMeta::new_readonly(*caller, true),
        AccountMeta::new_readonly(config, false),
        AccountMeta::new(raffle, false),
        AccountMeta::new_readonly(*coordinator_program, false),
    ];
    accounts.extend_from_slice(coordinator_accounts);

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create fulfill_random_words instruction, as issued by the coordinator
pub fn fulfill_random_words(
    program_id: &Pubkey,
    coordinator_authority: &Pubkey,
    beneficiary: &Pubkey,
    candidates: &[Pubkey],
    request_id: u64,
    random_words: Vec<[u8; 32]>,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::FulfillRandomWords {
        request_id,
        random_words,
    }
    .pack()?;
    let (config, _) = find_config_address(program_id);
    let (raffle, _) = find_raffle_address(program_id);

    let mut accounts = vec![
        AccountMeta::new_readonly(*coordinator_authority, true),
        AccountMeta::new_readonly(config, false),
        AccountMeta::new(raffle, false),
        AccountMeta::new(*beneficiary, false),
    ];
    accounts.extend(candidates.iter().map(|key| AccountMeta::new(*key, false)));

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create quote_tickets instruction
pub fn quote_tickets(
    program_id: &Pubkey,
    native_usd_feed: &Pubkey,
    fiat_usd_feed: &Pubkey,
    ticket_count: u64,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::QuoteTickets { ticket_count }.pack()?;
    let (config, _) = find_config_address(program_id);

    let accounts = vec![
        AccountMeta::new_readonly(config, false),
        AccountMeta::new_readonly(*native_usd_feed, false),
        AccountMeta::new_readonly(*fiat_usd_feed, false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}
