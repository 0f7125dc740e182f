// Randomness coordinator integration: request wire format, CPI and callback authority
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::AccountInfo,
    instruction::{AccountMeta, Instruction},
    msg,
    program::{get_return_data, invoke},
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::error::RaffleError;

/// Seed of the coordinator PDA that signs randomness callbacks
pub const AUTHORITY_SEED: &[u8] = b"vrf-authority";

/// Instructions understood by the coordinator program
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum CoordinatorInstruction {
    /// Asks for `num_words` random words to be delivered back to
    /// `consumer_program`. The coordinator answers with the request id as
    /// 8 little-endian bytes of return data.
    RequestRandomWords {
        key_hash: [u8; 32],
        subscription_id: u64,
        callback_gas_limit: u32,
        num_words: u32,
        consumer_program: Pubkey,
    },
}

/// Parameters of a randomness request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RandomWordsRequest {
    pub key_hash: [u8; 32],
    pub subscription_id: u64,
    pub callback_gas_limit: u32,
    pub num_words: u32,
}

/// An external verifiable randomness service
pub trait RandomnessCoordinator {
    /// Submits a request and returns its id
    fn request_random_words(&mut self, request: &RandomWordsRequest) -> Result<u64, ProgramError>;
}

/// Address allowed to deliver randomness on behalf of `coordinator_program`
pub fn coordinator_authority(coordinator_program: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[AUTHORITY_SEED], coordinator_program).0
}

/// Reduces a 32 byte random word to a u64 using its first 8 bytes
pub fn random_value_from_word(word: &[u8; 32]) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&word[..8]);
    u64::from_le_bytes(bytes)
}

/// Coordinator reached through a cross-program invocation
pub struct CpiCoordinator<'a, 'info> {
    pub program: &'a AccountInfo<'info>,
    pub consumer_program: Pubkey,
    /// Accounts forwarded verbatim to the coordinator
    pub accounts: &'a [AccountInfo<'info>],
}

impl<'a, 'info> RandomnessCoordinator for CpiCoordinator<'a, 'info> {
    fn request_random_words(&mut self, request: &RandomWordsRequest) -> Result<u64, ProgramError> {
        let data = CoordinatorInstruction::RequestRandomWords {
            key_hash: request.key_hash,
            subscription_id: request.subscription_id,
            callback_gas_limit: request.callback_gas_limit,
            num_words: request.num_words,
            consumer_program: self.consumer_program,
        }
        .try_to_vec()
        .map_err(|_| ProgramError::InvalidInstructionData)?;

        let instruction = Instruction {
            program_id: *self.program.key,
            accounts: self
                .accounts
                .iter()
                .map(|account| AccountMeta {
                    pubkey: *account.key,
                    is_signer: account.is_signer,
                    is_writable: account.is_writable,
                })
                .collect(),
            data,
        };

        let mut account_infos = self.accounts.to_vec();
        account_infos.push(self.program.clone());
        invoke(&instruction, &account_infos)?;

        match get_return_data() {
            Some((program_id, data)) if program_id == *self.program.key && data.len() >= 8 => {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(&data[..8]);
                Ok(u64::from_le_bytes(bytes))
            }
            _ => {
                msg!("Coordinator {} returned no request id", self.program.key);
                Err(RaffleError::CoordinatorNoResponse.into())
            }
        }
    }
}
