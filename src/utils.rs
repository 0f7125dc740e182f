// Program derived addresses used by the rifa program
use solana_program::pubkey::Pubkey;

/// Seed of the immutable configuration account
pub const CONFIG_SEED: &[u8] = b"config";

/// Seed of the raffle state account, which also holds the pot
pub const RAFFLE_SEED: &[u8] = b"rifa";

/// Find the program derived address of the configuration account
pub fn find_config_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[CONFIG_SEED], program_id)
}

/// Find the program derived address of the raffle state account.
/// This is the address that receives ticket payments.
pub fn find_raffle_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[RAFFLE_SEED], program_id)
}

/// The raffle's public address, where the pot is held
pub fn contract_address(program_id: &Pubkey) -> Pubkey {
    find_raffle_address(program_id).0
}
